use tokio::runtime::{Builder, Runtime};

use super::settings::{RuntimeFlavor, RuntimeSettings};

/// Builds the tokio runtime the stage runs on.
pub fn build_runtime(settings: &RuntimeSettings) -> anyhow::Result<Runtime> {
    tracing::info!("Initializing runtime with config: {:?}", settings);

    let mut builder = match settings.flavor {
        RuntimeFlavor::CurrentThread => Builder::new_current_thread(),
        RuntimeFlavor::MultiThread => {
            let mut builder = Builder::new_multi_thread();
            if settings.worker_threads > 0 {
                builder.worker_threads(settings.worker_threads);
            }
            builder
        }
    };

    builder
        .thread_name("avatar-stage")
        .enable_all()
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to create async runtime: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builds_both_flavors() {
        for flavor in [RuntimeFlavor::CurrentThread, RuntimeFlavor::MultiThread] {
            let settings = RuntimeSettings {
                flavor,
                worker_threads: 1,
            };
            let runtime = build_runtime(&settings).unwrap();
            assert_eq!(runtime.block_on(async { 40 + 2 }), 42);
        }
    }
}
