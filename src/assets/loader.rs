use std::sync::Arc;
use tracing::{error, info};

use super::material::MaterialRules;
use super::parse::parse_asset;
use super::source::{AssetSource, ProgressReporter};
use super::{AssetHandle, LoadError, LoadResult};

/// Transfer progress for a single path.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadProgress {
    pub path: String,
    pub loaded: u64,
    pub total: Option<u64>,
}

impl LoadProgress {
    /// Fraction of the payload transferred, when the total is known.
    pub fn fraction(&self) -> Option<f32> {
        match self.total {
            Some(0) => Some(1.0),
            Some(total) => Some((self.loaded as f64 / total as f64).min(1.0) as f32),
            None => None,
        }
    }
}

pub type ProgressSink = Arc<dyn Fn(LoadProgress) + Send + Sync>;

/// Fetches a file through an [`AssetSource`] and parses it into an [`AssetHandle`].
///
/// Single-shot: a failed load is reported, never retried.
#[derive(Clone)]
pub struct AssetLoader {
    source: Arc<dyn AssetSource>,
    rules: MaterialRules,
}

impl AssetLoader {
    pub fn new(source: Arc<dyn AssetSource>, rules: MaterialRules) -> Self {
        Self { source, rules }
    }

    pub async fn load(&self, path: &str) -> LoadResult<AssetHandle> {
        self.load_with_progress(path, None).await
    }

    pub async fn load_with_progress(
        &self,
        path: &str,
        sink: Option<&ProgressSink>,
    ) -> LoadResult<AssetHandle> {
        let reporter = ProgressReporter::new(path, sink);
        let bytes = self.source.fetch(path, &reporter).await.map_err(|e| {
            error!("Failed to fetch asset {}: {:#}", path, e);
            LoadError::fetch(path, format!("{:#}", e))
        })?;

        let handle = parse_asset(path, &bytes, &self.rules)?;
        info!(
            "Loaded asset {} ({} bytes, {} nodes, {} clips)",
            path,
            bytes.len(),
            handle.root().len(),
            handle.clips().len()
        );
        Ok(handle)
    }
}
