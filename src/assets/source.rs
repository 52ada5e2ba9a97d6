use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::io::AsyncReadExt;
use tracing::debug;
use url::Url;

use super::loader::{LoadProgress, ProgressSink};

const READ_CHUNK_SIZE: usize = 64 * 1024;

/// Forwards transfer progress for one path to an optional sink.
pub struct ProgressReporter<'a> {
    path: &'a str,
    sink: Option<&'a ProgressSink>,
}

impl<'a> ProgressReporter<'a> {
    pub fn new(path: &'a str, sink: Option<&'a ProgressSink>) -> Self {
        Self { path, sink }
    }

    pub fn report(&self, loaded: u64, total: Option<u64>) {
        if let Some(sink) = self.sink {
            sink(LoadProgress {
                path: self.path.to_string(),
                loaded,
                total,
            });
        }
    }
}

/// Byte transport behind the asset loader.
#[async_trait]
pub trait AssetSource: Send + Sync {
    async fn fetch(&self, path: &str, progress: &ProgressReporter<'_>) -> Result<Vec<u8>>;
}

/// Reads assets relative to a static base directory.
pub struct FileSource {
    base_dir: PathBuf,
}

impl FileSource {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.base_dir.join(path.trim_start_matches("./"))
    }
}

#[async_trait]
impl AssetSource for FileSource {
    async fn fetch(&self, path: &str, progress: &ProgressReporter<'_>) -> Result<Vec<u8>> {
        let full_path = self.resolve(path);
        debug!("Reading asset file {:?}", full_path);

        let mut file = tokio::fs::File::open(&full_path)
            .await
            .with_context(|| format!("opening {}", full_path.display()))?;
        let total = file.metadata().await.ok().map(|m| m.len());

        let mut bytes = Vec::with_capacity(total.unwrap_or(0) as usize);
        let mut chunk = vec![0u8; READ_CHUNK_SIZE];
        loop {
            let read = file.read(&mut chunk).await?;
            if read == 0 {
                break;
            }
            bytes.extend_from_slice(&chunk[..read]);
            progress.report(bytes.len() as u64, total);
        }
        Ok(bytes)
    }
}

/// Fetches assets over HTTP(S) relative to a base URL.
pub struct HttpSource {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpSource {
    pub fn new(base_url: Url) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
        }
    }

    /// Uses a preconfigured client, e.g. one with custom proxy or TLS settings.
    pub fn with_client(client: reqwest::Client, base_url: Url) -> Self {
        Self { client, base_url }
    }
}

#[async_trait]
impl AssetSource for HttpSource {
    async fn fetch(&self, path: &str, progress: &ProgressReporter<'_>) -> Result<Vec<u8>> {
        let url = self
            .base_url
            .join(path.trim_start_matches("./"))
            .map_err(|e| anyhow!("invalid asset url for {}: {}", path, e))?;
        debug!("GET {}", url);

        let mut response = self.client.get(url).send().await?.error_for_status()?;
        let total = response.content_length();

        let mut bytes = Vec::with_capacity(total.unwrap_or(0) as usize);
        while let Some(chunk) = response.chunk().await? {
            bytes.extend_from_slice(&chunk);
            progress.report(bytes.len() as u64, total);
        }
        Ok(bytes)
    }
}
