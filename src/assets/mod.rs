// Certificate background: fetched once, then served from memory.
use reqwest::Client;
use std::sync::{Arc, RwLock};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("background request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("background file could not be read: {0}")]
    Io(#[from] std::io::Error),
    #[error("background source returned no data")]
    Empty,
}

pub struct BackgroundCache {
    client: Client,
    source: String,
    bytes: RwLock<Option<Arc<Vec<u8>>>>,
}

impl BackgroundCache {
    /// `source` is an http(s) URL or a local file path.
    pub fn new(client: Client, source: impl Into<String>) -> Self {
        Self {
            client,
            source: source.into(),
            bytes: RwLock::new(None),
        }
    }

    pub fn cached(&self) -> Option<Arc<Vec<u8>>> {
        self.bytes.read().ok().and_then(|guard| guard.clone())
    }

    /// Warms the cache. A failure is only logged; `get` will try again.
    pub async fn prefetch(&self) {
        match self.get().await {
            Ok(bytes) => info!("Preloaded certificate background ({} bytes)", bytes.len()),
            Err(e) => warn!("Failed to preload certificate background from {}: {}", self.source, e),
        }
    }

    pub async fn get(&self) -> Result<Arc<Vec<u8>>, AssetError> {
        if let Some(bytes) = self.cached() {
            return Ok(bytes);
        }

        let bytes = Arc::new(self.fetch().await?);
        // Last write wins; racing fetches store identical bytes.
        if let Ok(mut slot) = self.bytes.write() {
            *slot = Some(bytes.clone());
        }
        Ok(bytes)
    }

    async fn fetch(&self) -> Result<Vec<u8>, AssetError> {
        let bytes = if is_remote(&self.source) {
            self.client
                .get(&self.source)
                .send()
                .await?
                .error_for_status()?
                .bytes()
                .await?
                .to_vec()
        } else {
            tokio::fs::read(&self.source).await?
        };

        if bytes.is_empty() {
            return Err(AssetError::Empty);
        }
        Ok(bytes)
    }
}

fn is_remote(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{png_fixture, spawn_upstream, Upstream};
    use std::sync::atomic::Ordering;

    #[tokio::test]
    async fn fetches_once_and_reuses_bytes() {
        let upstream = Upstream::default().with_background(png_fixture(8, 6));
        let server = spawn_upstream(upstream.clone()).await;
        let cache = BackgroundCache::new(Client::new(), server.background_url());

        let first = cache.get().await.unwrap();
        let second = cache.get().await.unwrap();

        assert_eq!(first, second);
        assert!(!first.is_empty());
        assert_eq!(upstream.background_hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_prefetch_does_not_block_later_fetch() {
        let upstream = Upstream::default();
        let server = spawn_upstream(upstream.clone()).await;
        let cache = BackgroundCache::new(Client::new(), server.background_url());

        cache.prefetch().await;
        assert!(cache.cached().is_none());

        upstream.set_background(png_fixture(4, 4));
        assert!(cache.get().await.is_ok());
        assert_eq!(upstream.background_hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn reads_local_files() {
        let path = std::env::temp_dir().join(format!("background-{}.png", uuid::Uuid::new_v4()));
        std::fs::write(&path, png_fixture(2, 2)).unwrap();

        let cache = BackgroundCache::new(Client::new(), path.to_string_lossy());
        let bytes = cache.get().await.unwrap();
        assert_eq!(bytes.as_slice(), std::fs::read(&path).unwrap().as_slice());

        std::fs::remove_file(&path).ok();
    }

    #[tokio::test]
    async fn missing_file_is_an_error() {
        let cache = BackgroundCache::new(Client::new(), "/nonexistent/background.png");
        assert!(matches!(cache.get().await, Err(AssetError::Io(_))));
    }
}
