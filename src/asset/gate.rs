use std::sync::Arc;

use parking_lot::Mutex;

use super::{AssetCategory, AssetHost};
use crate::error::AgemorphError;

#[derive(Debug, Clone)]
struct CachedAsset {
    source_ref: String,
    url: String,
}

#[derive(Debug, Default)]
struct GateCache {
    asset: Option<CachedAsset>,
    /// Bumped by `forget`; an upload started under an older generation
    /// must not repopulate the cache.
    generation: u64,
}

/// Durable URL returned by [`UploadGate::ensure_hosted`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnsuredAsset {
    pub url: String,
    /// False when the URL came from the cache.
    pub uploaded: bool,
}

/// Uploads a source image at most once per workflow instance.
///
/// The durable URL is cached against its source reference; every later call
/// for the same source, retries included, returns it without touching the
/// network. Uploads are serialized, so a caller arriving while another
/// upload of the same source is in flight reuses its result.
pub struct UploadGate<H> {
    host: Arc<H>,
    cache: Mutex<GateCache>,
    uploading: tokio::sync::Mutex<()>,
}

impl<H: AssetHost> UploadGate<H> {
    pub fn new(host: Arc<H>) -> Self {
        Self {
            host,
            cache: Mutex::new(GateCache::default()),
            uploading: tokio::sync::Mutex::new(()),
        }
    }

    /// Cached durable URL for `source_ref`, if any.
    pub fn cached_url(&self, source_ref: &str) -> Option<String> {
        self.cache
            .lock()
            .asset
            .as_ref()
            .filter(|c| c.source_ref == source_ref)
            .map(|c| c.url.clone())
    }

    /// Return a durable URL for `source_ref`, uploading only on a cache miss.
    pub async fn ensure_hosted(&self, source_ref: &str) -> Result<EnsuredAsset, AgemorphError> {
        if source_ref.trim().is_empty() {
            return Err(AgemorphError::Validation("No image URL provided".to_string()));
        }
        if let Some(url) = self.cached_url(source_ref) {
            tracing::debug!(%url, "Reusing hosted asset");
            return Ok(EnsuredAsset { url, uploaded: false });
        }

        let _uploading = self.uploading.lock().await;
        if let Some(url) = self.cached_url(source_ref) {
            tracing::debug!(%url, "Reusing asset hosted by a concurrent upload");
            return Ok(EnsuredAsset { url, uploaded: false });
        }

        let generation = self.cache.lock().generation;
        let hosted = self.host.upload(source_ref, AssetCategory::Original).await?;

        let mut cache = self.cache.lock();
        if cache.generation == generation {
            tracing::info!(url = %hosted.url, "Source image hosted");
            cache.asset = Some(CachedAsset {
                source_ref: source_ref.to_string(),
                url: hosted.url.clone(),
            });
        } else {
            tracing::debug!(url = %hosted.url, "Image removed during upload, not caching");
        }
        Ok(EnsuredAsset {
            url: hosted.url,
            uploaded: true,
        })
    }

    /// Drop the cached URL, e.g. when the user removes the image. An upload
    /// still in flight will not be cached either.
    pub fn forget(&self) {
        let mut cache = self.cache.lock();
        cache.asset = None;
        cache.generation += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::FakeAssetHost;
    use std::time::Duration;

    #[tokio::test]
    async fn second_call_is_served_from_cache() {
        let host = Arc::new(FakeAssetHost::ok("https://cdn.example/a.jpg"));
        let gate = UploadGate::new(host.clone());

        let first = gate.ensure_hosted("widget://a").await.unwrap();
        let second = gate.ensure_hosted("widget://a").await.unwrap();

        assert_eq!(first.url, "https://cdn.example/a.jpg");
        assert!(first.uploaded);
        assert_eq!(second.url, first.url);
        assert!(!second.uploaded);
        assert_eq!(host.uploads(), 1);
    }

    #[tokio::test]
    async fn different_source_uploads_again() {
        let host = Arc::new(FakeAssetHost::ok("https://cdn.example/a.jpg"));
        let gate = UploadGate::new(host.clone());

        gate.ensure_hosted("widget://a").await.unwrap();
        gate.ensure_hosted("widget://b").await.unwrap();
        assert_eq!(host.uploads(), 2);
        assert!(gate.cached_url("widget://a").is_none());
        assert!(gate.cached_url("widget://b").is_some());
    }

    #[tokio::test]
    async fn empty_source_is_rejected_without_upload() {
        let host = Arc::new(FakeAssetHost::ok("https://cdn.example/a.jpg"));
        let gate = UploadGate::new(host.clone());

        let err = gate.ensure_hosted("  ").await.unwrap_err();
        assert!(matches!(err, AgemorphError::Validation(_)));
        assert_eq!(host.uploads(), 0);
    }

    #[tokio::test]
    async fn failure_is_not_cached_or_retried() {
        let host = Arc::new(FakeAssetHost::failing());
        let gate = UploadGate::new(host.clone());

        let err = gate.ensure_hosted("widget://a").await.unwrap_err();
        assert!(matches!(err, AgemorphError::UploadFailed(_)));
        assert_eq!(host.uploads(), 1);
        assert!(gate.cached_url("widget://a").is_none());
    }

    #[tokio::test]
    async fn forget_clears_cache() {
        let host = Arc::new(FakeAssetHost::ok("https://cdn.example/a.jpg"));
        let gate = UploadGate::new(host.clone());

        gate.ensure_hosted("widget://a").await.unwrap();
        gate.forget();
        gate.ensure_hosted("widget://a").await.unwrap();
        assert_eq!(host.uploads(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn upload_landing_after_forget_is_not_cached() {
        let host = Arc::new(
            FakeAssetHost::ok("https://cdn.example/a.jpg").with_upload_delay(Duration::from_secs(10)),
        );
        let gate = Arc::new(UploadGate::new(host.clone()));

        let pending = {
            let gate = gate.clone();
            tokio::spawn(async move { gate.ensure_hosted("widget://a").await })
        };
        tokio::time::sleep(Duration::from_secs(1)).await;
        gate.forget();

        let landed = pending.await.unwrap().unwrap();
        assert!(landed.uploaded);
        assert!(gate.cached_url("widget://a").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_callers_share_one_upload() {
        let host = Arc::new(
            FakeAssetHost::ok("https://cdn.example/a.jpg").with_upload_delay(Duration::from_secs(10)),
        );
        let gate = Arc::new(UploadGate::new(host.clone()));

        let first = {
            let gate = gate.clone();
            tokio::spawn(async move { gate.ensure_hosted("widget://a").await })
        };
        tokio::time::sleep(Duration::from_secs(1)).await;
        let second = gate.ensure_hosted("widget://a").await.unwrap();

        assert!(first.await.unwrap().unwrap().uploaded);
        assert!(!second.uploaded);
        assert_eq!(host.uploads(), 1);
    }
}
