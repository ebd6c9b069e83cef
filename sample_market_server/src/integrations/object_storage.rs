use async_trait::async_trait;
use log::trace;
use sample_market_engine::traits::{StorageError, StorageUrlResolver};

use crate::config::StorageConfig;

/// Builds URLs for objects in a bucket that allows anonymous reads, i.e. `{public_url}/{bucket}/{key}`.
#[derive(Debug, Clone)]
pub struct PublicBucketUrls {
    public_url: String,
    bucket: String,
}

impl PublicBucketUrls {
    pub fn new(config: &StorageConfig) -> Result<Self, StorageError> {
        let public_url = config.public_url.trim_end_matches('/').to_string();
        if !(public_url.starts_with("http://") || public_url.starts_with("https://")) {
            return Err(StorageError::Unavailable(format!("'{}' is not an http(s) URL", config.public_url)));
        }
        let bucket = config.bucket.trim_matches('/').to_string();
        if bucket.is_empty() {
            return Err(StorageError::Unavailable("No storage bucket is configured".into()));
        }
        Ok(Self { public_url, bucket })
    }
}

#[async_trait]
impl StorageUrlResolver for PublicBucketUrls {
    async fn download_url(&self, storage_key: &str) -> Result<String, StorageError> {
        let key = storage_key.trim_start_matches('/');
        if key.is_empty() || key.split('/').any(|part| part == "..") {
            return Err(StorageError::InvalidKey(storage_key.to_string()));
        }
        let url = format!("{}/{}/{key}", self.public_url, self.bucket);
        trace!("🪣️ {storage_key} resolves to {url}");
        Ok(url)
    }
}
