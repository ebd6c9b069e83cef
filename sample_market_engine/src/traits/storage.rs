use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    #[error("Object storage is unavailable: {0}")]
    Unavailable(String),
    #[error("Invalid storage key: '{0}'")]
    InvalidKey(String),
}

/// Resolves where the audio for a sample can be fetched from.
#[async_trait]
pub trait StorageUrlResolver: Send + Sync {
    async fn download_url(&self, storage_key: &str) -> Result<String, StorageError>;

    /// The URL used for in-browser playback. Unless the storage backend distinguishes the two, this is the download URL.
    async fn listen_url(&self, storage_key: &str) -> Result<String, StorageError> {
        self.download_url(storage_key).await
    }
}
