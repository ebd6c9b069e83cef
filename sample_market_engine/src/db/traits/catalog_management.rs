use async_trait::async_trait;

use crate::db_types::{Sample, SampleId};

/// Read access to the sample catalog.
#[async_trait]
pub trait CatalogManagement: Send + Sync {
    type Error: std::error::Error + Send;

    async fn fetch_sample(&self, sample_id: &SampleId) -> Result<Option<Sample>, Self::Error>;
}
