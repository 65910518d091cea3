use async_trait::async_trait;

use crate::error::FetchError;

/// Page source as rendered by the fetch backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    pub url: String,
    /// Only known for plain http fetches.
    pub status: Option<u16>,
    pub source: String,
}

#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError>;
}
