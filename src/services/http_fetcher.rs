use async_trait::async_trait;
use reqwest::{Client, StatusCode};

use crate::{configuration::BrowserSettings, error::FetchError};

use super::{FetchedPage, PageFetcher};

/// Fetches raw html without a browser. Pages that need javascript come back
/// without the rendered content.
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(settings: &BrowserSettings) -> Result<Self, reqwest::Error> {
        let mut builder = Client::builder()
            .timeout(settings.page_load_timeout())
            .cookie_store(true);
        if let Some(user_agent) = &settings.user_agent {
            builder = builder.user_agent(user_agent.clone());
        }

        Ok(HttpFetcher {
            client: builder.build()?,
        })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        let res = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::transport(url, e))?;

        let status = res.status();
        if status == StatusCode::NOT_FOUND {
            return Err(FetchError::NotFound(url.to_string()));
        }
        if !status.is_success() {
            return Err(FetchError::transport(url, format!("status {}", status)));
        }

        let source = res
            .text()
            .await
            .map_err(|e| FetchError::transport(url, e))?;

        Ok(FetchedPage {
            url: url.to_string(),
            status: Some(status.as_u16()),
            source,
        })
    }
}
