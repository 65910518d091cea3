use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::{
    configuration::EnrichmentSettings,
    domain::enrichment::{BulkTrafficRequest, BulkTrafficResponse},
    error::ServiceError,
};

pub const BULK_TRAFFIC_PATH: &str =
    "/v3/dataforseo_labs/google/historical_bulk_traffic_estimation/live";

#[async_trait]
pub trait EnrichmentClient: Send + Sync {
    async fn bulk_traffic_estimation(
        &self,
        request: &BulkTrafficRequest,
    ) -> Result<BulkTrafficResponse, ServiceError>;
}

/// Historical bulk traffic estimation over basic auth.
pub struct DataForSeoClient {
    client: Client,
    endpoint: String,
    login: String,
    password: String,
}

impl DataForSeoClient {
    pub fn new(settings: &EnrichmentSettings) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;

        Ok(DataForSeoClient {
            client,
            endpoint: format!(
                "{}{}",
                settings.base_url.trim_end_matches('/'),
                BULK_TRAFFIC_PATH
            ),
            login: settings.login.clone(),
            password: settings.password.clone(),
        })
    }
}

#[async_trait]
impl EnrichmentClient for DataForSeoClient {
    async fn bulk_traffic_estimation(
        &self,
        request: &BulkTrafficRequest,
    ) -> Result<BulkTrafficResponse, ServiceError> {
        // The endpoint takes an array of tasks; one task per call.
        let res = self
            .client
            .post(&self.endpoint)
            .basic_auth(&self.login, Some(&self.password))
            .json(&[request])
            .send()
            .await?;

        let status = res.status();
        let body = res.text().await?;
        if !status.is_success() {
            return Err(ServiceError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(serde_json::from_str(&body)?)
    }
}
