use thiserror::Error;

/// Failure to obtain a rendered document for a single url.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("transport error on {url}: {message}")]
    Transport { url: String, message: String },
    #[error("not found: {0}")]
    NotFound(String),
    #[error("browser session error: {0}")]
    Browser(#[from] thirtyfour::error::WebDriverError),
}

impl FetchError {
    pub fn transport(url: &str, message: impl ToString) -> Self {
        FetchError::Transport {
            url: url.to_string(),
            message: message.to_string(),
        }
    }
}

/// Failure of one call to the bulk metrics service.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("request to enrichment service failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("enrichment service answered with status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed enrichment response: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Persistence failure. Always fatal for the running job.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
