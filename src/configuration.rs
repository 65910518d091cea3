use std::time::Duration;

use serde::Deserialize;
use serde_aux::field_attributes::deserialize_number_from_string;
use sqlx::postgres::{PgConnectOptions, PgSslMode};

#[derive(Deserialize, Clone)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub browser: BrowserSettings,
    pub sequential: SequentialSettings,
    pub listing: ListingSettings,
    pub enrichment: EnrichmentSettings,
}

#[derive(Deserialize, Clone)]
pub struct DatabaseSettings {
    pub username: String,
    pub password: String,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub port: u16,
    pub host: String,
    pub database_name: String,
    pub require_ssl: bool,
}

impl DatabaseSettings {
    pub fn without_db(&self) -> PgConnectOptions {
        let ssl_mode = match self.require_ssl {
            true => PgSslMode::Require,
            false => PgSslMode::Prefer,
        };
        PgConnectOptions::new()
            .host(&self.host)
            .username(&self.username)
            .password(&self.password)
            .port(self.port)
            .ssl_mode(ssl_mode)
    }

    pub fn with_db(&self) -> PgConnectOptions {
        self.without_db().database(&self.database_name)
    }
}

#[derive(Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BrowserBackend {
    /// Chrome driven over WebDriver.
    Webdriver,
    /// Plain GET requests, no javascript.
    Http,
}

#[derive(Deserialize, Clone)]
pub struct BrowserSettings {
    pub backend: BrowserBackend,
    pub webdriver_url: String,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub page_load_timeout_secs: u64,
    pub user_agent: Option<String>,
}

impl BrowserSettings {
    pub fn page_load_timeout(&self) -> Duration {
        Duration::from_secs(self.page_load_timeout_secs)
    }
}

#[derive(Deserialize, Clone)]
pub struct SequentialSettings {
    /// Detail url prefix, the id is appended to it.
    pub base_url: String,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub start_id: u64,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub failure_threshold: u32,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub high_water_mark: u64,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub delay_millis: u64,
    pub output: String,
}

#[derive(Deserialize, Clone)]
pub struct ListingSettings {
    pub base_url: String,
    pub partitions: String,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub start_page: u32,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub max_retries: u32,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub retry_base_delay_secs: u64,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub detail_delay_millis: u64,
    pub output: String,
}

#[derive(Deserialize, Clone)]
pub struct EnrichmentSettings {
    pub base_url: String,
    pub login: String,
    pub password: String,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub location_code: i32,
    pub language_code: String,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub batch_size: usize,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub timeout_secs: u64,
}

pub enum Environment {
    Local,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Local => "local",
            Environment::Production => "production",
        }
    }
}

impl TryFrom<String> for Environment {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "production" => Ok(Self::Production),
            other => Err(format!(
                "{} is not a supported environment. Use either `local` or `production`.",
                other
            )),
        }
    }
}

pub fn get_configuration() -> Result<Settings, config::ConfigError> {
    let base_path = std::env::current_dir().map_err(|e| config::ConfigError::Foreign(e.into()))?;
    let configuration_directory = base_path.join("configuration");

    let environment: Environment = std::env::var("APP_ENVIRONMENT")
        .unwrap_or_else(|_| "local".into())
        .try_into()
        .map_err(|e: String| config::ConfigError::Message(e))?;
    let environment_filename = format!("{}.yaml", environment.as_str());

    let settings = config::Config::builder()
        .add_source(config::File::from(configuration_directory.join("base.yaml")))
        .add_source(
            config::File::from(configuration_directory.join(environment_filename)).required(false),
        )
        // e.g. `APP_ENRICHMENT__PASSWORD=...` sets `Settings.enrichment.password`
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    settings.try_deserialize::<Settings>()
}
