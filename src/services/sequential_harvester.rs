use std::time::Duration;

use crate::{
    configuration::SequentialSettings,
    domain::profile::HarvestedProfile,
    error::{FetchError, StoreError},
};

use super::{PageFetcher, ProfileExtractor, Shutdown, Sink};

#[derive(Debug, Clone)]
pub struct SequentialConfig {
    pub base_url: String,
    pub start_id: u64,
    pub failure_threshold: u32,
    pub high_water_mark: u64,
    pub delay: Duration,
}

impl From<&SequentialSettings> for SequentialConfig {
    fn from(settings: &SequentialSettings) -> Self {
        SequentialConfig {
            base_url: settings.base_url.clone(),
            start_id: settings.start_id,
            failure_threshold: settings.failure_threshold,
            high_water_mark: settings.high_water_mark,
            delay: Duration::from_millis(settings.delay_millis),
        }
    }
}

/// Result of visiting one id.
#[derive(Debug, PartialEq)]
pub enum IdOutcome {
    Parsed(HarvestedProfile),
    NotFound,
    ParseEmpty,
    TransportError(String),
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SequentialStats {
    pub fetched: u64,
    pub parsed: u64,
    pub not_found: u64,
    pub parse_empty: u64,
    pub transport_errors: u64,
    pub last_id: Option<u64>,
    pub aborted: bool,
}

/// Walks consecutive ids from `start_id` until the stopping heuristic fires:
/// more than `failure_threshold` failures in a row while past
/// `high_water_mark`.
pub struct SequentialIdHarvester<'a, F, E> {
    fetcher: &'a F,
    extractor: E,
    config: SequentialConfig,
    shutdown: Shutdown,
    next_id: u64,
    consecutive_failures: u32,
    finished: bool,
    stats: SequentialStats,
}

impl<'a, F: PageFetcher, E: ProfileExtractor> SequentialIdHarvester<'a, F, E> {
    pub fn new(fetcher: &'a F, extractor: E, config: SequentialConfig, shutdown: Shutdown) -> Self {
        SequentialIdHarvester {
            fetcher,
            extractor,
            next_id: config.start_id,
            config,
            shutdown,
            consecutive_failures: 0,
            finished: false,
            stats: SequentialStats::default(),
        }
    }

    pub fn detail_url(&self, id: u64) -> String {
        format!("{}{}", self.config.base_url, id)
    }

    pub fn stats(&self) -> &SequentialStats {
        &self.stats
    }

    pub async fn fetch_id(&self, id: u64) -> IdOutcome {
        match self.fetcher.fetch(&self.detail_url(id)).await {
            Ok(page) if page.status == Some(404) => IdOutcome::NotFound,
            Ok(page) => match self.extractor.extract_profile(&page) {
                Some(profile) => IdOutcome::Parsed(profile),
                None => IdOutcome::ParseEmpty,
            },
            Err(FetchError::NotFound(_)) => IdOutcome::NotFound,
            Err(e) => IdOutcome::TransportError(e.to_string()),
        }
    }

    fn should_stop(&self, id: u64) -> bool {
        self.consecutive_failures > self.config.failure_threshold
            && id > self.config.high_water_mark
    }

    /// Next profile in id order, or `None` once the walk has stopped.
    pub async fn next_profile(&mut self) -> Option<HarvestedProfile> {
        while !self.finished {
            if self.shutdown.is_triggered() {
                log::warn!("Sequential harvest aborted before id {}", self.next_id);
                self.stats.aborted = true;
                self.finished = true;
                break;
            }

            if self.stats.fetched > 0 {
                tokio::time::sleep(self.config.delay).await;
            }

            let id = self.next_id;
            self.next_id += 1;

            let outcome = self.fetch_id(id).await;
            self.stats.fetched += 1;
            self.stats.last_id = Some(id);

            let profile = match outcome {
                IdOutcome::Parsed(profile) => {
                    log::info!(
                        "Found id {}: {} | {} | {}",
                        id,
                        profile.name,
                        profile.email.as_deref().unwrap_or("-"),
                        profile.status.as_deref().unwrap_or("-")
                    );
                    self.consecutive_failures = 0;
                    self.stats.parsed += 1;
                    Some(profile)
                }
                IdOutcome::NotFound => {
                    log::info!("Id {}: not found", id);
                    self.consecutive_failures += 1;
                    self.stats.not_found += 1;
                    None
                }
                IdOutcome::ParseEmpty => {
                    log::info!("Id {}: empty or invalid profile", id);
                    self.consecutive_failures += 1;
                    self.stats.parse_empty += 1;
                    None
                }
                IdOutcome::TransportError(e) => {
                    log::error!("Error processing id {}: {}", id, e);
                    self.consecutive_failures += 1;
                    self.stats.transport_errors += 1;
                    None
                }
            };

            if self.should_stop(id) {
                log::info!(
                    "{} consecutive failures past id {}, stopping at id {}",
                    self.consecutive_failures,
                    self.config.high_water_mark,
                    id
                );
                self.finished = true;
            }

            if profile.is_some() {
                return profile;
            }
        }

        None
    }

    /// Drains the walk into `sink`, one append per profile.
    pub async fn run<S: Sink<HarvestedProfile>>(
        mut self,
        sink: &mut S,
    ) -> Result<SequentialStats, StoreError> {
        log::info!("Starting sequential harvest at id {}", self.next_id);

        while let Some(profile) = self.next_profile().await {
            sink.append(&profile).await?;

            if self.stats.parsed % 100 == 0 {
                log::info!(
                    "Progress: {} ids fetched, {} profiles, {} failures in a row",
                    self.stats.fetched,
                    self.stats.parsed,
                    self.consecutive_failures
                );
            }
        }

        log::info!("Sequential harvest finished: {:?}", self.stats);
        Ok(self.stats)
    }
}
