use std::collections::HashSet;

use async_trait::async_trait;

use crate::{
    configuration::EnrichmentSettings,
    domain::{
        enrichment::{BatchOutcome, BulkTrafficRequest, EnrichmentResult},
        hostname::canonical_hostname,
        profile::RankedSourceRecord,
    },
    error::StoreError,
};

use super::EnrichmentClient;

#[async_trait]
pub trait EnrichmentStore: Send + Sync {
    /// Hostnames ordered by descending record count.
    async fn ranked_sources(
        &self,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<RankedSourceRecord>, StoreError>;

    async fn enriched_targets(&self) -> Result<HashSet<String>, StoreError>;

    async fn insert_results(&self, results: &[EnrichmentResult]) -> Result<u64, StoreError>;
}

#[derive(Debug, Clone)]
pub struct EnrichmentJobConfig {
    pub batch_size: usize,
    pub location_code: i32,
    pub language_code: String,
}

impl From<&EnrichmentSettings> for EnrichmentJobConfig {
    fn from(settings: &EnrichmentSettings) -> Self {
        EnrichmentJobConfig {
            batch_size: settings.batch_size.max(1),
            location_code: settings.location_code,
            language_code: settings.language_code.clone(),
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct JobSummary {
    pub pages_read: usize,
    pub sources_seen: usize,
    pub unparseable: usize,
    pub already_enriched: usize,
    pub duplicates: usize,
    pub batches: usize,
    pub failed_batches: usize,
    pub empty_batches: usize,
    pub targets_submitted: usize,
    pub results_inserted: u64,
    pub dropped_items: usize,
}

pub struct BatchEnrichmentJob<'a, S, C> {
    store: &'a S,
    client: &'a C,
    config: EnrichmentJobConfig,
}

impl<'a, S: EnrichmentStore, C: EnrichmentClient> BatchEnrichmentJob<'a, S, C> {
    pub fn new(store: &'a S, client: &'a C, config: EnrichmentJobConfig) -> Self {
        BatchEnrichmentJob {
            store,
            client,
            config,
        }
    }

    /// Walks the ranked sources until an empty page and submits every
    /// hostname that has no stored result yet, one batch at a time.
    pub async fn run(&self) -> Result<JobSummary, StoreError> {
        let batch_size = self.config.batch_size.max(1);
        let mut summary = JobSummary::default();
        let mut enriched = self.store.enriched_targets().await?;
        let mut claimed: HashSet<String> = HashSet::new();
        let mut buffer: Vec<String> = Vec::with_capacity(batch_size);
        let mut offset: i64 = 0;

        log::info!(
            "Starting enrichment with {} hostnames already enriched",
            enriched.len()
        );

        loop {
            let page = self
                .store
                .ranked_sources(offset, batch_size as i64)
                .await?;
            if page.is_empty() {
                break;
            }
            summary.pages_read += 1;
            offset += page.len() as i64;

            for source in page {
                summary.sources_seen += 1;

                let Some(hostname) = canonical_hostname(&source.hostname) else {
                    summary.unparseable += 1;
                    continue;
                };
                if enriched.contains(&hostname) {
                    summary.already_enriched += 1;
                    continue;
                }
                if !claimed.insert(hostname.clone()) {
                    summary.duplicates += 1;
                    continue;
                }

                buffer.push(hostname);
                if buffer.len() >= batch_size {
                    self.flush(&mut buffer, &mut summary).await?;
                    enriched = self.store.enriched_targets().await?;
                }
            }

            log::info!(
                "Read {} ranked sources, submitted {} targets so far",
                summary.sources_seen,
                summary.targets_submitted
            );
        }

        if !buffer.is_empty() {
            self.flush(&mut buffer, &mut summary).await?;
        }

        log::info!("Enrichment finished: {:?}", summary);
        Ok(summary)
    }

    async fn flush(
        &self,
        buffer: &mut Vec<String>,
        summary: &mut JobSummary,
    ) -> Result<(), StoreError> {
        let targets = std::mem::take(buffer);
        summary.batches += 1;
        summary.targets_submitted += targets.len();

        log::info!(
            "Submitting batch {} with {} targets",
            summary.batches,
            targets.len()
        );

        let request = BulkTrafficRequest {
            targets,
            location_code: self.config.location_code,
            language_code: self.config.language_code.clone(),
        };

        let response = match self.client.bulk_traffic_estimation(&request).await {
            Ok(response) => response,
            Err(e) => {
                log::error!("Batch {} failed: {}", summary.batches, e);
                summary.failed_batches += 1;
                return Ok(());
            }
        };

        match response.into_outcome() {
            BatchOutcome::NoTasks => {
                log::warn!("Batch {} returned no tasks", summary.batches);
                summary.empty_batches += 1;
            }
            BatchOutcome::NoResult { status_message } => {
                log::warn!(
                    "Batch {} returned no result: {}",
                    summary.batches,
                    status_message.unwrap_or_default()
                );
                summary.empty_batches += 1;
            }
            BatchOutcome::Items {
                items_count,
                results,
                dropped,
            } => {
                if dropped > 0 {
                    log::warn!(
                        "Batch {} dropped {} items without a usable target",
                        summary.batches,
                        dropped
                    );
                }
                summary.dropped_items += dropped;

                if !results.is_empty() {
                    let inserted = self.store.insert_results(&results).await?;
                    summary.results_inserted += inserted;
                    log::info!(
                        "Batch {} stored {} of {} items",
                        summary.batches,
                        inserted,
                        items_count.unwrap_or(results.len() as i64)
                    );
                }
            }
        }

        Ok(())
    }
}
