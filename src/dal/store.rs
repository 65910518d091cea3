use std::collections::HashSet;

use async_trait::async_trait;
use sqlx::PgPool;

use crate::{
    domain::{
        enrichment::EnrichmentResult,
        profile::{HarvestedProfile, ImportedListing, ListingRecord, RankedSourceRecord},
    },
    error::StoreError,
    services::{EnrichmentStore, ListingImportStore, Sink},
};

use super::{enrichment_db, listing_db, profile_db};

/// Postgres behind every store seam. Cloning shares the pool.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        PgStore { pool }
    }

    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl Sink<HarvestedProfile> for PgStore {
    async fn append(&mut self, record: &HarvestedProfile) -> Result<(), StoreError> {
        profile_db::insert_profile(&self.pool, record).await?;
        Ok(())
    }
}

#[async_trait]
impl Sink<ListingRecord> for PgStore {
    async fn append(&mut self, record: &ListingRecord) -> Result<(), StoreError> {
        let listing = ImportedListing::from_record(record);
        if listing.hostname.is_none() {
            log::warn!("Storing listing {:?} without a hostname", record.name);
        }
        listing_db::insert_listings(&self.pool, &[listing]).await?;
        Ok(())
    }
}

#[async_trait]
impl ListingImportStore for PgStore {
    async fn insert_listings(&self, listings: &[ImportedListing]) -> Result<u64, StoreError> {
        Ok(listing_db::insert_listings(&self.pool, listings).await?)
    }
}

#[async_trait]
impl EnrichmentStore for PgStore {
    async fn ranked_sources(
        &self,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<RankedSourceRecord>, StoreError> {
        Ok(enrichment_db::get_ranked_hostnames(&self.pool, offset, limit).await?)
    }

    async fn enriched_targets(&self) -> Result<HashSet<String>, StoreError> {
        Ok(enrichment_db::get_enriched_targets(&self.pool).await?)
    }

    async fn insert_results(&self, results: &[EnrichmentResult]) -> Result<u64, StoreError> {
        Ok(enrichment_db::insert_bulk_traffic_items(&self.pool, results).await?)
    }
}
