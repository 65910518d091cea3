use std::path::Path;

use async_trait::async_trait;
use csv::{ReaderBuilder, StringRecord};

use crate::{
    domain::profile::{ImportedListing, RowError},
    error::StoreError,
};

pub const IMPORT_CHUNK_SIZE: usize = 1000;

#[async_trait]
pub trait ListingImportStore: Send + Sync {
    async fn insert_listings(&self, listings: &[ImportedListing]) -> Result<u64, StoreError>;
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ImportSummary {
    pub rows_read: usize,
    pub malformed: usize,
    pub chunks: usize,
    pub inserted: u64,
}

fn is_header(record: &StringRecord) -> bool {
    record
        .get(0)
        .map(|field| field.trim().eq_ignore_ascii_case("name"))
        .unwrap_or(false)
}

fn parse_record(record: &StringRecord) -> Result<ImportedListing, RowError> {
    match (record.len(), record.get(0), record.get(1)) {
        (2, Some(label), Some(website)) => ImportedListing::from_row(label, website),
        (len, _, _) => Err(RowError::ColumnCount(len)),
    }
}

/// Streams a `"Name - City, ST","https://website"` file into the store.
/// Bad rows are logged and skipped; a store failure stops the import.
pub async fn import_listing_csv<S: ListingImportStore>(
    path: impl AsRef<Path>,
    store: &S,
    chunk_size: usize,
) -> Result<ImportSummary, StoreError> {
    let path = path.as_ref();
    let chunk_size = chunk_size.max(1);
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)?;

    log::info!("Importing listings from {}", path.display());

    let mut summary = ImportSummary::default();
    let mut chunk: Vec<ImportedListing> = Vec::with_capacity(chunk_size);

    for (index, record) in reader.records().enumerate() {
        let line = index + 1;
        let record = match record {
            Ok(record) => record,
            Err(e) => {
                log::warn!("Skipping unreadable row {}: {}", line, e);
                summary.malformed += 1;
                continue;
            }
        };
        if index == 0 && is_header(&record) {
            continue;
        }

        summary.rows_read += 1;
        match parse_record(&record) {
            Ok(listing) => chunk.push(listing),
            Err(e) => {
                log::warn!("Skipping malformed row {}: {}", line, e);
                summary.malformed += 1;
                continue;
            }
        }

        if chunk.len() >= chunk_size {
            flush_chunk(store, &mut chunk, &mut summary).await?;
        }
    }

    if !chunk.is_empty() {
        flush_chunk(store, &mut chunk, &mut summary).await?;
    }

    log::info!(
        "Import finished: {} rows read, {} inserted, {} malformed",
        summary.rows_read,
        summary.inserted,
        summary.malformed
    );
    Ok(summary)
}

async fn flush_chunk<S: ListingImportStore>(
    store: &S,
    chunk: &mut Vec<ImportedListing>,
    summary: &mut ImportSummary,
) -> Result<(), StoreError> {
    let inserted = store.insert_listings(chunk).await?;
    chunk.clear();
    summary.chunks += 1;
    summary.inserted += inserted;
    log::info!("Inserted {} listings so far", summary.inserted);
    Ok(())
}
