use std::{fs::OpenOptions, marker::PhantomData, path::Path};

use async_trait::async_trait;
use csv::{QuoteStyle, Terminator, Writer, WriterBuilder};
use serde::Serialize;

use crate::{
    domain::profile::{HarvestedProfile, ListingRecord},
    error::StoreError,
};

/// Append-only destination for harvested records. Every record is written
/// through as soon as it is appended.
#[async_trait]
pub trait Sink<R: Sync>: Send {
    async fn append(&mut self, record: &R) -> Result<(), StoreError>;
}

pub trait CsvRow: Serialize {
    const HEADER: &'static [&'static str];
}

impl CsvRow for HarvestedProfile {
    const HEADER: &'static [&'static str] = &["Name", "City", "State", "Status", "Website", "Email"];
}

impl CsvRow for ListingRecord {
    const HEADER: &'static [&'static str] = &["Name", "Website"];
}

/// Quote-all csv file opened in append mode.
pub struct CsvSink<R> {
    writer: Writer<std::fs::File>,
    _row: PhantomData<fn(&R)>,
}

impl<R: CsvRow> CsvSink<R> {
    /// Writes the header only when the file is created (or still empty).
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let is_new = std::fs::metadata(path)
            .map(|meta| meta.len() == 0)
            .unwrap_or(true);

        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let mut writer = WriterBuilder::new()
            .has_headers(false)
            .quote_style(QuoteStyle::Always)
            .terminator(Terminator::Any(b'\n'))
            .from_writer(file);

        if is_new {
            writer.write_record(R::HEADER)?;
            writer.flush()?;
            log::info!("Initialized {} with headers", path.display());
        }

        Ok(CsvSink {
            writer,
            _row: PhantomData,
        })
    }
}

#[async_trait]
impl<R: CsvRow + Sync> Sink<R> for CsvSink<R> {
    async fn append(&mut self, record: &R) -> Result<(), StoreError> {
        self.writer.serialize(record)?;
        self.writer.flush()?;
        Ok(())
    }
}
