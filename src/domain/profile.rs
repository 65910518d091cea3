use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::hostname::canonical_hostname;

/// One licensee record from the sequential-id directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HarvestedProfile {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "City")]
    pub city: String,
    #[serde(rename = "State")]
    pub state: String,
    #[serde(rename = "Status")]
    pub status: Option<String>,
    #[serde(rename = "Website")]
    pub website: String,
    #[serde(rename = "Email")]
    pub email: Option<String>,
}

impl HarvestedProfile {
    pub fn hostname(&self) -> Option<String> {
        canonical_hostname(&self.website)
    }
}

/// One profile reached through the paginated listing. `name` still carries
/// the `Name - City, ST` label shown on the detail page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingRecord {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Website")]
    pub website: String,
}

/// A listing record split into its parts, ready for the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportedListing {
    pub name: String,
    pub city: String,
    pub state: String,
    pub website: String,
    pub hostname: Option<String>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RowError {
    #[error("expected 2 columns, found {0}")]
    ColumnCount(usize),
    #[error("label has no ' - ' location separator: {0}")]
    MissingLocation(String),
    #[error("could not extract hostname from {0}")]
    NoHostname(String),
}

/// `Name - City, ST` → (`Name`, `City`, `ST`), splitting on the last
/// separator of each kind.
fn split_label(label: &str) -> Option<(&str, &str, &str)> {
    let (name, location) = label.rsplit_once(" - ")?;
    let location = location.trim();

    let (city, state) = match location.rsplit_once(", ") {
        Some((city, state)) => (city.trim(), state.trim()),
        None => (location, ""),
    };
    Some((name.trim(), city, state))
}

impl ImportedListing {
    /// Parses a `"Name - City, ST","https://website"` row. Both the
    /// location and the hostname are required.
    pub fn from_row(label: &str, website: &str) -> Result<Self, RowError> {
        let hostname =
            canonical_hostname(website).ok_or_else(|| RowError::NoHostname(website.to_string()))?;
        let (name, city, state) =
            split_label(label).ok_or_else(|| RowError::MissingLocation(label.to_string()))?;

        Ok(ImportedListing {
            name: name.to_string(),
            city: city.to_string(),
            state: state.to_string(),
            website: website.trim().to_string(),
            hostname: Some(hostname),
        })
    }

    /// Keeps every harvested record: a label without a location is stored
    /// whole with an empty city and state.
    pub fn from_record(record: &ListingRecord) -> Self {
        let (name, city, state) = split_label(&record.name).unwrap_or((record.name.trim(), "", ""));

        ImportedListing {
            name: name.to_string(),
            city: city.to_string(),
            state: state.to_string(),
            website: record.website.trim().to_string(),
            hostname: canonical_hostname(&record.website),
        }
    }
}

/// Hostname with the number of harvested records that point at it.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct RankedSourceRecord {
    pub hostname: String,
    pub count: i64,
}
