use serde::{Deserialize, Serialize};
use serde_aux::field_attributes::deserialize_default_from_null;

use super::hostname::canonical_hostname;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalMetric {
    pub year: i32,
    pub month: i32,
    #[serde(default)]
    pub etv: Option<f64>,
    #[serde(default)]
    pub count: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsBundle {
    #[serde(default, deserialize_with = "deserialize_default_from_null")]
    pub organic: Vec<HistoricalMetric>,
    #[serde(default, deserialize_with = "deserialize_default_from_null")]
    pub paid: Vec<HistoricalMetric>,
    #[serde(default, deserialize_with = "deserialize_default_from_null")]
    pub local_pack: Vec<HistoricalMetric>,
    #[serde(default, deserialize_with = "deserialize_default_from_null")]
    pub featured_snippet: Vec<HistoricalMetric>,
}

/// Traffic metrics for one canonical hostname. Written once, never updated.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichmentResult {
    pub target: String,
    pub se_type: Option<String>,
    pub metrics: MetricsBundle,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BulkTrafficRequest {
    pub targets: Vec<String>,
    pub location_code: i32,
    pub language_code: String,
}

#[derive(Debug, Deserialize)]
pub struct BulkTrafficResponse {
    #[serde(default, deserialize_with = "deserialize_default_from_null")]
    pub tasks: Vec<BulkTrafficTask>,
}

#[derive(Debug, Deserialize)]
pub struct BulkTrafficTask {
    #[serde(default)]
    pub status_code: Option<i64>,
    #[serde(default)]
    pub status_message: Option<String>,
    #[serde(default, deserialize_with = "deserialize_default_from_null")]
    pub result: Vec<BulkTrafficResult>,
}

#[derive(Debug, Deserialize)]
pub struct BulkTrafficResult {
    #[serde(default)]
    pub items_count: Option<i64>,
    #[serde(default, deserialize_with = "deserialize_default_from_null")]
    pub items: Vec<BulkTrafficItem>,
}

#[derive(Debug, Deserialize)]
pub struct BulkTrafficItem {
    #[serde(default)]
    pub se_type: Option<String>,
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default, deserialize_with = "deserialize_default_from_null")]
    pub metrics: MetricsBundle,
}

impl BulkTrafficItem {
    /// Re-keys the item on the canonical hostname of whatever url-like
    /// string the service echoed back as `target`.
    pub fn into_result(self) -> Option<EnrichmentResult> {
        let target = canonical_hostname(self.target.as_deref()?)?;

        Some(EnrichmentResult {
            target,
            se_type: self.se_type,
            metrics: self.metrics,
        })
    }
}

/// What a single batch call produced once the payload has been validated.
#[derive(Debug, PartialEq)]
pub enum BatchOutcome {
    NoTasks,
    NoResult { status_message: Option<String> },
    Items {
        items_count: Option<i64>,
        results: Vec<EnrichmentResult>,
        dropped: usize,
    },
}

impl BulkTrafficResponse {
    /// Only the first task and its first result are read; each call carries
    /// exactly one task.
    pub fn into_outcome(self) -> BatchOutcome {
        let Some(task) = self.tasks.into_iter().next() else {
            return BatchOutcome::NoTasks;
        };

        let Some(result) = task.result.into_iter().next() else {
            return BatchOutcome::NoResult {
                status_message: task.status_message,
            };
        };

        let total = result.items.len();
        let results: Vec<EnrichmentResult> = result
            .items
            .into_iter()
            .filter_map(BulkTrafficItem::into_result)
            .collect();

        BatchOutcome::Items {
            items_count: result.items_count,
            dropped: total - results.len(),
            results,
        }
    }
}
