//! Historical and static queries against the document store

pub mod alerts;
pub mod metrics;
pub mod monitorables;

pub use alerts::HistoricalAlertQuery;
pub use metrics::HistoricalMetricsQuery;
pub use monitorables::{MonitorableGroups, MonitorablesInfo, TopologyQuery, MONITORABLES_COLLECTION};

use crate::data::Severity;

/// Alert history request
#[derive(Debug, Clone, PartialEq)]
pub struct AlertsQuery {
    pub chains: Vec<String>,
    pub severities: Vec<Severity>,
    /// Alert origins to keep
    pub sources: Vec<String>,
    pub min_timestamp: f64,
    pub max_timestamp: f64,
    pub limit: usize,
}

/// Metric history request
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsQuery {
    pub chains: Vec<String>,
    pub systems: Vec<String>,
    pub min_timestamp: f64,
    pub max_timestamp: f64,
    pub limit_per_source: usize,
}

/// Pull the pushed array out of a grouped pipeline result.
fn grouped_items(mut docs: Vec<serde_json::Value>, field: &str) -> Vec<serde_json::Value> {
    docs.first_mut()
        .and_then(|doc| doc.get_mut(field))
        .map(serde_json::Value::take)
        .and_then(|items| match items {
            serde_json::Value::Array(items) => Some(items),
            _ => None,
        })
        .unwrap_or_default()
}
