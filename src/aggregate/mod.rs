//! Current-state aggregation over the key-value store

pub mod metrics;
pub mod overview;

pub use metrics::{parse_metric_value, MetricsSnapshotAggregator};
pub use overview::{absent_key_count, expected_alert_keys, AlertOverviewAggregator};
