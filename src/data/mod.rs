pub mod alert;
pub mod result;
pub mod topology;

pub use alert::{AlertRecord, Severity};
pub use result::{AggregationResult, MetricPanel, MetricsSnapshot, TagAlerts, TagChange};
pub use topology::{ChainSources, MetricSources, MetricsTopology, MonitoredTopology};
