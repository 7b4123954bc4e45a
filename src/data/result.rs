//! Response payloads produced by the aggregators.

use serde::Serialize;
use std::collections::BTreeMap;

use super::alert::{AlertRecord, Severity};

/// Tag alerts captured for one DockerHub repository
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TagAlerts {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new: Option<AlertRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated: Option<AlertRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted: Option<AlertRecord>,
}

/// Which tag slot an alert key fills
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagChange {
    New,
    Updated,
    Deleted,
}

/// Alert overview for one parent
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AggregationResult {
    pub info: u64,
    pub warning: u64,
    pub critical: u64,
    pub error: u64,
    pub problems: BTreeMap<String, Vec<AlertRecord>>,
    pub releases: BTreeMap<String, AlertRecord>,
    pub tags: BTreeMap<String, TagAlerts>,
}

impl AggregationResult {
    pub fn count(&mut self, severity: Severity, n: u64) {
        match severity {
            Severity::Info => self.info += n,
            Severity::Warning => self.warning += n,
            Severity::Critical => self.critical += n,
            Severity::Error => self.error += n,
        }
    }

    /// Count an alert at its effective severity and list it as a problem
    /// under `entity` when it is not informational.
    pub fn record(&mut self, entity: &str, record: &AlertRecord, now: f64) {
        let severity = record.effective_severity(now);
        self.count(severity, 1);

        if severity.is_problem() {
            self.problems
                .entry(entity.to_string())
                .or_default()
                .push(record.clone());
        }
    }

    pub fn set_tag(&mut self, repo: &str, change: TagChange, record: AlertRecord) {
        let tags = self.tags.entry(repo.to_string()).or_default();
        match change {
            TagChange::New => tags.new = Some(record),
            TagChange::Updated => tags.updated = Some(record),
            TagChange::Deleted => tags.deleted = Some(record),
        }
    }

    pub fn total(&self) -> u64 {
        self.info + self.warning + self.critical + self.error
    }
}

/// Entity id -> metric code -> value
pub type MetricPanel = BTreeMap<String, BTreeMap<String, serde_json::Value>>;

/// Metrics snapshot for one parent
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub system: MetricPanel,
    pub github: MetricPanel,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(severity: Severity, expiry: Option<f64>) -> AlertRecord {
        AlertRecord {
            severity,
            message: "msg".into(),
            metric: "metric".into(),
            timestamp: 10.0,
            expiry,
        }
    }

    #[test]
    fn test_record_problem_lazily_created() {
        let mut result = AggregationResult::default();

        result.record("sys1", &record(Severity::Info, None), 50.0);
        assert!(result.problems.is_empty());

        result.record("sys1", &record(Severity::Error, None), 50.0);
        result.record("sys1", &record(Severity::Warning, None), 50.0);

        assert_eq!(result.info, 1);
        assert_eq!(result.error, 1);
        assert_eq!(result.warning, 1);
        assert_eq!(result.problems["sys1"].len(), 2);
    }

    #[test]
    fn test_expired_critical_is_info() {
        let mut result = AggregationResult::default();
        result.record("sys1", &record(Severity::Critical, Some(40.0)), 50.0);

        assert_eq!(result.critical, 0);
        assert_eq!(result.info, 1);
        assert!(result.problems.is_empty());
    }

    #[test]
    fn test_empty_tags_serialize_without_slots() {
        let mut result = AggregationResult::default();
        result.set_tag("repo", TagChange::Updated, record(Severity::Info, None));

        let json = serde_json::to_value(&result).unwrap();
        let tags = &json["tags"]["repo"];
        assert!(tags.get("new").is_none());
        assert_eq!(tags["updated"]["severity"], "INFO");
    }
}
