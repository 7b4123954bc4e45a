//! Alert records as written by the alerters into the key-value store.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Alert severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Info,
    Warning,
    Critical,
    Error,
}

impl Severity {
    pub const ALL: [Severity; 4] = [
        Severity::Info,
        Severity::Warning,
        Severity::Critical,
        Severity::Error,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "INFO",
            Severity::Warning => "WARNING",
            Severity::Critical => "CRITICAL",
            Severity::Error => "ERROR",
        }
    }

    /// Whether an alert of this severity is listed as a problem.
    pub fn is_problem(&self) -> bool {
        !matches!(self, Severity::Info)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Severity::ALL
            .into_iter()
            .find(|sev| sev.as_str() == s)
            .ok_or_else(|| s.to_string())
    }
}

/// Current-state alert value stored under an entity key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRecord {
    pub severity: Severity,
    pub message: String,
    pub metric: String,
    /// Unix seconds
    pub timestamp: f64,
    /// Unix seconds after which the alert no longer applies
    #[serde(default)]
    pub expiry: Option<f64>,
}

impl AlertRecord {
    /// Parse a raw stored value.
    pub fn parse(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// Severity as seen at `now`. An expired alert counts as resolved.
    pub fn effective_severity(&self, now: f64) -> Severity {
        match self.expiry {
            Some(expiry) if now >= expiry => Severity::Info,
            _ => self.severity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_record() {
        let record = AlertRecord::parse(
            r#"{"severity":"WARNING","message":"Storage at 85%","metric":"system_storage_usage","timestamp":1700000000.5,"expiry":null}"#,
        )
        .unwrap();

        assert_eq!(record.severity, Severity::Warning);
        assert_eq!(record.metric, "system_storage_usage");
        assert_eq!(record.expiry, None);
    }

    #[test]
    fn test_parse_without_expiry_field() {
        let record = AlertRecord::parse(
            r#"{"severity":"INFO","message":"ok","metric":"m","timestamp":1}"#,
        )
        .unwrap();
        assert_eq!(record.expiry, None);
    }

    #[test]
    fn test_parse_rejects_unknown_severity() {
        assert!(AlertRecord::parse(
            r#"{"severity":"FATAL","message":"","metric":"m","timestamp":1}"#
        )
        .is_err());
    }

    #[test]
    fn test_effective_severity_respects_expiry() {
        let record = AlertRecord {
            severity: Severity::Critical,
            message: "down".into(),
            metric: "system_is_down".into(),
            timestamp: 100.0,
            expiry: Some(200.0),
        };

        assert_eq!(record.effective_severity(199.9), Severity::Critical);
        assert_eq!(record.effective_severity(200.0), Severity::Info);
        assert_eq!(record.effective_severity(500.0), Severity::Info);
    }

    #[test]
    fn test_severity_from_str() {
        assert_eq!("ERROR".parse::<Severity>(), Ok(Severity::Error));
        assert!("error".parse::<Severity>().is_err());
    }
}
