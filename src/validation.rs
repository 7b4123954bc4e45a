//! Request decoding.
//!
//! Raw JSON bodies are checked here and turned into typed values before any
//! store is touched. Every rejection maps onto one [`EngineError`] kind.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::data::{ChainSources, MetricSources, MetricsTopology, MonitoredTopology, Severity};
use crate::error::EngineError;
use crate::query::{AlertsQuery, MetricsQuery};

pub const SUPPORTED_BASE_CHAINS: [&str; 4] = ["cosmos", "general", "chainlink", "substrate"];

/// Check that every named field is present and non-null.
pub fn require_fields<'a>(
    body: &'a Value,
    fields: &[&str],
) -> Result<&'a Map<String, Value>, EngineError> {
    let missing: Vec<&str> = fields
        .iter()
        .copied()
        .filter(|f| body.get(*f).map(Value::is_null).unwrap_or(true))
        .collect();

    if !missing.is_empty() {
        return Err(EngineError::missing(missing));
    }

    body.as_object()
        .ok_or_else(|| EngineError::missing(fields.iter().copied()))
}

pub fn string_list(field: &str, value: &Value) -> Result<Vec<String>, EngineError> {
    let invalid = || EngineError::InvalidParameterValue(field.to_string());
    value
        .as_array()
        .ok_or_else(invalid)?
        .iter()
        .map(|v| v.as_str().map(str::to_string).ok_or_else(invalid))
        .collect()
}

pub fn severities(value: &Value) -> Result<Vec<Severity>, EngineError> {
    string_list("severities", value)?
        .iter()
        .map(|s| {
            s.parse::<Severity>()
                .map_err(|_| EngineError::InvalidParameterValue("severities".into()))
        })
        .collect()
}

/// Non-negative unix timestamp in seconds
pub fn timestamp(field: &str, value: &Value) -> Result<f64, EngineError> {
    value
        .as_f64()
        .filter(|t| t.is_finite() && *t >= 0.0)
        .ok_or_else(|| EngineError::InvalidParameterValue(field.to_string()))
}

pub fn positive_int(field: &str, value: &Value) -> Result<usize, EngineError> {
    value
        .as_u64()
        .filter(|n| *n > 0)
        .and_then(|n| usize::try_from(n).ok())
        .ok_or_else(|| EngineError::InvalidParameterValue(field.to_string()))
}

pub fn base_chains(value: &Value) -> Result<Vec<String>, EngineError> {
    let chains = string_list("baseChains", value)?;
    let invalid: Vec<String> = chains
        .iter()
        .filter(|c| !SUPPORTED_BASE_CHAINS.contains(&c.as_str()))
        .cloned()
        .collect();

    if invalid.is_empty() {
        Ok(chains)
    } else {
        Err(EngineError::InvalidBaseChain(invalid))
    }
}

/// Decode every `parentIds` entry into `T`; any shape mismatch names the parent.
fn decode_parents<T: DeserializeOwned>(value: &Value) -> Result<BTreeMap<String, T>, EngineError> {
    let parents = value
        .as_object()
        .ok_or_else(|| EngineError::InvalidSchema("parentIds".to_string()))?;

    parents
        .iter()
        .map(|(parent, sources)| {
            serde_json::from_value::<T>(sources.clone())
                .map(|decoded| (parent.clone(), decoded))
                .map_err(|e| {
                    tracing::debug!(parent = %parent, error = %e, "Rejected topology entry");
                    EngineError::InvalidSchema(format!("parentIds.{}", parent))
                })
        })
        .collect()
}

/// Decode `parentIds` for the alerts overview.
pub fn overview_topology(value: &Value) -> Result<MonitoredTopology, EngineError> {
    decode_parents::<ChainSources>(value)
}

/// Decode `parentIds` for the metrics snapshot.
pub fn metrics_topology(value: &Value) -> Result<MetricsTopology, EngineError> {
    decode_parents::<MetricSources>(value)
}

pub fn alerts_query(body: &Value) -> Result<AlertsQuery, EngineError> {
    let object = require_fields(
        body,
        &["chains", "severities", "sources", "minTimestamp", "maxTimestamp", "noOfAlerts"],
    )?;

    Ok(AlertsQuery {
        chains: string_list("chains", &object["chains"])?,
        severities: severities(&object["severities"])?,
        sources: string_list("sources", &object["sources"])?,
        min_timestamp: timestamp("minTimestamp", &object["minTimestamp"])?,
        max_timestamp: timestamp("maxTimestamp", &object["maxTimestamp"])?,
        limit: positive_int("noOfAlerts", &object["noOfAlerts"])?,
    })
}

pub fn metrics_query(body: &Value) -> Result<MetricsQuery, EngineError> {
    let object = require_fields(
        body,
        &["chains", "systems", "minTimestamp", "maxTimestamp", "noOfMetricsPerSource"],
    )?;

    Ok(MetricsQuery {
        chains: string_list("chains", &object["chains"])?,
        systems: string_list("systems", &object["systems"])?,
        min_timestamp: timestamp("minTimestamp", &object["minTimestamp"])?,
        max_timestamp: timestamp("maxTimestamp", &object["maxTimestamp"])?,
        limit_per_source: positive_int("noOfMetricsPerSource", &object["noOfMetricsPerSource"])?,
    })
}
