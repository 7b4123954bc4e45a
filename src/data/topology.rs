//! Per-request description of what is monitored under each parent chain.
//!
//! Decoded by [`crate::validation`]. Unknown or missing fields are rejected,
//! so a decoded value always has the exact request shape.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Entities declared under one parent for the alerts overview.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChainSources {
    pub systems: Vec<String>,
    pub nodes: Vec<String>,
    pub github_repos: Vec<String>,
    pub dockerhub_repos: Vec<String>,
    pub include_chain_sourced_alerts: bool,
}

/// Parent id -> declared entities. Ordered so every walk is deterministic.
pub type MonitoredTopology = BTreeMap<String, ChainSources>;

/// Entities declared under one parent for the metrics snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetricSources {
    pub systems: Vec<String>,
    /// GitHub repositories
    pub repos: Vec<String>,
}

pub type MetricsTopology = BTreeMap<String, MetricSources>;
