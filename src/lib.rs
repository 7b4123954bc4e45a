//! Vigil: alert and metrics aggregation for a blockchain monitoring dashboard
//!
//! External monitors and alerters write current alert state and metric
//! snapshots into a key-value store (one hash per parent chain) and history
//! into a document store. This crate reads that state back and shapes it for
//! a dashboard.
//!
//! # Features
//!
//! - **Key Namespacing**: Deterministic keys per category and monitored entity
//! - **Alerts Overview**: Per-parent severity counters, problem lists, releases and tags
//! - **Metrics Snapshot**: Flat metric panels per system and repository
//! - **History**: Time-windowed alert and metric queries across chain collections
//! - **Topology**: Monitorables configuration reshaped for the UI
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use vigil::aggregate::AlertOverviewAggregator;
//! use vigil::data::{ChainSources, MonitoredTopology};
//! use vigil::keys::KeyNamespace;
//! use vigil::store::MemoryKeyValueStore;
//!
//! # async fn run() -> Result<(), vigil::EngineError> {
//! let store = Arc::new(MemoryKeyValueStore::new());
//! let aggregator = AlertOverviewAggregator::new(store, KeyNamespace::new("panic_"));
//!
//! let mut topology = MonitoredTopology::new();
//! topology.insert(
//!     "chain_1".to_string(),
//!     ChainSources {
//!         systems: vec!["system_1".to_string()],
//!         ..Default::default()
//!     },
//! );
//!
//! let overview = aggregator.aggregate(&topology, 1_700_000_000.0).await?;
//! println!("Critical: {}", overview["chain_1"].critical);
//! # Ok(())
//! # }
//! ```

pub mod aggregate;
pub mod api;
pub mod data;
pub mod error;
pub mod keys;
pub mod query;
pub mod store;
pub mod validation;

// Re-export commonly used types
pub use data::{AggregationResult, AlertRecord, MetricsSnapshot, Severity};
pub use error::EngineError;
pub use keys::KeyNamespace;
pub use store::{StoreError, StoreKind};
