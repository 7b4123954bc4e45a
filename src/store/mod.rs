//! Store seams consumed by the aggregation core.
//!
//! The key-value store holds current alert state and metric snapshots, one
//! hash per parent chain. The document store holds historical alerts and
//! metrics plus the static monitorables topology.

pub mod document;
pub mod handle;
pub mod kv;
pub mod pipeline;
pub mod snapshot;
pub mod supervisor;

use std::fmt;

pub use document::{Document, DocumentStore, MemoryDocumentStore};
pub use handle::StoreHandle;
pub use kv::{KeyValueStore, MemoryKeyValueStore};
pub use pipeline::{Filter, Pipeline, SortOrder, Stage};
pub use snapshot::{load_document_snapshot, load_key_value_snapshot, SnapshotError};
pub use supervisor::StoreSupervisor;

/// Which backing store an operation or failure concerns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreKind {
    KeyValue,
    Document,
}

impl fmt::Display for StoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreKind::KeyValue => f.write_str("Key-value store"),
            StoreKind::Document => f.write_str("Document store"),
        }
    }
}

/// Transport or driver level store failure
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Command failed: {0}")]
    Command(String),

    #[error("Wrong type for key '{0}'")]
    WrongType(String),
}
