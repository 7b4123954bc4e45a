//! Store key construction and classification

pub mod classify;
pub mod namespace;
pub mod templates;

pub use classify::{Classification, KeyClassifier, MonitorableKind, SubstringClassifier};
pub use namespace::{add_postfix, add_prefix, build_key, KeyNamespace};
pub use templates::{KeyCategory, NodeKind};
