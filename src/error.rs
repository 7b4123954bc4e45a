//! Error taxonomy shared by validation, aggregation and history queries.
//!
//! Every failure surfaced to a caller is one of these kinds. Each kind
//! carries a numeric code which the HTTP layer uses as the response status.

use crate::store::{StoreError, StoreKind};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EngineError {
    #[error("Missing required field(s): {}", .0.join(", "))]
    MissingRequiredField(Vec<String>),

    #[error("An invalid value was given for '{0}'")]
    InvalidParameterValue(String),

    #[error("Invalid schema for '{0}'")]
    InvalidSchema(String),

    #[error("Invalid base chain(s) given: {}", .0.join(", "))]
    InvalidBaseChain(Vec<String>),

    #[error("{0} client is not initialised")]
    StoreNotInitialised(StoreKind),

    #[error("Could not retrieve data from {0}: {1}")]
    StoreRetrievalFailed(StoreKind, String),

    #[error("Invalid value retrieved from store: {0}")]
    InvalidValueRetrieved(String),

    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),
}

impl EngineError {
    /// Numeric code reported alongside the message.
    pub fn code(&self) -> u16 {
        match self {
            EngineError::MissingRequiredField(_) => 530,
            EngineError::InvalidParameterValue(_) => 531,
            EngineError::InvalidSchema(_) => 532,
            EngineError::InvalidBaseChain(_) => 533,
            EngineError::StoreNotInitialised(StoreKind::KeyValue) => 534,
            EngineError::StoreRetrievalFailed(StoreKind::KeyValue, _) => 535,
            EngineError::StoreNotInitialised(StoreKind::Document) => 536,
            EngineError::StoreRetrievalFailed(StoreKind::Document, _) => 537,
            EngineError::InvalidValueRetrieved(_) => 538,
            EngineError::InvalidEndpoint(_) => 539,
        }
    }

    /// Map a transport-level store failure into the retrieval kind for `kind`.
    pub fn retrieval(kind: StoreKind, err: StoreError) -> Self {
        EngineError::StoreRetrievalFailed(kind, err.to_string())
    }

    pub fn missing<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        EngineError::MissingRequiredField(fields.into_iter().map(Into::into).collect())
    }
}
