//! Dependency-injected store handles.
//!
//! A handle wraps a long-lived store connection shared by all in-flight
//! requests. It remembers whether the connection was ever established; until
//! then every caller is refused with `StoreNotInitialised`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::StoreKind;
use crate::error::EngineError;

pub struct StoreHandle<S: ?Sized> {
    kind: StoreKind,
    store: Arc<S>,
    initialised: AtomicBool,
    healthy: AtomicBool,
}

impl<S: ?Sized> StoreHandle<S> {
    /// Handle whose connection has not been confirmed yet
    pub fn new(kind: StoreKind, store: Arc<S>) -> Self {
        Self {
            kind,
            store,
            initialised: AtomicBool::new(false),
            healthy: AtomicBool::new(false),
        }
    }

    /// Handle over an already established connection
    pub fn connected(kind: StoreKind, store: Arc<S>) -> Self {
        let handle = Self::new(kind, store);
        handle.mark_up();
        handle
    }

    pub fn kind(&self) -> StoreKind {
        self.kind
    }

    /// The store, if its connection was ever established
    pub fn get(&self) -> Result<Arc<S>, EngineError> {
        if self.is_initialised() {
            Ok(Arc::clone(&self.store))
        } else {
            Err(EngineError::StoreNotInitialised(self.kind))
        }
    }

    /// Raw access for connection management
    pub fn raw(&self) -> &Arc<S> {
        &self.store
    }

    /// Record a successful health check. Returns true if the store was
    /// previously unhealthy.
    pub fn mark_up(&self) -> bool {
        self.initialised.store(true, Ordering::SeqCst);
        !self.healthy.swap(true, Ordering::SeqCst)
    }

    /// Record a failed health check. Returns true if the store was
    /// previously healthy.
    pub fn mark_down(&self) -> bool {
        self.healthy.swap(false, Ordering::SeqCst)
    }

    pub fn is_initialised(&self) -> bool {
        self.initialised.load(Ordering::SeqCst)
    }

    pub fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::SeqCst)
    }
}
