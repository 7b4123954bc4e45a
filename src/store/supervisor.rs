use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time;

use super::{DocumentStore, KeyValueStore, StoreHandle};

/// Used when a zero check interval is requested; `tokio::time::interval`
/// rejects a zero period.
pub const MIN_CHECK_INTERVAL: Duration = Duration::from_secs(1);

/// Background worker that health-checks both store connections
pub struct StoreSupervisor {
    kv: Arc<StoreHandle<dyn KeyValueStore>>,
    docs: Arc<StoreHandle<dyn DocumentStore>>,
    interval: Duration,
    running: Arc<AtomicBool>,
}

impl StoreSupervisor {
    pub fn new(
        kv: Arc<StoreHandle<dyn KeyValueStore>>,
        docs: Arc<StoreHandle<dyn DocumentStore>>,
        interval: Duration,
    ) -> Self {
        let interval = if interval.is_zero() {
            tracing::warn!(
                "Zero store check interval requested, using {:?}",
                MIN_CHECK_INTERVAL
            );
            MIN_CHECK_INTERVAL
        } else {
            interval
        };

        Self {
            kv,
            docs,
            interval,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Ping both stores once and update their handles.
    /// Returns (key-value healthy, document healthy).
    pub async fn check_once(&self) -> (bool, bool) {
        let kv_result = self.kv.raw().ping().await;
        let docs_result = self.docs.raw().ping().await;

        let kv_ok = Self::record(&self.kv, kv_result);
        let docs_ok = Self::record(&self.docs, docs_result);

        (kv_ok, docs_ok)
    }

    fn record<S: ?Sized>(
        handle: &StoreHandle<S>,
        result: Result<(), super::StoreError>,
    ) -> bool {
        match result {
            Ok(()) => {
                if handle.mark_up() {
                    tracing::info!(store = %handle.kind(), "Store connection is up");
                }
                true
            }
            Err(e) => {
                if handle.mark_down() || !handle.is_initialised() {
                    tracing::warn!(store = %handle.kind(), error = %e, "Store connection is down");
                }
                false
            }
        }
    }

    /// Start the background worker
    pub fn start(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        self.running.store(true, Ordering::SeqCst);

        tokio::spawn(async move {
            tracing::info!("Store supervisor started with interval {:?}", self.interval);

            let mut interval = time::interval(self.interval);

            while self.running.load(Ordering::SeqCst) {
                interval.tick().await;
                self.check_once().await;
            }

            tracing::info!("Store supervisor stopped");
        })
    }

    /// Stop the worker
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}
