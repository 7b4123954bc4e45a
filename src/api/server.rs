use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::handlers::{
    alerts_history, alerts_overview, health_check, invalid_endpoint, metrics_history,
    metrics_snapshot, monitorables_info, ping_document, ping_key_value, AppState,
};
use crate::keys::KeyNamespace;
use crate::store::{
    load_document_snapshot, load_key_value_snapshot, DocumentStore, KeyValueStore,
    MemoryDocumentStore, MemoryKeyValueStore, StoreHandle, StoreKind, StoreSupervisor,
};

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Prefix shared by every key the alerters write
    pub alerter_identifier: String,
    pub database: String,
    pub request_timeout_secs: u64,
    pub store_check_interval_secs: u64,
    pub key_value_snapshot: Option<PathBuf>,
    pub document_snapshot: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 9000,
            alerter_identifier: String::new(),
            database: "panicdb".to_string(),
            request_timeout_secs: 10,
            store_check_interval_secs: 30,
            key_value_snapshot: None,
            document_snapshot: None,
        }
    }
}

impl ServerConfig {
    /// Read `VIGIL_*` variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        // Zero would make every store call time out or stall the supervisor
        let positive = |name: &str, default: u64| {
            lookup(name)
                .and_then(|v| v.trim().parse::<u64>().ok())
                .filter(|n| *n > 0)
                .unwrap_or(default)
        };
        let path = |name: &str| {
            lookup(name)
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from)
        };

        Self {
            host: lookup("VIGIL_HOST").unwrap_or(defaults.host),
            port: lookup("VIGIL_PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            alerter_identifier: lookup("VIGIL_ALERTER_IDENTIFIER")
                .unwrap_or(defaults.alerter_identifier),
            database: lookup("VIGIL_DB_NAME").unwrap_or(defaults.database),
            request_timeout_secs: positive("VIGIL_REQUEST_TIMEOUT_SECS", defaults.request_timeout_secs),
            store_check_interval_secs: positive(
                "VIGIL_STORE_CHECK_INTERVAL_SECS",
                defaults.store_check_interval_secs,
            ),
            key_value_snapshot: path("VIGIL_KV_SNAPSHOT"),
            document_snapshot: path("VIGIL_DOC_SNAPSHOT"),
        }
    }
}

/// Build the application router
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health checks
        .route("/health", get(health_check))
        .route("/server/redis/ping", get(ping_key_value))
        .route("/server/mongo/ping", get(ping_document))
        // Current state
        .route("/server/redis/alertsOverview", post(alerts_overview))
        .route("/server/redis/metrics", post(metrics_snapshot))
        // History and topology
        .route("/server/mongo/alerts", post(alerts_history))
        .route("/server/mongo/metrics", post(metrics_history))
        .route("/server/mongo/monitorablesInfo", post(monitorables_info))
        .fallback(invalid_endpoint)
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Run the HTTP server
pub async fn run_server(config: ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    // Initialize stores
    let kv_store = Arc::new(MemoryKeyValueStore::new());
    if let Some(path) = &config.key_value_snapshot {
        load_key_value_snapshot(&kv_store, path)?;
    }
    let doc_store = Arc::new(MemoryDocumentStore::new());
    if let Some(path) = &config.document_snapshot {
        load_document_snapshot(&doc_store, path)?;
    }

    let kv_store: Arc<dyn KeyValueStore> = kv_store;
    let doc_store: Arc<dyn DocumentStore> = doc_store;
    let kv = Arc::new(StoreHandle::new(StoreKind::KeyValue, kv_store));
    let docs = Arc::new(StoreHandle::new(StoreKind::Document, doc_store));

    // Confirm connections before serving, then keep watching them
    let supervisor = Arc::new(StoreSupervisor::new(
        Arc::clone(&kv),
        Arc::clone(&docs),
        Duration::from_secs(config.store_check_interval_secs),
    ));
    let (kv_up, docs_up) = supervisor.check_once().await;
    tracing::info!(key_value = kv_up, document = docs_up, "Initial store check");
    let supervisor_handle = Arc::clone(&supervisor).start();

    // Initialize app state
    let state = Arc::new(AppState {
        kv,
        docs,
        namespace: KeyNamespace::new(config.alerter_identifier.clone()),
        database: config.database.clone(),
        request_timeout: Duration::from_secs(config.request_timeout_secs),
    });

    // Build router
    let app = build_router(state);

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    tracing::info!("Starting Vigil server on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(Arc::clone(&supervisor)))
        .await?;

    supervisor_handle.abort();

    tracing::info!("Vigil server stopped");
    Ok(())
}

async fn shutdown_signal(supervisor: Arc<StoreSupervisor>) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        return;
    }

    tracing::info!("Shutdown signal received, stopping store supervisor...");
    supervisor.stop();
}
