use axum::{
    body::Bytes,
    extract::State,
    http::{StatusCode, Uri},
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use serde_json::{json, Value};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::aggregate::{AlertOverviewAggregator, MetricsSnapshotAggregator};
use crate::error::EngineError;
use crate::keys::KeyNamespace;
use crate::query::{HistoricalAlertQuery, HistoricalMetricsQuery, TopologyQuery};
use crate::store::{DocumentStore, KeyValueStore, StoreHandle, StoreKind};
use crate::validation;

/// Application state shared across handlers
pub struct AppState {
    pub kv: Arc<StoreHandle<dyn KeyValueStore>>,
    pub docs: Arc<StoreHandle<dyn DocumentStore>>,
    pub namespace: KeyNamespace,
    pub database: String,
    pub request_timeout: Duration,
}

impl AppState {
    /// Run a store-touching operation, bounded by the request timeout.
    async fn bounded<T, F>(&self, kind: StoreKind, operation: F) -> Result<T, EngineError>
    where
        F: Future<Output = Result<T, EngineError>>,
    {
        match tokio::time::timeout(self.request_timeout, operation).await {
            Ok(result) => result,
            Err(_) => Err(EngineError::StoreRetrievalFailed(
                kind,
                format!("timed out after {}ms", self.request_timeout.as_millis()),
            )),
        }
    }
}

type ApiResult = Result<Json<Value>, ApiError>;

fn envelope<T: Serialize>(payload: T) -> ApiResult {
    let result = serde_json::to_value(payload)
        .map_err(|e| EngineError::InvalidValueRetrieved(e.to_string()))?;
    Ok(Json(json!({ "result": result })))
}

/// Malformed or empty bodies decode to `null` so validation reports them.
fn decode(body: &Bytes) -> Value {
    serde_json::from_slice(body).unwrap_or(Value::Null)
}

fn unix_now() -> f64 {
    chrono::Utc::now().timestamp_millis() as f64 / 1000.0
}

// ============================================================================
// Health Check
// ============================================================================

#[derive(Serialize)]
pub struct StoreHealth {
    pub initialised: bool,
    pub healthy: bool,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub key_value_store: StoreHealth,
    pub document_store: StoreHealth,
}

fn store_health<S: ?Sized>(handle: &StoreHandle<S>) -> StoreHealth {
    StoreHealth {
        initialised: handle.is_initialised(),
        healthy: handle.is_healthy(),
    }
}

pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let status = if state.kv.is_healthy() && state.docs.is_healthy() {
        "healthy"
    } else {
        "degraded"
    };

    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        key_value_store: store_health(&state.kv),
        document_store: store_health(&state.docs),
    })
}

pub async fn ping_key_value(State(state): State<Arc<AppState>>) -> ApiResult {
    let store = state.kv.get()?;
    state
        .bounded(StoreKind::KeyValue, async {
            store
                .ping()
                .await
                .map_err(|e| EngineError::retrieval(StoreKind::KeyValue, e))
        })
        .await?;
    envelope("PONG")
}

pub async fn ping_document(State(state): State<Arc<AppState>>) -> ApiResult {
    let store = state.docs.get()?;
    state
        .bounded(StoreKind::Document, async {
            store
                .ping()
                .await
                .map_err(|e| EngineError::retrieval(StoreKind::Document, e))
        })
        .await?;
    envelope("PONG")
}

// ============================================================================
// Key-value store: current state
// ============================================================================

pub async fn alerts_overview(State(state): State<Arc<AppState>>, body: Bytes) -> ApiResult {
    let body = decode(&body);
    let fields = validation::require_fields(&body, &["parentIds"])?;
    let topology = validation::overview_topology(&fields["parentIds"])?;

    let store = state.kv.get()?;
    let aggregator = AlertOverviewAggregator::new(store, state.namespace.clone());
    let overview = state
        .bounded(StoreKind::KeyValue, aggregator.aggregate(&topology, unix_now()))
        .await?;

    envelope(overview)
}

pub async fn metrics_snapshot(State(state): State<Arc<AppState>>, body: Bytes) -> ApiResult {
    let body = decode(&body);
    let fields = validation::require_fields(&body, &["parentIds"])?;
    let topology = validation::metrics_topology(&fields["parentIds"])?;

    let store = state.kv.get()?;
    let aggregator = MetricsSnapshotAggregator::new(store, state.namespace.clone());
    let snapshot = state
        .bounded(StoreKind::KeyValue, aggregator.aggregate(&topology))
        .await?;

    envelope(snapshot)
}

// ============================================================================
// Document store: history and topology
// ============================================================================

pub async fn alerts_history(State(state): State<Arc<AppState>>, body: Bytes) -> ApiResult {
    let query = validation::alerts_query(&decode(&body))?;

    let store = state.docs.get()?;
    let alerts = state
        .bounded(
            StoreKind::Document,
            HistoricalAlertQuery::new(store, state.database.clone()).run(&query),
        )
        .await?;

    envelope(json!({ "alerts": alerts }))
}

pub async fn metrics_history(State(state): State<Arc<AppState>>, body: Bytes) -> ApiResult {
    let query = validation::metrics_query(&decode(&body))?;

    let store = state.docs.get()?;
    let metrics = state
        .bounded(
            StoreKind::Document,
            HistoricalMetricsQuery::new(store, state.database.clone()).run(&query),
        )
        .await?;

    envelope(json!({ "metrics": metrics }))
}

pub async fn monitorables_info(State(state): State<Arc<AppState>>, body: Bytes) -> ApiResult {
    let body = decode(&body);
    let fields = validation::require_fields(&body, &["baseChains"])?;
    let base_chains = validation::base_chains(&fields["baseChains"])?;

    let store = state.docs.get()?;
    let info = state
        .bounded(
            StoreKind::Document,
            TopologyQuery::new(store, state.database.clone()).run(&base_chains),
        )
        .await?;

    envelope(info)
}

pub async fn invalid_endpoint(uri: Uri) -> ApiError {
    ApiError(EngineError::InvalidEndpoint(uri.path().to_string()))
}

// ============================================================================
// Error Handling
// ============================================================================

#[derive(Debug)]
pub struct ApiError(pub EngineError);

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let code = self.0.code();
        let status = StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        tracing::warn!(code, error = %self.0, "Request failed");

        let body = serde_json::json!({
            "error": self.0.to_string()
        });

        (status, Json(body)).into_response()
    }
}
