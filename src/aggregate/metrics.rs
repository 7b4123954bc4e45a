//! Flat metric panels per parent chain.
//!
//! Metric keys are known exactly, so each entity's fields are fetched with a
//! targeted multi-get; all entities of all parents go out as one batch.

use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::data::{MetricsSnapshot, MetricsTopology};
use crate::error::EngineError;
use crate::keys::KeyNamespace;
use crate::store::{KeyValueStore, StoreKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Panel {
    System,
    Github,
}

/// One entity's slice of the batch
struct Request<'a> {
    parent: &'a str,
    panel: Panel,
    entity: &'a str,
    keys: Vec<String>,
}

/// Decode a stored metric value. A missing field is a legitimate `null`.
pub fn parse_metric_value(raw: Option<&str>) -> Result<Value, EngineError> {
    match raw {
        None => Ok(Value::Null),
        Some(text) => serde_json::from_str(text)
            .map_err(|_| EngineError::InvalidValueRetrieved(text.to_string())),
    }
}

pub struct MetricsSnapshotAggregator {
    store: Arc<dyn KeyValueStore>,
    namespace: KeyNamespace,
}

impl MetricsSnapshotAggregator {
    pub fn new(store: Arc<dyn KeyValueStore>, namespace: KeyNamespace) -> Self {
        Self { store, namespace }
    }

    fn plan<'a>(&self, topology: &'a MetricsTopology) -> Vec<Request<'a>> {
        let mut requests = Vec::new();
        for (parent, sources) in topology {
            for system in &sources.systems {
                requests.push(Request {
                    parent,
                    panel: Panel::System,
                    entity: system,
                    keys: self.namespace.system_metric_keys(system),
                });
            }
            for repo in &sources.repos {
                requests.push(Request {
                    parent,
                    panel: Panel::Github,
                    entity: repo,
                    keys: self.namespace.github_metric_keys(repo),
                });
            }
        }
        requests
    }

    pub async fn aggregate(
        &self,
        topology: &MetricsTopology,
    ) -> Result<BTreeMap<String, MetricsSnapshot>, EngineError> {
        let requests = self.plan(topology);

        let batch: Vec<(String, Vec<String>)> = requests
            .iter()
            .map(|r| (self.namespace.parent_hash(r.parent), r.keys.clone()))
            .collect();

        let replies = if batch.is_empty() {
            Vec::new()
        } else {
            self.store
                .hmget_batch(&batch)
                .await
                .map_err(|e| EngineError::retrieval(StoreKind::KeyValue, e))?
        };

        if replies.len() != requests.len() {
            return Err(EngineError::StoreRetrievalFailed(
                StoreKind::KeyValue,
                format!("expected {} replies, got {}", requests.len(), replies.len()),
            ));
        }

        let mut results: BTreeMap<String, MetricsSnapshot> = topology
            .keys()
            .map(|parent| (parent.clone(), MetricsSnapshot::default()))
            .collect();

        for (request, values) in requests.iter().zip(replies) {
            let mut metrics = BTreeMap::new();
            for (key, value) in request.keys.iter().zip(values) {
                let name = self
                    .namespace
                    .code_of(key, request.entity)
                    .unwrap_or(key.as_str());
                metrics.insert(name.to_string(), parse_metric_value(value.as_deref())?);
            }

            let snapshot = results.entry(request.parent.to_string()).or_default();
            let panel = match request.panel {
                Panel::System => &mut snapshot.system,
                Panel::Github => &mut snapshot.github,
            };
            panel.insert(request.entity.to_string(), metrics);
        }

        tracing::debug!(
            parents = results.len(),
            entities = requests.len(),
            "Collected metrics snapshot"
        );

        Ok(results)
    }
}
