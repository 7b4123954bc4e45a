use futures::future::try_join_all;
use std::collections::BTreeMap;
use std::sync::Arc;

use super::{grouped_items, MetricsQuery};
use crate::error::EngineError;
use crate::store::{Document, DocumentStore, Filter, Pipeline, SortOrder, StoreKind};

pub const SYSTEM_DOC_TYPE: &str = "system";

/// Per-system metric history, newest first
pub struct HistoricalMetricsQuery {
    store: Arc<dyn DocumentStore>,
    database: String,
}

impl HistoricalMetricsQuery {
    pub fn new(store: Arc<dyn DocumentStore>, database: impl Into<String>) -> Self {
        Self {
            store,
            database: database.into(),
        }
    }

    pub fn pipeline(query: &MetricsQuery, system: &str) -> Pipeline {
        let timestamp = format!("{}.timestamp", system);

        Pipeline::new()
            .union_with(query.chains.iter().skip(1).cloned())
            .matching(Filter::eq("doc_type", SYSTEM_DOC_TYPE))
            .unwind(system)
            .matching(Filter::range(
                timestamp.clone(),
                query.min_timestamp,
                query.max_timestamp,
            ))
            .sort(vec![(timestamp, SortOrder::Descending)])
            .limit(query.limit_per_source)
            .group_push("metrics", system)
    }

    async fn run_system(&self, base: &str, query: &MetricsQuery, system: &str) -> Result<Vec<Document>, EngineError> {
        let docs = self
            .store
            .aggregate(&self.database, base, &Self::pipeline(query, system))
            .await
            .map_err(|e| EngineError::retrieval(StoreKind::Document, e))?;
        Ok(grouped_items(docs, "metrics"))
    }

    /// Every requested system gets an entry, empty when nothing matched.
    pub async fn run(&self, query: &MetricsQuery) -> Result<BTreeMap<String, Vec<Document>>, EngineError> {
        let Some(base) = query.chains.first() else {
            return Ok(query
                .systems
                .iter()
                .map(|system| (system.clone(), Vec::new()))
                .collect());
        };

        let futures = query
            .systems
            .iter()
            .map(|system| self.run_system(base, query, system));
        let series = try_join_all(futures).await?;

        let result: BTreeMap<String, Vec<Document>> = query.systems.iter().cloned().zip(series).collect();

        tracing::debug!(
            chains = query.chains.len(),
            systems = result.len(),
            "Queried metric history"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryDocumentStore, Stage, StoreError};
    use serde_json::json;

    const DB: &str = "panicdb";

    fn point(timestamp: f64, cpu: f64) -> serde_json::Value {
        json!({ "timestamp": timestamp, "system_cpu_usage": cpu })
    }

    fn seeded_store() -> Arc<MemoryDocumentStore> {
        let store = MemoryDocumentStore::new();
        store.insert(
            DB,
            "chain_a",
            json!({
                "_id": 1,
                "doc_type": "system",
                "sys1": [point(10.0, 1.0), point(30.0, 3.0), point(50.0, 5.0)],
                "sys2": [point(20.0, 2.0)],
            }),
        );
        store.insert(
            DB,
            "chain_b",
            json!({ "_id": 2, "doc_type": "system", "sys1": [point(40.0, 4.0)] }),
        );
        store.insert(DB, "chain_b", json!({ "_id": 3, "doc_type": "alert", "alerts": [] }));
        Arc::new(store)
    }

    fn query(chains: &[&str], systems: &[&str], limit: usize) -> MetricsQuery {
        MetricsQuery {
            chains: chains.iter().map(|c| c.to_string()).collect(),
            systems: systems.iter().map(|s| s.to_string()).collect(),
            min_timestamp: 0.0,
            max_timestamp: 45.0,
            limit_per_source: limit,
        }
    }

    #[tokio::test]
    async fn test_series_per_system() {
        let q = HistoricalMetricsQuery::new(seeded_store(), DB);
        let result = q
            .run(&query(&["chain_a", "chain_b"], &["sys1", "sys2", "sys9"], 2))
            .await
            .unwrap();

        let sys1: Vec<f64> = result["sys1"]
            .iter()
            .map(|p| p["timestamp"].as_f64().unwrap())
            .collect();
        assert_eq!(sys1, vec![40.0, 30.0]);

        assert_eq!(result["sys2"], vec![point(20.0, 2.0)]);
        assert!(result["sys9"].is_empty());
    }

    #[tokio::test]
    async fn test_no_chains_gives_empty_series() {
        let q = HistoricalMetricsQuery::new(seeded_store(), DB);
        let result = q.run(&query(&[], &["sys1", "sys2"], 5)).await.unwrap();

        assert_eq!(result.len(), 2);
        assert!(result.values().all(Vec::is_empty));
    }

    /// Fails only the pipeline that unwinds `sys2`
    struct PartiallyFailingStore {
        inner: Arc<MemoryDocumentStore>,
    }

    #[async_trait::async_trait]
    impl DocumentStore for PartiallyFailingStore {
        async fn ping(&self) -> Result<(), StoreError> {
            Ok(())
        }

        async fn aggregate(
            &self,
            database: &str,
            collection: &str,
            pipeline: &Pipeline,
        ) -> Result<Vec<Document>, StoreError> {
            if pipeline.stages().contains(&Stage::Unwind("sys2".into())) {
                return Err(StoreError::Command("cursor killed".into()));
            }
            self.inner.aggregate(database, collection, pipeline).await
        }
    }

    #[tokio::test]
    async fn test_one_failed_system_fails_whole_call() {
        let store = PartiallyFailingStore {
            inner: seeded_store(),
        };
        let err = HistoricalMetricsQuery::new(Arc::new(store), DB)
            .run(&query(&["chain_a"], &["sys1", "sys2"], 5))
            .await
            .unwrap_err();

        assert_eq!(err.code(), 537);
    }

    #[test]
    fn test_pipeline_targets_system_field() {
        let stages = HistoricalMetricsQuery::pipeline(&query(&["a"], &["sys1"], 3), "sys1").to_document();

        assert_eq!(stages[0], json!({ "$match": { "doc_type": "system" } }));
        assert_eq!(stages[1], json!({ "$unwind": "$sys1" }));
        assert_eq!(stages[3], json!({ "$sort": { "sys1.timestamp": -1 } }));
        assert_eq!(
            stages[5],
            json!({ "$group": { "_id": null, "metrics": { "$push": "$sys1" } } })
        );
    }
}
