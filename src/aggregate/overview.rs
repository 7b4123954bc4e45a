//! Current alert state per parent chain.
//!
//! One batched hash read covers every requested parent, so all parents are
//! folded from the same store snapshot. Results are assembled locally and
//! only returned once every key has been folded; any store or parse failure
//! discards the whole response.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Instant;

use crate::data::{AggregationResult, AlertRecord, ChainSources, MonitoredTopology, Severity, TagChange};
use crate::error::EngineError;
use crate::keys::{Classification, KeyClassifier, KeyNamespace, MonitorableKind, SubstringClassifier};
use crate::store::{KeyValueStore, StoreKind};

/// Every alert key expected for the entities declared under one parent.
/// Chain-sourced keys are not expected: their absence says nothing.
pub fn expected_alert_keys(namespace: &KeyNamespace, sources: &ChainSources) -> Vec<String> {
    let mut keys = Vec::new();
    for id in &sources.systems {
        keys.extend(namespace.system_alert_keys(id));
    }
    for id in &sources.nodes {
        keys.extend(namespace.node_alert_keys(id));
    }
    for id in &sources.github_repos {
        keys.extend(namespace.github_alert_keys(id));
    }
    for id in &sources.dockerhub_repos {
        keys.extend(namespace.dockerhub_alert_keys(id));
    }
    keys
}

/// An expected key with no stored alert counts as healthy.
pub fn absent_key_count(expected: &[String], present: &HashMap<String, String>) -> u64 {
    expected.iter().filter(|key| !present.contains_key(*key)).count() as u64
}

pub struct AlertOverviewAggregator {
    store: Arc<dyn KeyValueStore>,
    namespace: KeyNamespace,
    classifier: Arc<dyn KeyClassifier>,
}

impl AlertOverviewAggregator {
    pub fn new(store: Arc<dyn KeyValueStore>, namespace: KeyNamespace) -> Self {
        let classifier = Arc::new(SubstringClassifier::new(namespace.clone()));
        Self {
            store,
            namespace,
            classifier,
        }
    }

    pub fn with_classifier(mut self, classifier: Arc<dyn KeyClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    /// Aggregate current alerts for every parent in `topology` as of `now`
    /// (unix seconds).
    pub async fn aggregate(
        &self,
        topology: &MonitoredTopology,
        now: f64,
    ) -> Result<BTreeMap<String, AggregationResult>, EngineError> {
        let start = Instant::now();

        let hashes: Vec<String> = topology
            .keys()
            .map(|parent| self.namespace.parent_hash(parent))
            .collect();

        let snapshots = self
            .store
            .hgetall_batch(&hashes)
            .await
            .map_err(|e| EngineError::retrieval(StoreKind::KeyValue, e))?;

        if snapshots.len() != hashes.len() {
            return Err(EngineError::StoreRetrievalFailed(
                StoreKind::KeyValue,
                format!("expected {} hashes, got {}", hashes.len(), snapshots.len()),
            ));
        }

        let mut results = BTreeMap::new();
        for ((parent, sources), fields) in topology.iter().zip(snapshots.iter()) {
            let result = self.fold_parent(parent, sources, fields, now)?;
            results.insert(parent.clone(), result);
        }

        tracing::debug!(
            parents = results.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Aggregated alerts overview"
        );

        Ok(results)
    }

    fn fold_parent(
        &self,
        parent: &str,
        sources: &ChainSources,
        fields: &HashMap<String, String>,
        now: f64,
    ) -> Result<AggregationResult, EngineError> {
        let mut result = AggregationResult::default();

        let expected = expected_alert_keys(&self.namespace, sources);
        result.count(Severity::Info, absent_key_count(&expected, fields));

        // Stable problem ordering regardless of hash iteration order
        let mut keys: Vec<&String> = fields.keys().collect();
        keys.sort();

        for key in keys {
            let (kind, entity) = match self.classifier.classify(key, parent, sources) {
                Classification::Entity { kind, id } => (Some(kind), id),
                Classification::ChainSourced => (None, parent),
                Classification::Unmatched => continue,
            };

            let raw = &fields[key];
            let record = AlertRecord::parse(raw).map_err(|e| {
                tracing::warn!(parent = %parent, key = %key, error = %e, "Unparseable alert value");
                EngineError::InvalidValueRetrieved(raw.clone())
            })?;

            result.record(entity, &record, now);

            match kind {
                Some(MonitorableKind::GithubRepo) if *key == self.namespace.release_key(entity) => {
                    result.releases.insert(entity.to_string(), record);
                }
                Some(MonitorableKind::DockerhubRepo) => {
                    if let Some(change) = self.tag_change(key, entity) {
                        result.set_tag(entity, change, record);
                    }
                }
                _ => {}
            }
        }

        Ok(result)
    }

    fn tag_change(&self, key: &str, repo: &str) -> Option<TagChange> {
        [TagChange::New, TagChange::Updated, TagChange::Deleted]
            .into_iter()
            .find(|change| key == self.namespace.tag_key(repo, *change))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::templates::{DOCKERHUB_ALERTS, GITHUB_ALERTS, SYSTEM_ALERTS};
    use crate::keys::NodeKind;
    use crate::store::{MemoryKeyValueStore, StoreError};
    use async_trait::async_trait;
    use serde_json::json;

    const NOW: f64 = 1_700_000_000.0;

    fn alert(severity: &str, expiry: Option<f64>) -> String {
        json!({
            "severity": severity,
            "message": format!("{} alert", severity),
            "metric": "metric",
            "timestamp": NOW - 60.0,
            "expiry": expiry,
        })
        .to_string()
    }

    fn topology(parent: &str, sources: ChainSources) -> MonitoredTopology {
        let mut topology = MonitoredTopology::new();
        topology.insert(parent.to_string(), sources);
        topology
    }

    fn systems(ids: &[&str], chain_sourced: bool) -> ChainSources {
        ChainSources {
            systems: ids.iter().map(|s| s.to_string()).collect(),
            include_chain_sourced_alerts: chain_sourced,
            ..Default::default()
        }
    }

    async fn seed(store: &MemoryKeyValueStore, ns: &KeyNamespace, parent: &str, fields: &[(String, String)]) {
        let hash = ns.parent_hash(parent);
        for (field, value) in fields {
            store.hset(&hash, field, value).await.unwrap();
        }
    }

    fn aggregator(store: Arc<MemoryKeyValueStore>, ns: &KeyNamespace) -> AlertOverviewAggregator {
        AlertOverviewAggregator::new(store, ns.clone())
    }

    #[tokio::test]
    async fn test_no_entities_all_zero() {
        let store = Arc::new(MemoryKeyValueStore::new());
        let ns = KeyNamespace::default();

        let result = aggregator(store, &ns)
            .aggregate(&topology("chain_x", ChainSources::default()), NOW)
            .await
            .unwrap();

        assert_eq!(result["chain_x"], AggregationResult::default());
    }

    #[tokio::test]
    async fn test_empty_hash_counts_every_expected_key_as_info() {
        let store = Arc::new(MemoryKeyValueStore::new());
        let ns = KeyNamespace::new("panic_");

        let result = aggregator(store, &ns)
            .aggregate(&topology("chain_x", systems(&["sys1"], true)), NOW)
            .await
            .unwrap();

        let chain = &result["chain_x"];
        assert_eq!(chain.info, SYSTEM_ALERTS.len() as u64);
        assert_eq!((chain.warning, chain.critical, chain.error), (0, 0, 0));
        assert!(chain.problems.is_empty());
        assert!(chain.releases.is_empty());
        assert!(chain.tags.is_empty());
    }

    #[tokio::test]
    async fn test_node_expects_every_node_kind() {
        let store = Arc::new(MemoryKeyValueStore::new());
        let ns = KeyNamespace::default();
        let sources = ChainSources {
            nodes: vec!["node1".into()],
            ..Default::default()
        };

        let result = aggregator(store, &ns)
            .aggregate(&topology("p", sources), NOW)
            .await
            .unwrap();

        let expected: usize = NodeKind::ALL.iter().map(|k| k.templates().len()).sum();
        assert_eq!(result["p"].info, expected as u64);
    }

    #[tokio::test]
    async fn test_warning_listed_as_problem() {
        let store = Arc::new(MemoryKeyValueStore::new());
        let ns = KeyNamespace::default();
        let key = ns.key("alert_system3", "sys1");
        seed(&store, &ns, "chain_x", &[(key, alert("WARNING", None))]).await;

        let result = aggregator(store, &ns)
            .aggregate(&topology("chain_x", systems(&["sys1"], false)), NOW)
            .await
            .unwrap();

        let chain = &result["chain_x"];
        assert_eq!(chain.warning, 1);
        assert_eq!(chain.info, SYSTEM_ALERTS.len() as u64 - 1);
        assert_eq!(chain.problems["sys1"].len(), 1);
        assert_eq!(chain.problems["sys1"][0].severity, Severity::Warning);
    }

    #[tokio::test]
    async fn test_expired_critical_counts_as_info() {
        let store = Arc::new(MemoryKeyValueStore::new());
        let ns = KeyNamespace::default();
        seed(
            &store,
            &ns,
            "p",
            &[
                (ns.key("alert_system5", "sys1"), alert("CRITICAL", Some(NOW))),
                (ns.key("alert_system2", "sys1"), alert("CRITICAL", Some(NOW + 1.0))),
            ],
        )
        .await;

        let result = aggregator(store, &ns)
            .aggregate(&topology("p", systems(&["sys1"], false)), NOW)
            .await
            .unwrap();

        let chain = &result["p"];
        assert_eq!(chain.critical, 1);
        assert_eq!(chain.info, SYSTEM_ALERTS.len() as u64 - 1);
        assert_eq!(chain.problems["sys1"].len(), 1);
        assert_eq!(chain.problems["sys1"][0].expiry, Some(NOW + 1.0));
    }

    #[tokio::test]
    async fn test_releases_and_tags_captured() {
        let store = Arc::new(MemoryKeyValueStore::new());
        let ns = KeyNamespace::new("ns_");
        seed(
            &store,
            &ns,
            "p",
            &[
                (ns.release_key("gh"), alert("INFO", None)),
                (ns.key("alert_github2", "gh"), alert("ERROR", None)),
                (ns.tag_key("dh", TagChange::New), alert("INFO", None)),
                (ns.tag_key("dh", TagChange::Deleted), alert("WARNING", None)),
            ],
        )
        .await;

        let sources = ChainSources {
            github_repos: vec!["gh".into()],
            dockerhub_repos: vec!["dh".into()],
            ..Default::default()
        };
        let result = aggregator(store, &ns)
            .aggregate(&topology("p", sources), NOW)
            .await
            .unwrap();

        let chain = &result["p"];
        assert_eq!(chain.releases.len(), 1);
        assert_eq!(chain.releases["gh"].severity, Severity::Info);

        let tags = &chain.tags["dh"];
        assert!(tags.new.is_some());
        assert!(tags.updated.is_none());
        assert_eq!(tags.deleted.as_ref().map(|r| r.severity), Some(Severity::Warning));

        // Release and tag records are still counted
        let expected = (GITHUB_ALERTS.len() + DOCKERHUB_ALERTS.len()) as u64;
        assert_eq!(chain.total(), expected);
        assert_eq!(chain.error, 1);
        assert_eq!(chain.warning, 1);
        assert_eq!(chain.problems["dh"].len(), 1);
    }

    #[tokio::test]
    async fn test_chain_sourced_alerts_listed_under_parent() {
        let store = Arc::new(MemoryKeyValueStore::new());
        let ns = KeyNamespace::default();
        seed(
            &store,
            &ns,
            "chain_x",
            &[(ns.key("alert_cosmos_network1", "chain_x"), alert("CRITICAL", None))],
        )
        .await;

        let agg = aggregator(Arc::clone(&store), &ns);

        let result = agg
            .aggregate(&topology("chain_x", systems(&[], true)), NOW)
            .await
            .unwrap();
        assert_eq!(result["chain_x"].critical, 1);
        assert_eq!(result["chain_x"].problems["chain_x"].len(), 1);

        let result = agg
            .aggregate(&topology("chain_x", systems(&[], false)), NOW)
            .await
            .unwrap();
        assert_eq!(result["chain_x"], AggregationResult::default());
    }

    #[tokio::test]
    async fn test_unmatched_keys_ignored() {
        let store = Arc::new(MemoryKeyValueStore::new());
        let ns = KeyNamespace::default();
        seed(
            &store,
            &ns,
            "p",
            &[
                // Metric values share the parent hash and are not alerts
                (ns.key("s7", "sys1"), "not json at all".to_string()),
                (ns.key("alert_system1", "undeclared"), alert("ERROR", None)),
            ],
        )
        .await;

        let result = aggregator(store, &ns)
            .aggregate(&topology("p", systems(&["sys1"], false)), NOW)
            .await
            .unwrap();

        assert_eq!(result["p"].error, 0);
        assert_eq!(result["p"].info, SYSTEM_ALERTS.len() as u64);
    }

    #[tokio::test]
    async fn test_invalid_value_fails_whole_request() {
        let store = Arc::new(MemoryKeyValueStore::new());
        let ns = KeyNamespace::default();
        seed(&store, &ns, "a", &[(ns.key("alert_system1", "sys1"), alert("ERROR", None))]).await;
        seed(&store, &ns, "b", &[(ns.key("alert_system1", "sys2"), "{broken".to_string())]).await;

        let mut topology = topology("a", systems(&["sys1"], false));
        topology.insert("b".into(), systems(&["sys2"], false));

        let err = aggregator(store, &ns).aggregate(&topology, NOW).await.unwrap_err();
        assert_eq!(err, EngineError::InvalidValueRetrieved("{broken".into()));
    }

    #[tokio::test]
    async fn test_idempotent_over_unchanged_snapshot() {
        let store = Arc::new(MemoryKeyValueStore::new());
        let ns = KeyNamespace::default();
        seed(
            &store,
            &ns,
            "p",
            &[
                (ns.key("alert_system1", "sys1"), alert("ERROR", None)),
                (ns.key("alert_system2", "sys1"), alert("WARNING", None)),
                (ns.key("alert_system3", "sys1"), alert("CRITICAL", None)),
            ],
        )
        .await;

        let agg = aggregator(store, &ns);
        let topology = topology("p", systems(&["sys1"], true));

        let first = agg.aggregate(&topology, NOW).await.unwrap();
        let second = agg.aggregate(&topology, NOW).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[tokio::test]
    async fn test_substring_collision_pinned() {
        let store = Arc::new(MemoryKeyValueStore::new());
        let ns = KeyNamespace::default();
        seed(&store, &ns, "p", &[(ns.key("alert_system3", "sys10"), alert("ERROR", None))]).await;

        let result = aggregator(store, &ns)
            .aggregate(&topology("p", systems(&["sys1", "sys10"], false)), NOW)
            .await
            .unwrap();

        // sys1 is declared first and is a substring of sys10
        assert_eq!(result["p"].problems.keys().collect::<Vec<_>>(), vec!["sys1"]);
        assert_eq!(result["p"].info, 2 * SYSTEM_ALERTS.len() as u64 - 1);
    }

    /// Attributes a key by its exact `_<id>` suffix, so ids that contain
    /// each other never collide.
    struct SuffixClassifier;

    impl KeyClassifier for SuffixClassifier {
        fn classify<'a>(
            &self,
            key: &str,
            _parent_id: &str,
            sources: &'a ChainSources,
        ) -> Classification<'a> {
            sources
                .systems
                .iter()
                .find(|id| key.ends_with(&format!("_{}", id)))
                .map(|id| Classification::Entity {
                    kind: MonitorableKind::System,
                    id: id.as_str(),
                })
                .unwrap_or(Classification::Unmatched)
        }
    }

    #[tokio::test]
    async fn test_injected_classifier_replaces_substring_policy() {
        let store = Arc::new(MemoryKeyValueStore::new());
        let ns = KeyNamespace::default();
        seed(&store, &ns, "p", &[(ns.key("alert_system3", "sys10"), alert("ERROR", None))]).await;

        let result = aggregator(store, &ns)
            .with_classifier(Arc::new(SuffixClassifier))
            .aggregate(&topology("p", systems(&["sys1", "sys10"], false)), NOW)
            .await
            .unwrap();

        assert_eq!(result["p"].problems.keys().collect::<Vec<_>>(), vec!["sys10"]);
        assert_eq!(result["p"].error, 1);
    }

    struct FailingStore;

    #[async_trait]
    impl KeyValueStore for FailingStore {
        async fn ping(&self) -> Result<(), StoreError> {
            Ok(())
        }
        async fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
            Err(StoreError::Connection("reset".into()))
        }
        async fn set(&self, _key: &str, _value: &str) -> Result<(), StoreError> {
            Err(StoreError::Connection("reset".into()))
        }
        async fn hset(&self, _h: &str, _f: &str, _v: &str) -> Result<(), StoreError> {
            Err(StoreError::Connection("reset".into()))
        }
        async fn hgetall_batch(
            &self,
            _hashes: &[String],
        ) -> Result<Vec<HashMap<String, String>>, StoreError> {
            Err(StoreError::Connection("reset".into()))
        }
        async fn hmget_batch(
            &self,
            _requests: &[(String, Vec<String>)],
        ) -> Result<Vec<Vec<Option<String>>>, StoreError> {
            Err(StoreError::Connection("reset".into()))
        }
    }

    #[tokio::test]
    async fn test_store_failure_is_typed() {
        let agg = AlertOverviewAggregator::new(Arc::new(FailingStore), KeyNamespace::default());
        let err = agg
            .aggregate(&topology("p", systems(&["sys1"], false)), NOW)
            .await
            .unwrap_err();

        assert_eq!(err.code(), 535);
    }

    #[test]
    fn test_absent_key_count() {
        let expected = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let mut present = HashMap::new();
        present.insert("b".to_string(), "x".to_string());
        present.insert("z".to_string(), "x".to_string());

        assert_eq!(absent_key_count(&expected, &present), 2);
        assert_eq!(absent_key_count(&[], &present), 0);
    }
}
