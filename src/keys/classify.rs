//! Maps a raw key read from a parent hash back to the entity it belongs to.

use super::namespace::KeyNamespace;
use super::templates::KeyCategory;
use crate::data::ChainSources;

/// Kind of monitorable an alert key can be attributed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MonitorableKind {
    System,
    Node,
    GithubRepo,
    DockerhubRepo,
}

impl MonitorableKind {
    /// Fixed priority order used when classifying.
    pub const PRIORITY: [MonitorableKind; 4] = [
        MonitorableKind::System,
        MonitorableKind::Node,
        MonitorableKind::GithubRepo,
        MonitorableKind::DockerhubRepo,
    ];

    /// Code substrings identifying this kind's alert keys
    pub fn markers(&self) -> &'static [&'static str] {
        const NODE_MARKERS: [&str; 4] = [
            "alert_cl_node",
            "alert_evm_node",
            "alert_cosmos_node",
            "alert_substrate_node",
        ];
        match self {
            MonitorableKind::System => &["alert_system"],
            MonitorableKind::Node => &NODE_MARKERS,
            MonitorableKind::GithubRepo => &["alert_github"],
            MonitorableKind::DockerhubRepo => &["alert_dockerhub"],
        }
    }

    pub fn declared<'a>(&self, sources: &'a ChainSources) -> &'a [String] {
        match self {
            MonitorableKind::System => &sources.systems,
            MonitorableKind::Node => &sources.nodes,
            MonitorableKind::GithubRepo => &sources.github_repos,
            MonitorableKind::DockerhubRepo => &sources.dockerhub_repos,
        }
    }
}

/// Outcome of classifying one key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification<'a> {
    Entity {
        kind: MonitorableKind,
        id: &'a str,
    },
    /// Attributed to the parent itself
    ChainSourced,
    Unmatched,
}

/// Decides which declared entity a stored key belongs to.
pub trait KeyClassifier: Send + Sync {
    fn classify<'a>(
        &self,
        key: &str,
        parent_id: &str,
        sources: &'a ChainSources,
    ) -> Classification<'a>;
}

/// Ordered substring matching.
///
/// Kinds are tried in [`MonitorableKind::PRIORITY`] order and declared ids in
/// declaration order; the first id contained in the key whose kind marker is
/// also contained wins. An id that is a substring of another id can therefore
/// capture the other's keys.
#[derive(Debug, Clone, Default)]
pub struct SubstringClassifier {
    namespace: KeyNamespace,
}

impl SubstringClassifier {
    pub fn new(namespace: KeyNamespace) -> Self {
        Self { namespace }
    }

    fn is_chain_sourced(&self, key: &str, parent_id: &str) -> bool {
        self.namespace
            .code_of(key, parent_id)
            .map(|code| KeyCategory::ChainSourcedAlert.codes().contains(&code))
            .unwrap_or(false)
    }
}

impl KeyClassifier for SubstringClassifier {
    fn classify<'a>(
        &self,
        key: &str,
        parent_id: &str,
        sources: &'a ChainSources,
    ) -> Classification<'a> {
        for kind in MonitorableKind::PRIORITY {
            let markers = kind.markers();
            if !markers.iter().any(|m| key.contains(m)) {
                continue;
            }
            if let Some(id) = kind.declared(sources).iter().find(|id| key.contains(id.as_str())) {
                return Classification::Entity { kind, id };
            }
        }

        if sources.include_chain_sourced_alerts && self.is_chain_sourced(key, parent_id) {
            return Classification::ChainSourced;
        }

        Classification::Unmatched
    }
}
