//! Deterministic store keys.
//!
//! A key is `alerter_identifier + code + "_" + entity_id`. The prefix is fixed
//! per deployment and the postfix per entity; the two are applied
//! independently, so the order of application never changes the key.

use super::templates::{
    node_alert_codes, tag_code, KeyCategory, PARENT_HASH, RELEASE_CODE,
};
use crate::data::TagChange;

pub const POSTFIX_SEPARATOR: char = '_';

pub fn add_prefix(key: &str, prefix: &str) -> String {
    format!("{}{}", prefix, key)
}

pub fn add_postfix(key: &str, postfix: &str) -> String {
    format!("{}{}{}", key, POSTFIX_SEPARATOR, postfix)
}

/// Full key for one template code and entity under `namespace`.
pub fn build_key(code: &str, entity_id: &str, namespace: &str) -> String {
    add_postfix(&add_prefix(code, namespace), entity_id)
}

/// Key builder bound to one alerter identifier
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyNamespace {
    alerter_identifier: String,
}

impl KeyNamespace {
    pub fn new(alerter_identifier: impl Into<String>) -> Self {
        Self {
            alerter_identifier: alerter_identifier.into(),
        }
    }

    pub fn key(&self, code: &str, entity_id: &str) -> String {
        build_key(code, entity_id, &self.alerter_identifier)
    }

    /// Name of the hash holding everything stored for `parent_id`.
    pub fn parent_hash(&self, parent_id: &str) -> String {
        self.key(PARENT_HASH, parent_id)
    }

    pub fn keys_for(&self, category: KeyCategory, entity_id: &str) -> Vec<String> {
        self.keys_from_codes(&category.codes(), entity_id)
    }

    pub fn system_metric_keys(&self, system_id: &str) -> Vec<String> {
        self.keys_for(KeyCategory::SystemMetric, system_id)
    }

    pub fn github_metric_keys(&self, repo_id: &str) -> Vec<String> {
        self.keys_for(KeyCategory::GithubMetric, repo_id)
    }

    pub fn system_alert_keys(&self, system_id: &str) -> Vec<String> {
        self.keys_for(KeyCategory::SystemAlert, system_id)
    }

    pub fn node_alert_keys(&self, node_id: &str) -> Vec<String> {
        self.keys_from_codes(&node_alert_codes(), node_id)
    }

    pub fn github_alert_keys(&self, repo_id: &str) -> Vec<String> {
        self.keys_for(KeyCategory::GithubAlert, repo_id)
    }

    pub fn dockerhub_alert_keys(&self, repo_id: &str) -> Vec<String> {
        self.keys_for(KeyCategory::DockerhubAlert, repo_id)
    }

    pub fn chain_sourced_alert_keys(&self, parent_id: &str) -> Vec<String> {
        self.keys_for(KeyCategory::ChainSourcedAlert, parent_id)
    }

    pub fn release_key(&self, repo_id: &str) -> String {
        self.key(RELEASE_CODE, repo_id)
    }

    pub fn tag_key(&self, repo_id: &str, change: TagChange) -> String {
        self.key(tag_code(change), repo_id)
    }

    /// Recover the template code from a key built for `entity_id`.
    pub fn code_of<'k>(&self, key: &'k str, entity_id: &str) -> Option<&'k str> {
        key.strip_prefix(self.alerter_identifier.as_str())?
            .strip_suffix(entity_id)?
            .strip_suffix(POSTFIX_SEPARATOR)
    }

    fn keys_from_codes(&self, codes: &[&str], entity_id: &str) -> Vec<String> {
        codes.iter().map(|code| self.key(code, entity_id)).collect()
    }
}
