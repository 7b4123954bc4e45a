//! Static monitorables topology, reshaped for the dashboard.
//!
//! Stored shape, one document per base chain:
//!
//! ```text
//! { _id: <base chain>,
//!   <sub chain id>: { chain_name, monitored: { <category>: { <id>: { name, manager_names } } } } }
//! ```
//!
//! Returned shape: `{ <base chain>: { <chain name>: { <category>: [ { <id>: <name> } ] } } }`.

use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::EngineError;
use crate::store::{Document, DocumentStore, Filter, Pipeline, StoreKind};

pub const MONITORABLES_COLLECTION: &str = "monitorables_info";

/// category -> [{entity id: entity name}]
pub type MonitorableGroups = BTreeMap<String, Vec<BTreeMap<String, String>>>;

/// base chain -> chain name -> groups
pub type MonitorablesInfo = BTreeMap<String, BTreeMap<String, MonitorableGroups>>;

pub struct TopologyQuery {
    store: Arc<dyn DocumentStore>,
    database: String,
}

impl TopologyQuery {
    pub fn new(store: Arc<dyn DocumentStore>, database: impl Into<String>) -> Self {
        Self {
            store,
            database: database.into(),
        }
    }

    pub fn pipeline(base_chains: &[String]) -> Pipeline {
        Pipeline::new().matching(Filter::is_in("_id", base_chains.iter().cloned()))
    }

    pub async fn run(&self, base_chains: &[String]) -> Result<MonitorablesInfo, EngineError> {
        let mut info: MonitorablesInfo = base_chains
            .iter()
            .map(|chain| (chain.clone(), BTreeMap::new()))
            .collect();

        if base_chains.is_empty() {
            return Ok(info);
        }

        let docs = self
            .store
            .aggregate(&self.database, MONITORABLES_COLLECTION, &Self::pipeline(base_chains))
            .await
            .map_err(|e| EngineError::retrieval(StoreKind::Document, e))?;

        for doc in &docs {
            let Some(base) = doc.get("_id").and_then(Value::as_str) else {
                return Err(malformed(doc));
            };
            info.insert(base.to_string(), reshape(doc)?);
        }

        tracing::debug!(
            requested = base_chains.len(),
            found = docs.len(),
            "Queried monitorables topology"
        );
        Ok(info)
    }
}

fn malformed(value: &Value) -> EngineError {
    EngineError::InvalidValueRetrieved(value.to_string())
}

fn reshape(doc: &Document) -> Result<BTreeMap<String, MonitorableGroups>, EngineError> {
    let fields = doc.as_object().ok_or_else(|| malformed(doc))?;
    let mut chains: BTreeMap<String, MonitorableGroups> = BTreeMap::new();

    for (sub_chain, data) in fields {
        if sub_chain == "_id" {
            continue;
        }
        let chain_name = data
            .get("chain_name")
            .and_then(Value::as_str)
            .ok_or_else(|| malformed(data))?;
        let monitored = data
            .get("monitored")
            .and_then(Value::as_object)
            .ok_or_else(|| malformed(data))?;

        // Sub-chains sharing a display name are merged under it
        let merged = chains.entry(chain_name.to_string()).or_default();
        for (category, entities) in group(monitored)? {
            merged.entry(category).or_default().extend(entities);
        }
    }

    Ok(chains)
}

fn group(monitored: &Map<String, Value>) -> Result<MonitorableGroups, EngineError> {
    let mut groups = MonitorableGroups::new();

    for (category, entities) in monitored {
        let entities = entities.as_object().ok_or_else(|| malformed(entities))?;
        let list = entities
            .iter()
            .map(|(id, entity)| -> Result<BTreeMap<String, String>, EngineError> {
                let name = entity
                    .get("name")
                    .and_then(Value::as_str)
                    .ok_or_else(|| malformed(entity))?;
                Ok(BTreeMap::from([(id.clone(), name.to_string())]))
            })
            .collect::<Result<Vec<_>, _>>()?;
        groups.insert(category.clone(), list);
    }

    Ok(groups)
}
