use std::sync::Arc;

use super::{grouped_items, AlertsQuery};
use crate::error::EngineError;
use crate::store::{Document, DocumentStore, Filter, Pipeline, SortOrder, StoreKind};

pub const ALERT_DOC_TYPE: &str = "alert";

/// Time-windowed alert history across chain collections
pub struct HistoricalAlertQuery {
    store: Arc<dyn DocumentStore>,
    database: String,
}

impl HistoricalAlertQuery {
    pub fn new(store: Arc<dyn DocumentStore>, database: impl Into<String>) -> Self {
        Self {
            store,
            database: database.into(),
        }
    }

    /// Pipeline run against the first chain; the remaining chains are unioned in.
    pub fn pipeline(query: &AlertsQuery) -> Pipeline {
        let severities: Vec<&str> = query.severities.iter().map(|s| s.as_str()).collect();

        Pipeline::new()
            .union_with(query.chains.iter().skip(1).cloned())
            .matching(Filter::eq("doc_type", ALERT_DOC_TYPE))
            .unwind("alerts")
            .matching(Filter::And(vec![
                Filter::is_in("alerts.severity", severities),
                Filter::is_in("alerts.origin", query.sources.iter().cloned()),
                Filter::range("alerts.timestamp", query.min_timestamp, query.max_timestamp),
            ]))
            .sort(vec![
                ("alerts.timestamp".to_string(), SortOrder::Descending),
                ("_id".to_string(), SortOrder::Ascending),
            ])
            .limit(query.limit)
            .group_push("alerts", "alerts")
    }

    pub async fn run(&self, query: &AlertsQuery) -> Result<Vec<Document>, EngineError> {
        let Some(base) = query.chains.first() else {
            return Ok(Vec::new());
        };

        let docs = self
            .store
            .aggregate(&self.database, base, &Self::pipeline(query))
            .await
            .map_err(|e| EngineError::retrieval(StoreKind::Document, e))?;

        let alerts = grouped_items(docs, "alerts");
        tracing::debug!(
            chains = query.chains.len(),
            alerts = alerts.len(),
            "Queried alert history"
        );
        Ok(alerts)
    }
}
