//! Document store seam and in-memory backend

use async_trait::async_trait;
use dashmap::DashMap;

use super::pipeline::Pipeline;
use super::StoreError;

/// A stored document (always a JSON object)
pub type Document = serde_json::Value;

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn ping(&self) -> Result<(), StoreError>;

    /// Run `pipeline` over `collection` of `database`, returning the output
    /// documents in pipeline order. Unknown collections are empty.
    async fn aggregate(
        &self,
        database: &str,
        collection: &str,
        pipeline: &Pipeline,
    ) -> Result<Vec<Document>, StoreError>;
}

/// In-process document store keyed by (database, collection)
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    collections: DashMap<(String, String), Vec<Document>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, database: &str, collection: &str, doc: Document) {
        self.collections
            .entry((database.to_string(), collection.to_string()))
            .or_default()
            .push(doc);
    }

    pub fn insert_many<I>(&self, database: &str, collection: &str, docs: I)
    where
        I: IntoIterator<Item = Document>,
    {
        self.collections
            .entry((database.to_string(), collection.to_string()))
            .or_default()
            .extend(docs);
    }

    pub fn collection_len(&self, database: &str, collection: &str) -> usize {
        self.collections
            .get(&(database.to_string(), collection.to_string()))
            .map(|docs| docs.len())
            .unwrap_or(0)
    }

    fn snapshot(&self, database: &str, collection: &str) -> Vec<Document> {
        self.collections
            .get(&(database.to_string(), collection.to_string()))
            .map(|docs| docs.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn aggregate(
        &self,
        database: &str,
        collection: &str,
        pipeline: &Pipeline,
    ) -> Result<Vec<Document>, StoreError> {
        let input = self.snapshot(database, collection);
        Ok(pipeline.evaluate(input, |name| self.snapshot(database, name)))
    }
}
