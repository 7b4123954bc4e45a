//! Key-value store seam and in-memory backend

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;

use super::StoreError;

/// Key-value store operations used by the aggregators.
///
/// Batch operations observe one consistent snapshot and either return every
/// sub-result or a single error for the whole batch.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn ping(&self) -> Result<(), StoreError>;

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    async fn hset(&self, hash: &str, field: &str, value: &str) -> Result<(), StoreError>;

    /// All fields of each hash, in request order. A missing hash is empty.
    async fn hgetall_batch(
        &self,
        hashes: &[String],
    ) -> Result<Vec<HashMap<String, String>>, StoreError>;

    /// Named fields of each hash, in request order. Missing fields are `None`.
    async fn hmget_batch(
        &self,
        requests: &[(String, Vec<String>)],
    ) -> Result<Vec<Vec<Option<String>>>, StoreError>;
}

#[derive(Debug)]
enum Entry {
    Value(String),
    Hash(HashMap<String, String>),
}

/// In-process key-value store.
///
/// A single lock guards the whole keyspace so each batch reads one snapshot.
#[derive(Debug, Default)]
pub struct MemoryKeyValueStore {
    entries: RwLock<HashMap<String, Entry>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace a whole hash
    pub fn insert_hash(&self, hash: impl Into<String>, fields: HashMap<String, String>) {
        self.entries.write().insert(hash.into(), Entry::Hash(fields));
    }

    pub fn insert_value(&self, key: impl Into<String>, value: impl Into<String>) {
        self.entries
            .write()
            .insert(key.into(), Entry::Value(value.into()));
    }

    fn read_hash<'a>(
        entries: &'a HashMap<String, Entry>,
        hash: &str,
    ) -> Result<Option<&'a HashMap<String, String>>, StoreError> {
        match entries.get(hash) {
            None => Ok(None),
            Some(Entry::Hash(fields)) => Ok(Some(fields)),
            Some(Entry::Value(_)) => Err(StoreError::WrongType(hash.to_string())),
        }
    }
}

#[async_trait]
impl KeyValueStore for MemoryKeyValueStore {
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        match self.entries.read().get(key) {
            None => Ok(None),
            Some(Entry::Value(v)) => Ok(Some(v.clone())),
            Some(Entry::Hash(_)) => Err(StoreError::WrongType(key.to_string())),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries
            .write()
            .insert(key.to_string(), Entry::Value(value.to_string()));
        Ok(())
    }

    async fn hset(&self, hash: &str, field: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.write();
        let entry = entries
            .entry(hash.to_string())
            .or_insert_with(|| Entry::Hash(HashMap::new()));

        match entry {
            Entry::Hash(fields) => {
                fields.insert(field.to_string(), value.to_string());
                Ok(())
            }
            Entry::Value(_) => Err(StoreError::WrongType(hash.to_string())),
        }
    }

    async fn hgetall_batch(
        &self,
        hashes: &[String],
    ) -> Result<Vec<HashMap<String, String>>, StoreError> {
        let entries = self.entries.read();
        hashes
            .iter()
            .map(|hash| Ok(Self::read_hash(&entries, hash)?.cloned().unwrap_or_default()))
            .collect()
    }

    async fn hmget_batch(
        &self,
        requests: &[(String, Vec<String>)],
    ) -> Result<Vec<Vec<Option<String>>>, StoreError> {
        let entries = self.entries.read();
        requests
            .iter()
            .map(|(hash, fields)| {
                let stored = Self::read_hash(&entries, hash)?;
                Ok(fields
                    .iter()
                    .map(|field| stored.and_then(|h| h.get(field).cloned()))
                    .collect())
            })
            .collect()
    }
}
