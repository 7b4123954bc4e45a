//! Seed the in-memory stores from JSON snapshot files.
//!
//! Key-value snapshot: a JSON object whose object-valued entries become
//! hashes and whose other entries become plain values. Non-string hash field
//! values are stored as their JSON text, the way alerters write them.
//!
//! Document snapshot: `{ "<database>": { "<collection>": [ {...}, ... ] } }`.

use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;

use super::{MemoryDocumentStore, MemoryKeyValueStore};

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid snapshot layout: {0}")]
    Layout(String),
}

fn read_object(path: &Path) -> Result<serde_json::Map<String, Value>, SnapshotError> {
    let bytes = std::fs::read(path)?;
    match serde_json::from_slice(&bytes)? {
        Value::Object(map) => Ok(map),
        _ => Err(SnapshotError::Layout("top level must be an object".into())),
    }
}

fn stored_text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

/// Load a key-value snapshot, returning the number of top-level keys loaded.
pub fn load_key_value_snapshot(
    store: &MemoryKeyValueStore,
    path: &Path,
) -> Result<usize, SnapshotError> {
    let root = read_object(path)?;
    let count = root.len();

    for (key, value) in root {
        match value {
            Value::Object(fields) => {
                let fields: HashMap<String, String> = fields
                    .into_iter()
                    .map(|(field, v)| (field, stored_text(v)))
                    .collect();
                store.insert_hash(key, fields);
            }
            other => {
                let text = stored_text(other);
                store.insert_value(key, text);
            }
        }
    }

    tracing::info!(path = %path.display(), keys = count, "Loaded key-value snapshot");
    Ok(count)
}

/// Load a document snapshot, returning the number of documents loaded.
pub fn load_document_snapshot(
    store: &MemoryDocumentStore,
    path: &Path,
) -> Result<usize, SnapshotError> {
    let root = read_object(path)?;
    let mut count = 0;

    for (database, collections) in root {
        let Value::Object(collections) = collections else {
            return Err(SnapshotError::Layout(format!(
                "database '{}' must map collection names to arrays",
                database
            )));
        };

        for (collection, docs) in collections {
            let Value::Array(docs) = docs else {
                return Err(SnapshotError::Layout(format!(
                    "collection '{}.{}' must be an array",
                    database, collection
                )));
            };
            count += docs.len();
            store.insert_many(&database, &collection, docs);
        }
    }

    tracing::info!(path = %path.display(), documents = count, "Loaded document snapshot");
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::KeyValueStore;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_temp(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[tokio::test]
    async fn test_load_key_value_snapshot() {
        let file = write_temp(
            r#"{
                "hash_p1_chain_x": {
                    "alert_system3_sys1": {"severity": "WARNING", "message": "m", "metric": "x", "timestamp": 1},
                    "s7_sys1": "42.5"
                },
                "plain": 7
            }"#,
        );

        let store = MemoryKeyValueStore::new();
        let loaded = load_key_value_snapshot(&store, file.path()).unwrap();
        assert_eq!(loaded, 2);

        let hashes = store
            .hgetall_batch(&["hash_p1_chain_x".to_string()])
            .await
            .unwrap();
        let fields = &hashes[0];
        assert_eq!(fields["s7_sys1"], "42.5");

        let alert: Value = serde_json::from_str(&fields["alert_system3_sys1"]).unwrap();
        assert_eq!(alert["severity"], "WARNING");

        assert_eq!(store.get("plain").await.unwrap(), Some("7".to_string()));
    }

    #[test]
    fn test_load_document_snapshot() {
        let file = write_temp(
            r#"{ "panicdb": { "chain_a": [ {"doc_type": "alert"}, {"doc_type": "system"} ] } }"#,
        );

        let store = MemoryDocumentStore::new();
        assert_eq!(load_document_snapshot(&store, file.path()).unwrap(), 2);
        assert_eq!(store.collection_len("panicdb", "chain_a"), 2);
    }

    #[test]
    fn test_bad_layout_rejected() {
        let file = write_temp(r#"{ "panicdb": { "chain_a": {"doc_type": "alert"} } }"#);
        let store = MemoryDocumentStore::new();

        assert!(matches!(
            load_document_snapshot(&store, file.path()),
            Err(SnapshotError::Layout(_))
        ));

        let file = write_temp("[1, 2]");
        assert!(matches!(
            load_key_value_snapshot(&MemoryKeyValueStore::new(), file.path()),
            Err(SnapshotError::Layout(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        let store = MemoryKeyValueStore::new();
        let result = load_key_value_snapshot(&store, Path::new("/nonexistent/vigil.json"));
        assert!(matches!(result, Err(SnapshotError::Io(_))));
    }
}
