//! Typed aggregation pipelines for the document store.
//!
//! A [`Pipeline`] renders to the store's native stage documents through
//! [`Pipeline::to_document`] and can also be evaluated in-process against
//! plain JSON documents, which is what the in-memory backend does.

use serde_json::{json, Map, Value};
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

impl SortOrder {
    fn as_i32(self) -> i32 {
        match self {
            SortOrder::Ascending => 1,
            SortOrder::Descending => -1,
        }
    }
}

/// Document predicate over dotted field paths
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq { path: String, value: Value },
    In { path: String, values: Vec<Value> },
    /// Inclusive on both ends
    Range { path: String, min: f64, max: f64 },
    And(Vec<Filter>),
}

impl Filter {
    pub fn eq(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Eq {
            path: path.into(),
            value: value.into(),
        }
    }

    pub fn is_in<V: Into<Value>>(path: impl Into<String>, values: impl IntoIterator<Item = V>) -> Self {
        Filter::In {
            path: path.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn range(path: impl Into<String>, min: f64, max: f64) -> Self {
        Filter::Range {
            path: path.into(),
            min,
            max,
        }
    }

    pub fn to_document(&self) -> Value {
        match self {
            Filter::Eq { path, value } => json!({ path.as_str(): value }),
            Filter::In { path, values } => json!({ path.as_str(): { "$in": values } }),
            Filter::Range { path, min, max } => {
                json!({ path.as_str(): { "$gte": min, "$lte": max } })
            }
            Filter::And(filters) => {
                json!({ "$and": filters.iter().map(Filter::to_document).collect::<Vec<_>>() })
            }
        }
    }

    pub fn matches(&self, doc: &Value) -> bool {
        match self {
            Filter::Eq { path, value } => lookup(doc, path) == Some(value),
            Filter::In { path, values } => lookup(doc, path)
                .map(|v| values.contains(v))
                .unwrap_or(false),
            Filter::Range { path, min, max } => lookup(doc, path)
                .and_then(Value::as_f64)
                .map(|v| v >= *min && v <= *max)
                .unwrap_or(false),
            Filter::And(filters) => filters.iter().all(|f| f.matches(doc)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    UnionWith(String),
    Match(Filter),
    /// Emit one document per element of the array at this path
    Unwind(String),
    Sort(Vec<(String, SortOrder)>),
    Limit(usize),
    /// Collapse every document into `{_id: null, <field>: [<push path>...]}`
    Group { field: String, push: String },
}

impl Stage {
    pub fn to_document(&self) -> Value {
        match self {
            Stage::UnionWith(collection) => json!({ "$unionWith": collection }),
            Stage::Match(filter) => json!({ "$match": filter.to_document() }),
            Stage::Unwind(path) => json!({ "$unwind": format!("${}", path) }),
            Stage::Sort(keys) => {
                let mut order_by = Map::new();
                for (path, order) in keys {
                    order_by.insert(path.clone(), json!(order.as_i32()));
                }
                json!({ "$sort": order_by })
            }
            Stage::Limit(n) => json!({ "$limit": n }),
            Stage::Group { field, push } => json!({
                "$group": { "_id": null, field.as_str(): { "$push": format!("${}", push) } }
            }),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pipeline {
    stages: Vec<Stage>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage(mut self, stage: Stage) -> Self {
        self.stages.push(stage);
        self
    }

    pub fn union_with<I, S>(mut self, collections: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.stages
            .extend(collections.into_iter().map(|c| Stage::UnionWith(c.into())));
        self
    }

    pub fn matching(self, filter: Filter) -> Self {
        self.stage(Stage::Match(filter))
    }

    pub fn unwind(self, path: impl Into<String>) -> Self {
        self.stage(Stage::Unwind(path.into()))
    }

    pub fn sort(self, keys: Vec<(String, SortOrder)>) -> Self {
        self.stage(Stage::Sort(keys))
    }

    pub fn limit(self, n: usize) -> Self {
        self.stage(Stage::Limit(n))
    }

    pub fn group_push(self, field: impl Into<String>, push: impl Into<String>) -> Self {
        self.stage(Stage::Group {
            field: field.into(),
            push: push.into(),
        })
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn to_document(&self) -> Vec<Value> {
        self.stages.iter().map(Stage::to_document).collect()
    }

    /// Run the pipeline over `input`, pulling unioned collections from
    /// `collection`.
    pub fn evaluate<F>(&self, input: Vec<Value>, collection: F) -> Vec<Value>
    where
        F: Fn(&str) -> Vec<Value>,
    {
        let mut docs = input;

        for stage in &self.stages {
            match stage {
                Stage::UnionWith(name) => docs.extend(collection(name)),
                Stage::Match(filter) => docs.retain(|doc| filter.matches(doc)),
                Stage::Unwind(path) => docs = docs.into_iter().flat_map(|d| unwind(d, path)).collect(),
                Stage::Sort(keys) => docs.sort_by(|a, b| compare_by(a, b, keys)),
                Stage::Limit(n) => docs.truncate(*n),
                Stage::Group { field, push } => {
                    if docs.is_empty() {
                        continue;
                    }
                    let pushed: Vec<Value> = docs
                        .iter()
                        .filter_map(|d| lookup(d, push).cloned())
                        .collect();
                    let mut grouped = Map::new();
                    grouped.insert("_id".to_string(), Value::Null);
                    grouped.insert(field.clone(), Value::Array(pushed));
                    docs = vec![Value::Object(grouped)];
                }
            }
        }

        docs
    }
}

/// Resolve a dotted path inside a document
pub fn lookup<'a>(doc: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(doc, |current, part| current.get(part))
}

fn set_path(doc: &mut Value, path: &str, value: Value) {
    let mut current = doc;
    let mut parts = path.split('.').peekable();

    while let Some(part) = parts.next() {
        let Value::Object(map) = current else {
            return;
        };
        if parts.peek().is_none() {
            map.insert(part.to_string(), value);
            return;
        }
        current = map
            .entry(part.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }
}

fn unwind(doc: Value, path: &str) -> Vec<Value> {
    let items = match lookup(&doc, path) {
        Some(Value::Array(items)) => items.clone(),
        None | Some(Value::Null) => return Vec::new(),
        // A scalar unwinds to itself
        Some(_) => return vec![doc.clone()],
    };

    items
        .into_iter()
        .map(|item| {
            let mut out = doc.clone();
            set_path(&mut out, path, item);
            out
        })
        .collect()
}

fn compare_by(a: &Value, b: &Value, keys: &[(String, SortOrder)]) -> Ordering {
    for (path, order) in keys {
        let ordering = compare_values(lookup(a, path), lookup(b, path));
        let ordering = match order {
            SortOrder::Ascending => ordering,
            SortOrder::Descending => ordering.reverse(),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

fn type_rank(value: Option<&Value>) -> u8 {
    match value {
        None | Some(Value::Null) => 0,
        Some(Value::Number(_)) => 1,
        Some(Value::String(_)) => 2,
        Some(Value::Object(_)) => 3,
        Some(Value::Array(_)) => 4,
        Some(Value::Bool(_)) => 5,
    }
}

/// Cross-type ordering: missing/null, numbers, strings, objects, arrays, bools.
pub fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let x = x.as_f64().unwrap_or(f64::NAN);
            let y = y.as_f64().unwrap_or(f64::NAN);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}
