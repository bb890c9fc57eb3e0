//! In-process document store for tests.

use std::cmp::Ordering;
use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use super::DocumentStore;
use crate::errors::AppError;
use crate::models::{Direction, OrderedQuery, Payload, Record};

#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Vec<Record>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, collection: &str, id: &str, data: Value) {
        let data: Payload = match data {
            Value::Object(map) => map,
            other => panic!("record payload must be an object, got {}", other),
        };
        self.collections
            .write()
            .await
            .entry(collection.to_string())
            .or_default()
            .push(Record::new(id, data));
    }
}

/// Rank of a value's type in the cross-type ordering.
fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => {
            let x = x.as_f64().unwrap_or(f64::NAN);
            let y = y.as_f64().unwrap_or(f64::NAN);
            x.total_cmp(&y)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        // Timestamps decode to {_seconds, _nanoseconds}.
        (Value::Object(x), Value::Object(y)) => {
            let key = |m: &serde_json::Map<String, Value>| {
                (
                    m.get("_seconds").and_then(Value::as_i64).unwrap_or(0),
                    m.get("_nanoseconds").and_then(Value::as_i64).unwrap_or(0),
                )
            };
            key(x).cmp(&key(y))
        }
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn list_ordered(&self, query: &OrderedQuery) -> Result<Vec<Record>, AppError> {
        let collections = self.collections.read().await;
        let mut records: Vec<Record> = collections
            .get(&query.collection)
            .map(|records| {
                records
                    .iter()
                    .filter(|r| r.data.contains_key(&query.order_by))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        records.sort_by(|a, b| {
            let ord = compare_values(&a.data[&query.order_by], &b.data[&query.order_by])
                .then_with(|| a.id.cmp(&b.id));
            match query.direction {
                Direction::Ascending => ord,
                Direction::Descending => ord.reverse(),
            }
        });

        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_orders_descending_and_skips_missing_field() {
        let store = MemoryStore::new();
        store.insert("posts", "a", json!({ "date": 1 })).await;
        store.insert("posts", "b", json!({ "date": 3 })).await;
        store.insert("posts", "c", json!({ "caption": "undated" })).await;
        store.insert("posts", "d", json!({ "date": 2 })).await;
        store.insert("drafts", "e", json!({ "date": 9 })).await;

        let records = store
            .list_ordered(&OrderedQuery::descending("posts", "date"))
            .await
            .unwrap();
        let ids: Vec<_> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "d", "a"]);
    }

    #[tokio::test]
    async fn test_unknown_collection_is_empty() {
        let store = MemoryStore::new();
        let records = store
            .list_ordered(&OrderedQuery::descending("posts", "date"))
            .await
            .unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn test_timestamp_ordering() {
        let earlier = json!({ "_seconds": 10, "_nanoseconds": 5 });
        let later = json!({ "_seconds": 10, "_nanoseconds": 6 });
        assert_eq!(compare_values(&earlier, &later), Ordering::Less);
        assert_eq!(compare_values(&json!(null), &json!(0)), Ordering::Less);
    }
}
