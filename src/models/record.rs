//! Record and query models for collection reads.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Untyped key/value payload of a record, as written by external producers.
pub type Payload = Map<String, Value>;

/// A document read from a collection.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// Document id, never part of the response body
    pub id: String,
    pub data: Payload,
}

impl Record {
    pub fn new(id: impl Into<String>, data: Payload) -> Self {
        Self {
            id: id.into(),
            data,
        }
    }

    pub fn into_payload(self) -> Payload {
        self.data
    }
}

/// Sort direction of an ordered read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    Ascending,
    Descending,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Ascending => "ASCENDING",
            Direction::Descending => "DESCENDING",
        }
    }
}

/// Read every record of a collection, ordered by one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderedQuery {
    pub collection: String,
    pub order_by: String,
    pub direction: Direction,
}

impl OrderedQuery {
    /// Newest-first read of `collection` by `field`.
    pub fn descending(collection: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            order_by: field.into(),
            direction: Direction::Descending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_direction_wire_name() {
        assert_eq!(
            serde_json::to_value(Direction::Descending).unwrap(),
            json!("DESCENDING")
        );
        assert_eq!(Direction::Ascending.as_str(), "ASCENDING");
    }

    #[test]
    fn test_descending_query() {
        let query = OrderedQuery::descending("posts", "date");
        assert_eq!(query.collection, "posts");
        assert_eq!(query.order_by, "date");
        assert_eq!(query.direction, Direction::Descending);
    }

    #[test]
    fn test_into_payload_drops_id() {
        let mut data = Payload::new();
        data.insert("caption".into(), json!("Sunset"));
        let record = Record::new("abc", data.clone());
        assert_eq!(record.into_payload(), data);
    }
}
