//! Document store boundary.
//!
//! Collections of JSON documents addressed by `(collection, id)`, queried with
//! equality / membership filters and a single sort field. Two backends implement
//! [`DocumentStore`]: [`memory::MemoryStore`] and [`postgres::PgDocumentStore`].

use std::cmp::Ordering;

use async_trait::async_trait;
use rand::{distributions::Alphanumeric, Rng};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value};
use time::OffsetDateTime;

use crate::error::PersistenceError;

pub mod memory;
pub mod postgres;

/// Maximum number of values accepted by a single [`Filter::In`].
pub const IN_FILTER_LIMIT: usize = 10;

pub type Fields = Map<String, Value>;

/// Store-side timestamp, persisted as `{ "seconds": .., "nanos": .. }`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Timestamp {
    pub seconds: i64,
    pub nanos: u32,
}

impl Timestamp {
    pub const fn new(seconds: i64, nanos: u32) -> Self {
        Self { seconds, nanos }
    }

    pub fn now() -> Self {
        Self::from_datetime(OffsetDateTime::now_utc())
    }

    pub fn from_datetime(dt: OffsetDateTime) -> Self {
        Self {
            seconds: dt.unix_timestamp(),
            nanos: dt.nanosecond(),
        }
    }

    pub fn to_datetime(self) -> Option<OffsetDateTime> {
        let base = OffsetDateTime::from_unix_timestamp(self.seconds).ok()?;
        Some(base + time::Duration::nanoseconds(i64::from(self.nanos)))
    }

    /// Smallest timestamp strictly after `self`.
    pub fn successor(self) -> Self {
        if self.nanos + 1 >= 1_000_000_000 {
            Self::new(self.seconds + 1, 0)
        } else {
            Self::new(self.seconds, self.nanos + 1)
        }
    }

    pub fn to_value(self) -> Value {
        serde_json::json!({ "seconds": self.seconds, "nanos": self.nanos })
    }

    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let seconds = obj.get("seconds")?.as_i64()?;
        let nanos = obj.get("nanos").and_then(Value::as_u64).unwrap_or(0);
        Some(Self::new(seconds, u32::try_from(nanos).ok()?))
    }
}

/// A stored document with its store-assigned id.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub fields: Fields,
}

impl Document {
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Deserializes the document, exposing its id as an `id` field.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, PersistenceError> {
        let mut fields = self.fields.clone();
        fields.insert("id".to_string(), Value::String(self.id.clone()));
        serde_json::from_value(Value::Object(fields)).map_err(|e| {
            PersistenceError::from(anyhow::Error::new(e).context(format!("decode document {}", self.id)))
        })
    }
}

/// Payload for `add` / `set`. Fields listed in `server_timestamps` are stamped by the
/// store's clock at write time, overriding any client value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewDocument {
    pub fields: Fields,
    pub server_timestamps: Vec<String>,
}

impl NewDocument {
    pub fn new(fields: Fields) -> Self {
        Self {
            fields,
            server_timestamps: Vec::new(),
        }
    }

    pub fn from_serialize<T: Serialize>(value: &T) -> Result<Self, PersistenceError> {
        match serde_json::to_value(value).map_err(anyhow::Error::new)? {
            Value::Object(fields) => Ok(Self::new(fields)),
            other => Err(PersistenceError::msg(format!(
                "document must be a JSON object, got {other}"
            ))),
        }
    }

    pub fn server_timestamp(mut self, field: &str) -> Self {
        self.server_timestamps.push(field.to_string());
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq(String, Value),
    In(String, Vec<Value>),
}

impl Filter {
    pub fn eq(field: &str, value: impl Into<Value>) -> Self {
        Filter::Eq(field.to_string(), value.into())
    }

    pub fn is_in<V: Into<Value>>(field: &str, values: impl IntoIterator<Item = V>) -> Self {
        Filter::In(field.to_string(), values.into_iter().map(Into::into).collect())
    }

    pub fn matches(&self, fields: &Fields) -> bool {
        match self {
            Filter::Eq(field, value) => fields.get(field) == Some(value),
            Filter::In(field, values) => fields
                .get(field)
                .map(|v| values.contains(v))
                .unwrap_or(false),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filters: Vec<Filter>,
    pub order_by: Option<OrderBy>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn order_by(mut self, field: &str, direction: Direction) -> Self {
        self.order_by = Some(OrderBy {
            field: field.to_string(),
            direction,
        });
        self
    }

    /// Rejects queries the backing store would refuse.
    pub fn validate(&self) -> Result<(), PersistenceError> {
        for filter in &self.filters {
            if let Filter::In(field, values) = filter {
                if values.len() > IN_FILTER_LIMIT {
                    return Err(PersistenceError::msg(format!(
                        "'in' filter on {field} has {} values, limit is {IN_FILTER_LIMIT}",
                        values.len()
                    )));
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, PartialEq, PartialOrd)]
enum SortKey<'a> {
    Null,
    Bool(bool),
    Number(f64),
    String(&'a str),
    Timestamp(Timestamp),
    Other,
}

fn sort_key(value: Option<&Value>) -> SortKey<'_> {
    match value {
        None | Some(Value::Null) => SortKey::Null,
        Some(Value::Bool(b)) => SortKey::Bool(*b),
        Some(Value::Number(n)) => SortKey::Number(n.as_f64().unwrap_or(0.0)),
        Some(Value::String(s)) => SortKey::String(s),
        Some(v) => Timestamp::from_value(v)
            .map(SortKey::Timestamp)
            .unwrap_or(SortKey::Other),
    }
}

/// Total order over stored values. Missing and null sort lowest.
pub fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let (a, b) = (sort_key(a), sort_key(b));
    match (&a, &b) {
        (SortKey::Number(x), SortKey::Number(y)) => x.total_cmp(y),
        _ => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
    }
}

/// Fresh opaque document id (20 alphanumeric characters).
pub fn new_document_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(20)
        .map(char::from)
        .collect()
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Persists `doc` under a freshly generated id and returns that id.
    async fn add(&self, collection: &str, doc: NewDocument) -> Result<String, PersistenceError>;
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, PersistenceError>;
    /// Creates or fully replaces the document at `id`.
    async fn set(&self, collection: &str, id: &str, doc: NewDocument)
        -> Result<(), PersistenceError>;
    /// Deleting a missing document is not an error.
    async fn delete(&self, collection: &str, id: &str) -> Result<(), PersistenceError>;
    async fn query(&self, collection: &str, query: Query)
        -> Result<Vec<Document>, PersistenceError>;
}


#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn timestamps_order_before_strings_and_after_null() {
        let ts = Timestamp::new(5, 0).to_value();
        let later = Timestamp::new(5, 1).to_value();
        assert_eq!(compare_values(Some(&ts), Some(&later)), Ordering::Less);
        assert_eq!(compare_values(None, Some(&ts)), Ordering::Less);
        assert_eq!(compare_values(Some(&Value::Null), None), Ordering::Equal);
        assert_eq!(
            compare_values(Some(&json!(10)), Some(&json!(9.5))),
            Ordering::Greater
        );
        assert_eq!(
            compare_values(Some(&json!("apple")), Some(&json!("banana"))),
            Ordering::Less
        );
    }

    #[test]
    fn timestamp_successor_carries_into_seconds() {
        assert_eq!(Timestamp::new(1, 999_999_999).successor(), Timestamp::new(2, 0));
        assert_eq!(Timestamp::new(1, 5).successor(), Timestamp::new(1, 6));
    }

    #[test]
    fn timestamp_value_shape() {
        let ts = Timestamp::new(1_700_000_000, 42);
        assert_eq!(ts.to_value(), json!({ "seconds": 1_700_000_000i64, "nanos": 42 }));
        assert_eq!(Timestamp::from_value(&ts.to_value()), Some(ts));
        assert_eq!(Timestamp::from_value(&json!("2024-01-01")), None);
        let dt = ts.to_datetime().unwrap();
        assert_eq!(Timestamp::from_datetime(dt), ts);
    }

    #[test]
    fn in_filter_limit_is_enforced() {
        let ok = Query::new().filter(Filter::is_in("authorId", (0..10).map(|i| i.to_string())));
        assert!(ok.validate().is_ok());
        let too_many =
            Query::new().filter(Filter::is_in("authorId", (0..11).map(|i| i.to_string())));
        let err = too_many.validate().unwrap_err();
        assert!(err.to_string().contains("limit is 10"));
    }

    #[test]
    fn filters_match_fields() {
        let fields = json!({ "authorId": "u1", "category": "soup" });
        let fields = fields.as_object().unwrap();
        assert!(Filter::eq("authorId", "u1").matches(fields));
        assert!(!Filter::eq("authorId", "u2").matches(fields));
        assert!(Filter::is_in("authorId", ["u0", "u1"]).matches(fields));
        assert!(!Filter::is_in("authorId", Vec::<String>::new()).matches(fields));
        assert!(!Filter::eq("missing", "x").matches(fields));
    }

    #[test]
    fn document_decode_exposes_id() {
        #[derive(Deserialize)]
        struct Row {
            id: String,
            title: String,
        }
        let doc = Document {
            id: "abc".into(),
            fields: json!({ "title": "Soup" }).as_object().unwrap().clone(),
        };
        let row: Row = doc.decode().unwrap();
        assert_eq!(row.id, "abc");
        assert_eq!(row.title, "Soup");
    }

    #[test]
    fn generated_ids_are_opaque_and_distinct() {
        let a = new_document_id();
        let b = new_document_id();
        assert_eq!(a.len(), 20);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, b);
    }

    #[test]
    fn new_document_requires_object() {
        assert!(NewDocument::from_serialize(&json!([1, 2])).is_err());
        let doc = NewDocument::from_serialize(&json!({ "a": 1 }))
            .unwrap()
            .server_timestamp("createdAt");
        assert_eq!(doc.server_timestamps, vec!["createdAt".to_string()]);
    }
}
