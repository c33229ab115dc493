use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{
    compare_values, new_document_id, Direction, Document, DocumentStore, Fields, NewDocument,
    Query, Timestamp,
};
use crate::error::PersistenceError;

/// In-process document store. Collections are kept ordered by id; the store clock is
/// strictly monotonic so no two writes share a server timestamp.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    collections: HashMap<String, BTreeMap<String, Fields>>,
    last_stamp: Option<Timestamp>,
}

impl Inner {
    fn next_stamp(&mut self) -> Timestamp {
        let now = Timestamp::now();
        let stamp = match self.last_stamp {
            Some(last) if now <= last => last.successor(),
            _ => now,
        };
        self.last_stamp = Some(stamp);
        stamp
    }

    fn write(&mut self, collection: &str, id: String, doc: NewDocument) {
        let NewDocument {
            mut fields,
            server_timestamps,
        } = doc;
        if !server_timestamps.is_empty() {
            let stamp = self.next_stamp().to_value();
            for field in server_timestamps {
                fields.insert(field, stamp.clone());
            }
        }
        self.collections
            .entry(collection.to_string())
            .or_default()
            .insert(id, fields);
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents currently held in `collection`.
    pub async fn len(&self, collection: &str) -> usize {
        self.inner
            .read()
            .await
            .collections
            .get(collection)
            .map(BTreeMap::len)
            .unwrap_or(0)
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn add(&self, collection: &str, doc: NewDocument) -> Result<String, PersistenceError> {
        let mut inner = self.inner.write().await;
        let mut id = new_document_id();
        while inner
            .collections
            .get(collection)
            .is_some_and(|c| c.contains_key(&id))
        {
            id = new_document_id();
        }
        inner.write(collection, id.clone(), doc);
        Ok(id)
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, PersistenceError> {
        let inner = self.inner.read().await;
        Ok(inner
            .collections
            .get(collection)
            .and_then(|c| c.get(id))
            .map(|fields| Document {
                id: id.to_string(),
                fields: fields.clone(),
            }))
    }

    async fn set(
        &self,
        collection: &str,
        id: &str,
        doc: NewDocument,
    ) -> Result<(), PersistenceError> {
        self.inner
            .write()
            .await
            .write(collection, id.to_string(), doc);
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), PersistenceError> {
        if let Some(c) = self.inner.write().await.collections.get_mut(collection) {
            c.remove(id);
        }
        Ok(())
    }

    async fn query(
        &self,
        collection: &str,
        query: Query,
    ) -> Result<Vec<Document>, PersistenceError> {
        query.validate()?;
        let inner = self.inner.read().await;
        let Some(docs) = inner.collections.get(collection) else {
            return Ok(Vec::new());
        };

        let mut out: Vec<Document> = docs
            .iter()
            .filter(|(_, fields)| query.filters.iter().all(|f| f.matches(fields)))
            .map(|(id, fields)| Document {
                id: id.clone(),
                fields: fields.clone(),
            })
            .collect();

        if let Some(order) = &query.order_by {
            out.sort_by(|a, b| {
                let ord = compare_values(a.get(&order.field), b.get(&order.field));
                match order.direction {
                    Direction::Asc => ord,
                    Direction::Desc => ord.reverse(),
                }
            });
        }
        Ok(out)
    }
}
