use crate::document::{Document, IdKey};
use crate::errors::DbError;
use bson::Bson;
use parking_lot::RwLock;
use std::collections::HashMap;

/// An in-memory collection of documents. Insertion order is stable and is the
/// tie-break order for query results; the store holds the canonical copy of
/// each document and hands out clones.
pub struct Collection {
    name: String,
    store: RwLock<Store>,
}

#[derive(Default)]
struct Store {
    docs: Vec<Document>,
    ids: HashMap<IdKey, usize>,
}

impl Collection {
    #[must_use]
    pub fn new(name: String) -> Self {
        Self { name, store: RwLock::new(Store::default()) }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Bulk insert. The whole batch is validated before any document lands, so
    /// a duplicate `_id` (against the store or within the batch) rejects the
    /// batch atomically. Returns the `_id` of each inserted document in order.
    pub fn insert_many(&self, docs: Vec<bson::Document>) -> Result<Vec<Bson>, DbError> {
        let staged: Vec<Document> = docs.into_iter().map(Document::new).collect();
        let mut store = self.store.write();
        let mut seen: Vec<IdKey> = Vec::with_capacity(staged.len());
        for doc in &staged {
            let key = IdKey::from_bson(doc.id());
            if store.ids.contains_key(&key) || seen.contains(&key) {
                return Err(DbError::DuplicateKey(format!(
                    "collection {}: _id {:?}",
                    self.name,
                    doc.id()
                )));
            }
            seen.push(key);
        }
        let mut ids = Vec::with_capacity(staged.len());
        for (doc, key) in staged.into_iter().zip(seen) {
            ids.push(doc.id().clone());
            let idx = store.docs.len();
            store.ids.insert(key, idx);
            store.docs.push(doc);
        }
        Ok(ids)
    }

    pub fn insert_one(&self, doc: bson::Document) -> Result<Bson, DbError> {
        let mut ids = self.insert_many(vec![doc])?;
        Ok(ids.remove(0))
    }

    /// Snapshot of all documents in insertion order.
    #[must_use]
    pub fn scan(&self) -> Vec<Document> {
        self.store.read().docs.clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.store.read().docs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.store.read().docs.is_empty()
    }
}
