use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use crate::collection::Collection;
use crate::cursor::CursorManager;
use crate::errors::DbError;

/// Process-wide state: the named-collection registry (the collection-name
/// resolver consumed by the protocol layer) and the cursor table.
pub struct Engine {
    collections: RwLock<HashMap<String, Arc<Collection>>>,
    cursors: CursorManager,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    #[must_use]
    pub fn new() -> Self {
        Self { collections: RwLock::new(HashMap::new()), cursors: CursorManager::new() }
    }

    /// Creates a collection, or returns the existing one with that name.
    pub fn create_collection(&self, name: &str) -> Arc<Collection> {
        let mut cols = self.collections.write();
        cols.entry(name.to_string())
            .or_insert_with(|| Arc::new(Collection::new(name.to_string())))
            .clone()
    }

    #[must_use]
    pub fn collection(&self, name: &str) -> Option<Arc<Collection>> {
        self.collections.read().get(name).cloned()
    }

    pub fn drop_collection(&self, name: &str) -> bool {
        self.collections.write().remove(name).is_some()
    }

    #[must_use]
    pub fn list_collection_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.collections.read().keys().cloned().collect();
        names.sort();
        names
    }

    #[must_use]
    pub fn cursors(&self) -> &CursorManager {
        &self.cursors
    }

    /// Resolves a collection or fails, for callers that require it to exist.
    ///
    /// # Errors
    /// `NoSuchCollection` when the name is unknown.
    pub fn require_collection(&self, name: &str) -> Result<Arc<Collection>, DbError> {
        self.collection(name).ok_or_else(|| DbError::NoSuchCollection(name.to_string()))
    }
}
