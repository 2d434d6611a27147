pub mod collection;
pub mod cursor;
pub mod document;
pub mod engine;
pub mod errors;
pub mod logger;
pub mod protocol;
pub mod query;

use std::sync::Arc;

use crate::collection::Collection;
use crate::engine::Engine;
use crate::errors::DbError;
use crate::protocol::{CommandListener, Session};

/// The main database struct: a named handle over an [`Engine`], plus the
/// entry points external collaborators use (bulk seeding, session creation).
pub struct Database {
    engine: Arc<Engine>,
    name: String,
}

impl Database {
    /// Creates a new in-memory database instance.
    #[must_use]
    pub fn new(name: &str) -> Self {
        let _ = logger::init();
        Self { engine: Arc::new(Engine::new()), name: name.to_string() }
    }

    /// Creates a new collection with the given name (no-op if it exists).
    pub fn create_collection(&self, name: &str) -> Arc<Collection> {
        self.engine.create_collection(name)
    }

    /// Retrieves a collection by its name.
    #[must_use]
    pub fn collection(&self, name: &str) -> Option<Arc<Collection>> {
        self.engine.collection(name)
    }

    /// Deletes a collection by its name.
    pub fn drop_collection(&self, name: &str) -> bool {
        self.engine.drop_collection(name)
    }

    /// Lists the names of all collections.
    #[must_use]
    pub fn list_collection_names(&self) -> Vec<String> {
        self.engine.list_collection_names()
    }

    /// Bulk insert used for initial data seeding; creates the collection if
    /// needed. Returns the `_id` of each inserted document.
    ///
    /// # Errors
    /// `DuplicateKey` when an `_id` collides; the whole batch is rejected.
    pub fn insert_many(
        &self,
        collection: &str,
        docs: Vec<bson::Document>,
    ) -> Result<Vec<bson::Bson>, DbError> {
        self.engine.create_collection(collection).insert_many(docs)
    }

    /// Opens a query session with no listeners attached.
    #[must_use]
    pub fn session(&self) -> Session {
        Session::new(self.engine.clone(), &self.name)
    }

    /// Opens a query session that reports every outbound command to
    /// `listener`.
    #[must_use]
    pub fn session_with_listener(&self, listener: Arc<dyn CommandListener>) -> Session {
        self.session().with_listener(listener)
    }

    #[must_use]
    pub fn engine(&self) -> Arc<Engine> {
        self.engine.clone()
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}
