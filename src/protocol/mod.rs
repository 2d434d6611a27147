mod events;

pub use events::{CommandListener, CommandStartedEvent, EventRecorder};

use bson::{Bson, doc};
use std::sync::Arc;

use crate::cursor::Batch;
use crate::engine::Engine;
use crate::errors::DbError;
use crate::query;

/// Caller-supplied query modifiers. Absent fields stay absent in the emitted
/// command; defaulting happens server-side.
#[derive(Debug, Clone, Default)]
pub struct FindOptions {
    pub filter: Option<bson::Document>,
    pub sort: Option<bson::Document>,
    pub skip: Option<u64>,
    pub limit: Option<i64>,
    pub batch_size: Option<i64>,
}

/// Command protocol layer: translates `find`/`getMore` requests into cursor
/// manager calls and emits each outbound command to the registered listeners,
/// in issuance order, before execution.
pub struct Session {
    engine: Arc<Engine>,
    database: String,
    listeners: Vec<Arc<dyn CommandListener>>,
}

impl Session {
    #[must_use]
    pub fn new(engine: Arc<Engine>, database: impl Into<String>) -> Self {
        Self { engine, database: database.into(), listeners: Vec::new() }
    }

    #[must_use]
    pub fn with_listener(mut self, listener: Arc<dyn CommandListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    /// Runs a `find` and returns the first batch.
    ///
    /// The emitted command carries only the fields the caller set, with one
    /// observable adjustment: when `limit` and `batchSize` are both positive
    /// and equal, the wire `batchSize` becomes `batchSize + 1` so the first
    /// reply can report exhaustion instead of leaving a one-shot cursor open.
    ///
    /// # Errors
    /// `InvalidFilter`/`InvalidSort` on malformed modifiers (rejected before
    /// any command is emitted or cursor allocated); `NoSuchCollection`.
    pub fn find(&self, collection: &str, opts: &FindOptions) -> Result<Batch, DbError> {
        let filter = match &opts.filter {
            Some(f) => query::parse_filter(f)?,
            None => query::Filter::True,
        };
        let sort = match &opts.sort {
            Some(s) => Some(query::parse_sort(s)?),
            None => None,
        };
        let col = self.engine.require_collection(collection)?;

        let limit = opts.limit.unwrap_or(0);
        let wire_batch_size = opts.batch_size.map(|b| {
            if b > 0 && limit > 0 && b == limit { b + 1 } else { b }
        });

        let mut cmd = doc! {"find": collection};
        if let Some(f) = &opts.filter {
            cmd.insert("filter", f.clone());
        }
        if let Some(s) = &opts.sort {
            cmd.insert("sort", s.clone());
        }
        if let Some(skip) = opts.skip {
            cmd.insert("skip", Bson::Int64(i64::try_from(skip).unwrap_or(i64::MAX)));
        }
        if let Some(limit) = opts.limit {
            cmd.insert("limit", Bson::Int64(limit));
        }
        if let Some(b) = wire_batch_size {
            cmd.insert("batchSize", Bson::Int64(b));
        }
        self.emit("find", cmd);

        Ok(self.engine.cursors().open_find(
            &col,
            &filter,
            sort.as_deref(),
            opts.skip.unwrap_or(0),
            limit,
            wire_batch_size.unwrap_or(0),
        ))
    }

    /// Fetches the next batch for an open cursor. A `batch_size` here applies
    /// to this call only and appears in the emitted command.
    ///
    /// # Errors
    /// `CursorNotFound` for stale/unknown ids, `CursorInUse` on contention.
    pub fn get_more(
        &self,
        collection: &str,
        cursor_id: i64,
        batch_size: Option<i64>,
    ) -> Result<Batch, DbError> {
        let mut cmd = doc! {"getMore": Bson::Int64(cursor_id), "collection": collection};
        if let Some(b) = batch_size {
            cmd.insert("batchSize", Bson::Int64(b));
        }
        self.emit("getMore", cmd);
        self.engine.cursors().get_more(cursor_id, batch_size)
    }

    /// Explicitly closes a cursor. Idempotent; no command is emitted.
    ///
    /// # Errors
    /// `CursorInUse` when a call on the same cursor is in flight.
    pub fn kill_cursor(&self, cursor_id: i64) -> Result<(), DbError> {
        self.engine.cursors().close(cursor_id)
    }

    /// Drains a query: runs `find`, then `getMore` until exhaustion, and
    /// returns the concatenated result set.
    ///
    /// # Errors
    /// Propagates any `find`/`get_more` failure.
    pub fn find_all(&self, collection: &str, opts: &FindOptions) -> Result<Vec<bson::Document>, DbError> {
        let mut batch = self.find(collection, opts)?;
        let mut out = batch.docs;
        while batch.cursor_id != 0 {
            batch = self.get_more(collection, batch.cursor_id, None)?;
            out.append(&mut batch.docs);
        }
        Ok(out)
    }

    fn emit(&self, name: &str, command: bson::Document) {
        let event = CommandStartedEvent {
            command_name: name.to_string(),
            database_name: self.database.clone(),
            command,
        };
        log::debug!("command {} db={} body={}", name, self.database, event.command_json());
        for listener in &self.listeners {
            listener.command_started(event.clone());
        }
    }
}
