use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{Duration, Instant};

use crate::collection::Collection;
use crate::errors::DbError;
use crate::query::{self, Evaluation, Filter, SortSpec};

/// Batch size used when the caller specifies neither `limit` nor `batchSize`
/// (and for `getMore` when no batch size was ever negotiated).
pub const DEFAULT_BATCH_SIZE: i64 = 101;

/// One bounded chunk of query results. A `cursor_id` of 0 means the query is
/// exhausted and no server-side state remains.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    pub cursor_id: i64,
    pub docs: Vec<bson::Document>,
}

struct CursorState {
    collection: String,
    eval: Evaluation,
    /// Documents still owed to the caller under `limit`; None = unbounded.
    remaining: Option<i64>,
    /// Negotiated batch size for subsequent batches. Always positive.
    batch_size: i64,
    last_used: Instant,
}

/// Owns the table of open cursors and their lifecycle.
///
/// Concurrency discipline: callers on different cursors run in parallel; a
/// second `get_more` or `close` on the same cursor while a call is in flight
/// fails fast with `CursorInUse`. Exhaustion and close both remove the table
/// entry under the cursor's own state lock, so exactly one caller observes
/// the terminal transition and later calls see `CursorNotFound`.
pub struct CursorManager {
    next_id: AtomicI64,
    table: RwLock<HashMap<i64, Arc<Mutex<CursorState>>>>,
}

impl Default for CursorManager {
    fn default() -> Self {
        Self::new()
    }
}

impl CursorManager {
    #[must_use]
    pub fn new() -> Self {
        Self { next_id: AtomicI64::new(1), table: RwLock::new(HashMap::new()) }
    }

    /// Runs a query and returns its first batch, persisting a cursor only when
    /// more results may remain.
    ///
    /// The effective first-batch size reconciles `limit` and `batch_size`:
    /// both positive takes the min, one positive takes that one, neither takes
    /// the default. A negative `limit` returns everything (capped at `|limit|`
    /// by the evaluator) in a single batch with no cursor.
    pub fn open_find(
        &self,
        col: &Arc<Collection>,
        filter: &Filter,
        sort: Option<&[SortSpec]>,
        skip: u64,
        limit: i64,
        batch_size: i64,
    ) -> Batch {
        let mut eval = query::evaluate(col, filter, sort, skip, limit);

        if limit < 0 {
            // single-batch mode
            return Batch { cursor_id: 0, docs: eval.take(usize::MAX) };
        }

        let effective = match (limit > 0, batch_size > 0) {
            (true, true) => limit.min(batch_size),
            (true, false) => limit,
            (false, true) => batch_size,
            (false, false) => DEFAULT_BATCH_SIZE,
        };
        let requested = usize::try_from(effective).unwrap_or(usize::MAX);
        let fits_in_first = eval.remaining() < requested;
        let docs = eval.take(requested);

        let remaining = if limit > 0 { Some(limit - docs.len() as i64) } else { None };
        if fits_in_first || remaining == Some(0) {
            return Batch { cursor_id: 0, docs };
        }

        let cursor_id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let state = CursorState {
            collection: col.name().to_string(),
            eval,
            remaining,
            batch_size: if batch_size > 0 { batch_size } else { DEFAULT_BATCH_SIZE },
            last_used: Instant::now(),
        };
        self.table.write().insert(cursor_id, Arc::new(Mutex::new(state)));
        log::debug!("cursor {cursor_id} opened on {}", col.name());
        Batch { cursor_id, docs }
    }

    /// Serves the next batch for an open cursor.
    ///
    /// `batch_size` overrides the negotiated size for this call only. The
    /// batch is capped at the remaining limit; hitting the limit or draining
    /// the sequence exhausts the cursor and the returned batch carries id 0.
    ///
    /// # Errors
    /// `CursorNotFound` for unknown, closed or exhausted ids; `CursorInUse`
    /// when another call on the same cursor is in flight.
    pub fn get_more(&self, cursor_id: i64, batch_size: Option<i64>) -> Result<Batch, DbError> {
        let entry = self
            .table
            .read()
            .get(&cursor_id)
            .cloned()
            .ok_or(DbError::CursorNotFound(cursor_id))?;
        let mut state = entry.try_lock().ok_or(DbError::CursorInUse(cursor_id))?;
        // the cursor may have been closed between lookup and lock
        if !self.table.read().contains_key(&cursor_id) {
            return Err(DbError::CursorNotFound(cursor_id));
        }
        state.last_used = Instant::now();

        let requested = match batch_size {
            Some(b) if b > 0 => b,
            // explicit 0 means server default, not the negotiated size
            Some(_) => DEFAULT_BATCH_SIZE,
            None => state.batch_size,
        };
        let n = state.remaining.map_or(requested, |r| requested.min(r));
        let docs = state.eval.take(usize::try_from(n).unwrap_or(usize::MAX));
        if let Some(r) = state.remaining.as_mut() {
            *r -= docs.len() as i64;
        }

        let exhausted = state.remaining == Some(0) || state.eval.is_drained();
        if exhausted {
            let collection = state.collection.clone();
            drop(state);
            self.table.write().remove(&cursor_id);
            log::debug!("cursor {cursor_id} exhausted on {collection}");
            return Ok(Batch { cursor_id: 0, docs });
        }
        Ok(Batch { cursor_id, docs })
    }

    /// Closes a cursor, freeing its iteration state. Idempotent: closing an
    /// unknown or already-closed id is a no-op.
    ///
    /// # Errors
    /// `CursorInUse` when a call on the same cursor is in flight; the cursor
    /// stays open and the caller may retry once that call completes.
    pub fn close(&self, cursor_id: i64) -> Result<(), DbError> {
        let Some(entry) = self.table.read().get(&cursor_id).cloned() else {
            return Ok(());
        };
        let _state = entry.try_lock().ok_or(DbError::CursorInUse(cursor_id))?;
        if self.table.write().remove(&cursor_id).is_some() {
            log::debug!("cursor {cursor_id} closed");
        }
        Ok(())
    }

    /// Reaps cursors idle longer than `max_idle`. Same terminal transition as
    /// an explicit close. Cursors with a call in flight are left alone.
    pub fn reap_idle(&self, max_idle: Duration) -> usize {
        let now = Instant::now();
        let mut table = self.table.write();
        let before = table.len();
        table.retain(|id, entry| match entry.try_lock() {
            Some(state) => {
                let keep = now.duration_since(state.last_used) <= max_idle;
                if !keep {
                    log::debug!("cursor {id} reaped after idle timeout");
                }
                keep
            }
            None => true,
        });
        before - table.len()
    }

    #[must_use]
    pub fn open_cursors(&self) -> usize {
        self.table.read().len()
    }
}
