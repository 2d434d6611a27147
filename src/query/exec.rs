use std::sync::Arc;

use crate::collection::Collection;
use crate::document::Document;

use super::eval::{compare_docs, eval_filter};
use super::types::{Filter, MAX_SORT_FIELDS, SortSpec};

/// A checkpointed result sequence: the ordered output of one logical query,
/// consumed batch by batch. The position is the cursor's resume point.
pub struct Evaluation {
    docs: Vec<Document>,
    pos: usize,
}

impl Evaluation {
    /// Yields up to `n` documents and advances the checkpoint.
    pub fn take(&mut self, n: usize) -> Vec<bson::Document> {
        let end = self.pos.saturating_add(n).min(self.docs.len());
        let out = self.docs[self.pos..end].iter().map(|d| d.data.clone()).collect();
        self.pos = end;
        out
    }

    #[must_use]
    pub fn remaining(&self) -> usize {
        self.docs.len() - self.pos
    }

    #[must_use]
    pub fn is_drained(&self) -> bool {
        self.pos >= self.docs.len()
    }
}

/// Runs filter, sort, skip and limit against a collection scan.
///
/// Sorting is stable, so equal keys keep insertion order. A positive `limit`
/// caps the sequence; a negative `limit` caps it at `|limit|` (the caller
/// treats that as single-batch and never persists a cursor); 0 is unbounded.
#[must_use]
pub fn evaluate(
    col: &Arc<Collection>,
    filter: &Filter,
    sort: Option<&[SortSpec]>,
    skip: u64,
    limit: i64,
) -> Evaluation {
    let mut docs: Vec<Document> =
        col.scan().into_iter().filter(|d| eval_filter(&d.data, filter)).collect();

    if let Some(sort) = sort {
        if sort.len() > MAX_SORT_FIELDS {
            log::warn!("sort spec too long ({} fields), extra fields ignored", sort.len());
        }
        docs.sort_by(|a, b| compare_docs(&a.data, &b.data, sort));
    }

    let skip = usize::try_from(skip).unwrap_or(usize::MAX);
    if skip > 0 {
        docs = if skip >= docs.len() { Vec::new() } else { docs.split_off(skip) };
    }

    if limit != 0 {
        let cap = usize::try_from(limit.unsigned_abs()).unwrap_or(usize::MAX);
        docs.truncate(cap);
    }

    log::debug!("evaluate collection={} matched={}", col.name(), docs.len());
    Evaluation { docs, pos: 0 }
}
