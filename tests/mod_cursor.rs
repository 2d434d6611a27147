use bson::doc;
use cursorlite::collection::Collection;
use cursorlite::cursor::{CursorManager, DEFAULT_BATCH_SIZE};
use cursorlite::errors::DbError;
use cursorlite::query::Filter;
use std::sync::Arc;

fn seeded(n: i32) -> Arc<Collection> {
    let col = Arc::new(Collection::new("items".into()));
    let docs = (1..=n).map(|i| doc! {"_id": i}).collect();
    col.insert_many(docs).unwrap();
    col
}

fn batch_ids(docs: &[bson::Document]) -> Vec<i32> {
    docs.iter().map(|d| d.get_i32("_id").unwrap()).collect()
}

#[test]
fn default_batch_size_paginates() {
    let col = seeded(250);
    let mgr = CursorManager::new();
    let first = mgr.open_find(&col, &Filter::True, None, 0, 0, 0);
    assert_eq!(first.docs.len(), usize::try_from(DEFAULT_BATCH_SIZE).unwrap());
    assert_ne!(first.cursor_id, 0);

    let second = mgr.get_more(first.cursor_id, None).unwrap();
    assert_eq!(second.docs.len(), 101);
    assert_eq!(second.cursor_id, first.cursor_id);

    let third = mgr.get_more(first.cursor_id, None).unwrap();
    assert_eq!(third.docs.len(), 48);
    assert_eq!(third.cursor_id, 0);
    assert_eq!(mgr.open_cursors(), 0);
}

#[test]
fn result_fitting_first_batch_leaves_no_cursor() {
    let col = seeded(5);
    let mgr = CursorManager::new();
    let batch = mgr.open_find(&col, &Filter::True, None, 0, 0, 10);
    assert_eq!(batch.cursor_id, 0);
    assert_eq!(batch.docs.len(), 5);
    assert_eq!(mgr.open_cursors(), 0);
}

#[test]
fn exactly_full_first_batch_keeps_cursor_until_empty_getmore() {
    let col = seeded(4);
    let mgr = CursorManager::new();
    let first = mgr.open_find(&col, &Filter::True, None, 0, 0, 4);
    assert_eq!(first.docs.len(), 4);
    assert_ne!(first.cursor_id, 0);
    let next = mgr.get_more(first.cursor_id, None).unwrap();
    assert!(next.docs.is_empty());
    assert_eq!(next.cursor_id, 0);
}

#[test]
fn limit_bookkeeping_across_batches() {
    let col = seeded(20);
    let mgr = CursorManager::new();
    let first = mgr.open_find(&col, &Filter::True, None, 0, 5, 2);
    assert_eq!(batch_ids(&first.docs), vec![1, 2]);
    let b2 = mgr.get_more(first.cursor_id, None).unwrap();
    assert_eq!(batch_ids(&b2.docs), vec![3, 4]);
    assert_ne!(b2.cursor_id, 0);
    let b3 = mgr.get_more(first.cursor_id, None).unwrap();
    assert_eq!(batch_ids(&b3.docs), vec![5]);
    assert_eq!(b3.cursor_id, 0);
}

#[test]
fn per_call_batch_size_overrides_negotiated() {
    let col = seeded(20);
    let mgr = CursorManager::new();
    let first = mgr.open_find(&col, &Filter::True, None, 0, 0, 3);
    assert_eq!(first.docs.len(), 3);
    let b2 = mgr.get_more(first.cursor_id, Some(10)).unwrap();
    assert_eq!(b2.docs.len(), 10);
    // override was for that call only
    let b3 = mgr.get_more(first.cursor_id, None).unwrap();
    assert_eq!(b3.docs.len(), 3);
}

#[test]
fn explicit_zero_batch_size_means_server_default() {
    let col = seeded(200);
    let mgr = CursorManager::new();
    let first = mgr.open_find(&col, &Filter::True, None, 0, 0, 3);
    assert_eq!(first.docs.len(), 3);
    let b2 = mgr.get_more(first.cursor_id, Some(0)).unwrap();
    assert_eq!(b2.docs.len(), usize::try_from(DEFAULT_BATCH_SIZE).unwrap());
    // absent still means the negotiated size
    let b3 = mgr.get_more(first.cursor_id, None).unwrap();
    assert_eq!(b3.docs.len(), 3);
}

#[test]
fn negative_limit_is_single_batch() {
    let col = seeded(20);
    let mgr = CursorManager::new();
    let batch = mgr.open_find(&col, &Filter::True, None, 0, -7, 2);
    assert_eq!(batch.docs.len(), 7);
    assert_eq!(batch.cursor_id, 0);
    assert_eq!(mgr.open_cursors(), 0);
}

#[test]
fn getmore_on_unknown_cursor_fails() {
    let mgr = CursorManager::new();
    assert!(matches!(mgr.get_more(42, None), Err(DbError::CursorNotFound(42))));
}

#[test]
fn getmore_after_exhaustion_fails() {
    let col = seeded(3);
    let mgr = CursorManager::new();
    let first = mgr.open_find(&col, &Filter::True, None, 0, 0, 2);
    let id = first.cursor_id;
    let last = mgr.get_more(id, None).unwrap();
    assert_eq!(last.cursor_id, 0);
    assert!(matches!(mgr.get_more(id, None), Err(DbError::CursorNotFound(_))));
}

#[test]
fn close_is_idempotent() {
    let col = seeded(10);
    let mgr = CursorManager::new();
    let first = mgr.open_find(&col, &Filter::True, None, 0, 0, 2);
    let id = first.cursor_id;
    mgr.close(id).unwrap();
    mgr.close(id).unwrap();
    assert!(matches!(mgr.get_more(id, None), Err(DbError::CursorNotFound(_))));
    mgr.close(9999).unwrap();
}

#[test]
fn idle_cursors_are_reaped() {
    let col = seeded(10);
    let mgr = CursorManager::new();
    let first = mgr.open_find(&col, &Filter::True, None, 0, 0, 2);
    std::thread::sleep(std::time::Duration::from_millis(10));
    let reaped = mgr.reap_idle(std::time::Duration::from_millis(1));
    assert_eq!(reaped, 1);
    assert!(matches!(mgr.get_more(first.cursor_id, None), Err(DbError::CursorNotFound(_))));
}

#[test]
fn fresh_cursors_survive_reaping() {
    let col = seeded(10);
    let mgr = CursorManager::new();
    let first = mgr.open_find(&col, &Filter::True, None, 0, 0, 2);
    assert_eq!(mgr.reap_idle(std::time::Duration::from_secs(60)), 0);
    assert!(mgr.get_more(first.cursor_id, None).is_ok());
}

#[test]
fn concurrent_getmore_on_distinct_cursors() {
    let col = seeded(100);
    let mgr = Arc::new(CursorManager::new());
    let mut ids = Vec::new();
    for _ in 0..4 {
        let b = mgr.open_find(&col, &Filter::True, None, 0, 0, 5);
        ids.push(b.cursor_id);
    }
    let handles: Vec<_> = ids
        .into_iter()
        .map(|id| {
            let mgr = mgr.clone();
            std::thread::spawn(move || {
                let mut total = 5usize; // first batch
                let mut cursor_id = id;
                while cursor_id != 0 {
                    let b = mgr.get_more(cursor_id, None).unwrap();
                    total += b.docs.len();
                    cursor_id = b.cursor_id;
                }
                total
            })
        })
        .collect();
    for h in handles {
        assert_eq!(h.join().unwrap(), 100);
    }
    assert_eq!(mgr.open_cursors(), 0);
}

#[test]
fn cursor_ids_are_unique_and_nonzero() {
    let col = seeded(50);
    let mgr = CursorManager::new();
    let a = mgr.open_find(&col, &Filter::True, None, 0, 0, 5).cursor_id;
    let b = mgr.open_find(&col, &Filter::True, None, 0, 0, 5).cursor_id;
    assert_ne!(a, 0);
    assert_ne!(b, 0);
    assert_ne!(a, b);
}
