use bson::{Bson, Document as BsonDocument};
use std::cmp::Ordering;

use super::types::{CmpOp, Filter, MAX_PATH_DEPTH, MAX_SORT_FIELDS, Order, SortSpec};

pub fn eval_filter(doc: &BsonDocument, filter: &Filter) -> bool {
    match filter {
        Filter::True => true,
        Filter::And(fs) => fs.iter().all(|f| eval_filter(doc, f)),
        Filter::Or(fs) => fs.iter().any(|f| eval_filter(doc, f)),
        Filter::Not(f) => !eval_filter(doc, f),
        Filter::Exists { path, exists } => get_path(doc, path).is_some() == *exists,
        Filter::In { path, values } => {
            get_path(doc, path).is_some_and(|v| values.iter().any(|x| values_equal(v, x)))
        }
        Filter::Nin { path, values } => {
            !get_path(doc, path).is_some_and(|v| values.iter().any(|x| values_equal(v, x)))
        }
        Filter::Cmp { path, op, value } => match get_path(doc, path) {
            Some(v) => match op {
                CmpOp::Eq => values_equal(v, value),
                CmpOp::Ne => !values_equal(v, value),
                CmpOp::Gt => compare_bson(v, value) == Ordering::Greater,
                CmpOp::Gte => compare_bson(v, value) != Ordering::Less,
                CmpOp::Lt => compare_bson(v, value) == Ordering::Less,
                CmpOp::Lte => compare_bson(v, value) != Ordering::Greater,
            },
            // a missing field only satisfies $ne
            None => matches!(op, CmpOp::Ne),
        },
    }
}

/// Comparison for a sort specification. Ties fall through to `Ordering::Equal`
/// and are broken by the caller's stable sort, i.e. by scan order.
pub fn compare_docs(a: &BsonDocument, b: &BsonDocument, sort: &[SortSpec]) -> Ordering {
    for s in sort.iter().take(MAX_SORT_FIELDS) {
        let ord = match (get_path(a, &s.field), get_path(b, &s.field)) {
            (Some(x), Some(y)) => compare_bson(x, y),
            (Some(_), None) => Ordering::Greater,
            (None, Some(_)) => Ordering::Less,
            (None, None) => Ordering::Equal,
        };
        if ord != Ordering::Equal {
            return if matches!(s.order, Order::Asc) { ord } else { ord.reverse() };
        }
    }
    Ordering::Equal
}

/// Equality with numeric coercion: `1i32 == 1i64 == 1.0`.
pub fn values_equal(a: &Bson, b: &Bson) -> bool {
    if is_numeric(a) && is_numeric(b) {
        return as_f64(a) == as_f64(b);
    }
    a == b
}

pub fn compare_bson(a: &Bson, b: &Bson) -> Ordering {
    if is_numeric(a) && is_numeric(b) {
        return as_f64(a).total_cmp(&as_f64(b));
    }
    match (a, b) {
        (Bson::String(x), Bson::String(y)) => x.cmp(y),
        (Bson::Boolean(x), Bson::Boolean(y)) => x.cmp(y),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

fn is_numeric(v: &Bson) -> bool {
    matches!(v, Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_))
}

#[allow(clippy::cast_precision_loss)]
fn as_f64(v: &Bson) -> f64 {
    match v {
        Bson::Int32(i) => f64::from(*i),
        Bson::Int64(i) => *i as f64,
        Bson::Double(f) => *f,
        _ => f64::NAN,
    }
}

// Cross-type ordering rank over the value set we store.
fn type_rank(v: &Bson) -> u8 {
    match v {
        Bson::Null => 0,
        Bson::Boolean(_) => 1,
        Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_) => 2,
        Bson::String(_) => 3,
        Bson::Array(_) => 4,
        Bson::Document(_) => 5,
        Bson::ObjectId(_) => 6,
        _ => 200,
    }
}

/// Resolves a dotted field path against nested documents.
pub fn get_path<'a>(doc: &'a BsonDocument, path: &str) -> Option<&'a Bson> {
    if path.is_empty() || path.len() > 1024 {
        return None;
    }
    let mut cur = doc;
    let mut parts = path.split('.').peekable();
    let mut depth = 0usize;
    while let Some(part) = parts.next() {
        depth += 1;
        if depth > MAX_PATH_DEPTH {
            return None;
        }
        if parts.peek().is_none() {
            return cur.get(part);
        }
        match cur.get(part) {
            Some(Bson::Document(d)) => cur = d,
            _ => return None,
        }
    }
    None
}
