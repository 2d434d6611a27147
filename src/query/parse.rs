use bson::{Bson, Document as BsonDocument};

use crate::errors::DbError;

use super::types::{CmpOp, Filter, MAX_IN_SET, Order, SortSpec};

/// Parses a wire-shaped filter document into a predicate tree.
///
/// `{}` matches everything; `{f: v}` is an implicit `$eq`; a value document
/// whose keys are all operators (`{f: {"$gt": v}}`) applies those operators to
/// the field; multiple top-level entries are an implicit `$and`.
///
/// # Errors
/// `DbError::InvalidFilter` on unknown operators or malformed combinator
/// arguments; nothing is evaluated against the store before parsing succeeds.
pub fn parse_filter(doc: &BsonDocument) -> Result<Filter, DbError> {
    let mut clauses = Vec::new();
    for (key, value) in doc.clone() {
        clauses.push(parse_clause(&key, value)?);
    }
    Ok(match clauses.len() {
        0 => Filter::True,
        1 => clauses.remove(0),
        _ => Filter::And(clauses),
    })
}

fn parse_clause(key: &str, value: Bson) -> Result<Filter, DbError> {
    match key {
        "$and" => Ok(Filter::And(parse_branch_list(key, value)?)),
        "$or" => Ok(Filter::Or(parse_branch_list(key, value)?)),
        "$not" => match value {
            Bson::Document(d) => Ok(Filter::Not(Box::new(parse_filter(&d)?))),
            other => Err(DbError::InvalidFilter(format!("$not takes a document, got {other:?}"))),
        },
        k if k.starts_with('$') => {
            Err(DbError::InvalidFilter(format!("unknown top-level operator {k}")))
        }
        field => parse_field(field, value),
    }
}

fn parse_branch_list(op: &str, value: Bson) -> Result<Vec<Filter>, DbError> {
    let Bson::Array(items) = value else {
        return Err(DbError::InvalidFilter(format!("{op} takes an array of documents")));
    };
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        let Bson::Document(d) = item else {
            return Err(DbError::InvalidFilter(format!("{op} entries must be documents")));
        };
        out.push(parse_filter(&d)?);
    }
    Ok(out)
}

fn parse_field(field: &str, value: Bson) -> Result<Filter, DbError> {
    let Bson::Document(ops) = value else {
        return Ok(Filter::Cmp { path: field.to_string(), op: CmpOp::Eq, value });
    };
    if !ops.keys().any(|k| k.starts_with('$')) {
        // plain subdocument value: exact equality on the whole thing
        return Ok(Filter::Cmp {
            path: field.to_string(),
            op: CmpOp::Eq,
            value: Bson::Document(ops),
        });
    }
    let mut clauses = Vec::new();
    for (op, operand) in ops {
        let path = field.to_string();
        let clause = match op.as_str() {
            "$eq" => Filter::Cmp { path, op: CmpOp::Eq, value: operand },
            "$ne" => Filter::Cmp { path, op: CmpOp::Ne, value: operand },
            "$gt" => Filter::Cmp { path, op: CmpOp::Gt, value: operand },
            "$gte" => Filter::Cmp { path, op: CmpOp::Gte, value: operand },
            "$lt" => Filter::Cmp { path, op: CmpOp::Lt, value: operand },
            "$lte" => Filter::Cmp { path, op: CmpOp::Lte, value: operand },
            "$in" => Filter::In { path, values: operand_set("$in", operand)? },
            "$nin" => Filter::Nin { path, values: operand_set("$nin", operand)? },
            "$exists" => match operand {
                Bson::Boolean(exists) => Filter::Exists { path, exists },
                other => {
                    return Err(DbError::InvalidFilter(format!(
                        "$exists takes a boolean, got {other:?}"
                    )));
                }
            },
            unknown => {
                return Err(DbError::InvalidFilter(format!(
                    "unknown operator {unknown} on field {field}"
                )));
            }
        };
        clauses.push(clause);
    }
    Ok(if clauses.len() == 1 { clauses.remove(0) } else { Filter::And(clauses) })
}

fn operand_set(op: &str, operand: Bson) -> Result<Vec<Bson>, DbError> {
    match operand {
        Bson::Array(values) => Ok(values.into_iter().take(MAX_IN_SET).collect()),
        other => Err(DbError::InvalidFilter(format!("{op} takes an array, got {other:?}"))),
    }
}

/// Parses a `{field: 1 | -1, ...}` sort document.
///
/// # Errors
/// `DbError::InvalidSort` when a direction is anything other than 1 or -1.
pub fn parse_sort(doc: &BsonDocument) -> Result<Vec<SortSpec>, DbError> {
    let mut out = Vec::new();
    for (field, direction) in doc.clone() {
        let order = match direction {
            Bson::Int32(1) | Bson::Int64(1) => Some(Order::Asc),
            Bson::Int32(-1) | Bson::Int64(-1) => Some(Order::Desc),
            Bson::Double(d) if d == 1.0 => Some(Order::Asc),
            Bson::Double(d) if d == -1.0 => Some(Order::Desc),
            _ => None,
        };
        match order {
            Some(order) => out.push(SortSpec { field, order }),
            None => {
                return Err(DbError::InvalidSort(format!(
                    "sort direction for {field} must be 1 or -1, got {direction:?}"
                )));
            }
        }
    }
    Ok(out)
}
