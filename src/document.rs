use bson::{Bson, Document as BsonDocument};
use serde::{Deserialize, Serialize};

/// Field holding a document's unique identifier.
pub const ID_FIELD: &str = "_id";

/// A stored document. The `_id` field lives inside the payload; one is
/// assigned on construction if the caller omitted it.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Document {
    pub data: BsonDocument,
}

impl Document {
    #[must_use]
    pub fn new(data: BsonDocument) -> Self {
        if data.contains_key(ID_FIELD) {
            return Self { data };
        }
        // Assigned ids go first so scans show them in the usual position.
        let mut with_id = BsonDocument::new();
        with_id.insert(ID_FIELD, Bson::ObjectId(bson::oid::ObjectId::new()));
        for (k, v) in data {
            with_id.insert(k, v);
        }
        Self { data: with_id }
    }

    #[must_use]
    pub fn id(&self) -> &Bson {
        self.data.get(ID_FIELD).unwrap_or(&Bson::Null)
    }
}

/// Hashable form of an `_id` value, used by the store's uniqueness index.
/// Numeric ids collapse to one key: `{_id: 1}`, `{_id: 1i64}` and `{_id: 1.0}`
/// all collide, matching comparison semantics in `query::eval`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IdKey {
    Null,
    Bool(bool),
    Int(i64),
    Double(u64),
    String(String),
    ObjectId(bson::oid::ObjectId),
    Array(Vec<IdKey>),
    Doc(Vec<(String, IdKey)>),
    Opaque(String),
}

impl IdKey {
    #[must_use]
    pub fn from_bson(v: &Bson) -> Self {
        match v {
            Bson::Null => Self::Null,
            Bson::Boolean(b) => Self::Bool(*b),
            Bson::Int32(i) => Self::Int(i64::from(*i)),
            Bson::Int64(i) => Self::Int(*i),
            #[allow(clippy::cast_possible_truncation)]
            Bson::Double(f) => {
                if f.fract() == 0.0 && f.is_finite() && f.abs() < 9.0e18 {
                    Self::Int(*f as i64)
                } else {
                    Self::Double(f.to_bits())
                }
            }
            Bson::String(s) => Self::String(s.clone()),
            Bson::ObjectId(oid) => Self::ObjectId(*oid),
            Bson::Array(items) => Self::Array(items.iter().map(Self::from_bson).collect()),
            Bson::Document(d) => Self::Doc(
                d.clone().into_iter().map(|(k, v)| (k, Self::from_bson(&v))).collect(),
            ),
            other => Self::Opaque(format!("{other:?}")),
        }
    }
}
