use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    #[error("Invalid sort: {0}")]
    InvalidSort(String),

    #[error("Cursor not found: {0}")]
    CursorNotFound(i64),

    #[error("Cursor in use: {0}")]
    CursorInUse(i64),

    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    #[error("Collection not found: {0}")]
    NoSuchCollection(String),
}
