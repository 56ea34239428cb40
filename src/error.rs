use thiserror::Error;

use crate::attribute::AttrId;
use crate::kind::AttrKind;

#[derive(Error, Debug)]
pub enum AttrError {
    #[error("Operation '{op}' is not supported for {kind} attributes")]
    Unsupported { kind: AttrKind, op: &'static str },
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Cannot convert to {requested}: actual value is {actual} ({rendered})")]
    Conversion {
        requested: AttrKind,
        actual: String,
        rendered: String,
    },
    #[error("Duplicate attribute key: {0}")]
    Duplicate(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Version conflict on attribute {id}: version {expected} is stale")]
    VersionConflict { id: AttrId, expected: i64 },
    #[error("Data corruption: {message}")]
    Corruption { message: String },
    #[error("Persistence error: {0}")]
    Persistence(String),
    #[error("Lock poisoned: {0}")]
    Lock(String),
    #[error("Config error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, AttrError>;

// Helper conversions
impl From<rusqlite::Error> for AttrError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Persistence(e.to_string())
    }
}
