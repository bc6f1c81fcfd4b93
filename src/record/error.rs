use crate::file::FileError;
use thiserror::Error;

use super::record::RecordId;

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("File error: {0}")]
    File(#[from] FileError),

    #[error("Invalid column type: {0}")]
    InvalidColumnType(String),

    #[error("Arity mismatch: expected {expected} values, got {actual}")]
    ArityMismatch { expected: usize, actual: usize },

    #[error("Type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },

    #[error("Record size {record_size} does not fit a {page_size}-byte page")]
    RecordTooLarge { record_size: usize, page_size: usize },

    #[error("Header page full: {needed} bytes needed, page holds {page_size}")]
    HeaderPageFull { needed: usize, page_size: usize },

    #[error("Corrupt page: {0}")]
    CorruptPage(String),

    #[error("Invalid slot: {0:?}")]
    InvalidSlot(RecordId),
}

pub type RecordResult<T> = Result<T, RecordError>;
