use std::io;
use thiserror::Error;

use super::PageId;

#[derive(Debug, Error)]
pub enum FileError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid file id: {0}")]
    InvalidFileId(String),

    #[error("File already exists: {0}")]
    FileAlreadyExists(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Invalid buffer: expected {expected} bytes, got {actual}")]
    InvalidBuffer { expected: usize, actual: usize },

    #[error("Page out of range: {page} (file has {page_count} pages)")]
    PageOutOfRange { page: PageId, page_count: u32 },

    #[error("Page not cached: {0}")]
    PageNotCached(PageId),

    #[error("Pin count underflow on page {0}")]
    PinUnderflow(PageId),

    #[error("Buffer pool exhausted: all {capacity} frames are pinned")]
    PoolExhausted { capacity: usize },
}

pub type FileResult<T> = Result<T, FileError>;
