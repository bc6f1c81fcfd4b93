mod buffer_manager;
mod disk_manager;
mod error;

pub use buffer_manager::BufferManager;
pub use disk_manager::DiskManager;
pub use error::{FileError, FileResult};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Page size in bytes (4KB)
pub const PAGE_SIZE: usize = 4096;

/// Number of frames in the buffer pool
pub const BUFFER_POOL_SIZE: usize = 2;

/// Separator token between the textual fields of a header page
pub const DATA_SEP: &str = ";";

/// Name of the catalog snapshot inside the storage directory
pub const CATALOG_FILE_NAME: &str = "Catalog.def";

/// Identifier of a relation's backing file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileId(u32);

impl FileId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<i64> for FileId {
    type Error = FileError;

    fn try_from(raw: i64) -> FileResult<Self> {
        u32::try_from(raw)
            .map(FileId)
            .map_err(|_| FileError::InvalidFileId(raw.to_string()))
    }
}

impl FromStr for FileId {
    type Err = FileError;

    fn from_str(s: &str) -> FileResult<Self> {
        // Only plain decimal digits: no sign, no whitespace
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(FileError::InvalidFileId(s.to_string()));
        }
        s.parse::<u32>()
            .map(FileId)
            .map_err(|_| FileError::InvalidFileId(s.to_string()))
    }
}

/// Page address: backing file plus page index within it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageId {
    pub file_id: FileId,
    pub index: u32,
}

impl PageId {
    pub fn new(file_id: FileId, index: u32) -> Self {
        Self { file_id, index }
    }

    /// Page 0 of a relation file is always its header page
    pub fn header(file_id: FileId) -> Self {
        Self { file_id, index: 0 }
    }

    /// Byte offset of this page inside its file
    pub fn offset(&self) -> u64 {
        self.index as u64 * PAGE_SIZE as u64
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file_id, self.index)
    }
}
