use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use super::error::{FileError, FileResult};
use super::{FileId, PAGE_SIZE, PageId};

/// Page-granular I/O over one file per relation.
///
/// Every call opens the backing file, does its work and drops the handle
/// before returning, so no descriptor outlives a single operation.
#[derive(Debug, Clone)]
pub struct DiskManager {
    base_dir: PathBuf,
}

impl DiskManager {
    /// Create a disk manager rooted at `base_dir`
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
        }
    }

    /// Storage directory holding the relation files
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// File name for a relation file: `Data_<file_id>.rf`
    pub fn file_name(file_id: FileId) -> String {
        format!("Data_{}.rf", file_id)
    }

    /// Inverse of [`DiskManager::file_name`]
    pub fn parse_file_name(name: &str) -> FileResult<FileId> {
        let id = name
            .strip_prefix("Data_")
            .and_then(|rest| rest.strip_suffix(".rf"))
            .ok_or_else(|| FileError::InvalidFileId(name.to_string()))?;
        id.parse()
    }

    /// Full path of a relation file
    pub fn file_path(&self, file_id: FileId) -> PathBuf {
        self.base_dir.join(Self::file_name(file_id))
    }

    /// Create the (empty) backing file for `file_id`
    pub fn create_file(&self, file_id: FileId) -> FileResult<()> {
        let path = self.file_path(file_id);

        fs::create_dir_all(&self.base_dir)?;

        // create_new refuses to clobber an existing file atomically
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(_) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                Err(FileError::FileAlreadyExists(path.display().to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Check whether the backing file for `file_id` exists
    pub fn file_exists(&self, file_id: FileId) -> bool {
        self.file_path(file_id).is_file()
    }

    /// All relation files present in the storage directory, sorted by id
    pub fn list_files(&self) -> FileResult<Vec<FileId>> {
        let mut ids = Vec::new();
        if !self.base_dir.exists() {
            return Ok(ids);
        }

        for entry in fs::read_dir(&self.base_dir)? {
            let name = entry?.file_name();
            if let Some(name) = name.to_str()
                && let Ok(id) = Self::parse_file_name(name)
            {
                ids.push(id);
            }
        }
        ids.sort();
        Ok(ids)
    }

    /// Number of whole pages in a relation file
    pub fn page_count(&self, file_id: FileId) -> FileResult<u32> {
        let file = self.open(file_id, false)?;
        Self::pages_in(&file)
    }

    /// Append one zeroed page to the file and return its id.
    ///
    /// The new page gets index [`DiskManager::page_count`]. A torn trailing
    /// partial page is discarded and overwritten by the new page.
    pub fn append_page(&self, file_id: FileId) -> FileResult<PageId> {
        let file = self.open(file_id, true)?;
        let index = Self::pages_in(&file)?;

        let start = index as u64 * PAGE_SIZE as u64;
        // Truncate first so the torn bytes are zero-filled by the extension
        file.set_len(start)?;
        file.set_len(start + PAGE_SIZE as u64)?;

        Ok(PageId::new(file_id, index))
    }

    /// Read one page into `buffer`, which must be exactly `PAGE_SIZE` bytes
    pub fn read_page(&self, pid: PageId, buffer: &mut [u8]) -> FileResult<()> {
        Self::check_buffer(buffer.len())?;

        let mut file = self.open(pid.file_id, false)?;
        let page_count = Self::pages_in(&file)?;
        if pid.index >= page_count {
            return Err(FileError::PageOutOfRange {
                page: pid,
                page_count,
            });
        }

        file.seek(SeekFrom::Start(pid.offset()))?;
        file.read_exact(buffer)?;
        Ok(())
    }

    /// Overwrite one whole page with `buffer`
    pub fn write_page(&self, pid: PageId, buffer: &[u8]) -> FileResult<()> {
        Self::check_buffer(buffer.len())?;

        let mut file = self.open(pid.file_id, true)?;
        let page_count = Self::pages_in(&file)?;
        if pid.index >= page_count {
            return Err(FileError::PageOutOfRange {
                page: pid,
                page_count,
            });
        }

        file.seek(SeekFrom::Start(pid.offset()))?;
        file.write_all(buffer)?;
        Ok(())
    }

    fn open(&self, file_id: FileId, write: bool) -> FileResult<File> {
        let path = self.file_path(file_id);
        OpenOptions::new()
            .read(true)
            .write(write)
            .open(&path)
            .map_err(|e| match e.kind() {
                io::ErrorKind::NotFound => FileError::FileNotFound(path.display().to_string()),
                _ => FileError::Io(e),
            })
    }

    fn pages_in(file: &File) -> FileResult<u32> {
        Ok((file.metadata()?.len() / PAGE_SIZE as u64) as u32)
    }

    fn check_buffer(len: usize) -> FileResult<()> {
        if len != PAGE_SIZE {
            return Err(FileError::InvalidBuffer {
                expected: PAGE_SIZE,
                actual: len,
            });
        }
        Ok(())
    }
}
