use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::catalog::{CatalogError, DbDef, RelDef};
use crate::file::{BufferManager, DiskManager, FileError};
use crate::record::{ColumnType, HeapFile, Record, RecordError, RecordId, RelSchema, Value};


#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Relation {0} already exists")]
    RelationExists(String),

    #[error("Relation {0} not found")]
    RelationNotFound(String),

    #[error("Cannot read/write file: {0}")]
    IoError(#[from] io::Error),

    #[error("Catalog error: {0}")]
    CatalogError(#[from] CatalogError),

    #[error("Record error: {0}")]
    RecordError(#[from] RecordError),

    #[error("File error: {0}")]
    FileError(#[from] FileError),
}

pub type DatabaseResult<T> = Result<T, DatabaseError>;

/// Entry point of the storage engine: the relation catalog plus one heap
/// file per relation, sharing a single buffer pool.
pub struct GlobalManager {
    data_dir: PathBuf,
    dbdef: DbDef,
    /// Same order as `dbdef.relations()`
    files: Vec<HeapFile>,
    buffer: BufferManager,
}

impl GlobalManager {
    /// Open the storage directory, loading the catalog snapshot if there is one
    pub fn open<P: AsRef<Path>>(data_dir: P) -> DatabaseResult<Self> {
        Self::open_with_pool_size(data_dir, crate::file::BUFFER_POOL_SIZE)
    }

    /// Like [`GlobalManager::open`] with a buffer pool of `frames` pages
    pub fn open_with_pool_size<P: AsRef<Path>>(
        data_dir: P,
        frames: usize,
    ) -> DatabaseResult<Self> {
        let data_dir = data_dir.as_ref().to_path_buf();
        fs::create_dir_all(&data_dir)?;

        let disk = DiskManager::new(&data_dir);
        let dbdef = Self::load_catalog(&data_dir, &disk);
        let files = dbdef
            .relations()
            .iter()
            .cloned()
            .map(HeapFile::new)
            .collect();

        Ok(Self {
            data_dir,
            dbdef,
            files,
            buffer: BufferManager::with_capacity(disk, frames),
        })
    }

    /// A missing or unusable snapshot means an empty catalog
    fn load_catalog(data_dir: &Path, disk: &DiskManager) -> DbDef {
        let dbdef = match DbDef::load(data_dir) {
            Ok(dbdef) => dbdef,
            Err(CatalogError::IoError(e)) if e.kind() == io::ErrorKind::NotFound => {
                return DbDef::new();
            }
            Err(e) => {
                eprintln!("{}", Self::fallback_message(data_dir, disk, &e.to_string()));
                return DbDef::new();
            }
        };

        if let Some(rel) = dbdef
            .relations()
            .iter()
            .find(|rel| !disk.file_exists(rel.file_id()))
        {
            let reason = format!(
                "file {} of relation {} is missing",
                DiskManager::file_name(rel.file_id()),
                rel.name()
            );
            eprintln!("{}", Self::fallback_message(data_dir, disk, &reason));
            return DbDef::new();
        }
        dbdef
    }

    /// Warning for an ignored snapshot, naming leftover relation files.
    /// File ids restart at 0, so each leftover blocks one `create_relation`.
    fn fallback_message(data_dir: &Path, disk: &DiskManager, reason: &str) -> String {
        let mut message = format!(
            "Ignoring catalog snapshot in {}: {}",
            data_dir.display(),
            reason
        );

        match disk.list_files() {
            Ok(stale) if !stale.is_empty() => {
                let names: Vec<String> = stale.into_iter().map(DiskManager::file_name).collect();
                message.push_str(&format!(
                    "; existing relation files will block new relations until removed: {}",
                    names.join(", ")
                ));
            }
            Ok(_) => {}
            Err(e) => message.push_str(&format!("; cannot list relation files: {}", e)),
        }
        message
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn dbdef(&self) -> &DbDef {
        &self.dbdef
    }

    pub fn relations(&self) -> &[RelDef] {
        self.dbdef.relations()
    }

    pub fn relation(&self, name: &str) -> Option<&RelDef> {
        self.dbdef.get(name)
    }

    pub fn buffer_manager(&self) -> &BufferManager {
        &self.buffer
    }

    /// Register a relation, create its file and write its header page
    pub fn create_relation(
        &mut self,
        name: &str,
        column_count: usize,
        column_types: &[ColumnType],
    ) -> DatabaseResult<RelDef> {
        if self.dbdef.position(name).is_some() {
            return Err(DatabaseError::RelationExists(name.to_string()));
        }

        let schema = RelSchema::new(name, column_count, column_types.to_vec())?;
        let rel_def = RelDef::new(self.dbdef.next_file_id(), schema)?;

        self.buffer.disk().create_file(rel_def.file_id())?;
        let heap_file = HeapFile::new(rel_def.clone());
        heap_file.create_header(&mut self.buffer)?;

        self.dbdef.add_relation(rel_def.clone())?;
        self.files.push(heap_file);
        Ok(rel_def)
    }

    /// Insert typed values into relation `relation_name`
    pub fn insert(&mut self, relation_name: &str, values: Vec<Value>) -> DatabaseResult<RecordId> {
        let heap_file = &self.files[self.relation_index(relation_name)?];
        let record = Record::for_schema(heap_file.schema(), values)?;
        Ok(heap_file.insert_record(&mut self.buffer, &record)?)
    }

    /// Insert textual values, parsing each one for its column's type
    pub fn insert_text<S: AsRef<str>>(
        &mut self,
        relation_name: &str,
        values: &[S],
    ) -> DatabaseResult<RecordId> {
        let schema = self.files[self.relation_index(relation_name)?].schema();
        if values.len() != schema.column_count() {
            return Err(RecordError::ArityMismatch {
                expected: schema.column_count(),
                actual: values.len(),
            }
            .into());
        }

        let parsed = values
            .iter()
            .zip(schema.column_types())
            .map(|(text, ct)| Value::parse(text.as_ref(), ct))
            .collect::<Result<Vec<_>, _>>()?;
        self.insert(relation_name, parsed)
    }

    /// Every record of a relation, in storage order
    pub fn scan(&mut self, relation_name: &str) -> DatabaseResult<Vec<(RecordId, Record)>> {
        let heap_file = &self.files[self.relation_index(relation_name)?];
        Ok(heap_file.scan(&mut self.buffer)?)
    }

    /// Persist the catalog snapshot and write back all dirty pages
    pub fn checkpoint(&mut self) -> DatabaseResult<()> {
        self.buffer.flush_all()?;
        self.dbdef.save(&self.data_dir)?;
        Ok(())
    }

    /// Checkpoint and shut down
    pub fn close(mut self) -> DatabaseResult<()> {
        self.checkpoint()
    }

    /// First relation called `name`, looked up in creation order
    fn relation_index(&self, name: &str) -> DatabaseResult<usize> {
        self.dbdef
            .position(name)
            .filter(|&idx| idx < self.files.len())
            .ok_or_else(|| DatabaseError::RelationNotFound(name.to_string()))
    }
}
