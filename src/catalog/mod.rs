use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::file::{CATALOG_FILE_NAME, FileId, PAGE_SIZE};
use crate::record::{RecordError, RecordResult, RelSchema, slot_count_for};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Corrupt catalog: {0}")]
    CorruptCatalog(String),
}

pub type CatalogResult<T> = Result<T, CatalogError>;

/// Physical definition of one relation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelDef {
    file_id: FileId,
    record_size: usize,
    slot_count: usize,
    schema: RelSchema,
}

impl RelDef {
    /// Derive the physical layout of `schema` stored in file `file_id`
    pub fn new(file_id: FileId, schema: RelSchema) -> RecordResult<Self> {
        let record_size = schema.record_size();
        let slot_count = slot_count_for(record_size);
        if slot_count == 0 {
            return Err(RecordError::RecordTooLarge {
                record_size,
                page_size: PAGE_SIZE,
            });
        }

        Ok(Self {
            file_id,
            record_size,
            slot_count,
            schema,
        })
    }

    pub fn file_id(&self) -> FileId {
        self.file_id
    }

    pub fn schema(&self) -> &RelSchema {
        &self.schema
    }

    pub fn name(&self) -> &str {
        self.schema.name()
    }

    pub fn record_size(&self) -> usize {
        self.record_size
    }

    pub fn slot_count(&self) -> usize {
        self.slot_count
    }
}

/// Catalog state: every relation in creation order plus the id allocator
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DbDef {
    next_file_id: u32,
    relations: Vec<RelDef>,
}

impl DbDef {
    pub fn new() -> Self {
        Self::default()
    }

    /// File id the next relation will receive
    pub fn next_file_id(&self) -> FileId {
        FileId::new(self.next_file_id)
    }

    pub fn relations(&self) -> &[RelDef] {
        &self.relations
    }

    /// Index of the first relation called `name`
    pub fn position(&self, name: &str) -> Option<usize> {
        self.relations.iter().position(|r| r.name() == name)
    }

    pub fn get(&self, name: &str) -> Option<&RelDef> {
        self.position(name).map(|idx| &self.relations[idx])
    }

    /// Append a relation created with [`DbDef::next_file_id`]
    pub fn add_relation(&mut self, rel_def: RelDef) -> CatalogResult<()> {
        if rel_def.file_id() != self.next_file_id() {
            return Err(CatalogError::CorruptCatalog(format!(
                "relation {} uses file {} but next file id is {}",
                rel_def.name(),
                rel_def.file_id(),
                self.next_file_id
            )));
        }
        self.relations.push(rel_def);
        self.next_file_id += 1;
        Ok(())
    }

    /// Load the snapshot stored in `db_path`
    pub fn load(db_path: &Path) -> CatalogResult<Self> {
        let content = fs::read_to_string(db_path.join(CATALOG_FILE_NAME))?;
        let dbdef: DbDef = serde_json::from_str(&content)
            .map_err(|e| CatalogError::CorruptCatalog(e.to_string()))?;
        dbdef.validate()?;
        Ok(dbdef)
    }

    /// Write the snapshot into `db_path`, replacing any previous one
    pub fn save(&self, db_path: &Path) -> CatalogResult<()> {
        let content = serde_json::to_string_pretty(&self)?;
        fs::write(db_path.join(CATALOG_FILE_NAME), content)?;
        Ok(())
    }

    /// Check everything a snapshot can get wrong that serde does not catch
    pub fn validate(&self) -> CatalogResult<()> {
        let corrupt = |msg: String| Err(CatalogError::CorruptCatalog(msg));

        if self.next_file_id as usize != self.relations.len() {
            return corrupt(format!(
                "next file id {} but {} relations",
                self.next_file_id,
                self.relations.len()
            ));
        }

        let mut names = HashSet::new();
        for (idx, rel) in self.relations.iter().enumerate() {
            if rel.file_id.as_u32() as usize != idx {
                return corrupt(format!(
                    "relation {} at position {} has file id {}",
                    rel.name(),
                    idx,
                    rel.file_id
                ));
            }
            if !names.insert(rel.name()) {
                return corrupt(format!("duplicate relation {}", rel.name()));
            }

            // Rebuilding through the constructors re-derives every layout field
            let schema = RelSchema::new(
                rel.schema.name(),
                rel.schema.column_count(),
                rel.schema.column_types().to_vec(),
            )
            .map_err(|e| CatalogError::CorruptCatalog(e.to_string()))?;
            let expected = RelDef::new(rel.file_id, schema)
                .map_err(|e| CatalogError::CorruptCatalog(e.to_string()))?;
            if &expected != rel {
                return corrupt(format!(
                    "relation {} stores record size {} / {} slots, expected {} / {}",
                    rel.name(),
                    rel.record_size,
                    rel.slot_count,
                    expected.record_size,
                    expected.slot_count
                ));
            }
        }
        Ok(())
    }
}
