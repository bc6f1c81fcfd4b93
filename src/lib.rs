pub mod catalog;
pub mod database;
pub mod file;
pub mod record;

pub use catalog::{CatalogError, CatalogResult, DbDef, RelDef};
pub use database::{DatabaseError, DatabaseResult, GlobalManager};
pub use file::{
    BUFFER_POOL_SIZE, BufferManager, DiskManager, FileError, FileId, FileResult, PAGE_SIZE,
    PageId,
};
pub use record::{
    ColumnType, HeaderPageInfo, HeapFile, PageBitmapInfo, Record, RecordError, RecordId,
    RecordResult, RelSchema, Value,
};
