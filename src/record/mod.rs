mod error;
mod heap_file;
mod page;
mod record;
mod schema;
mod value;

pub use error::{RecordError, RecordResult};
pub use heap_file::HeapFile;
pub use page::{HeaderPageInfo, PageBitmapInfo, slot_count_for};
pub use record::{Record, RecordId, SlotId};
pub use schema::{ColumnType, RelSchema};
pub use value::Value;
