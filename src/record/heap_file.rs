use super::error::{RecordError, RecordResult};
use super::page::{HeaderPageInfo, PageBitmapInfo};
use super::record::{Record, RecordId};
use super::schema::RelSchema;
use crate::catalog::RelDef;
use crate::file::{BufferManager, PAGE_SIZE, PageId};

/// Record placement for one relation.
///
/// Page 0 is the header page listing each data page's free slot count;
/// pages 1.. are data pages with a one-byte-per-slot bitmap followed by
/// `slot_count` fixed-size slots. All page access goes through the buffer
/// manager, and at most one page is pinned at a time.
#[derive(Debug, Clone)]
pub struct HeapFile {
    rel_def: RelDef,
}

impl HeapFile {
    pub fn new(rel_def: RelDef) -> Self {
        Self { rel_def }
    }

    pub fn rel_def(&self) -> &RelDef {
        &self.rel_def
    }

    pub fn schema(&self) -> &RelSchema {
        self.rel_def.schema()
    }

    pub fn header_page_id(&self) -> PageId {
        PageId::header(self.rel_def.file_id())
    }

    /// Allocate page 0 and write an empty header into it
    pub fn create_header(&self, buffer_mgr: &mut BufferManager) -> RecordResult<()> {
        let pid = buffer_mgr.new_page(self.rel_def.file_id())?;
        if pid != self.header_page_id() {
            return Err(RecordError::CorruptPage(format!(
                "header must be the first page, got {}",
                pid
            )));
        }

        with_page(buffer_mgr, pid, true, |page| {
            HeaderPageInfo::new().write_to(page)
        })
    }

    /// Decode the header page
    pub fn get_header_page_info(
        &self,
        buffer_mgr: &mut BufferManager,
    ) -> RecordResult<HeaderPageInfo> {
        with_page(buffer_mgr, self.header_page_id(), false, |page| {
            HeaderPageInfo::read_from(page)
        })
    }

    /// First data page with a free slot, allocating one if all are full
    pub fn get_free_page_id(&self, buffer_mgr: &mut BufferManager) -> RecordResult<PageId> {
        let header = self.get_header_page_info(buffer_mgr)?;
        match header.first_page_with_free_slot() {
            Some(index) => Ok(PageId::new(self.rel_def.file_id(), index)),
            None => self.add_data_page(buffer_mgr),
        }
    }

    /// Append a data page with an empty bitmap and register it in the header
    pub fn add_data_page(&self, buffer_mgr: &mut BufferManager) -> RecordResult<PageId> {
        let file_id = self.rel_def.file_id();
        let slot_count = self.rel_def.slot_count() as u32;

        // Refuse before appending so a full header never leaves orphan pages
        let mut header = self.get_header_page_info(buffer_mgr)?;
        let next_index = buffer_mgr.disk().page_count(file_id)?;
        header.add_page(next_index, slot_count)?;
        header.write_to(&mut vec![0u8; PAGE_SIZE])?;

        let pid = buffer_mgr.new_page(file_id)?;
        with_page(buffer_mgr, pid, true, |page| {
            PageBitmapInfo::new(slot_count as usize).write_to(page);
            Ok(())
        })?;

        self.update_header(buffer_mgr, |header| header.add_page(pid.index, slot_count))?;
        Ok(pid)
    }

    /// Insert a record into the first free slot of the relation
    pub fn insert_record(
        &self,
        buffer_mgr: &mut BufferManager,
        record: &Record,
    ) -> RecordResult<RecordId> {
        // Encode first: a bad record must not allocate pages
        let record_bytes = record.serialize(self.schema())?;
        let pid = self.get_free_page_id(buffer_mgr)?;
        self.insert_record_in_page(buffer_mgr, &record_bytes, pid)
    }

    /// Write an encoded record into the lowest free slot of page `pid`
    pub fn insert_record_in_page(
        &self,
        buffer_mgr: &mut BufferManager,
        record_bytes: &[u8],
        pid: PageId,
    ) -> RecordResult<RecordId> {
        let slot_count = self.rel_def.slot_count();
        let record_size = self.rel_def.record_size();
        if record_bytes.len() != record_size {
            return Err(RecordError::TypeMismatch {
                expected: format!("{} record bytes", record_size),
                actual: format!("{} bytes", record_bytes.len()),
            });
        }

        let (slot_id, free_slots) = with_page(buffer_mgr, pid, true, |page| {
            let mut bitmap = PageBitmapInfo::read_from(page, slot_count)?;
            let slot_id = bitmap.first_free().ok_or_else(|| {
                RecordError::CorruptPage(format!("page {} has no free slot", pid))
            })?;

            let offset = slot_offset(slot_count, record_size, slot_id);
            page[offset..offset + record_size].copy_from_slice(record_bytes);
            bitmap.set_used(slot_id);
            bitmap.write_to(page);

            Ok((slot_id, bitmap.free_count() as u32))
        })?;

        // The header count is re-derived from the bitmap, never decremented blindly
        self.update_header(buffer_mgr, |header| {
            header.set_free_slots(pid.index, free_slots)
        })?;

        Ok(RecordId::new(pid, slot_id))
    }

    /// Read back the record stored at `rid`
    pub fn get_record(
        &self,
        buffer_mgr: &mut BufferManager,
        rid: RecordId,
    ) -> RecordResult<Record> {
        let slot_count = self.rel_def.slot_count();
        let record_size = self.rel_def.record_size();
        if rid.page_id.file_id != self.rel_def.file_id()
            || rid.page_id.index == 0
            || rid.slot_id >= slot_count
        {
            return Err(RecordError::InvalidSlot(rid));
        }

        with_page(buffer_mgr, rid.page_id, false, |page| {
            let bitmap = PageBitmapInfo::read_from(page, slot_count)?;
            if !bitmap.is_used(rid.slot_id) {
                return Err(RecordError::InvalidSlot(rid));
            }
            let offset = slot_offset(slot_count, record_size, rid.slot_id);
            Record::deserialize(&page[offset..offset + record_size], self.schema())
        })
    }

    /// All live records, in page then slot order
    pub fn scan(&self, buffer_mgr: &mut BufferManager) -> RecordResult<Vec<(RecordId, Record)>> {
        let slot_count = self.rel_def.slot_count();
        let record_size = self.rel_def.record_size();
        let header = self.get_header_page_info(buffer_mgr)?;

        let mut results = Vec::new();
        for &(index, _) in header.pages() {
            let pid = PageId::new(self.rel_def.file_id(), index);
            with_page(buffer_mgr, pid, false, |page| {
                let bitmap = PageBitmapInfo::read_from(page, slot_count)?;
                for slot_id in bitmap.used_slots() {
                    let offset = slot_offset(slot_count, record_size, slot_id);
                    let record =
                        Record::deserialize(&page[offset..offset + record_size], self.schema())?;
                    results.push((RecordId::new(pid, slot_id), record));
                }
                Ok(())
            })?;
        }
        Ok(results)
    }

    /// Check that every header count matches its page's bitmap
    pub fn check_consistency(&self, buffer_mgr: &mut BufferManager) -> RecordResult<()> {
        let slot_count = self.rel_def.slot_count();
        let header = self.get_header_page_info(buffer_mgr)?;

        if header.data_page_count() as usize != header.pages().len() {
            return Err(RecordError::CorruptPage(format!(
                "header counts {} data pages but lists {}",
                header.data_page_count(),
                header.pages().len()
            )));
        }

        for &(index, free) in header.pages() {
            let pid = PageId::new(self.rel_def.file_id(), index);
            let actual = with_page(buffer_mgr, pid, false, |page| {
                Ok(PageBitmapInfo::read_from(page, slot_count)?.free_count())
            })?;
            if actual != free as usize {
                return Err(RecordError::CorruptPage(format!(
                    "header says page {} has {} free slots, bitmap says {}",
                    pid, free, actual
                )));
            }
        }
        Ok(())
    }

    fn update_header<F>(&self, buffer_mgr: &mut BufferManager, f: F) -> RecordResult<()>
    where
        F: FnOnce(&mut HeaderPageInfo) -> RecordResult<()>,
    {
        with_page(buffer_mgr, self.header_page_id(), true, |page| {
            let mut header = HeaderPageInfo::read_from(page)?;
            f(&mut header)?;
            header.write_to(page)
        })
    }
}

/// Byte offset of a slot: the bitmap comes first, one byte per slot
fn slot_offset(slot_count: usize, record_size: usize, slot_id: usize) -> usize {
    slot_count + slot_id * record_size
}

/// Pin `pid`, run `f` on its content and unpin it again, even when `f` fails.
/// The page is only marked dirty if `dirty` is set and `f` succeeded.
fn with_page<T, F>(
    buffer_mgr: &mut BufferManager,
    pid: PageId,
    dirty: bool,
    f: F,
) -> RecordResult<T>
where
    F: FnOnce(&mut [u8]) -> RecordResult<T>,
{
    let page = buffer_mgr.get_page(pid)?;
    let result = f(page);
    buffer_mgr.free_page(pid, dirty && result.is_ok())?;
    result
}
