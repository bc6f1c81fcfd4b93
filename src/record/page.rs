//! Decoded views of the two page roles inside a relation file.
//!
//! Page 0 (header) is UTF-8 text: the data page count followed by one
//! `index;free_slots` pair per data page, all joined by [`DATA_SEP`] and
//! zero-padded to `PAGE_SIZE`. Data pages start with a one-byte-per-slot
//! occupancy bitmap followed by the fixed-size record slots.

use super::error::{RecordError, RecordResult};
use crate::file::{DATA_SEP, PAGE_SIZE};

/// Decoded header page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderPageInfo {
    data_page_count: u32,
    /// (page index, free slots), in allocation order
    free_slots_by_page: Vec<(u32, u32)>,
}

impl HeaderPageInfo {
    /// Header of a relation without data pages
    pub fn new() -> Self {
        Self::default()
    }

    pub fn data_page_count(&self) -> u32 {
        self.data_page_count
    }

    pub fn pages(&self) -> &[(u32, u32)] {
        &self.free_slots_by_page
    }

    pub fn free_slots(&self, page_index: u32) -> Option<u32> {
        self.free_slots_by_page
            .iter()
            .find(|(idx, _)| *idx == page_index)
            .map(|(_, free)| *free)
    }

    /// First page in allocation order that still has a free slot
    pub fn first_page_with_free_slot(&self) -> Option<u32> {
        self.free_slots_by_page
            .iter()
            .find(|(_, free)| *free > 0)
            .map(|(idx, _)| *idx)
    }

    /// Register a newly allocated data page
    pub fn add_page(&mut self, page_index: u32, free_slots: u32) -> RecordResult<()> {
        if self.free_slots(page_index).is_some() {
            return Err(RecordError::CorruptPage(format!(
                "data page {} registered twice in header",
                page_index
            )));
        }
        self.free_slots_by_page.push((page_index, free_slots));
        self.data_page_count += 1;
        Ok(())
    }

    pub fn set_free_slots(&mut self, page_index: u32, free_slots: u32) -> RecordResult<()> {
        let entry = self
            .free_slots_by_page
            .iter_mut()
            .find(|(idx, _)| *idx == page_index)
            .ok_or_else(|| {
                RecordError::CorruptPage(format!("data page {} missing from header", page_index))
            })?;
        entry.1 = free_slots;
        Ok(())
    }

    /// Decode a header page
    pub fn read_from(buffer: &[u8]) -> RecordResult<Self> {
        let end = buffer.iter().position(|&b| b == 0).unwrap_or(buffer.len());
        let text = std::str::from_utf8(&buffer[..end])
            .map_err(|e| RecordError::CorruptPage(format!("header is not UTF-8: {}", e)))?;

        let mut fields = text.split(DATA_SEP).filter(|f| !f.is_empty());
        let data_page_count = match fields.next() {
            Some(field) => parse_field(field)?,
            None => return Err(RecordError::CorruptPage("empty header page".to_string())),
        };

        let rest: Vec<&str> = fields.collect();
        if rest.len() != data_page_count as usize * 2 {
            return Err(RecordError::CorruptPage(format!(
                "header announces {} data pages but holds {} fields",
                data_page_count,
                rest.len()
            )));
        }

        let mut header = Self::new();
        for pair in rest.chunks(2) {
            header.add_page(parse_field(pair[0])?, parse_field(pair[1])?)?;
        }
        Ok(header)
    }

    /// Encode into a full page buffer, zero-padding the tail
    pub fn write_to(&self, buffer: &mut [u8]) -> RecordResult<()> {
        let mut fields = Vec::with_capacity(1 + self.free_slots_by_page.len());
        fields.push(self.data_page_count.to_string());
        for (idx, free) in &self.free_slots_by_page {
            fields.push(format!("{}{}{}", idx, DATA_SEP, free));
        }
        let text = fields.join(DATA_SEP);

        // Keep at least one terminating zero byte
        if text.len() >= buffer.len() {
            return Err(RecordError::HeaderPageFull {
                needed: text.len() + 1,
                page_size: buffer.len(),
            });
        }

        buffer.fill(0);
        buffer[..text.len()].copy_from_slice(text.as_bytes());
        Ok(())
    }
}

fn parse_field(field: &str) -> RecordResult<u32> {
    field
        .parse()
        .map_err(|_| RecordError::CorruptPage(format!("bad header field {:?}", field)))
}

/// Decoded occupancy bitmap of a data page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageBitmapInfo {
    slot_status: Vec<bool>,
}

impl PageBitmapInfo {
    /// All-free bitmap for `slot_count` slots
    pub fn new(slot_count: usize) -> Self {
        Self {
            slot_status: vec![false; slot_count],
        }
    }

    /// Decode the first `slot_count` bytes of a data page
    pub fn read_from(buffer: &[u8], slot_count: usize) -> RecordResult<Self> {
        if slot_count > buffer.len() {
            return Err(RecordError::CorruptPage(format!(
                "bitmap of {} slots exceeds {}-byte page",
                slot_count,
                buffer.len()
            )));
        }

        let slot_status = buffer[..slot_count]
            .iter()
            .enumerate()
            .map(|(slot, &b)| match b {
                0 => Ok(false),
                1 => Ok(true),
                other => Err(RecordError::CorruptPage(format!(
                    "bitmap byte {} for slot {}",
                    other, slot
                ))),
            })
            .collect::<RecordResult<Vec<bool>>>()?;

        Ok(Self { slot_status })
    }

    /// Encode into the leading bytes of a data page
    pub fn write_to(&self, buffer: &mut [u8]) {
        for (byte, &used) in buffer.iter_mut().zip(&self.slot_status) {
            *byte = used as u8;
        }
    }

    pub fn slot_count(&self) -> usize {
        self.slot_status.len()
    }

    pub fn is_used(&self, slot: usize) -> bool {
        self.slot_status.get(slot).copied().unwrap_or(false)
    }

    pub fn set_used(&mut self, slot: usize) {
        if let Some(status) = self.slot_status.get_mut(slot) {
            *status = true;
        }
    }

    /// Lowest free slot index
    pub fn first_free(&self) -> Option<usize> {
        self.slot_status.iter().position(|used| !used)
    }

    pub fn free_count(&self) -> usize {
        self.slot_status.iter().filter(|used| !**used).count()
    }

    pub fn used_slots(&self) -> impl Iterator<Item = usize> + '_ {
        self.slot_status
            .iter()
            .enumerate()
            .filter(|(_, used)| **used)
            .map(|(slot, _)| slot)
    }
}

/// Slots per data page for a given record size: one bitmap byte per slot
pub fn slot_count_for(record_size: usize) -> usize {
    record_size
        .checked_add(1)
        .map_or(0, |slot_width| PAGE_SIZE / slot_width)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_header_encoding() {
        let mut buffer = vec![0xaau8; PAGE_SIZE];
        HeaderPageInfo::new().write_to(&mut buffer).unwrap();
        assert_eq!(buffer[0], b'0');
        assert!(buffer[1..].iter().all(|&b| b == 0));

        let decoded = HeaderPageInfo::read_from(&buffer).unwrap();
        assert_eq!(decoded.data_page_count(), 0);
        assert!(decoded.pages().is_empty());
    }

    #[test]
    fn test_header_text_layout() {
        let mut header = HeaderPageInfo::new();
        header.add_page(1, 409).unwrap();
        header.add_page(2, 17).unwrap();

        let mut buffer = vec![0u8; PAGE_SIZE];
        header.write_to(&mut buffer).unwrap();
        let expected = format!("2{0}1{0}409{0}2{0}17", DATA_SEP);
        assert_eq!(&buffer[..expected.len()], expected.as_bytes());
        assert_eq!(buffer[expected.len()], 0);

        assert_eq!(HeaderPageInfo::read_from(&buffer).unwrap(), header);
    }

    #[test]
    fn test_rewrite_shorter_header_clears_tail() {
        let mut header = HeaderPageInfo::new();
        header.add_page(1, 1000).unwrap();
        let mut buffer = vec![0u8; PAGE_SIZE];
        header.write_to(&mut buffer).unwrap();

        header.set_free_slots(1, 9).unwrap();
        header.write_to(&mut buffer).unwrap();
        assert_eq!(HeaderPageInfo::read_from(&buffer).unwrap().free_slots(1), Some(9));
    }

    #[test]
    fn test_first_page_with_free_slot() {
        let mut header = HeaderPageInfo::new();
        header.add_page(1, 0).unwrap();
        header.add_page(2, 0).unwrap();
        assert_eq!(header.first_page_with_free_slot(), None);

        header.add_page(3, 5).unwrap();
        header.set_free_slots(1, 1).unwrap();
        assert_eq!(header.first_page_with_free_slot(), Some(1));
    }

    #[test]
    fn test_header_full() {
        let mut header = HeaderPageInfo::new();
        for idx in 1..=1000 {
            header.add_page(idx, 99999).unwrap();
        }
        let mut buffer = vec![0u8; PAGE_SIZE];
        assert!(matches!(
            header.write_to(&mut buffer),
            Err(RecordError::HeaderPageFull { .. })
        ));
    }

    #[test]
    fn test_corrupt_headers() {
        let mut buffer = vec![0u8; PAGE_SIZE];
        assert!(HeaderPageInfo::read_from(&buffer).is_err());

        let text = format!("2{0}1{0}5", DATA_SEP);
        buffer[..text.len()].copy_from_slice(text.as_bytes());
        assert!(matches!(
            HeaderPageInfo::read_from(&buffer),
            Err(RecordError::CorruptPage(_))
        ));

        let text = format!("1{0}x{0}5", DATA_SEP);
        buffer.fill(0);
        buffer[..text.len()].copy_from_slice(text.as_bytes());
        assert!(HeaderPageInfo::read_from(&buffer).is_err());
    }

    #[test]
    fn test_duplicate_data_page() {
        let mut header = HeaderPageInfo::new();
        header.add_page(1, 3).unwrap();
        assert!(header.add_page(1, 3).is_err());
        assert!(header.set_free_slots(4, 1).is_err());
    }

    #[test]
    fn test_bitmap_read_write() {
        let mut bitmap = PageBitmapInfo::new(5);
        assert_eq!(bitmap.first_free(), Some(0));
        bitmap.set_used(0);
        bitmap.set_used(2);

        let mut buffer = vec![0u8; PAGE_SIZE];
        bitmap.write_to(&mut buffer);
        assert_eq!(&buffer[..6], &[1, 0, 1, 0, 0, 0]);

        let decoded = PageBitmapInfo::read_from(&buffer, 5).unwrap();
        assert_eq!(decoded, bitmap);
        assert_eq!(decoded.first_free(), Some(1));
        assert_eq!(decoded.free_count(), 3);
        assert_eq!(decoded.used_slots().collect::<Vec<_>>(), vec![0, 2]);
    }

    #[test]
    fn test_bitmap_rejects_garbage() {
        let mut buffer = vec![0u8; PAGE_SIZE];
        buffer[1] = 7;
        assert!(matches!(
            PageBitmapInfo::read_from(&buffer, 4),
            Err(RecordError::CorruptPage(_))
        ));
        // Bytes past the bitmap are record data, not checked
        assert!(PageBitmapInfo::read_from(&buffer, 1).is_ok());
    }

    #[test]
    fn test_full_bitmap() {
        let mut bitmap = PageBitmapInfo::new(3);
        for slot in 0..3 {
            bitmap.set_used(slot);
        }
        assert_eq!(bitmap.first_free(), None);
        assert_eq!(bitmap.free_count(), 0);
    }

    #[test]
    fn test_slot_count_for() {
        assert_eq!(slot_count_for(9), PAGE_SIZE / 10);
        assert_eq!(slot_count_for(PAGE_SIZE), 0);
        assert_eq!(slot_count_for(usize::MAX), 0);
    }
}
