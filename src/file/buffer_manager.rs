use lru::LruCache;

use super::disk_manager::DiskManager;
use super::error::{FileError, FileResult};
use super::{BUFFER_POOL_SIZE, FileId, PAGE_SIZE, PageId};

/// A cached page plus its pin/dirty/recency bookkeeping
struct Frame {
    data: Vec<u8>,
    pin_count: u32,
    dirty: bool,
    /// Logical clock value of the last `get_page` hit
    last_used: u64,
}

/// Fixed-capacity page cache with pin-aware LRU eviction.
///
/// Pages are pinned by [`BufferManager::get_page`] and released by
/// [`BufferManager::free_page`]. A pinned frame is never evicted; when every
/// frame is pinned a miss fails with [`FileError::PoolExhausted`].
pub struct BufferManager {
    disk: DiskManager,
    /// Frames ordered by recency. The cache itself is unbounded: capacity is
    /// enforced here so eviction can skip pinned frames.
    buffer_pool: LruCache<PageId, Frame>,
    max_pool_size: usize,
    clock: u64,
}

impl BufferManager {
    /// Create a new buffer manager
    pub fn new(disk: DiskManager) -> Self {
        Self::with_capacity(disk, BUFFER_POOL_SIZE)
    }

    /// Create a new buffer manager with specified capacity
    pub fn with_capacity(disk: DiskManager, capacity: usize) -> Self {
        Self {
            disk,
            buffer_pool: LruCache::unbounded(),
            max_pool_size: capacity.max(1),
            clock: 0,
        }
    }

    /// Get a reference to the disk manager
    pub fn disk(&self) -> &DiskManager {
        &self.disk
    }

    /// Maximum number of frames held at once
    pub fn capacity(&self) -> usize {
        self.max_pool_size
    }

    /// Pin a page and return its content, loading it from disk on a miss
    pub fn get_page(&mut self, pid: PageId) -> FileResult<&mut [u8]> {
        if !self.buffer_pool.contains(&pid) {
            self.load_page(pid)?;
        }

        self.clock += 1;
        let tick = self.clock;

        // get_mut also moves the frame to the most-recently-used end
        let frame = self
            .buffer_pool
            .get_mut(&pid)
            .ok_or(FileError::PageNotCached(pid))?;
        frame.pin_count += 1;
        frame.last_used = tick;
        Ok(&mut frame.data)
    }

    /// Release one pin on a page, optionally marking it dirty
    pub fn free_page(&mut self, pid: PageId, dirty: bool) -> FileResult<()> {
        let frame = self
            .buffer_pool
            .peek_mut(&pid)
            .ok_or(FileError::PageNotCached(pid))?;

        if frame.pin_count == 0 {
            return Err(FileError::PinUnderflow(pid));
        }
        frame.pin_count -= 1;
        if dirty {
            frame.dirty = true;
        }
        Ok(())
    }

    /// Append a fresh zeroed page to a file. The page is not pinned.
    pub fn new_page(&mut self, file_id: FileId) -> FileResult<PageId> {
        self.disk.append_page(file_id)
    }

    /// Write a page back to disk if it is cached and dirty
    pub fn flush_page(&mut self, pid: PageId) -> FileResult<()> {
        if let Some(frame) = self.buffer_pool.peek_mut(&pid)
            && frame.dirty
        {
            self.disk.write_page(pid, &frame.data)?;
            frame.dirty = false;
        }
        Ok(())
    }

    /// Write every dirty frame back to disk. Pin counts are left untouched.
    pub fn flush_all(&mut self) -> FileResult<()> {
        let dirty_pages: Vec<PageId> = self
            .buffer_pool
            .iter()
            .filter(|(_, frame)| frame.dirty)
            .map(|(pid, _)| *pid)
            .collect();

        for pid in dirty_pages {
            self.flush_page(pid)?;
        }
        Ok(())
    }

    fn load_page(&mut self, pid: PageId) -> FileResult<()> {
        while self.buffer_pool.len() >= self.capacity() {
            self.evict_lru_page()?;
        }

        let mut data = vec![0u8; PAGE_SIZE];
        self.disk.read_page(pid, &mut data)?;

        self.buffer_pool.put(
            pid,
            Frame {
                data,
                pin_count: 0,
                dirty: false,
                last_used: 0,
            },
        );
        Ok(())
    }

    /// Evict the least recently used unpinned frame
    fn evict_lru_page(&mut self) -> FileResult<()> {
        let victim = self
            .buffer_pool
            .iter()
            .rev()
            .find(|(_, frame)| frame.pin_count == 0)
            .map(|(pid, _)| *pid)
            .ok_or(FileError::PoolExhausted {
                capacity: self.capacity(),
            })?;

        // Write back before dropping so a failed write keeps the frame
        self.flush_page(victim)?;
        self.buffer_pool.pop(&victim);
        Ok(())
    }

    /// Get the number of pages currently in the buffer pool
    pub fn buffer_pool_size(&self) -> usize {
        self.buffer_pool.len()
    }

    /// Check if a page is in the buffer pool
    pub fn is_page_cached(&self, pid: PageId) -> bool {
        self.buffer_pool.contains(&pid)
    }

    /// Get the number of dirty pages in the buffer pool
    pub fn dirty_page_count(&self) -> usize {
        self.buffer_pool.iter().filter(|(_, f)| f.dirty).count()
    }

    pub fn pin_count(&self, pid: PageId) -> Option<u32> {
        self.buffer_pool.peek(&pid).map(|f| f.pin_count)
    }

    pub fn is_dirty(&self, pid: PageId) -> Option<bool> {
        self.buffer_pool.peek(&pid).map(|f| f.dirty)
    }

    pub fn last_used(&self, pid: PageId) -> Option<u64> {
        self.buffer_pool.peek(&pid).map(|f| f.last_used)
    }
}

impl Drop for BufferManager {
    fn drop(&mut self) {
        // Flush all dirty pages when the buffer manager is dropped
        let _ = self.flush_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const FILE: FileId = FileId(0);

    fn setup_test_env(capacity: usize, pages: u32) -> (TempDir, BufferManager) {
        let temp_dir = tempfile::tempdir().unwrap();
        let disk = DiskManager::new(temp_dir.path());
        disk.create_file(FILE).unwrap();
        for _ in 0..pages {
            disk.append_page(FILE).unwrap();
        }
        (temp_dir, BufferManager::with_capacity(disk, capacity))
    }

    fn pid(index: u32) -> PageId {
        PageId::new(FILE, index)
    }

    #[test]
    fn test_get_page() {
        let (_temp_dir, mut bm) = setup_test_env(3, 1);

        let mut write_buffer = vec![0u8; PAGE_SIZE];
        write_buffer[0] = 42;
        bm.disk().write_page(pid(0), &write_buffer).unwrap();

        let page = bm.get_page(pid(0)).unwrap();
        assert_eq!(page[0], 42);
        assert_eq!(bm.buffer_pool_size(), 1);
        assert_eq!(bm.pin_count(pid(0)), Some(1));
        assert_eq!(bm.is_dirty(pid(0)), Some(false));
    }

    #[test]
    fn test_get_page_cached_pins_again() {
        let (_temp_dir, mut bm) = setup_test_env(3, 1);

        assert!(!bm.is_page_cached(pid(0)));
        bm.get_page(pid(0)).unwrap();
        let first = bm.last_used(pid(0)).unwrap();
        bm.get_page(pid(0)).unwrap();

        assert_eq!(bm.buffer_pool_size(), 1);
        assert_eq!(bm.pin_count(pid(0)), Some(2));
        assert!(bm.last_used(pid(0)).unwrap() > first);
    }

    #[test]
    fn test_free_page_unpins_and_marks_dirty() {
        let (_temp_dir, mut bm) = setup_test_env(3, 1);

        bm.get_page(pid(0)).unwrap();
        bm.get_page(pid(0)).unwrap();
        bm.free_page(pid(0), true).unwrap();
        assert_eq!(bm.pin_count(pid(0)), Some(1));
        assert_eq!(bm.is_dirty(pid(0)), Some(true));

        // Dirty is sticky until flushed
        bm.free_page(pid(0), false).unwrap();
        assert_eq!(bm.pin_count(pid(0)), Some(0));
        assert_eq!(bm.is_dirty(pid(0)), Some(true));
    }

    #[test]
    fn test_free_page_underflow() {
        let (_temp_dir, mut bm) = setup_test_env(3, 1);

        bm.get_page(pid(0)).unwrap();
        bm.free_page(pid(0), false).unwrap();
        let result = bm.free_page(pid(0), false);
        assert!(matches!(result, Err(FileError::PinUnderflow(_))));

        let result = bm.free_page(pid(7), false);
        assert!(matches!(result, Err(FileError::PageNotCached(_))));
    }

    #[test]
    fn test_flush_page() {
        let (_temp_dir, mut bm) = setup_test_env(3, 1);

        bm.get_page(pid(0)).unwrap()[0] = 55;
        bm.free_page(pid(0), true).unwrap();
        assert_eq!(bm.dirty_page_count(), 1);

        bm.flush_page(pid(0)).unwrap();
        assert_eq!(bm.dirty_page_count(), 0);
        assert_eq!(bm.pin_count(pid(0)), Some(0));

        let mut buffer = vec![0u8; PAGE_SIZE];
        bm.disk().read_page(pid(0), &mut buffer).unwrap();
        assert_eq!(buffer[0], 55);
    }

    #[test]
    fn test_flush_all_keeps_pins() {
        let (_temp_dir, mut bm) = setup_test_env(5, 5);

        for i in 0..5 {
            bm.get_page(pid(i)).unwrap()[0] = i as u8 + 1;
            bm.free_page(pid(i), true).unwrap();
        }
        bm.get_page(pid(2)).unwrap();
        assert_eq!(bm.dirty_page_count(), 5);

        bm.flush_all().unwrap();
        assert_eq!(bm.dirty_page_count(), 0);
        assert_eq!(bm.pin_count(pid(2)), Some(1));

        let mut buffer = vec![0u8; PAGE_SIZE];
        for i in 0..5 {
            bm.disk().read_page(pid(i), &mut buffer).unwrap();
            assert_eq!(buffer[0], i as u8 + 1);
        }
    }

    #[test]
    fn test_lru_eviction() {
        let (_temp_dir, mut bm) = setup_test_env(3, 4);

        for i in 0..3 {
            bm.get_page(pid(i)).unwrap();
            bm.free_page(pid(i), false).unwrap();
        }
        assert_eq!(bm.buffer_pool_size(), 3);

        // Load a 4th page - should evict page 0 (LRU)
        bm.get_page(pid(3)).unwrap();
        assert_eq!(bm.buffer_pool_size(), 3);
        assert!(!bm.is_page_cached(pid(0)));
        assert!(bm.is_page_cached(pid(1)));
        assert!(bm.is_page_cached(pid(2)));
        assert!(bm.is_page_cached(pid(3)));
    }

    #[test]
    fn test_lru_update_on_access() {
        let (_temp_dir, mut bm) = setup_test_env(3, 4);

        for i in [0, 1, 2, 0] {
            bm.get_page(pid(i)).unwrap();
            bm.free_page(pid(i), false).unwrap();
        }

        // Page 1 now has the smallest last_used
        let oldest = (0..3)
            .min_by_key(|&i| bm.last_used(pid(i)).unwrap())
            .unwrap();
        assert_eq!(oldest, 1);

        bm.get_page(pid(3)).unwrap();
        assert!(bm.is_page_cached(pid(0)));
        assert!(!bm.is_page_cached(pid(1)));
        assert!(bm.is_page_cached(pid(2)));
        assert!(bm.is_page_cached(pid(3)));
    }

    #[test]
    fn test_eviction_skips_pinned_frames() {
        let (_temp_dir, mut bm) = setup_test_env(2, 3);

        // Page 0 is the oldest but stays pinned
        bm.get_page(pid(0)).unwrap();
        bm.get_page(pid(1)).unwrap();
        bm.free_page(pid(1), false).unwrap();

        bm.get_page(pid(2)).unwrap();
        assert!(bm.is_page_cached(pid(0)));
        assert!(!bm.is_page_cached(pid(1)));
        assert!(bm.is_page_cached(pid(2)));
    }

    #[test]
    fn test_pool_exhausted_when_all_pinned() {
        let (_temp_dir, mut bm) = setup_test_env(2, 3);

        bm.get_page(pid(0)).unwrap();
        bm.get_page(pid(1)).unwrap();

        let result = bm.get_page(pid(2));
        assert!(matches!(
            result,
            Err(FileError::PoolExhausted { capacity: 2 })
        ));

        // Nothing was disturbed
        assert_eq!(bm.buffer_pool_size(), 2);
        assert_eq!(bm.pin_count(pid(0)), Some(1));
        assert_eq!(bm.pin_count(pid(1)), Some(1));

        // Releasing a pin makes room again
        bm.free_page(pid(1), false).unwrap();
        bm.get_page(pid(2)).unwrap();
        assert!(!bm.is_page_cached(pid(1)));
    }

    #[test]
    fn test_dirty_page_flushed_on_eviction() {
        let (_temp_dir, mut bm) = setup_test_env(2, 3);

        bm.get_page(pid(0)).unwrap()[0] = 77;
        bm.free_page(pid(0), true).unwrap();

        for i in 1..3 {
            bm.get_page(pid(i)).unwrap();
            bm.free_page(pid(i), false).unwrap();
        }
        assert!(!bm.is_page_cached(pid(0)));

        let page = bm.get_page(pid(0)).unwrap();
        assert_eq!(page[0], 77);
    }

    #[test]
    fn test_never_exceeds_capacity() {
        let (_temp_dir, mut bm) = setup_test_env(2, 6);

        for round in 0..3 {
            for i in 0..6 {
                bm.get_page(pid(i)).unwrap();
                bm.free_page(pid(i), round % 2 == 0).unwrap();
                assert!(bm.buffer_pool_size() <= 2);
            }
        }
    }

    #[test]
    fn test_miss_on_missing_page_propagates() {
        let (_temp_dir, mut bm) = setup_test_env(2, 1);
        let result = bm.get_page(pid(4));
        assert!(matches!(result, Err(FileError::PageOutOfRange { .. })));
        assert_eq!(bm.buffer_pool_size(), 0);
    }

    #[test]
    fn test_new_page_appends() {
        let (_temp_dir, mut bm) = setup_test_env(2, 2);
        let new_pid = bm.new_page(FILE).unwrap();
        assert_eq!(new_pid, pid(2));
        assert!(!bm.is_page_cached(new_pid));
    }

    #[test]
    fn test_drop_flushes_dirty_pages() {
        let temp_dir = tempfile::tempdir().unwrap();
        let disk = DiskManager::new(temp_dir.path());
        disk.create_file(FILE).unwrap();
        disk.append_page(FILE).unwrap();

        {
            let mut bm = BufferManager::new(disk.clone());
            bm.get_page(pid(0)).unwrap()[0] = 88;
            bm.free_page(pid(0), true).unwrap();
            // bm is dropped here, should flush
        }

        let mut buffer = vec![0u8; PAGE_SIZE];
        disk.read_page(pid(0), &mut buffer).unwrap();
        assert_eq!(buffer[0], 88);
    }
}
