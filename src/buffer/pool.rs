//! Buffer pool implementation.
//!
//! The buffer pool caches up to a fixed number of pages from one page
//! file in memory. Clients pin a page to obtain a handle, read or write
//! the cached bytes through it, mark the frame dirty after modifying it,
//! and unpin it when done. A page is never evicted while its fix count
//! is positive; eviction among unpinned frames is arbitrated by the
//! pool's replacement policy.

use crate::buffer::replacer::{Replacer, ReplacementPolicy};
use crate::error::{Result, StorageError};
use crate::storage::PageFile;
use crate::types::{PageId, PAGE_SIZE};
use log::trace;
use std::collections::VecDeque;
use std::path::Path;

/// One page frame in the buffer pool
pub(crate) struct Frame {
    /// Page cached in this frame, or `PageId::NONE` when empty
    pub(crate) page: PageId,
    /// The cached page bytes
    pub(crate) data: Box<[u8]>,
    /// Whether the cached bytes differ from disk
    pub(crate) dirty: bool,
    /// Number of outstanding pins
    pub(crate) fix_count: u32,
    /// LRU access stamp
    pub(crate) stamp: u64,
    /// CLOCK reference bit
    pub(crate) ref_bit: bool,
    /// LFU access frequency
    pub(crate) freq: u64,
    /// LRU-K access history, oldest first
    pub(crate) history: VecDeque<u64>,
}

impl Frame {
    fn new() -> Self {
        Self {
            page: PageId::NONE,
            data: vec![0u8; PAGE_SIZE].into_boxed_slice(),
            dirty: false,
            fix_count: 0,
            stamp: 0,
            ref_bit: false,
            freq: 0,
            history: VecDeque::new(),
        }
    }
}

/// Handle to a pinned page.
///
/// The handle stays valid until the page is unpinned; using it after the
/// frame has been reused for another page asserts.
#[derive(Debug, Clone, Copy)]
pub struct PageHandle {
    page: PageId,
    frame: usize,
}

impl PageHandle {
    /// The pinned page's number
    pub fn page(&self) -> PageId {
        self.page
    }
}

/// A fixed-size page cache over a single page file
pub struct BufferPool {
    file: PageFile,
    frames: Vec<Frame>,
    replacer: Replacer,
    reads: u64,
    writes: u64,
}

impl BufferPool {
    /// Open a buffer pool of `capacity` frames over the page file at
    /// `path`.
    ///
    /// Fails with `FileNotFound` if the backing file does not exist.
    pub fn new(
        path: impl AsRef<Path>,
        capacity: usize,
        policy: ReplacementPolicy,
    ) -> Result<Self> {
        assert!(capacity > 0, "buffer pool needs at least one frame");
        let file = PageFile::open(path)?;
        let frames = (0..capacity).map(|_| Frame::new()).collect();
        Ok(Self {
            file,
            frames,
            replacer: Replacer::new(policy),
            reads: 0,
            writes: 0,
        })
    }

    /// Pin `page`, loading it into a frame if it is not already resident.
    ///
    /// The backing file is extended when `page` lies beyond its current
    /// end. Fails with `PoolPinned` when the page is not resident and
    /// every frame is pinned.
    pub fn pin_page(&mut self, page: PageId) -> Result<PageHandle> {
        if page == PageId::NONE {
            return Err(StorageError::PageNotFound(page));
        }

        // Already resident: share the frame.
        if let Some(idx) = self.find_frame(page) {
            let frame = &mut self.frames[idx];
            frame.fix_count += 1;
            self.replacer.on_hit(frame);
            return Ok(PageHandle { page, frame: idx });
        }

        // Prefer an empty frame, otherwise evict.
        let victim = match self.frames.iter().position(|f| f.page == PageId::NONE) {
            Some(idx) => idx,
            None => self.replacer.select_victim(&mut self.frames)?,
        };

        if self.frames[victim].dirty {
            trace!(
                "evicting dirty page {} for page {}",
                self.frames[victim].page,
                page
            );
            self.file
                .write_page(self.frames[victim].page, &self.frames[victim].data)?;
            self.writes += 1;
            self.frames[victim].dirty = false;
        }

        if page.value() >= self.file.total_pages() {
            self.file.ensure_capacity(page.value() + 1)?;
        }
        self.file.read_page(page, &mut self.frames[victim].data)?;
        self.reads += 1;

        let frame = &mut self.frames[victim];
        frame.page = page;
        frame.fix_count = 1;
        frame.dirty = false;
        self.replacer.on_load(frame);

        Ok(PageHandle {
            page,
            frame: victim,
        })
    }

    /// Bytes of the pinned page
    pub fn page(&self, handle: &PageHandle) -> &[u8] {
        let frame = &self.frames[handle.frame];
        assert_eq!(frame.page, handle.page, "page handle used after unpin");
        &frame.data
    }

    /// Mutable bytes of the pinned page.
    ///
    /// Modifications are only persisted if the frame is marked dirty.
    pub fn page_mut(&mut self, handle: &PageHandle) -> &mut [u8] {
        let frame = &mut self.frames[handle.frame];
        assert_eq!(frame.page, handle.page, "page handle used after unpin");
        &mut frame.data
    }

    /// Mark the frame holding the handle's page dirty
    pub fn mark_dirty(&mut self, handle: &PageHandle) -> Result<()> {
        let idx = self
            .find_frame(handle.page)
            .ok_or(StorageError::PageNotFound(handle.page))?;
        self.frames[idx].dirty = true;
        Ok(())
    }

    /// Release one pin on the handle's page.
    ///
    /// The fix count only decrements while positive.
    pub fn unpin_page(&mut self, handle: &PageHandle) -> Result<()> {
        let idx = self
            .find_frame(handle.page)
            .ok_or(StorageError::PageNotFound(handle.page))?;
        let frame = &mut self.frames[idx];
        if frame.fix_count > 0 {
            frame.fix_count -= 1;
        }
        Ok(())
    }

    /// Write the handle's page to disk immediately, clearing its dirty flag
    pub fn force_page(&mut self, handle: &PageHandle) -> Result<()> {
        let idx = self
            .find_frame(handle.page)
            .ok_or(StorageError::PageNotFound(handle.page))?;
        self.file
            .write_page(self.frames[idx].page, &self.frames[idx].data)?;
        self.writes += 1;
        self.frames[idx].dirty = false;
        Ok(())
    }

    /// Write back every dirty, unpinned frame
    pub fn force_flush(&mut self) -> Result<()> {
        for idx in 0..self.frames.len() {
            let frame = &self.frames[idx];
            if frame.page.is_some() && frame.dirty && frame.fix_count == 0 {
                self.file.write_page(frame.page, &frame.data)?;
                self.writes += 1;
                self.frames[idx].dirty = false;
            }
        }
        Ok(())
    }

    /// Flush all dirty frames and release the pool.
    ///
    /// Fails with `PoolPinned` while any frame is still pinned, leaving
    /// the pool untouched.
    pub fn close(&mut self) -> Result<()> {
        if self.frames.iter().any(|f| f.fix_count > 0) {
            return Err(StorageError::PoolPinned);
        }
        self.force_flush()
    }

    /// Number of frames
    pub fn capacity(&self) -> usize {
        self.frames.len()
    }

    /// The pool's replacement policy
    pub fn policy(&self) -> ReplacementPolicy {
        self.replacer.policy()
    }

    /// Page cached in each frame (`PageId::NONE` for empty frames)
    pub fn frame_contents(&self) -> Vec<PageId> {
        self.frames.iter().map(|f| f.page).collect()
    }

    /// Dirty flag of each frame
    pub fn dirty_flags(&self) -> Vec<bool> {
        self.frames.iter().map(|f| f.dirty).collect()
    }

    /// Fix count of each frame
    pub fn fix_counts(&self) -> Vec<u32> {
        self.frames.iter().map(|f| f.fix_count).collect()
    }

    /// Total pages read from disk since the pool was opened
    pub fn read_count(&self) -> u64 {
        self.reads
    }

    /// Total pages written to disk since the pool was opened
    pub fn write_count(&self) -> u64 {
        self.writes
    }

    fn find_frame(&self, page: PageId) -> Option<usize> {
        if page == PageId::NONE {
            return None;
        }
        self.frames.iter().position(|f| f.page == page)
    }
}

impl Drop for BufferPool {
    fn drop(&mut self) {
        // Best-effort writeback of whatever close() did not flush.
        let _ = self.force_flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::{tempdir, TempDir};

    /// Page file with `pages` user pages, each tagged with its number
    fn setup_file(pages: u32) -> (TempDir, PathBuf) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("pool.pf");
        PageFile::create(&path).unwrap();
        let mut pf = PageFile::open(&path).unwrap();
        pf.ensure_capacity(pages).unwrap();
        for n in 0..pages {
            let mut page = [0u8; PAGE_SIZE];
            page[0] = n as u8;
            pf.write_page(PageId::new(n), &page).unwrap();
        }
        pf.close().unwrap();
        (dir, path)
    }

    fn pin_unpin(pool: &mut BufferPool, page: u32) -> Result<()> {
        let h = pool.pin_page(PageId::new(page))?;
        pool.unpin_page(&h)
    }

    fn contents(pool: &BufferPool) -> Vec<PageId> {
        pool.frame_contents()
    }

    fn ids(raw: &[u32]) -> Vec<PageId> {
        raw.iter().map(|&n| PageId::new(n)).collect()
    }

    #[test]
    fn test_fifo_replacement() -> Result<()> {
        let (_dir, path) = setup_file(6);
        let mut pool = BufferPool::new(&path, 3, ReplacementPolicy::Fifo)?;

        let expected: [&[u32]; 6] = [
            &[0],
            &[0, 1],
            &[0, 1, 2],
            &[3, 1, 2],
            &[3, 4, 2],
            &[3, 4, 5],
        ];
        for (n, want) in expected.iter().enumerate() {
            pin_unpin(&mut pool, n as u32)?;
            let mut frames = ids(want);
            frames.resize(3, PageId::NONE);
            assert_eq!(contents(&pool), frames, "after pinning page {n}");
            assert!(pool.fix_counts().iter().all(|&c| c == 0));
        }

        assert_eq!(pool.read_count(), 6);
        assert_eq!(pool.write_count(), 0);
        Ok(())
    }

    #[test]
    fn test_lru_replacement() -> Result<()> {
        let (_dir, path) = setup_file(6);
        let mut pool = BufferPool::new(&path, 3, ReplacementPolicy::Lru)?;

        pin_unpin(&mut pool, 0)?;
        pin_unpin(&mut pool, 1)?;
        pin_unpin(&mut pool, 2)?;
        // Refresh page 0; page 1 becomes least recently used.
        pin_unpin(&mut pool, 0)?;
        pin_unpin(&mut pool, 3)?;
        assert_eq!(contents(&pool), ids(&[0, 3, 2]));

        // Page 2 is now the oldest.
        pin_unpin(&mut pool, 4)?;
        assert_eq!(contents(&pool), ids(&[0, 3, 4]));
        Ok(())
    }

    #[test]
    fn test_lfu_replacement() -> Result<()> {
        let (_dir, path) = setup_file(6);
        let mut pool = BufferPool::new(&path, 3, ReplacementPolicy::Lfu)?;

        pin_unpin(&mut pool, 0)?;
        pin_unpin(&mut pool, 1)?;
        pin_unpin(&mut pool, 2)?;
        for _ in 0..2 {
            pin_unpin(&mut pool, 0)?;
            pin_unpin(&mut pool, 1)?;
        }

        // Page 2 has the lowest frequency.
        pin_unpin(&mut pool, 3)?;
        assert_eq!(contents(&pool), ids(&[0, 1, 3]));

        // The fresh page 3 starts at frequency one and loses again.
        pin_unpin(&mut pool, 4)?;
        assert_eq!(contents(&pool), ids(&[0, 1, 4]));

        assert_eq!(pool.read_count(), 5);
        assert_eq!(pool.write_count(), 0);
        Ok(())
    }

    #[test]
    fn test_clock_replacement() -> Result<()> {
        let (_dir, path) = setup_file(6);
        let mut pool = BufferPool::new(&path, 3, ReplacementPolicy::Clock)?;

        pin_unpin(&mut pool, 0)?;
        pin_unpin(&mut pool, 1)?;
        pin_unpin(&mut pool, 2)?;
        // Re-reference page 0 so it gets a second chance.
        pin_unpin(&mut pool, 0)?;

        pin_unpin(&mut pool, 3)?;
        assert_eq!(contents(&pool), ids(&[0, 3, 2]));

        pin_unpin(&mut pool, 4)?;
        assert_eq!(contents(&pool), ids(&[0, 3, 4]));
        Ok(())
    }

    #[test]
    fn test_lru_k_replacement() -> Result<()> {
        let (_dir, path) = setup_file(6);
        let mut pool = BufferPool::new(&path, 3, ReplacementPolicy::lru_k())?;

        pin_unpin(&mut pool, 0)?;
        pin_unpin(&mut pool, 1)?;
        pin_unpin(&mut pool, 2)?;
        pin_unpin(&mut pool, 0)?;
        pin_unpin(&mut pool, 1)?;

        // Pages 0 and 1 have full histories; page 0's second-most-recent
        // access is the oldest, so it is the victim. Page 2 only has one
        // access and is considered last.
        pin_unpin(&mut pool, 3)?;
        assert_eq!(contents(&pool), ids(&[3, 1, 2]));
        Ok(())
    }

    #[test]
    fn test_pin_shares_frame() -> Result<()> {
        let (_dir, path) = setup_file(2);
        let mut pool = BufferPool::new(&path, 3, ReplacementPolicy::Lru)?;

        let h1 = pool.pin_page(PageId::new(0))?;
        let h2 = pool.pin_page(PageId::new(0))?;
        assert_eq!(pool.fix_counts(), vec![2, 0, 0]);
        assert_eq!(pool.read_count(), 1);

        pool.unpin_page(&h1)?;
        assert_eq!(pool.fix_counts(), vec![1, 0, 0]);
        pool.unpin_page(&h2)?;
        assert_eq!(pool.fix_counts(), vec![0, 0, 0]);
        Ok(())
    }

    #[test]
    fn test_all_frames_pinned() -> Result<()> {
        let (_dir, path) = setup_file(3);
        let mut pool = BufferPool::new(&path, 2, ReplacementPolicy::Fifo)?;

        let h0 = pool.pin_page(PageId::new(0))?;
        let h1 = pool.pin_page(PageId::new(1))?;
        assert!(matches!(
            pool.pin_page(PageId::new(2)),
            Err(StorageError::PoolPinned)
        ));

        pool.unpin_page(&h0)?;
        pool.unpin_page(&h1)?;
        assert!(pool.pin_page(PageId::new(2)).is_ok());
        Ok(())
    }

    #[test]
    fn test_dirty_writeback_on_eviction() -> Result<()> {
        let (_dir, path) = setup_file(2);
        let mut pool = BufferPool::new(&path, 1, ReplacementPolicy::Fifo)?;

        let h = pool.pin_page(PageId::new(0))?;
        pool.page_mut(&h)[10] = 0xAB;
        pool.mark_dirty(&h)?;
        pool.unpin_page(&h)?;

        // Loading page 1 evicts the dirty page 0.
        pin_unpin(&mut pool, 1)?;
        assert_eq!(pool.write_count(), 1);

        let h = pool.pin_page(PageId::new(0))?;
        assert_eq!(pool.page(&h)[10], 0xAB);
        pool.unpin_page(&h)?;
        Ok(())
    }

    #[test]
    fn test_force_flush_persists_bytes() -> Result<()> {
        let (_dir, path) = setup_file(2);
        let mut pool = BufferPool::new(&path, 3, ReplacementPolicy::Lru)?;

        let h = pool.pin_page(PageId::new(1))?;
        pool.page_mut(&h)[0..4].copy_from_slice(b"data");
        pool.mark_dirty(&h)?;
        pool.unpin_page(&h)?;
        pool.force_flush()?;

        assert_eq!(pool.dirty_flags(), vec![false, false, false]);

        // The bytes land at the page's physical offset.
        let raw = std::fs::read(&path).unwrap();
        let offset = PageId::new(1).file_offset(PAGE_SIZE) as usize;
        assert_eq!(&raw[offset..offset + 4], b"data");
        Ok(())
    }

    #[test]
    fn test_force_flush_skips_pinned() -> Result<()> {
        let (_dir, path) = setup_file(2);
        let mut pool = BufferPool::new(&path, 3, ReplacementPolicy::Lru)?;

        let h = pool.pin_page(PageId::new(0))?;
        pool.mark_dirty(&h)?;
        pool.force_flush()?;
        assert_eq!(pool.write_count(), 0);
        assert_eq!(pool.dirty_flags()[0], true);

        pool.unpin_page(&h)?;
        pool.force_flush()?;
        assert_eq!(pool.write_count(), 1);
        Ok(())
    }

    #[test]
    fn test_force_page() -> Result<()> {
        let (_dir, path) = setup_file(2);
        let mut pool = BufferPool::new(&path, 3, ReplacementPolicy::Lru)?;

        let h = pool.pin_page(PageId::new(0))?;
        pool.page_mut(&h)[0] = 0x42;
        pool.mark_dirty(&h)?;
        pool.force_page(&h)?;
        assert_eq!(pool.write_count(), 1);
        assert_eq!(pool.dirty_flags()[0], false);
        pool.unpin_page(&h)?;
        Ok(())
    }

    #[test]
    fn test_pin_extends_file() -> Result<()> {
        let (_dir, path) = setup_file(1);
        let mut pool = BufferPool::new(&path, 3, ReplacementPolicy::Lru)?;

        let h = pool.pin_page(PageId::new(4))?;
        assert!(pool.page(&h).iter().all(|&b| b == 0));
        pool.unpin_page(&h)?;
        drop(pool);

        let pf = PageFile::open(&path)?;
        assert_eq!(pf.total_pages(), 5);
        Ok(())
    }

    #[test]
    fn test_close_fails_while_pinned() -> Result<()> {
        let (_dir, path) = setup_file(2);
        let mut pool = BufferPool::new(&path, 3, ReplacementPolicy::Lru)?;

        let h = pool.pin_page(PageId::new(0))?;
        assert!(matches!(pool.close(), Err(StorageError::PoolPinned)));

        pool.unpin_page(&h)?;
        pool.close()?;
        Ok(())
    }

    #[test]
    fn test_stale_handle_operations() -> Result<()> {
        let (_dir, path) = setup_file(3);
        let mut pool = BufferPool::new(&path, 1, ReplacementPolicy::Fifo)?;

        let h0 = pool.pin_page(PageId::new(0))?;
        pool.unpin_page(&h0)?;
        // Page 0 gets evicted by page 1.
        pin_unpin(&mut pool, 1)?;

        assert!(matches!(
            pool.mark_dirty(&h0),
            Err(StorageError::PageNotFound(_))
        ));
        assert!(matches!(
            pool.unpin_page(&h0),
            Err(StorageError::PageNotFound(_))
        ));
        Ok(())
    }
}
