//! Page file store.
//!
//! A page file is a single file on disk partitioned into fixed-size pages
//! of `PAGE_SIZE` bytes. Physical page 0 is a reserved header whose first
//! four bytes hold the number of user pages as a little-endian u32; the
//! rest of the header page is zero. User page `n` is stored at offset
//! `(n + 1) * PAGE_SIZE`.
//!
//! The header on disk is rewritten whenever the file grows, so the stored
//! page count never lags the handle.

use crate::error::{Result, StorageError};
use crate::types::{PageId, PAGE_SIZE};
use log::trace;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// An open page file with positional and cursor-based whole-page IO
pub struct PageFile {
    /// Path the file was opened from
    path: PathBuf,
    /// The underlying file, held open for the lifetime of the handle
    file: File,
    /// Number of user pages in the file
    total_pages: u32,
    /// Current page position for the cursor-based read/write wrappers
    position: u32,
}

impl PageFile {
    /// Create a new page file at `path`.
    ///
    /// The file starts with one zeroed user page. An existing file at the
    /// same path is truncated.
    pub fn create(path: impl AsRef<Path>) -> Result<()> {
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path.as_ref())?;

        let mut header = [0u8; PAGE_SIZE];
        header[0..4].copy_from_slice(&1u32.to_le_bytes());
        file.write_all(&header)?;
        file.write_all(&[0u8; PAGE_SIZE])?;
        file.sync_all()?;
        Ok(())
    }

    /// Open an existing page file.
    ///
    /// Fails with `FileNotFound` if the path does not exist and with
    /// `InvalidMetadata` if the file is too short to hold a header page.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => {
                    StorageError::FileNotFound(path.display().to_string())
                }
                _ => StorageError::Io(e),
            })?;

        if file.metadata()?.len() < PAGE_SIZE as u64 {
            return Err(StorageError::invalid_metadata(format!(
                "{} is shorter than one header page",
                path.display()
            )));
        }

        let mut header = [0u8; 4];
        let mut file = file;
        file.seek(SeekFrom::Start(0))?;
        file.read_exact(&mut header)?;
        let total_pages = u32::from_le_bytes(header);

        Ok(Self {
            path: path.to_path_buf(),
            file,
            total_pages,
            position: 0,
        })
    }

    /// Close the file, syncing any buffered writes
    pub fn close(self) -> Result<()> {
        self.file.sync_all()?;
        Ok(())
    }

    /// Remove the page file at `path`
    pub fn destroy(path: impl AsRef<Path>) -> Result<()> {
        std::fs::remove_file(path.as_ref())?;
        Ok(())
    }

    /// Path this file was opened from
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of user pages in the file
    pub fn total_pages(&self) -> u32 {
        self.total_pages
    }

    /// Current page position of the cursor
    pub fn current_position(&self) -> u32 {
        self.position
    }

    /// Read user page `page` into `buf`.
    ///
    /// `buf` must be exactly `PAGE_SIZE` bytes. Updates the cursor on
    /// success.
    pub fn read_page(&mut self, page: PageId, buf: &mut [u8]) -> Result<()> {
        assert_eq!(buf.len(), PAGE_SIZE, "page buffer must be PAGE_SIZE bytes");
        if page.value() >= self.total_pages {
            return Err(StorageError::PageNotFound(page));
        }

        self.file.seek(SeekFrom::Start(page.file_offset(PAGE_SIZE)))?;
        self.file.read_exact(buf)?;
        self.position = page.value();
        Ok(())
    }

    /// Write `buf` to user page `page`.
    ///
    /// `buf` must be exactly `PAGE_SIZE` bytes. Updates the cursor on
    /// success.
    pub fn write_page(&mut self, page: PageId, buf: &[u8]) -> Result<()> {
        assert_eq!(buf.len(), PAGE_SIZE, "page buffer must be PAGE_SIZE bytes");
        if page.value() >= self.total_pages {
            return Err(StorageError::PageNotFound(page));
        }

        self.file.seek(SeekFrom::Start(page.file_offset(PAGE_SIZE)))?;
        self.file.write_all(buf)?;
        self.position = page.value();
        Ok(())
    }

    /// Read the first user page
    pub fn read_first_page(&mut self, buf: &mut [u8]) -> Result<()> {
        self.read_page(PageId::new(0), buf)
    }

    /// Read the last user page
    pub fn read_last_page(&mut self, buf: &mut [u8]) -> Result<()> {
        let last = self
            .total_pages
            .checked_sub(1)
            .ok_or(StorageError::PageNotFound(PageId::NONE))?;
        self.read_page(PageId::new(last), buf)
    }

    /// Read the page at the current cursor position
    pub fn read_current_page(&mut self, buf: &mut [u8]) -> Result<()> {
        self.read_page(PageId::new(self.position), buf)
    }

    /// Read the page after the cursor position
    pub fn read_next_page(&mut self, buf: &mut [u8]) -> Result<()> {
        self.read_page(PageId::new(self.position + 1), buf)
    }

    /// Read the page before the cursor position
    pub fn read_previous_page(&mut self, buf: &mut [u8]) -> Result<()> {
        let prev = self
            .position
            .checked_sub(1)
            .ok_or(StorageError::PageNotFound(PageId::NONE))?;
        self.read_page(PageId::new(prev), buf)
    }

    /// Write `buf` to the page at the current cursor position
    pub fn write_current_page(&mut self, buf: &[u8]) -> Result<()> {
        self.write_page(PageId::new(self.position), buf)
    }

    /// Append one zeroed user page at the end of the file.
    ///
    /// The header's page count is persisted immediately.
    pub fn append_empty_page(&mut self) -> Result<()> {
        self.file.seek(SeekFrom::End(0))?;
        self.file.write_all(&[0u8; PAGE_SIZE])?;
        self.total_pages += 1;
        self.flush_header()?;
        trace!(
            "appended empty page to {} (now {} pages)",
            self.path.display(),
            self.total_pages
        );
        Ok(())
    }

    /// Append empty pages until the file holds at least `pages` user pages
    pub fn ensure_capacity(&mut self, pages: u32) -> Result<()> {
        while self.total_pages < pages {
            self.append_empty_page()?;
        }
        Ok(())
    }

    /// Rewrite the stored page count in the header page
    fn flush_header(&mut self) -> Result<()> {
        self.file.seek(SeekFrom::Start(0))?;
        self.file.write_all(&self.total_pages.to_le_bytes())?;
        Ok(())
    }
}
