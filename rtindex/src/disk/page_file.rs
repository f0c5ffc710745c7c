//! Disk storage layer for the paged index file.
//!
//! Page 0 holds the [`FileHeader`]; data pages follow from page 1. New pages
//! are always appended: the next free page number is the file length divided
//! by the page size, and deleted pages are never reused.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use super::constants::{HEADER_PROBE_SIZE, LEAF_LEVEL, ROOT_PAGE_NO};
use super::data_page::DataPage;
use super::header_page::FileHeader;
use super::record::{RecordFormat, RecordKind};
use super::PageNo;
use crate::config::{CreateOptions, OpenMode, Precision, RecordType};
use crate::error::{IndexError, IndexResult};

/// Handles reading and writing individual pages of the index file.
///
/// Pages are read one at a time on demand; nothing is cached between calls.
pub(crate) struct PageFile {
    file: File,
    path: PathBuf,
    header: FileHeader,
    page_size: usize,
    free_page_no: PageNo,
    writable: bool,
}

impl PageFile {
    /// Create a new index file holding the header page and an empty root leaf.
    pub fn create(path: &Path, record_type: RecordType, options: &CreateOptions) -> IndexResult<()> {
        options.validate()?;
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;

        let mut header = FileHeader::new(record_type, options);
        header.free_page_no = ROOT_PAGE_NO + 1;
        file.write_all(&header.to_page()?)?;

        let root = DataPage::init_empty(ROOT_PAGE_NO, options.page_size, LEAF_LEVEL, true)?;
        file.write_all(root.as_bytes())?;
        file.sync_all()?;
        Ok(())
    }

    /// Open an existing index file. Only the header is read.
    pub fn open(path: &Path, mode: OpenMode) -> IndexResult<Self> {
        let mut file = OpenOptions::new()
            .read(true)
            .write(mode.is_writable())
            .open(path)?;

        let length = file.metadata()?.len();
        let mut probe = vec![0u8; HEADER_PROBE_SIZE.min(length as usize)];
        file.read_exact(&mut probe)?;
        let header = FileHeader::from_bytes(&probe)?;
        let page_size = header.page_size as usize;

        if length % page_size as u64 != 0 || length < 2 * page_size as u64 {
            return Err(IndexError::Corrupted(format!(
                "index file length {} is not a whole number of {} byte pages",
                length, page_size
            )));
        }

        Ok(Self {
            file,
            path: path.to_path_buf(),
            header,
            page_size,
            free_page_no: (length / page_size as u64) as PageNo,
            writable: mode.is_writable(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn header(&self) -> &FileHeader {
        &self.header
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn record_type(&self) -> RecordType {
        self.header.record_type
    }

    pub fn precision(&self) -> Precision {
        self.header.precision()
    }

    /// Next page number to be appended; also the number of pages in the file.
    pub fn free_page_no(&self) -> PageNo {
        self.free_page_no
    }

    pub fn leaf_format(&self) -> RecordFormat {
        RecordFormat::new(self.record_type().into(), self.precision())
    }

    pub fn entry_format(&self) -> RecordFormat {
        RecordFormat::new(RecordKind::Entry, self.precision())
    }

    /// Read a single data page (one seek, one read).
    pub fn read_page(&mut self, page_no: PageNo) -> IndexResult<DataPage> {
        if page_no == 0 || page_no >= self.free_page_no {
            return Err(IndexError::InvalidOperation(format!(
                "page {} is not a data page (file holds {} pages)",
                page_no, self.free_page_no
            )));
        }
        self.file.seek(SeekFrom::Start(self.offset_of(page_no)))?;
        let mut buffer = vec![0u8; self.page_size];
        self.file.read_exact(&mut buffer)?;
        DataPage::from_bytes(page_no, buffer)
    }

    /// Reserve the next page number at the end of the file.
    pub fn allocate_page_no(&mut self) -> IndexResult<PageNo> {
        self.check_writable()?;
        let page_no = self.free_page_no;
        self.free_page_no += 1;
        Ok(page_no)
    }

    /// Append a fresh, empty, non-root page.
    pub fn allocate_page(&mut self, level: u16) -> IndexResult<DataPage> {
        let page_no = self.allocate_page_no()?;
        DataPage::init_empty(page_no, self.page_size, level, false)
    }

    /// Write a page back if it is dirty.
    pub fn flush_page(&mut self, page: &mut DataPage) -> IndexResult<()> {
        if !page.is_dirty() {
            return Ok(());
        }
        self.check_writable()?;
        log::trace!("flushing page {} of {:?}", page.page_no(), self.path);
        self.file.seek(SeekFrom::Start(self.offset_of(page.page_no())))?;
        self.file.write_all(page.as_bytes())?;
        page.mark_clean();
        Ok(())
    }

    /// Rewrite the header page with the current free-page pointer.
    pub fn write_header(&mut self) -> IndexResult<()> {
        self.check_writable()?;
        self.header.free_page_no = self.free_page_no;
        let bytes = self.header.to_page()?;
        self.file.seek(SeekFrom::Start(0))?;
        self.file.write_all(&bytes)?;
        Ok(())
    }

    /// Persist the header and sync the file. A no-op for read-only files.
    pub fn sync(&mut self) -> IndexResult<()> {
        if !self.writable {
            return Ok(());
        }
        self.write_header()?;
        self.file.sync_all()?;
        Ok(())
    }

    fn offset_of(&self, page_no: PageNo) -> u64 {
        page_no as u64 * self.page_size as u64
    }

    fn check_writable(&self) -> IndexResult<()> {
        if self.writable {
            Ok(())
        } else {
            Err(IndexError::ReadOnly)
        }
    }
}
