//! Slotted data pages.
//!
//! ```text
//! +----------------------+ 0
//! |    Page Header       | 16 bytes
//! +----------------------+ 16
//! |  Record-Set Header   | 8 bytes, referenced by slot 0
//! +----------------------+ 24
//! |    Record Data       | grows forward, ends at end_data_offset
//! |        ...           |
//! +----------------------+
//! |    Free Space        |
//! +----------------------+
//! |    Guard Slot        | reserved, never written
//! |    Slot Array        | 4 bytes per slot, grows backward
//! |      [slot 2]        |
//! |      [slot 1]        |
//! |      [slot 0]        | record-set header
//! +----------------------+ page_size
//! ```
//!
//! Deleting a record compacts the slot array but leaves its payload in the
//! data area. Those bytes are reclaimed by [`DataPage::compress`], which runs
//! only when an insertion no longer fits.

use super::codec::{ByteReader, ByteWriter};
use super::constants::{
    DATA_START, PAGE_HEADER_SIZE, PAGE_MAGIC, RECORD_SET_CORRECTION, RECORD_SET_HEADER_SIZE,
    RESERVED_SLOTS, SLOT_SIZE,
};
use super::PageNo;
use crate::error::{IndexError, IndexResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PageHeader {
    pub page_id: u32,
    pub free_space: u16,
    pub end_data_offset: u16,
    /// Live records plus [`RECORD_SET_CORRECTION`].
    pub record_count: u16,
    /// Payloads orphaned by deletes since the last compression.
    pub vacant_record_count: u16,
    pub magic: u32,
}

impl PageHeader {
    fn empty(page_id: u32, page_size: usize) -> Self {
        Self {
            page_id,
            free_space: (page_size - DATA_START - RESERVED_SLOTS * SLOT_SIZE) as u16,
            end_data_offset: DATA_START as u16,
            record_count: RECORD_SET_CORRECTION,
            vacant_record_count: 0,
            magic: PAGE_MAGIC,
        }
    }

    fn read(buf: &[u8]) -> IndexResult<Self> {
        let mut reader = ByteReader::new(buf);
        Ok(Self {
            page_id: reader.read_u32()?,
            free_space: reader.read_u16()?,
            end_data_offset: reader.read_u16()?,
            record_count: reader.read_u16()?,
            vacant_record_count: reader.read_u16()?,
            magic: reader.read_u32()?,
        })
    }

    fn write(&self, buf: &mut [u8]) -> IndexResult<()> {
        let mut writer = ByteWriter::new(buf);
        writer.write_u32(self.page_id)?;
        writer.write_u16(self.free_space)?;
        writer.write_u16(self.end_data_offset)?;
        writer.write_u16(self.record_count)?;
        writer.write_u16(self.vacant_record_count)?;
        writer.write_u32(self.magic)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RecordSetHeader {
    pub root: bool,
    pub level: u16,
}

impl RecordSetHeader {
    fn read(buf: &[u8], offset: usize) -> IndexResult<Self> {
        let mut reader = ByteReader::at(buf, offset);
        let root = reader.read_u8()? != 0;
        let _reserved = reader.read_u8()?;
        let level = reader.read_u16()?;
        let _placeholder = reader.read_u32()?;
        Ok(Self { root, level })
    }

    fn write(&self, buf: &mut [u8], offset: usize) -> IndexResult<()> {
        let mut writer = ByteWriter::at(buf, offset);
        writer.write_u8(self.root as u8)?;
        writer.write_u8(0)?;
        writer.write_u16(self.level)?;
        writer.write_u32(0)
    }
}

/// A page loaded into an owned buffer.
///
/// Mutations update the buffer in place and mark the page dirty; the page
/// file writes it back on flush.
#[derive(Debug, Clone)]
pub(crate) struct DataPage {
    page_no: PageNo,
    buf: Vec<u8>,
    header: PageHeader,
    record_set: RecordSetHeader,
    dirty: bool,
}

impl DataPage {
    /// Number of fixed-size records of `record_size` bytes a page can hold.
    pub fn capacity(page_size: usize, record_size: usize) -> usize {
        (page_size - PAGE_HEADER_SIZE - RECORD_SET_HEADER_SIZE - RESERVED_SLOTS * SLOT_SIZE)
            / (record_size + SLOT_SIZE)
    }

    /// A zero-filled page with its headers written. The page starts dirty.
    pub fn init_empty(
        page_no: PageNo,
        page_size: usize,
        level: u16,
        root: bool,
    ) -> IndexResult<Self> {
        let mut page = Self {
            page_no,
            buf: vec![0u8; page_size],
            header: PageHeader::empty(page_no, page_size),
            record_set: RecordSetHeader { root, level },
            dirty: true,
        };
        page.format_empty()?;
        Ok(page)
    }

    /// Decodes the page and record-set headers of a page read from disk.
    pub fn from_bytes(page_no: PageNo, buf: Vec<u8>) -> IndexResult<Self> {
        let header = PageHeader::read(&buf)?;
        if header.magic != PAGE_MAGIC {
            return Err(IndexError::Corrupted(format!(
                "page {} has bad magic {:#x}",
                page_no, header.magic
            )));
        }
        if header.page_id != page_no {
            return Err(IndexError::Corrupted(format!(
                "page {} claims to be page {}",
                page_no, header.page_id
            )));
        }
        let slot_area = SLOT_SIZE * (header.record_count as usize + 1);
        if header.record_count < RECORD_SET_CORRECTION
            || (header.end_data_offset as usize) < DATA_START
            || header.end_data_offset as usize + slot_area > buf.len()
            || header.free_space as usize
                != buf.len() - header.end_data_offset as usize - slot_area
        {
            return Err(IndexError::Corrupted(format!(
                "page {} header is inconsistent: {:?}",
                page_no, header
            )));
        }

        let (offset, _) = read_slot(&buf, 0)?;
        let record_set = RecordSetHeader::read(&buf, offset as usize)?;
        Ok(Self {
            page_no,
            buf,
            header,
            record_set,
            dirty: false,
        })
    }

    pub fn page_no(&self) -> PageNo {
        self.page_no
    }

    pub fn page_size(&self) -> usize {
        self.buf.len()
    }

    pub fn level(&self) -> u16 {
        self.record_set.level
    }

    pub fn is_root(&self) -> bool {
        self.record_set.root
    }

    /// Live records, excluding the record-set header.
    pub fn len(&self) -> usize {
        (self.header.record_count - RECORD_SET_CORRECTION) as usize
    }

    #[cfg(test)]
    pub fn header(&self) -> &PageHeader {
        &self.header
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Raw bytes of live record `id`.
    pub fn record_bytes(&self, id: usize) -> IndexResult<&[u8]> {
        self.check_id(id)?;
        let (offset, length) = read_slot(&self.buf, id + 1)?;
        let (start, end) = (offset as usize, offset as usize + length as usize);
        if start < DATA_START || end > self.header.end_data_offset as usize {
            return Err(IndexError::Corrupted(format!(
                "slot {} of page {} points outside the data area ({}..{})",
                id + 1,
                self.page_no,
                start,
                end
            )));
        }
        Ok(&self.buf[start..end])
    }

    /// Appends a record, compressing the page first when deleted payloads
    /// hold the space it needs.
    pub fn insert_record(&mut self, bytes: &[u8]) -> IndexResult<usize> {
        let needed = bytes.len() + SLOT_SIZE;
        if (self.header.free_space as usize) < needed && self.header.vacant_record_count > 0 {
            self.compress()?;
        }
        if (self.header.free_space as usize) < needed {
            return Err(IndexError::InvalidOperation(format!(
                "page {} is full ({} bytes free, {} needed)",
                self.page_no, self.header.free_space, needed
            )));
        }

        let offset = self.header.end_data_offset as usize;
        self.buf[offset..offset + bytes.len()].copy_from_slice(bytes);
        let slot = self.header.record_count as usize;
        write_slot(&mut self.buf, slot, offset as u16, bytes.len() as u16)?;

        self.header.end_data_offset += bytes.len() as u16;
        self.header.free_space -= needed as u16;
        self.header.record_count += 1;
        self.store_header()?;
        Ok(slot - 1)
    }

    /// Overwrites a record with bytes of exactly the same length.
    pub fn overwrite_record(&mut self, id: usize, bytes: &[u8]) -> IndexResult<()> {
        self.check_id(id)?;
        let (offset, length) = read_slot(&self.buf, id + 1)?;
        if length as usize != bytes.len() {
            return Err(IndexError::InvalidOperation(format!(
                "cannot overwrite a {} byte record with {} bytes",
                length,
                bytes.len()
            )));
        }
        let offset = offset as usize;
        self.buf[offset..offset + bytes.len()].copy_from_slice(bytes);
        self.dirty = true;
        Ok(())
    }

    /// Removes the slot of record `id`; later records shift down by one id.
    pub fn delete_record(&mut self, id: usize) -> IndexResult<()> {
        self.check_id(id)?;
        let last = self.header.record_count as usize - 1;
        for slot in id + 1..last {
            let (offset, length) = read_slot(&self.buf, slot + 1)?;
            write_slot(&mut self.buf, slot, offset, length)?;
        }
        write_slot(&mut self.buf, last, 0, 0)?;

        self.header.record_count -= 1;
        self.header.vacant_record_count += 1;
        self.header.free_space += SLOT_SIZE as u16;
        self.store_header()
    }

    /// Rewrites the live records contiguously, reclaiming deleted payloads.
    pub fn compress(&mut self) -> IndexResult<()> {
        let records = (0..self.len())
            .map(|id| self.record_bytes(id).map(<[u8]>::to_vec))
            .collect::<IndexResult<Vec<_>>>()?;
        log::trace!(
            "compressing page {}: {} live, {} vacant",
            self.page_no,
            records.len(),
            self.header.vacant_record_count
        );

        self.clear()?;
        for record in &records {
            self.insert_record(record)?;
        }
        Ok(())
    }

    /// Drops every record, keeping the page number, level and root flag.
    pub fn clear(&mut self) -> IndexResult<()> {
        self.buf.fill(0);
        self.header = PageHeader::empty(self.page_no, self.buf.len());
        self.format_empty()
    }

    /// Re-initializes the page as an empty page at another level.
    pub fn reinit(&mut self, level: u16, root: bool) -> IndexResult<()> {
        self.record_set = RecordSetHeader { root, level };
        self.clear()
    }

    /// A copy of this page's contents stored under a different page number.
    pub fn relocate(&self, page_no: PageNo) -> IndexResult<DataPage> {
        let mut page = self.clone();
        page.page_no = page_no;
        page.header.page_id = page_no;
        page.record_set.root = false;
        page.store_header()?;
        let (offset, _) = read_slot(&page.buf, 0)?;
        page.record_set.write(&mut page.buf, offset as usize)?;
        Ok(page)
    }

    fn check_id(&self, id: usize) -> IndexResult<()> {
        if id >= self.len() {
            return Err(IndexError::OutOfBounds {
                id,
                count: self.len(),
            });
        }
        Ok(())
    }

    fn store_header(&mut self) -> IndexResult<()> {
        self.header.write(&mut self.buf)?;
        self.dirty = true;
        Ok(())
    }

    fn format_empty(&mut self) -> IndexResult<()> {
        self.header.write(&mut self.buf)?;
        self.record_set.write(&mut self.buf, PAGE_HEADER_SIZE)?;
        write_slot(
            &mut self.buf,
            0,
            PAGE_HEADER_SIZE as u16,
            RECORD_SET_HEADER_SIZE as u16,
        )?;
        self.dirty = true;
        Ok(())
    }
}

fn slot_position(page_size: usize, slot: usize) -> usize {
    page_size - SLOT_SIZE * (slot + 1)
}

fn read_slot(buf: &[u8], slot: usize) -> IndexResult<(u16, u16)> {
    let mut reader = ByteReader::at(buf, slot_position(buf.len(), slot));
    Ok((reader.read_u16()?, reader.read_u16()?))
}

fn write_slot(buf: &mut [u8], slot: usize, offset: u16, length: u16) -> IndexResult<()> {
    let position = slot_position(buf.len(), slot);
    let mut writer = ByteWriter::at(buf, position);
    writer.write_u16(offset)?;
    writer.write_u16(length)
}
