//! Typed views over data pages.
//!
//! A [`LeafPage`] holds point or rectangle records; a [`ChildPage`] holds
//! entries pointing at child pages. Both share the slot logic of
//! [`DataPage`] and differ only in the record codec they apply.

use std::marker::PhantomData;

use super::data_page::DataPage;
use super::record::{EntryRecord, LeafRecord, PageRecord, RecordFormat};
use super::PageNo;
use crate::envelope::Envelope;
use crate::error::IndexResult;

pub(crate) struct RecordPage<R: PageRecord> {
    page: DataPage,
    format: RecordFormat,
    _record: PhantomData<R>,
}

pub(crate) type LeafPage = RecordPage<LeafRecord>;
pub(crate) type ChildPage = RecordPage<EntryRecord>;

impl<R: PageRecord> RecordPage<R> {
    pub fn new(page: DataPage, format: RecordFormat) -> Self {
        Self {
            page,
            format,
            _record: PhantomData,
        }
    }

    pub fn format(&self) -> RecordFormat {
        self.format
    }

    pub fn page_mut(&mut self) -> &mut DataPage {
        &mut self.page
    }

    pub fn page_no(&self) -> PageNo {
        self.page.page_no()
    }

    pub fn level(&self) -> u16 {
        self.page.level()
    }

    pub fn len(&self) -> usize {
        self.page.len()
    }

    pub fn capacity(&self) -> usize {
        DataPage::capacity(self.page.page_size(), self.format.record_size())
    }

    pub fn has_room(&self) -> bool {
        self.len() < self.capacity()
    }

    pub fn record(&self, id: usize) -> IndexResult<R> {
        R::from_bytes(self.page.record_bytes(id)?, self.format)
    }

    pub fn records(&self) -> IndexResult<Vec<R>> {
        (0..self.len()).map(|id| self.record(id)).collect()
    }

    pub fn insert_record(&mut self, record: &R) -> IndexResult<usize> {
        let bytes = record.to_bytes(self.format)?;
        self.page.insert_record(&bytes)
    }

    pub fn delete_record(&mut self, id: usize) -> IndexResult<()> {
        self.page.delete_record(id)
    }

    pub fn clear(&mut self) -> IndexResult<()> {
        self.page.clear()
    }

    /// Union of every live record's envelope; empty when the page holds none.
    pub fn envelope(&self) -> IndexResult<Envelope> {
        let mut envelope = Envelope::empty();
        for id in 0..self.len() {
            envelope.expand(&self.record(id)?.envelope());
        }
        Ok(envelope)
    }
}

impl ChildPage {
    /// Overwrites entry `id` in place. Entries are fixed-size, so this never
    /// needs compression.
    pub fn update_entry(&mut self, entry: &EntryRecord, id: usize) -> IndexResult<()> {
        let bytes = entry.to_bytes(self.format)?;
        self.page.overwrite_record(id, &bytes)
    }
}
