//! Recursive R-tree algorithms over loaded pages.
//!
//! A [`Node`] wraps one page read from disk for the duration of a single
//! operation. Every mutation is flushed before the node is dropped.

use super::constants::{LEAF_LEVEL, ROOT_PAGE_NO};
use super::data_page::DataPage;
use super::page_file::PageFile;
use super::record::{EntryRecord, LeafRecord, PageRecord};
use super::record_page::{ChildPage, LeafPage, RecordPage};
use super::split::quad_split;
use super::{BlockNo, PageNo};
use crate::envelope::Envelope;
use crate::error::{IndexError, IndexResult};

pub(crate) enum Node {
    Leaf(LeafPage),
    Child(ChildPage),
}

impl Node {
    pub fn load(file: &mut PageFile, page_no: PageNo) -> IndexResult<Self> {
        let page = file.read_page(page_no)?;
        Ok(Self::from_page(file, page))
    }

    pub fn root(file: &mut PageFile) -> IndexResult<Self> {
        let page = file.read_page(ROOT_PAGE_NO)?;
        if !page.is_root() {
            return Err(IndexError::Corrupted(format!(
                "page {} is not flagged as the root",
                ROOT_PAGE_NO
            )));
        }
        Ok(Self::from_page(file, page))
    }

    fn from_page(file: &PageFile, page: DataPage) -> Self {
        if page.level() <= LEAF_LEVEL {
            Node::Leaf(LeafPage::new(page, file.leaf_format()))
        } else {
            Node::Child(ChildPage::new(page, file.entry_format()))
        }
    }

    pub fn level(&self) -> u16 {
        match self {
            Node::Leaf(page) => page.level(),
            Node::Child(page) => page.level(),
        }
    }

    /// MBR of every record or entry in this node.
    pub fn envelope(&self) -> IndexResult<Envelope> {
        match self {
            Node::Leaf(page) => page.envelope(),
            Node::Child(page) => page.envelope(),
        }
    }

    fn page_mut(&mut self) -> &mut DataPage {
        match self {
            Node::Leaf(page) => page.page_mut(),
            Node::Child(page) => page.page_mut(),
        }
    }

    fn flush(&mut self, file: &mut PageFile) -> IndexResult<()> {
        file.flush_page(self.page_mut())
    }

    /// Inserts a leaf record below this node.
    ///
    /// Returns the entry for a new right sibling when this node split; the
    /// caller adds it next to its own entry for this node.
    pub fn insert(
        &mut self,
        file: &mut PageFile,
        record: &LeafRecord,
    ) -> IndexResult<Option<EntryRecord>> {
        match self {
            Node::Leaf(page) => insert_or_split(page, file, *record),
            Node::Child(page) => {
                let target = record.envelope();
                let index = choose_subtree(page, &target)?;
                let mut entry = page.record(index)?;
                let child_no = entry.child.ok_or_else(|| {
                    IndexError::Corrupted(format!(
                        "entry {} of page {} has no child",
                        index,
                        page.page_no()
                    ))
                })?;

                let mut child = Node::load(file, child_no)?;
                let split = child.insert(file, record)?;
                let child_envelope = child.envelope()?;

                match split {
                    Some(sibling) => {
                        entry.envelope = child_envelope;
                        page.update_entry(&entry, index)?;
                        insert_or_split(page, file, sibling)
                    }
                    None => {
                        if !entry.envelope.contains(&child_envelope) {
                            entry.envelope = child_envelope;
                            page.update_entry(&entry, index)?;
                            file.flush_page(page.page_mut())?;
                        }
                        Ok(None)
                    }
                }
            }
        }
    }

    /// Moves the root's contents to a fresh page and rewrites page 1 as an
    /// internal root one level higher over the old root and `sibling`.
    pub fn grow_root(file: &mut PageFile, sibling: EntryRecord) -> IndexResult<()> {
        let root = file.read_page(ROOT_PAGE_NO)?;
        let level = root.level();
        let relocated_no = file.allocate_page_no()?;
        let mut relocated = Self::from_page(file, root.relocate(relocated_no)?);
        let relocated_envelope = relocated.envelope()?;
        relocated.flush(file)?;

        let mut new_root = ChildPage::new(root, file.entry_format());
        new_root.page_mut().reinit(level + 1, true)?;
        new_root.insert_record(&EntryRecord::new(relocated_envelope, relocated_no))?;
        new_root.insert_record(&sibling)?;
        file.flush_page(new_root.page_mut())?;

        log::debug!(
            "root split into pages {} and {:?}; tree height is now {}",
            relocated_no,
            sibling.child,
            level + 1
        );
        Ok(())
    }

    /// Removes the first leaf record whose geometry equals `target`.
    pub fn delete(&mut self, file: &mut PageFile, target: &LeafRecord) -> IndexResult<bool> {
        match self {
            Node::Leaf(page) => {
                for id in 0..page.len() {
                    if page.record(id)?.same_geometry(target) {
                        page.delete_record(id)?;
                        file.flush_page(page.page_mut())?;
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Node::Child(page) => {
                for entry in page.records()? {
                    let Some(child_no) = entry.child else {
                        continue;
                    };
                    if !covers(&entry.envelope, target) {
                        continue;
                    }
                    if Node::load(file, child_no)?.delete(file, target)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
        }
    }

    /// Collects the data ids of records overlapping `query`.
    pub fn fill_overlaps(
        &self,
        file: &mut PageFile,
        query: &Envelope,
        out: &mut Vec<BlockNo>,
    ) -> IndexResult<()> {
        self.visit(file, query, out, &|record, query| {
            record.envelope().intersects(query)
        })
    }

    /// Collects the data ids of records lying entirely inside `query`.
    pub fn fill_contains(
        &self,
        file: &mut PageFile,
        query: &Envelope,
        out: &mut Vec<BlockNo>,
    ) -> IndexResult<()> {
        self.visit(file, query, out, &|record, query| {
            query.contains(&record.envelope())
        })
    }

    /// Collects every data id below this node.
    pub fn fill_all(&self, file: &mut PageFile, out: &mut Vec<BlockNo>) -> IndexResult<()> {
        match self {
            Node::Leaf(page) => {
                for record in page.records()? {
                    out.push(record.data_id());
                }
            }
            Node::Child(page) => {
                for entry in page.records()? {
                    if let Some(child_no) = entry.child {
                        Node::load(file, child_no)?.fill_all(file, out)?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Pruned traversal shared by the overlap and containment searches.
    ///
    /// Subtrees outside `query` are skipped; subtrees fully inside it are
    /// collected wholesale without further comparisons.
    fn visit(
        &self,
        file: &mut PageFile,
        query: &Envelope,
        out: &mut Vec<BlockNo>,
        matches: &dyn Fn(&LeafRecord, &Envelope) -> bool,
    ) -> IndexResult<()> {
        match self {
            Node::Leaf(page) => {
                for record in page.records()? {
                    if matches(&record, query) {
                        out.push(record.data_id());
                    }
                }
            }
            Node::Child(page) => {
                for entry in page.records()? {
                    let Some(child_no) = entry.child else {
                        continue;
                    };
                    if !entry.envelope.intersects(query) {
                        continue;
                    }
                    let child = Node::load(file, child_no)?;
                    if query.contains(&entry.envelope) {
                        child.fill_all(file, out)?;
                    } else {
                        child.visit(file, query, out, matches)?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Number of leaf records below this node.
    pub fn all_record_count(&self, file: &mut PageFile) -> IndexResult<u64> {
        match self {
            Node::Leaf(page) => Ok(page.len() as u64),
            Node::Child(page) => {
                let mut total = 0;
                for entry in page.records()? {
                    if let Some(child_no) = entry.child {
                        total += Node::load(file, child_no)?.all_record_count(file)?;
                    }
                }
                Ok(total)
            }
        }
    }
}

/// Whether a subtree with MBR `envelope` may hold `target`.
fn covers(envelope: &Envelope, target: &LeafRecord) -> bool {
    match target {
        LeafRecord::Point(p) => envelope.contains_point(p.x, p.y),
        LeafRecord::Rectangle(r) => envelope.contains(&r.envelope),
    }
}

/// The entry needing the least enlargement to cover `target`, ties broken
/// by the smaller current area.
fn choose_subtree(page: &ChildPage, target: &Envelope) -> IndexResult<usize> {
    let mut best: Option<(usize, f64, f64)> = None;
    for (index, entry) in page.records()?.iter().enumerate() {
        if entry.child.is_none() {
            continue;
        }
        let enlargement = entry.envelope.enlargement(target);
        let area = entry.envelope.area();
        let better = match best {
            None => true,
            Some((_, best_enlargement, best_area)) => {
                enlargement < best_enlargement
                    || (enlargement == best_enlargement && area < best_area)
            }
        };
        if better {
            best = Some((index, enlargement, area));
        }
    }
    best.map(|(index, _, _)| index).ok_or_else(|| {
        IndexError::Corrupted(format!("internal page {} has no children", page.page_no()))
    })
}

/// Inserts `item` if the page has room; otherwise splits the page's items
/// plus `item` between this page and a freshly appended sibling.
fn insert_or_split<R: PageRecord>(
    page: &mut RecordPage<R>,
    file: &mut PageFile,
    item: R,
) -> IndexResult<Option<EntryRecord>> {
    if page.has_room() {
        page.insert_record(&item)?;
        file.flush_page(page.page_mut())?;
        return Ok(None);
    }

    let capacity = page.capacity();
    let mut items = page.records()?;
    items.push(item);
    let envelopes: Vec<Envelope> = items.iter().map(PageRecord::envelope).collect();
    let (left, right) = quad_split(&envelopes, capacity);

    page.clear()?;
    for &index in &left {
        page.insert_record(&items[index])?;
    }

    let level = page.level();
    let mut sibling = RecordPage::<R>::new(file.allocate_page(level)?, page.format());
    for &index in &right {
        sibling.insert_record(&items[index])?;
    }

    file.flush_page(page.page_mut())?;
    file.flush_page(sibling.page_mut())?;
    log::trace!(
        "split page {} at level {}: {} stay, {} move to page {}",
        page.page_no(),
        level,
        left.len(),
        right.len(),
        sibling.page_no()
    );
    Ok(Some(EntryRecord::new(sibling.envelope()?, sibling.page_no())))
}
