//! The public index handle.

use parking_lot::Mutex;
use std::cmp::Ordering;
use std::io;
use std::path::{Path, PathBuf};

use crate::config::{CreateOptions, OpenMode, Precision, RecordType};
use crate::disk::id_store::IdStore;
use crate::disk::node::Node;
use crate::disk::page_file::PageFile;
use crate::disk::record::{LeafRecord, PointRecord, RectangleRecord};
use crate::disk::{BlockNo, FileHeader, PageNo};
use crate::envelope::Envelope;
use crate::error::{IndexError, IndexResult};
use crate::files;
use crate::geometry::Geometry;

/// Summary of an open index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexStats {
    pub record_type: RecordType,
    pub precision: Precision,
    pub page_size: usize,
    /// Pages in the index file, header page included.
    pub page_count: PageNo,
    /// Levels from the root down to the leaves; 1 for a lone root leaf.
    pub tree_height: u16,
    pub record_count: u64,
    /// Next block the identifier store will hand out.
    pub next_id_block: BlockNo,
}

struct OpenIndex {
    mode: OpenMode,
    file: PageFile,
    ids: IdStore,
}

impl OpenIndex {
    fn sync(&mut self) -> IndexResult<()> {
        self.file.sync()?;
        self.ids.sync()
    }

    fn check_writable(&self) -> IndexResult<()> {
        if self.mode.is_writable() {
            Ok(())
        } else {
            Err(IndexError::ReadOnly)
        }
    }

    fn resolve(&mut self, mut blocks: Vec<BlockNo>) -> IndexResult<Vec<String>> {
        blocks.sort_unstable();
        let mut ids = blocks
            .into_iter()
            .map(|block| self.ids.id(block))
            .collect::<IndexResult<Vec<_>>>()?;
        sort_ids(&mut ids);
        Ok(ids)
    }
}

/// A disk-resident R-tree mapping points or rectangles to string ids.
///
/// The handle is created closed; [`RTreeIndex::open`] attaches it to the
/// `.idx`/`.ids` pair and [`RTreeIndex::close`] releases both files. Every
/// query or mutation on a closed handle fails with [`IndexError::Closed`].
///
/// ```rust,no_run
/// use rtindex::{CreateOptions, Envelope, Geometry, OpenMode, RTreeIndex, RecordType};
///
/// # fn main() -> rtindex::IndexResult<()> {
/// let index = RTreeIndex::create("cities", RecordType::Point, &CreateOptions::default())?;
/// index.push(&Geometry::point(2.35, 48.85), "paris")?;
/// index.close()?;
///
/// index.open(OpenMode::ReadOnly)?;
/// let found = index.intersections(&Envelope::new(0.0, 40.0, 10.0, 50.0))?;
/// assert_eq!(found, vec!["paris".to_string()]);
/// # Ok(())
/// # }
/// ```
pub struct RTreeIndex {
    path: PathBuf,
    state: Mutex<Option<OpenIndex>>,
}

impl RTreeIndex {
    /// Creates both index files and returns the index opened read-write.
    ///
    /// An existing pair at `path` is replaced only when `options.overwrite`
    /// is set; otherwise this fails with [`IndexError::AlreadyExists`].
    pub fn create(
        path: impl AsRef<Path>,
        record_type: RecordType,
        options: &CreateOptions,
    ) -> IndexResult<Self> {
        options.validate()?;
        let entry = files::entry(path);
        if files::any_exists(&entry) {
            if !options.overwrite {
                return Err(IndexError::AlreadyExists(entry));
            }
            files::clean(&entry)?;
        }

        PageFile::create(&files::idx_path(&entry), record_type, options)?;
        IdStore::create(&files::ids_path(&entry))?;
        log::debug!(
            "created {} index {:?} ({} byte pages, {:?} precision)",
            record_type,
            entry,
            options.page_size,
            options.precision
        );

        let index = Self::new(entry);
        index.open(OpenMode::ReadWrite)?;
        Ok(index)
    }

    /// A closed handle for the index at `path`.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: files::entry(path),
            state: Mutex::new(None),
        }
    }

    /// Shorthand for [`RTreeIndex::new`] followed by [`RTreeIndex::open`].
    pub fn open_path(path: impl AsRef<Path>, mode: OpenMode) -> IndexResult<Self> {
        let index = Self::new(path);
        index.open(mode)?;
        Ok(index)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Opens both files in `mode`.
    ///
    /// Does nothing when the index is already open in `mode`. An index open
    /// in the other mode is closed and reopened.
    pub fn open(&self, mode: OpenMode) -> IndexResult<()> {
        let mut state = self.state.lock();
        if let Some(open) = state.as_mut() {
            if open.mode == mode {
                return Ok(());
            }
            open.sync()?;
            *state = None;
        }

        let idx_path = files::idx_path(&self.path);
        let ids_path = files::ids_path(&self.path);
        for path in [&idx_path, &ids_path] {
            if !path.is_file() {
                return Err(IndexError::Io(io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("index file {:?} does not exist", path),
                )));
            }
        }

        let file = PageFile::open(&idx_path, mode)?;
        let ids = IdStore::open(&ids_path, mode)?;
        log::debug!(
            "opened {} index {:?} with flag '{}'",
            file.record_type(),
            self.path,
            mode
        );
        *state = Some(OpenIndex { mode, file, ids });
        Ok(())
    }

    /// Opens with a POSIX-style flag: `"rs"`/`"r"` or `"rs+"`/`"r+"`.
    pub fn open_flag(&self, flag: &str) -> IndexResult<()> {
        self.open(flag.parse()?)
    }

    /// Flushes and closes both files. Does nothing when already closed.
    pub fn close(&self) -> IndexResult<()> {
        let mut state = self.state.lock();
        if let Some(mut open) = state.take() {
            open.sync()?;
            log::debug!("closed index {:?}", self.path);
        }
        Ok(())
    }

    pub fn is_open(&self) -> bool {
        self.state.lock().is_some()
    }

    /// Mode the index is open in, if any.
    pub fn mode(&self) -> Option<OpenMode> {
        self.state.lock().as_ref().map(|open| open.mode)
    }

    /// Writes the header page and syncs both files without closing them.
    pub fn flush(&self) -> IndexResult<()> {
        self.with_open(|open| open.sync())
    }

    /// Adds `geometry` under `id`. Duplicate geometries and ids are kept.
    pub fn push(&self, geometry: &Geometry, id: &str) -> IndexResult<()> {
        self.with_open(|open| {
            open.check_writable()?;
            let record = leaf_record(open.file.record_type(), open.file.precision(), geometry)?;
            let block = open.ids.write(id)?;
            let record = record.with_data_id(block);

            let mut root = Node::root(&mut open.file)?;
            if let Some(sibling) = root.insert(&mut open.file, &record)? {
                Node::grow_root(&mut open.file, sibling)?;
            }
            Ok(())
        })
    }

    /// Removes one record whose stored geometry equals `geometry`.
    ///
    /// Returns whether a record was found. The node that held it is never
    /// condensed, so the tree keeps its height.
    pub fn delete(&self, geometry: &Geometry) -> IndexResult<bool> {
        self.with_open(|open| {
            open.check_writable()?;
            let target = leaf_record(open.file.record_type(), open.file.precision(), geometry)?;
            let deleted = Node::root(&mut open.file)?.delete(&mut open.file, &target)?;
            if deleted {
                log::trace!("deleted {} from {:?}", geometry, open.file.path());
            }
            Ok(deleted)
        })
    }

    /// Number of records, counted by walking the tree.
    pub fn count(&self) -> IndexResult<u64> {
        self.with_open(|open| Node::root(&mut open.file)?.all_record_count(&mut open.file))
    }

    /// Ids of every record whose envelope overlaps `envelope`, boundary
    /// contact included. Ids are sorted numerically where they parse as
    /// numbers; the rest follow in lexical order.
    pub fn intersections(&self, envelope: &Envelope) -> IndexResult<Vec<String>> {
        self.with_open(|open| {
            let mut blocks = Vec::new();
            Node::root(&mut open.file)?.fill_overlaps(&mut open.file, envelope, &mut blocks)?;
            open.resolve(blocks)
        })
    }

    /// Ids of every record lying entirely inside `envelope`, sorted like
    /// [`RTreeIndex::intersections`].
    pub fn contained(&self, envelope: &Envelope) -> IndexResult<Vec<String>> {
        self.with_open(|open| {
            let mut blocks = Vec::new();
            Node::root(&mut open.file)?.fill_contains(&mut open.file, envelope, &mut blocks)?;
            open.resolve(blocks)
        })
    }

    /// Ids of every record in the index.
    pub fn all_ids(&self) -> IndexResult<Vec<String>> {
        self.with_open(|open| {
            let mut blocks = Vec::new();
            Node::root(&mut open.file)?.fill_all(&mut open.file, &mut blocks)?;
            open.resolve(blocks)
        })
    }

    pub fn stats(&self) -> IndexResult<IndexStats> {
        self.with_open(|open| {
            let root = Node::root(&mut open.file)?;
            Ok(IndexStats {
                record_type: open.file.record_type(),
                precision: open.file.precision(),
                page_size: open.file.page_size(),
                page_count: open.file.free_page_no(),
                tree_height: root.level(),
                record_count: root.all_record_count(&mut open.file)?,
                next_id_block: open.ids.next_valid_block(),
            })
        })
    }

    /// The file header as it will be written on the next flush.
    pub fn header(&self) -> IndexResult<FileHeader> {
        self.with_open(|open| {
            let mut header = open.file.header().clone();
            header.free_page_no = open.file.free_page_no();
            Ok(header)
        })
    }

    /// Page size suited to an index expected to hold `record_count` records.
    pub fn recommend_page_size(record_count: u64) -> usize {
        match record_count {
            0..=5_000 => 4096,
            5_001..=50_000 => 8192,
            50_001..=500_000 => 16384,
            _ => 32768,
        }
    }

    /// See [`files::exists`].
    pub fn exists(path: impl AsRef<Path>) -> bool {
        files::exists(path)
    }

    /// See [`files::clean`].
    pub fn clean(path: impl AsRef<Path>) -> IndexResult<()> {
        files::clean(path)
    }

    /// See [`files::move_index`].
    pub fn move_index(
        src: impl AsRef<Path>,
        dst: impl AsRef<Path>,
        overwrite: bool,
    ) -> IndexResult<()> {
        files::move_index(src, dst, overwrite)
    }

    /// See [`files::temp`].
    pub fn temp(path: impl AsRef<Path>) -> PathBuf {
        files::temp(path)
    }

    /// See [`files::entry`].
    pub fn entry(path: impl AsRef<Path>) -> PathBuf {
        files::entry(path)
    }

    fn with_open<T>(&self, f: impl FnOnce(&mut OpenIndex) -> IndexResult<T>) -> IndexResult<T> {
        let mut state = self.state.lock();
        let open = state.as_mut().ok_or(IndexError::Closed)?;
        f(open)
    }
}

impl Drop for RTreeIndex {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            log::warn!("failed to close index {:?}: {}", self.path, e);
        }
    }
}

/// Builds the leaf record stored for `geometry`, with coordinates rounded
/// to what the file will hold. The data id is filled in by the caller.
fn leaf_record(
    record_type: RecordType,
    precision: Precision,
    geometry: &Geometry,
) -> IndexResult<LeafRecord> {
    match (record_type, geometry) {
        (RecordType::Point, Geometry::Point { x, y }) => {
            let (x, y) = (precision.round(*x), precision.round(*y));
            if !x.is_finite() || !y.is_finite() {
                return Err(IndexError::UnsupportedGeometry(format!(
                    "{} is not finite at {:?} precision",
                    geometry, precision
                )));
            }
            Ok(LeafRecord::Point(PointRecord { x, y, data_id: 0 }))
        }
        (RecordType::Point, Geometry::Rectangle { .. }) => Err(IndexError::UnsupportedGeometry(
            format!("{} cannot be stored in a point index", geometry),
        )),
        (RecordType::Rectangle, _) => {
            let env = geometry.envelope();
            let envelope = Envelope::new(
                precision.round(env.min_x),
                precision.round(env.min_y),
                precision.round(env.max_x),
                precision.round(env.max_y),
            );
            if !envelope.is_finite() || envelope.is_empty() {
                return Err(IndexError::UnsupportedGeometry(format!(
                    "{} is not a finite, ordered rectangle at {:?} precision",
                    geometry, precision
                )));
            }
            Ok(LeafRecord::Rectangle(RectangleRecord {
                envelope,
                data_id: 0,
            }))
        }
    }
}

/// Numeric ids first in numeric order, then the rest lexically.
fn sort_ids(ids: &mut [String]) {
    ids.sort_by(|a, b| match (a.parse::<f64>(), b.parse::<f64>()) {
        (Ok(x), Ok(y)) => x.total_cmp(&y).then_with(|| a.cmp(b)),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn init_logger() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn world_corners(index: &RTreeIndex) {
        let corners = [
            Geometry::rectangle(-180.0, -90.0, -160.0, -70.0),
            Geometry::rectangle(-180.0, 70.0, -160.0, 90.0),
            Geometry::rectangle(160.0, 70.0, 180.0, 90.0),
            Geometry::rectangle(160.0, -90.0, 180.0, -70.0),
        ];
        for (i, corner) in corners.iter().enumerate() {
            index.push(corner, &(i + 1).to_string()).unwrap();
        }
    }

    #[test]
    fn test_world_corners() {
        init_logger();
        let dir = tempdir().unwrap();
        let index = RTreeIndex::create(
            dir.path().join("corners"),
            RecordType::Rectangle,
            &CreateOptions::default(),
        )
        .unwrap();
        world_corners(&index);

        assert_eq!(index.count().unwrap(), 4);
        let globe = Envelope::new(-180.0, -90.0, 180.0, 90.0);
        assert_eq!(index.intersections(&globe).unwrap(), vec!["1", "2", "3", "4"]);

        let west = Envelope::new(-180.0, -90.0, 0.0, 90.0);
        assert_eq!(index.intersections(&west).unwrap(), vec!["1", "2"]);
        let nothing = Envelope::new(-10.0, -10.0, 10.0, 10.0);
        assert!(index.intersections(&nothing).unwrap().is_empty());
    }

    #[test]
    fn test_reopen_read_only() {
        init_logger();
        let dir = tempdir().unwrap();
        let path = dir.path().join("points");
        let index = RTreeIndex::create(&path, RecordType::Point, &CreateOptions::default()).unwrap();
        for i in 0..50 {
            index.push(&Geometry::point(i as f64, -(i as f64)), &i.to_string()).unwrap();
        }
        index.close().unwrap();
        assert!(!index.is_open());

        index.open_flag("rs").unwrap();
        assert_eq!(index.mode(), Some(OpenMode::ReadOnly));
        assert_eq!(index.count().unwrap(), 50);
        assert!(matches!(
            index.push(&Geometry::point(0.0, 0.0), "x"),
            Err(IndexError::ReadOnly)
        ));
        assert!(matches!(
            index.delete(&Geometry::point(0.0, 0.0)),
            Err(IndexError::ReadOnly)
        ));

        index.open_flag("rs+").unwrap();
        assert_eq!(index.mode(), Some(OpenMode::ReadWrite));
        index.push(&Geometry::point(0.0, 0.0), "50").unwrap();
        assert_eq!(index.count().unwrap(), 51);
    }

    #[test]
    fn test_open_and_close_are_idempotent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("idem");
        let index = RTreeIndex::create(&path, RecordType::Point, &CreateOptions::default()).unwrap();
        index.open(OpenMode::ReadWrite).unwrap();
        index.open(OpenMode::ReadWrite).unwrap();
        index.close().unwrap();
        index.close().unwrap();
        assert!(matches!(index.count(), Err(IndexError::Closed)));
        assert!(matches!(index.open_flag("w"), Err(IndexError::InvalidOperation(_))));
    }

    #[test]
    fn test_open_missing_files() {
        let dir = tempdir().unwrap();
        let index = RTreeIndex::new(dir.path().join("missing"));
        match index.open(OpenMode::ReadOnly) {
            Err(IndexError::Io(e)) => assert_eq!(e.kind(), io::ErrorKind::NotFound),
            other => panic!("expected not found, got {:?}", other.err()),
        }
        assert!(!index.is_open());
    }

    #[test]
    fn test_create_respects_overwrite() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("twice");
        let index = RTreeIndex::create(&path, RecordType::Point, &CreateOptions::default()).unwrap();
        index.push(&Geometry::point(1.0, 1.0), "a").unwrap();
        index.close().unwrap();

        let result = RTreeIndex::create(&path, RecordType::Point, &CreateOptions::default());
        assert!(matches!(result, Err(IndexError::AlreadyExists(_))));

        let index = RTreeIndex::create(
            &path,
            RecordType::Rectangle,
            &CreateOptions::default().with_overwrite(true),
        )
        .unwrap();
        assert_eq!(index.count().unwrap(), 0);
        assert_eq!(index.stats().unwrap().record_type, RecordType::Rectangle);
    }

    #[test]
    fn test_geometry_checks() {
        let dir = tempdir().unwrap();
        let points =
            RTreeIndex::create(dir.path().join("p"), RecordType::Point, &CreateOptions::default())
                .unwrap();
        let rect = Geometry::rectangle(0.0, 0.0, 1.0, 1.0);
        assert!(matches!(
            points.push(&rect, "r"),
            Err(IndexError::UnsupportedGeometry(_))
        ));
        assert!(matches!(
            points.push(&Geometry::point(f64::NAN, 0.0), "nan"),
            Err(IndexError::UnsupportedGeometry(_))
        ));
        assert!(matches!(
            points.push(&Geometry::point(1e300, 0.0), "huge"),
            Err(IndexError::UnsupportedGeometry(_))
        ));
        assert_eq!(points.stats().unwrap().next_id_block, 0);

        let rects = RTreeIndex::create(
            dir.path().join("r"),
            RecordType::Rectangle,
            &CreateOptions::default(),
        )
        .unwrap();
        rects.push(&Geometry::point(5.0, 5.0), "p").unwrap();
        assert_eq!(
            rects.intersections(&Envelope::new(4.0, 4.0, 6.0, 6.0)).unwrap(),
            vec!["p"]
        );
        assert!(matches!(
            rects.push(&Geometry::rectangle(2.0, 0.0, 1.0, 1.0), "inverted"),
            Err(IndexError::UnsupportedGeometry(_))
        ));
    }

    #[test]
    fn test_delete_and_contained() {
        let dir = tempdir().unwrap();
        let index = RTreeIndex::create(
            dir.path().join("rects"),
            RecordType::Rectangle,
            &CreateOptions::default().with_float(false),
        )
        .unwrap();
        index.push(&Geometry::rectangle(0.0, 0.0, 2.0, 2.0), "inside").unwrap();
        index.push(&Geometry::rectangle(5.0, 5.0, 15.0, 15.0), "straddles").unwrap();
        index.push(&Geometry::rectangle(0.1, 0.1, 0.2, 0.2), "tiny").unwrap();

        let query = Envelope::new(-1.0, -1.0, 10.0, 10.0);
        assert_eq!(index.contained(&query).unwrap(), vec!["inside", "tiny"]);
        assert_eq!(
            index.intersections(&query).unwrap(),
            vec!["inside", "straddles", "tiny"]
        );

        assert!(index.delete(&Geometry::rectangle(0.1, 0.1, 0.2, 0.2)).unwrap());
        assert!(!index.delete(&Geometry::rectangle(0.1, 0.1, 0.2, 0.2)).unwrap());
        assert_eq!(index.count().unwrap(), 2);
        assert_eq!(index.all_ids().unwrap(), vec!["inside", "straddles"]);
    }

    #[test]
    fn test_stats() {
        let dir = tempdir().unwrap();
        let index = RTreeIndex::create(
            dir.path().join("stats"),
            RecordType::Point,
            &CreateOptions::default().with_page_size(512),
        )
        .unwrap();
        let stats = index.stats().unwrap();
        assert_eq!(stats.page_count, 2);
        assert_eq!(stats.tree_height, 1);
        assert_eq!(stats.precision, Precision::Float);

        for i in 0..100 {
            index.push(&Geometry::point(i as f64, i as f64), &i.to_string()).unwrap();
        }
        let stats = index.stats().unwrap();
        assert_eq!(stats.record_count, 100);
        assert!(stats.tree_height >= 2);
        assert!(stats.page_count > 2);
        assert!(stats.next_id_block >= 200);

        let header = index.header().unwrap();
        assert_eq!(header.page_size, 512);
        assert!(header.use_float);
        assert_eq!(header.free_page_no, stats.page_count);
    }

    #[test]
    fn test_recommend_page_size() {
        assert_eq!(RTreeIndex::recommend_page_size(0), 4096);
        assert_eq!(RTreeIndex::recommend_page_size(5_000), 4096);
        assert_eq!(RTreeIndex::recommend_page_size(5_001), 8192);
        assert_eq!(RTreeIndex::recommend_page_size(50_000), 8192);
        assert_eq!(RTreeIndex::recommend_page_size(500_000), 16384);
        assert_eq!(RTreeIndex::recommend_page_size(500_001), 32768);
    }

    #[test]
    fn test_sort_ids() {
        let mut ids: Vec<String> = ["10", "b", "2", "a", "-1.5", "2"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        sort_ids(&mut ids);
        assert_eq!(ids, vec!["-1.5", "2", "2", "10", "a", "b"]);
    }
}
