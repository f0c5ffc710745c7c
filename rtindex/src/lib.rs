//! # rtindex - Disk-Resident R-Tree Spatial Index
//!
//! A paged R-tree stored in a pair of files that maps 2-D points or
//! rectangles to string feature identifiers. It is meant for feature sets
//! too large or too slow to scan linearly, such as the records of a
//! shapefile.
//!
//! ## Features
//!
//! - **Paged Storage**: fixed-size slotted pages, read on demand and written back immediately
//! - **Guttman Insertion**: least-enlargement descent with quadratic node splits
//! - **Pruned Queries**: overlap and containment searches skip disjoint subtrees
//! - **Identifier Store**: variable-length ids addressed by block number in O(1) seeks
//! - **Float or Double**: coordinates stored at 4 or 8 bytes per value
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use rtindex::{CreateOptions, Envelope, Geometry, OpenMode, RTreeIndex, RecordType};
//!
//! # fn main() -> rtindex::IndexResult<()> {
//! let page_size = RTreeIndex::recommend_page_size(10_000);
//! let options = CreateOptions::default().with_page_size(page_size);
//! let index = RTreeIndex::create("roads", RecordType::Rectangle, &options)?;
//!
//! index.push(&Geometry::rectangle(-1.0, -1.0, 1.0, 1.0), "17")?;
//! index.push(&Geometry::rectangle(5.0, 5.0, 6.0, 6.0), "4")?;
//! index.close()?;
//!
//! index.open(OpenMode::ReadOnly)?;
//! let hits = index.intersections(&Envelope::new(0.0, 0.0, 10.0, 10.0))?;
//! assert_eq!(hits, vec!["4", "17"]);
//! # Ok(())
//! # }
//! ```
//!
//! ## Limitations
//!
//! Writes are not crash-safe and an index must not be opened for writing by
//! two handles at once. Deleting records never merges underfull nodes or
//! lowers the tree.

pub mod config;
pub mod disk;
pub mod envelope;
pub mod error;
pub mod files;
pub mod geometry;
pub mod index;

pub use config::{CreateOptions, OpenMode, Precision, RecordType};
pub use disk::FileHeader;
pub use envelope::Envelope;
pub use error::{IndexError, IndexResult};
pub use geometry::Geometry;
pub use index::{IndexStats, RTreeIndex};
