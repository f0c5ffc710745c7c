//! Paged on-disk storage for the R-tree.
//!
//! An index is a pair of files:
//! - `<name>.idx`: fixed-size slotted pages. Page 0 is the header, page 1 is
//!   always the root, and new pages are only ever appended
//! - `<name>.ids`: the identifier store, addressed in 16-byte blocks
//!
//! Nodes are read from disk on demand and written back as soon as they
//! change; no page cache sits between the tree and the file.

pub(crate) mod codec;
pub(crate) mod constants;
pub(crate) mod data_page;
pub mod header_page;
pub(crate) mod id_store;
pub(crate) mod node;
pub(crate) mod page_file;
pub(crate) mod record;
pub(crate) mod record_page;
pub(crate) mod split;

/// Page number within the index file.
pub type PageNo = u32;

/// Block number within the identifier store.
pub type BlockNo = u32;

pub use header_page::FileHeader;
