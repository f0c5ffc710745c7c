//! Integration tests for the disk R-tree index.
//!
//! These tests drive the index through its public API only, on real files,
//! and check query results against linear scans and an in-memory R-tree.

mod index_lifecycle_test;
mod index_query_test;
mod index_rebuild_test;
