//! Constants for the paged index file and the identifier store.

use super::PageNo;

/// Default page size (8KB)
pub const DEFAULT_PAGE_SIZE: usize = 8192;

/// Smallest page size accepted at creation
pub const MIN_PAGE_SIZE: usize = 512;

/// Largest page size; slot offsets are 16-bit
pub const MAX_PAGE_SIZE: usize = 32768;

/// Page header: page id, free space, end-of-data offset, record count,
/// vacant record count, magic
pub const PAGE_HEADER_SIZE: usize = 16;

/// Record-set header: root flag, reserved, tree level, placeholder
pub const RECORD_SET_HEADER_SIZE: usize = 8;

/// First byte of the data area
pub const DATA_START: usize = PAGE_HEADER_SIZE + RECORD_SET_HEADER_SIZE;

/// One `{offset: u16, length: u16}` slot
pub const SLOT_SIZE: usize = 4;

/// Slots that never reference a stored record: the record-set header and a guard
pub const RESERVED_SLOTS: usize = 2;

/// The record-set header occupies slot 0, so the stored record count is
/// always the live count plus this correction.
pub const RECORD_SET_CORRECTION: u16 = 1;

/// Record header: key length, element length, child node id
pub const RECORD_HEADER_SIZE: usize = 8;

/// Data-block id plus magic trailer carried by point and rectangle records
pub const LEAF_ELEMENT_SIZE: usize = 8;

/// Magic written in every data page header ("RTPG")
pub const PAGE_MAGIC: u32 = 0x5254_5047;

/// Trailer written after the data id of point and rectangle records ("RTRC")
pub const RECORD_MAGIC: u32 = 0x5254_5243;

/// Minimum fraction of node capacity each half of a split receives
pub const FILL_FACTOR: f64 = 0.5;

/// Absolute floor on the number of records per split half
pub const MIN_FILL: usize = 2;

/// The root always lives on the first data page
pub const ROOT_PAGE_NO: PageNo = 1;

/// Level of leaf pages; internal levels count upward from here
pub const LEAF_LEVEL: u16 = 1;

/// File identity written into the header page
pub const HEADER_DESCRIPTION: &str = "rtindex paged r-tree";

/// File format version
pub const FORMAT_VERSION: u32 = 1;

/// Bytes read from page 0 to decode the header before the page size is known
pub const HEADER_PROBE_SIZE: usize = MIN_PAGE_SIZE;

pub const IDX_EXTENSION: &str = "idx";
pub const IDS_EXTENSION: &str = "ids";

/// Identifier store header length
pub const IDS_HEADER_LENGTH: u64 = 32;

/// Identifier store addressing granularity
pub const IDS_BLOCK_SIZE: u64 = 16;

/// Length prefix of each identifier record
pub const IDS_LENGTH_PREFIX: usize = 4;

/// Magic number of the identifier store ("RTID")
pub const IDS_MAGIC: u32 = 0x5254_4944;
