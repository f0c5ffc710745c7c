//! File header stored in page 0 of the index file.

use serde::{Deserialize, Serialize};

use super::constants::{FORMAT_VERSION, HEADER_DESCRIPTION, IDX_EXTENSION, MAX_PAGE_SIZE};
use super::PageNo;
use crate::config::{validate_page_size, CreateOptions, Precision, RecordType};
use crate::error::{IndexError, IndexResult};

/// Fixed-width little-endian encoding, capped so a damaged length prefix
/// fails instead of allocating.
pub(crate) fn header_config() -> impl bincode::config::Config {
    bincode::config::legacy().with_limit::<MAX_PAGE_SIZE>()
}

/// File metadata, written once at creation and refreshed on flush.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileHeader {
    pub description: String,
    pub version: u32,
    pub record_type: RecordType,
    /// Next page number to append; also derivable from the file length.
    pub free_page_no: PageNo,
    pub extension: String,
    pub page_size: u32,
    pub use_float: bool,
}

impl FileHeader {
    pub fn new(record_type: RecordType, options: &CreateOptions) -> Self {
        Self {
            description: HEADER_DESCRIPTION.to_string(),
            version: FORMAT_VERSION,
            record_type,
            free_page_no: 1,
            extension: IDX_EXTENSION.to_string(),
            page_size: options.page_size as u32,
            use_float: options.precision.is_float(),
        }
    }

    pub fn precision(&self) -> Precision {
        Precision::from_float_flag(self.use_float)
    }

    pub fn validate(&self) -> IndexResult<()> {
        if self.description != HEADER_DESCRIPTION {
            return Err(IndexError::Corrupted(format!(
                "not an index file (description '{}')",
                self.description
            )));
        }
        if self.version != FORMAT_VERSION {
            return Err(IndexError::Corrupted(format!(
                "unsupported file format version {}",
                self.version
            )));
        }
        validate_page_size(self.page_size as usize)
    }

    /// Serializes the header padded to a full page.
    pub fn to_page(&self) -> IndexResult<Vec<u8>> {
        let mut bytes = bincode::serde::encode_to_vec(self, header_config())?;
        if bytes.len() > self.page_size as usize {
            return Err(IndexError::Serialization(format!(
                "header of {} bytes does not fit a {} byte page",
                bytes.len(),
                self.page_size
            )));
        }
        bytes.resize(self.page_size as usize, 0);
        Ok(bytes)
    }

    pub fn from_bytes(bytes: &[u8]) -> IndexResult<Self> {
        let (header, _): (FileHeader, usize) =
            bincode::serde::decode_from_slice(bytes, header_config())
                .map_err(|e| IndexError::Corrupted(format!("unreadable file header: {}", e)))?;
        header.validate()?;
        Ok(header)
    }
}
