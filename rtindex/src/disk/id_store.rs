//! Append-only store of feature identifiers.
//!
//! Identifiers are written at 16-byte block boundaries after a 32-byte
//! header, so the block number handed out by [`IdStore::write`] is enough to
//! seek straight back to the string. Blocks are never reused.

use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use super::constants::{
    FORMAT_VERSION, IDS_BLOCK_SIZE, IDS_HEADER_LENGTH, IDS_LENGTH_PREFIX, IDS_MAGIC,
};
use super::header_page::header_config;
use super::BlockNo;
use crate::config::OpenMode;
use crate::error::{IndexError, IndexResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct IdsHeader {
    magic: u32,
    version: u32,
    next_valid_block: BlockNo,
    reserved: [u8; 20],
}

impl IdsHeader {
    fn new() -> Self {
        Self {
            magic: IDS_MAGIC,
            version: FORMAT_VERSION,
            next_valid_block: 0,
            reserved: [0; 20],
        }
    }

    fn encode(&self) -> IndexResult<Vec<u8>> {
        let bytes = bincode::serde::encode_to_vec(self, header_config())?;
        debug_assert_eq!(bytes.len() as u64, IDS_HEADER_LENGTH);
        Ok(bytes)
    }

    fn decode(bytes: &[u8]) -> IndexResult<Self> {
        let (header, _): (IdsHeader, usize) =
            bincode::serde::decode_from_slice(bytes, header_config())?;
        if header.magic != IDS_MAGIC {
            return Err(IndexError::Corrupted(format!(
                "not an identifier store (magic {:#x})",
                header.magic
            )));
        }
        if header.version != FORMAT_VERSION {
            return Err(IndexError::Corrupted(format!(
                "unsupported identifier store version {}",
                header.version
            )));
        }
        Ok(header)
    }
}

/// Blocks occupied by an identifier of `len` bytes.
pub(crate) fn blocks_for(len: usize) -> BlockNo {
    ((len as u64 + 3).div_ceil(IDS_BLOCK_SIZE) + 1) as BlockNo
}

fn block_offset(block: BlockNo) -> u64 {
    IDS_HEADER_LENGTH + IDS_BLOCK_SIZE * block as u64
}

pub(crate) struct IdStore {
    file: File,
    path: PathBuf,
    next_valid_block: BlockNo,
    writable: bool,
}

impl IdStore {
    /// Create an empty store, truncating any existing file.
    pub fn create(path: &Path) -> IndexResult<()> {
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        file.write_all(&IdsHeader::new().encode()?)?;
        file.sync_all()?;
        Ok(())
    }

    pub fn open(path: &Path, mode: OpenMode) -> IndexResult<Self> {
        let mut file = OpenOptions::new()
            .read(true)
            .write(mode.is_writable())
            .open(path)?;
        let mut bytes = [0u8; IDS_HEADER_LENGTH as usize];
        file.read_exact(&mut bytes)?;
        let header = IdsHeader::decode(&bytes)?;

        Ok(Self {
            file,
            path: path.to_path_buf(),
            next_valid_block: header.next_valid_block,
            writable: mode.is_writable(),
        })
    }

    pub fn next_valid_block(&self) -> BlockNo {
        self.next_valid_block
    }

    /// Append `id` and return the block it starts at.
    pub fn write(&mut self, id: &str) -> IndexResult<BlockNo> {
        if !self.writable {
            return Err(IndexError::ReadOnly);
        }
        let bytes = id.as_bytes();
        let length = u32::try_from(bytes.len()).map_err(|_| {
            IndexError::InvalidOperation(format!("identifier of {} bytes is too long", bytes.len()))
        })?;

        let block = self.next_valid_block;
        let span = blocks_for(bytes.len());
        let mut record = vec![0u8; (span as u64 * IDS_BLOCK_SIZE) as usize];
        record[..IDS_LENGTH_PREFIX].copy_from_slice(&length.to_le_bytes());
        record[IDS_LENGTH_PREFIX..IDS_LENGTH_PREFIX + bytes.len()].copy_from_slice(bytes);

        self.file.seek(SeekFrom::Start(block_offset(block)))?;
        self.file.write_all(&record)?;

        self.next_valid_block = block.checked_add(span).ok_or_else(|| {
            IndexError::InvalidOperation("identifier store is out of blocks".into())
        })?;
        self.write_header()?;
        log::trace!(
            "wrote id '{}' at block {} of {:?} ({} blocks)",
            id,
            block,
            self.path,
            span
        );
        Ok(block)
    }

    /// Read the identifier starting at `block`.
    pub fn id(&mut self, block: BlockNo) -> IndexResult<String> {
        if block >= self.next_valid_block {
            return Err(IndexError::OutOfBounds {
                id: block as usize,
                count: self.next_valid_block as usize,
            });
        }
        self.file.seek(SeekFrom::Start(block_offset(block)))?;
        let mut prefix = [0u8; IDS_LENGTH_PREFIX];
        self.file.read_exact(&mut prefix)?;
        let length = u32::from_le_bytes(prefix) as u64;

        let available = block_offset(self.next_valid_block) - block_offset(block);
        if length + IDS_LENGTH_PREFIX as u64 > available {
            return Err(IndexError::Corrupted(format!(
                "identifier at block {} claims {} bytes",
                block, length
            )));
        }
        let mut bytes = vec![0u8; length as usize];
        self.file.read_exact(&mut bytes)?;
        String::from_utf8(bytes).map_err(|e| {
            IndexError::Corrupted(format!("identifier at block {} is not UTF-8: {}", block, e))
        })
    }

    pub fn sync(&mut self) -> IndexResult<()> {
        if self.writable {
            self.file.sync_all()?;
        }
        Ok(())
    }

    fn write_header(&mut self) -> IndexResult<()> {
        let header = IdsHeader {
            next_valid_block: self.next_valid_block,
            ..IdsHeader::new()
        };
        self.file.seek(SeekFrom::Start(0))?;
        self.file.write_all(&header.encode()?)?;
        Ok(())
    }
}
