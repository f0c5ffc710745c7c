//! Creation options, open modes and the on-disk type discriminators.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use std::str::FromStr;

use crate::disk::constants::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE, MIN_PAGE_SIZE};
use crate::error::{IndexError, IndexResult};

/// Kind of geometry stored in the leaves of an index.
///
/// The variant order is the on-disk discriminator (point = 0, rectangle = 1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordType {
    Point,
    Rectangle,
}

impl Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordType::Point => write!(f, "point"),
            RecordType::Rectangle => write!(f, "rectangle"),
        }
    }
}

/// Width of the coordinates written into records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Precision {
    /// 4-byte IEEE-754 floats
    #[default]
    Float,
    /// 8-byte IEEE-754 doubles
    Double,
}

impl Precision {
    pub fn from_float_flag(use_float: bool) -> Self {
        if use_float {
            Precision::Float
        } else {
            Precision::Double
        }
    }

    pub fn is_float(self) -> bool {
        self == Precision::Float
    }

    /// Bytes used by a single coordinate.
    pub fn coord_size(self) -> usize {
        match self {
            Precision::Float => 4,
            Precision::Double => 8,
        }
    }

    /// Rounds a coordinate to the value that will be read back from disk.
    pub fn round(self, value: f64) -> f64 {
        match self {
            Precision::Float => value as f32 as f64,
            Precision::Double => value,
        }
    }
}

/// How the index files are opened, modelled on the POSIX-style flags
/// `"rs"` (read, no create) and `"rs+"` (read-write, no truncate).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OpenMode {
    #[default]
    ReadOnly,
    ReadWrite,
}

impl OpenMode {
    pub fn is_writable(self) -> bool {
        self == OpenMode::ReadWrite
    }

    pub fn flag(self) -> &'static str {
        match self {
            OpenMode::ReadOnly => "rs",
            OpenMode::ReadWrite => "rs+",
        }
    }
}

impl FromStr for OpenMode {
    type Err = IndexError;

    fn from_str(flag: &str) -> Result<Self, Self::Err> {
        match flag {
            "rs" | "r" => Ok(OpenMode::ReadOnly),
            "rs+" | "r+" => Ok(OpenMode::ReadWrite),
            other => Err(IndexError::InvalidOperation(format!(
                "unsupported open flag '{}'",
                other
            ))),
        }
    }
}

impl Display for OpenMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.flag())
    }
}

/// Options used when creating a new index file pair.
///
/// # Examples
///
/// ```rust
/// use rtindex::{CreateOptions, Precision};
///
/// let options = CreateOptions::default()
///     .with_float(false)
///     .with_page_size(16384)
///     .with_overwrite(true);
/// assert_eq!(options.precision, Precision::Double);
/// assert!(options.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateOptions {
    pub precision: Precision,
    pub page_size: usize,
    /// Replace an existing index at the same path instead of failing.
    pub overwrite: bool,
}

impl Default for CreateOptions {
    fn default() -> Self {
        Self {
            precision: Precision::Float,
            page_size: DEFAULT_PAGE_SIZE,
            overwrite: false,
        }
    }
}

impl CreateOptions {
    pub fn with_float(mut self, use_float: bool) -> Self {
        self.precision = Precision::from_float_flag(use_float);
        self
    }

    pub fn with_precision(mut self, precision: Precision) -> Self {
        self.precision = precision;
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    pub fn validate(&self) -> IndexResult<()> {
        validate_page_size(self.page_size)
    }
}

/// Page sizes must be powers of two so pages never straddle the 16-bit
/// slot offsets.
pub(crate) fn validate_page_size(page_size: usize) -> IndexResult<()> {
    if !page_size.is_power_of_two() || !(MIN_PAGE_SIZE..=MAX_PAGE_SIZE).contains(&page_size) {
        return Err(IndexError::InvalidOperation(format!(
            "page size {} must be a power of two between {} and {}",
            page_size, MIN_PAGE_SIZE, MAX_PAGE_SIZE
        )));
    }
    Ok(())
}
