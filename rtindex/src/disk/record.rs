//! Binary codecs for the three record shapes stored in data pages.
//!
//! Every record starts with an 8-byte header `{key_length, element_length,
//! child_node_id}`. Point and rectangle records follow the coordinates with a
//! 4-byte data-block id and a magic trailer; entry records carry only the
//! child page's rectangle.

use super::codec::{ByteReader, ByteWriter};
use super::constants::{LEAF_ELEMENT_SIZE, RECORD_HEADER_SIZE, RECORD_MAGIC};
use super::{BlockNo, PageNo};
use crate::config::{Precision, RecordType};
use crate::envelope::Envelope;
use crate::error::{IndexError, IndexResult};

/// Shape of the records held by a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RecordKind {
    Point,
    Rectangle,
    Entry,
}

impl From<RecordType> for RecordKind {
    fn from(record_type: RecordType) -> Self {
        match record_type {
            RecordType::Point => RecordKind::Point,
            RecordType::Rectangle => RecordKind::Rectangle,
        }
    }
}

/// Everything a codec needs to size and decode a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RecordFormat {
    pub kind: RecordKind,
    pub precision: Precision,
}

impl RecordFormat {
    pub fn new(kind: RecordKind, precision: Precision) -> Self {
        Self { kind, precision }
    }

    pub fn key_length(&self) -> usize {
        let coords = match self.kind {
            RecordKind::Point => 2,
            RecordKind::Rectangle | RecordKind::Entry => 4,
        };
        coords * self.precision.coord_size()
    }

    pub fn element_length(&self) -> usize {
        match self.kind {
            RecordKind::Point | RecordKind::Rectangle => LEAF_ELEMENT_SIZE,
            RecordKind::Entry => 0,
        }
    }

    /// Encoded size of one record, header included.
    pub fn record_size(&self) -> usize {
        RECORD_HEADER_SIZE + self.key_length() + self.element_length()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RecordHeader {
    key_length: u16,
    element_length: u16,
    child_node_id: u32,
}

impl RecordHeader {
    fn for_format(format: RecordFormat, child_node_id: u32) -> Self {
        Self {
            key_length: format.key_length() as u16,
            element_length: format.element_length() as u16,
            child_node_id,
        }
    }

    fn read(reader: &mut ByteReader<'_>, format: RecordFormat) -> IndexResult<Self> {
        let header = Self {
            key_length: reader.read_u16()?,
            element_length: reader.read_u16()?,
            child_node_id: reader.read_u32()?,
        };
        if header.key_length as usize != format.key_length()
            || header.element_length as usize != format.element_length()
        {
            return Err(IndexError::Corrupted(format!(
                "record header {:?} does not match {:?} layout",
                header, format
            )));
        }
        Ok(header)
    }

    fn write(&self, writer: &mut ByteWriter<'_>) -> IndexResult<()> {
        writer.write_u16(self.key_length)?;
        writer.write_u16(self.element_length)?;
        writer.write_u32(self.child_node_id)
    }
}

/// A value that can be stored in a slot of a data page.
pub(crate) trait PageRecord: Sized + Clone {
    fn envelope(&self) -> Envelope;

    fn encode(&self, writer: &mut ByteWriter<'_>, format: RecordFormat) -> IndexResult<()>;

    fn decode(reader: &mut ByteReader<'_>, format: RecordFormat) -> IndexResult<Self>;

    fn to_bytes(&self, format: RecordFormat) -> IndexResult<Vec<u8>> {
        let mut buf = vec![0u8; format.record_size()];
        self.encode(&mut ByteWriter::new(&mut buf), format)?;
        Ok(buf)
    }

    fn from_bytes(bytes: &[u8], format: RecordFormat) -> IndexResult<Self> {
        Self::decode(&mut ByteReader::new(bytes), format)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct PointRecord {
    pub x: f64,
    pub y: f64,
    pub data_id: BlockNo,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct RectangleRecord {
    pub envelope: Envelope,
    pub data_id: BlockNo,
}

/// A leaf payload: the indexed geometry and the identifier-store block of its id.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum LeafRecord {
    Point(PointRecord),
    Rectangle(RectangleRecord),
}

impl LeafRecord {
    pub fn data_id(&self) -> BlockNo {
        match self {
            LeafRecord::Point(p) => p.data_id,
            LeafRecord::Rectangle(r) => r.data_id,
        }
    }

    pub fn with_data_id(self, data_id: BlockNo) -> Self {
        match self {
            LeafRecord::Point(p) => LeafRecord::Point(PointRecord { data_id, ..p }),
            LeafRecord::Rectangle(r) => LeafRecord::Rectangle(RectangleRecord { data_id, ..r }),
        }
    }

    /// Geometry equality, ignoring the data id.
    pub fn same_geometry(&self, other: &LeafRecord) -> bool {
        match (self, other) {
            (LeafRecord::Point(a), LeafRecord::Point(b)) => a.x == b.x && a.y == b.y,
            (LeafRecord::Rectangle(a), LeafRecord::Rectangle(b)) => a.envelope == b.envelope,
            _ => false,
        }
    }
}

fn read_trailer(reader: &mut ByteReader<'_>) -> IndexResult<BlockNo> {
    let data_id = reader.read_u32()?;
    let magic = reader.read_u32()?;
    if magic != RECORD_MAGIC {
        return Err(IndexError::Corrupted(format!(
            "record magic mismatch at offset {} (expected {:#x}, got {:#x})",
            reader.position() - 4,
            RECORD_MAGIC,
            magic
        )));
    }
    Ok(data_id)
}

fn write_trailer(writer: &mut ByteWriter<'_>, data_id: BlockNo) -> IndexResult<()> {
    writer.write_u32(data_id)?;
    writer.write_u32(RECORD_MAGIC)
}

impl PageRecord for LeafRecord {
    fn envelope(&self) -> Envelope {
        match self {
            LeafRecord::Point(p) => Envelope::from_point(p.x, p.y),
            LeafRecord::Rectangle(r) => r.envelope,
        }
    }

    fn encode(&self, writer: &mut ByteWriter<'_>, format: RecordFormat) -> IndexResult<()> {
        match (self, format.kind) {
            (LeafRecord::Point(p), RecordKind::Point) => {
                RecordHeader::for_format(format, 0).write(writer)?;
                writer.write_point(format.precision, p.x, p.y)?;
                write_trailer(writer, p.data_id)
            }
            (LeafRecord::Rectangle(r), RecordKind::Rectangle) => {
                RecordHeader::for_format(format, 0).write(writer)?;
                writer.write_envelope(format.precision, &r.envelope)?;
                write_trailer(writer, r.data_id)
            }
            (record, kind) => Err(IndexError::UnsupportedGeometry(format!(
                "cannot store {:?} in a {:?} page",
                record, kind
            ))),
        }
    }

    fn decode(reader: &mut ByteReader<'_>, format: RecordFormat) -> IndexResult<Self> {
        match format.kind {
            RecordKind::Point => {
                RecordHeader::read(reader, format)?;
                let (x, y) = reader.read_point(format.precision)?;
                let data_id = read_trailer(reader)?;
                Ok(LeafRecord::Point(PointRecord { x, y, data_id }))
            }
            RecordKind::Rectangle => {
                RecordHeader::read(reader, format)?;
                let envelope = reader.read_envelope(format.precision)?;
                let data_id = read_trailer(reader)?;
                Ok(LeafRecord::Rectangle(RectangleRecord { envelope, data_id }))
            }
            RecordKind::Entry => Err(IndexError::Corrupted(
                "leaf record requested from an entry page".into(),
            )),
        }
    }
}

/// An internal-node pointer: the child page's MBR and page number.
///
/// A stored child id of 0 decodes to `None` and marks "no child".
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct EntryRecord {
    pub envelope: Envelope,
    pub child: Option<PageNo>,
}

impl EntryRecord {
    pub fn new(envelope: Envelope, child: PageNo) -> Self {
        Self {
            envelope,
            child: Some(child),
        }
    }
}

impl PageRecord for EntryRecord {
    fn envelope(&self) -> Envelope {
        self.envelope
    }

    fn encode(&self, writer: &mut ByteWriter<'_>, format: RecordFormat) -> IndexResult<()> {
        if format.kind != RecordKind::Entry {
            return Err(IndexError::InvalidOperation(format!(
                "cannot store an entry in a {:?} page",
                format.kind
            )));
        }
        RecordHeader::for_format(format, self.child.unwrap_or(0)).write(writer)?;
        writer.write_envelope(format.precision, &self.envelope)
    }

    fn decode(reader: &mut ByteReader<'_>, format: RecordFormat) -> IndexResult<Self> {
        if format.kind != RecordKind::Entry {
            return Err(IndexError::Corrupted(format!(
                "entry record requested from a {:?} page",
                format.kind
            )));
        }
        let header = RecordHeader::read(reader, format)?;
        let envelope = reader.read_envelope(format.precision)?;
        Ok(EntryRecord {
            envelope,
            child: Some(header.child_node_id).filter(|&id| id != 0),
        })
    }
}
