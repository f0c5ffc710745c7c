//! Fixed-width little-endian primitives over page buffers.
//!
//! Readers and writers carry their own cursor so a page buffer is never
//! shared between two in-flight cursors.

use crate::config::Precision;
use crate::envelope::Envelope;
use crate::error::{IndexError, IndexResult};

pub(crate) struct ByteReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn at(buf: &'a [u8], pos: usize) -> Self {
        Self { buf, pos }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    fn take<const N: usize>(&mut self) -> IndexResult<[u8; N]> {
        let end = self
            .pos
            .checked_add(N)
            .filter(|&end| end <= self.buf.len())
            .ok_or_else(|| {
                IndexError::Corrupted(format!(
                    "read of {} bytes at offset {} overruns buffer of {} bytes",
                    N,
                    self.pos,
                    self.buf.len()
                ))
            })?;
        let mut out = [0u8; N];
        out.copy_from_slice(&self.buf[self.pos..end]);
        self.pos = end;
        Ok(out)
    }

    pub fn read_u8(&mut self) -> IndexResult<u8> {
        Ok(self.take::<1>()?[0])
    }

    pub fn read_u16(&mut self) -> IndexResult<u16> {
        Ok(u16::from_le_bytes(self.take()?))
    }

    pub fn read_u32(&mut self) -> IndexResult<u32> {
        Ok(u32::from_le_bytes(self.take()?))
    }

    pub fn read_f32(&mut self) -> IndexResult<f32> {
        Ok(f32::from_le_bytes(self.take()?))
    }

    pub fn read_f64(&mut self) -> IndexResult<f64> {
        Ok(f64::from_le_bytes(self.take()?))
    }

    pub fn read_coord(&mut self, precision: Precision) -> IndexResult<f64> {
        match precision {
            Precision::Float => Ok(self.read_f32()? as f64),
            Precision::Double => self.read_f64(),
        }
    }

    pub fn read_point(&mut self, precision: Precision) -> IndexResult<(f64, f64)> {
        let x = self.read_coord(precision)?;
        let y = self.read_coord(precision)?;
        Ok((x, y))
    }

    pub fn read_envelope(&mut self, precision: Precision) -> IndexResult<Envelope> {
        let (min_x, min_y) = self.read_point(precision)?;
        let (max_x, max_y) = self.read_point(precision)?;
        Ok(Envelope::new(min_x, min_y, max_x, max_y))
    }
}

pub(crate) struct ByteWriter<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl<'a> ByteWriter<'a> {
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn at(buf: &'a mut [u8], pos: usize) -> Self {
        Self { buf, pos }
    }

    fn put(&mut self, bytes: &[u8]) -> IndexResult<()> {
        let end = self
            .pos
            .checked_add(bytes.len())
            .filter(|&end| end <= self.buf.len())
            .ok_or_else(|| {
                IndexError::InvalidOperation(format!(
                    "write of {} bytes at offset {} overruns buffer of {} bytes",
                    bytes.len(),
                    self.pos,
                    self.buf.len()
                ))
            })?;
        self.buf[self.pos..end].copy_from_slice(bytes);
        self.pos = end;
        Ok(())
    }

    pub fn write_u8(&mut self, value: u8) -> IndexResult<()> {
        self.put(&[value])
    }

    pub fn write_u16(&mut self, value: u16) -> IndexResult<()> {
        self.put(&value.to_le_bytes())
    }

    pub fn write_u32(&mut self, value: u32) -> IndexResult<()> {
        self.put(&value.to_le_bytes())
    }

    pub fn write_f32(&mut self, value: f32) -> IndexResult<()> {
        self.put(&value.to_le_bytes())
    }

    pub fn write_f64(&mut self, value: f64) -> IndexResult<()> {
        self.put(&value.to_le_bytes())
    }

    pub fn write_coord(&mut self, precision: Precision, value: f64) -> IndexResult<()> {
        match precision {
            Precision::Float => self.write_f32(value as f32),
            Precision::Double => self.write_f64(value),
        }
    }

    pub fn write_point(&mut self, precision: Precision, x: f64, y: f64) -> IndexResult<()> {
        self.write_coord(precision, x)?;
        self.write_coord(precision, y)
    }

    pub fn write_envelope(&mut self, precision: Precision, envelope: &Envelope) -> IndexResult<()> {
        self.write_point(precision, envelope.min_x, envelope.min_y)?;
        self.write_point(precision, envelope.max_x, envelope.max_y)
    }
}
