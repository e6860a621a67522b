//! Payload writer.
//!
//! Appends MySQL protocol primitives to a growable buffer. Reference:
//! https://dev.mysql.com/doc/dev/mysql-server/latest/page_protocol_basic_dt_integers.html

use bytes::{BufMut, Bytes};
use tracing::trace;

use crate::error::{CodecError, Result};

/// Length-encoded integer prefixes
pub const LENENC_2_BYTE: u8 = 0xfc;
pub const LENENC_3_BYTE: u8 = 0xfd;
pub const LENENC_8_BYTE: u8 = 0xfe;

/// Number of bytes `value` occupies as a length-encoded integer.
pub fn lenenc_int_len(value: u64) -> usize {
    if value < 251 {
        1
    } else if value < (1 << 16) {
        3
    } else if value < (1 << 24) {
        4
    } else {
        9
    }
}

/// Number of bytes a length-encoded string of `len` bytes occupies, prefix included.
pub fn lenenc_bytes_len(len: usize) -> usize {
    lenenc_int_len(len as u64) + len
}

/// Single-use buffer for one packet payload.
///
/// The capacity hint only sizes the first allocation; the buffer keeps growing as needed.
/// Growth goes through fallible reservation, so running out of memory comes back as
/// [`CodecError::Allocation`]. [`PayloadWriter::finish`] consumes the writer; a writer
/// dropped on an error path takes its storage with it.
#[derive(Debug, Default)]
pub struct PayloadWriter {
    buf: Vec<u8>,
}

impl PayloadWriter {
    pub fn with_capacity(hint: usize) -> Self {
        let mut buf = Vec::new();
        if buf.try_reserve_exact(hint).is_err() {
            trace!(hint, "capacity hint not honored, growing on demand");
        }
        Self { buf }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    fn reserve(&mut self, additional: usize) -> Result<()> {
        self.buf.try_reserve(additional)?;
        Ok(())
    }

    pub fn write_byte(&mut self, value: u8) -> Result<()> {
        self.reserve(1)?;
        self.buf.put_u8(value);
        Ok(())
    }

    pub fn write_bytes(&mut self, data: &[u8]) -> Result<()> {
        self.reserve(data.len())?;
        self.buf.put_slice(data);
        Ok(())
    }

    /// Write `len` bytes of `data` starting at `offset`.
    pub fn write_bytes_at(&mut self, data: &[u8], offset: usize, len: usize) -> Result<()> {
        let slice = offset
            .checked_add(len)
            .and_then(|end| data.get(offset..end))
            .ok_or(CodecError::OutOfBounds {
                offset,
                len,
                available: data.len(),
            })?;
        self.write_bytes(slice)
    }

    /// Write the low `width` bytes of `value`, little-endian.
    pub fn write_fixed_int(&mut self, width: usize, value: u64) -> Result<()> {
        match width {
            1 | 2 | 3 | 4 | 8 => {
                self.reserve(width)?;
                self.buf.put_uint_le(value, width);
                Ok(())
            }
            _ => Err(CodecError::InvalidIntWidth(width)),
        }
    }

    pub fn write_lenenc_int(&mut self, value: u64) -> Result<()> {
        self.reserve(lenenc_int_len(value))?;
        if value < 251 {
            self.buf.put_u8(value as u8);
        } else if value < (1 << 16) {
            self.buf.put_u8(LENENC_2_BYTE);
            self.buf.put_u16_le(value as u16);
        } else if value < (1 << 24) {
            self.buf.put_u8(LENENC_3_BYTE);
            self.buf.put_uint_le(value, 3);
        } else {
            self.buf.put_u8(LENENC_8_BYTE);
            self.buf.put_u64_le(value);
        }
        Ok(())
    }

    pub fn write_lenenc_bytes(&mut self, data: &[u8]) -> Result<()> {
        self.reserve(lenenc_bytes_len(data.len()))?;
        self.write_lenenc_int(data.len() as u64)?;
        self.buf.put_slice(data);
        Ok(())
    }

    /// Raw string that runs to the end of the packet; no length prefix.
    pub fn write_rest_of_packet(&mut self, data: &[u8]) -> Result<()> {
        self.write_bytes(data)
    }

    pub fn finish(self) -> Bytes {
        Bytes::from(self.buf)
    }
}
