//! Bounds-checked payload access.
//!
//! Executors read their record through [`PayloadReader`], encoders write it
//! through [`PayloadWriter`]. Both sit on `bytes::Buf`/`bytes::BufMut` over a
//! plain slice, but check the remaining length first and return an error
//! instead of panicking, so a malformed record can never reach memory
//! outside its range.
//!
//! Variable-length fields are self-delimiting: a native `u32` length
//! followed by the data.
//!
//! # Example
//!
//! ```
//! use workpipe::codec::{PayloadReader, PayloadWriter};
//!
//! let mut buf = [0u8; 13];
//! let mut writer = PayloadWriter::new(&mut buf);
//! writer.put_u32(42).unwrap();
//! writer.put_str("hello").unwrap();
//! assert_eq!(writer.written(), 13);
//!
//! let mut reader = PayloadReader::new(&buf);
//! assert_eq!(reader.read_u32().unwrap(), 42);
//! assert_eq!(reader.read_str().unwrap(), "hello");
//! assert_eq!(reader.consumed(), 13);
//! ```

use bytes::{Buf, BufMut};

use crate::error::{Result, WorkpipeError};

/// Size of a length prefix.
pub const LEN_PREFIX_SIZE: usize = std::mem::size_of::<u32>();

/// Encoded size of a length-prefixed byte field.
///
/// Saturates at `usize::MAX`, which no pipe can reserve.
#[inline]
pub fn len_prefixed_size(len: usize) -> usize {
    LEN_PREFIX_SIZE.saturating_add(len)
}

/// Encoded size of a length-prefixed `u32` list.
///
/// Saturates at `usize::MAX`, which no pipe can reserve.
#[inline]
pub fn u32_list_size(count: usize) -> usize {
    count
        .checked_mul(std::mem::size_of::<u32>())
        .and_then(|bytes| bytes.checked_add(LEN_PREFIX_SIZE))
        .unwrap_or(usize::MAX)
}

/// Convert a field length to its `u32` prefix.
fn len_prefix(len: usize) -> Result<u32> {
    u32::try_from(len).map_err(|_| WorkpipeError::PayloadOverflow {
        needed: len,
        available: u32::MAX as usize,
    })
}

/// Cursor over the bytes of one record.
#[derive(Debug)]
pub struct PayloadReader<'a> {
    buf: &'a [u8],
    start_len: usize,
}

impl<'a> PayloadReader<'a> {
    /// Create a reader over `data`.
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            buf: data,
            start_len: data.len(),
        }
    }

    /// Bytes read so far.
    #[inline]
    pub fn consumed(&self) -> usize {
        self.start_len - self.buf.remaining()
    }

    /// Bytes left in the range.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.buf.remaining()
    }

    #[inline]
    fn ensure(&self, needed: usize) -> Result<()> {
        if self.buf.remaining() < needed {
            return Err(WorkpipeError::PayloadTruncated {
                needed,
                available: self.buf.remaining(),
            });
        }
        Ok(())
    }

    /// Read one byte.
    pub fn read_u8(&mut self) -> Result<u8> {
        self.ensure(1)?;
        Ok(self.buf.get_u8())
    }

    /// Read a native-endian `u16`.
    pub fn read_u16(&mut self) -> Result<u16> {
        self.ensure(2)?;
        Ok(self.buf.get_u16_ne())
    }

    /// Read a native-endian `u32`.
    pub fn read_u32(&mut self) -> Result<u32> {
        self.ensure(4)?;
        Ok(self.buf.get_u32_ne())
    }

    /// Read a native-endian `u64`.
    pub fn read_u64(&mut self) -> Result<u64> {
        self.ensure(8)?;
        Ok(self.buf.get_u64_ne())
    }

    /// Read a native-endian `i32`.
    pub fn read_i32(&mut self) -> Result<i32> {
        self.ensure(4)?;
        Ok(self.buf.get_i32_ne())
    }

    /// Read a native-endian `i64`.
    pub fn read_i64(&mut self) -> Result<i64> {
        self.ensure(8)?;
        Ok(self.buf.get_i64_ne())
    }

    /// Read a native-endian `f64`.
    pub fn read_f64(&mut self) -> Result<f64> {
        self.ensure(8)?;
        Ok(self.buf.get_f64_ne())
    }

    /// Read exactly `len` bytes without copying.
    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        self.ensure(len)?;
        let (head, tail) = self.buf.split_at(len);
        self.buf = tail;
        Ok(head)
    }

    /// Read a length-prefixed byte field.
    pub fn read_len_prefixed(&mut self) -> Result<&'a [u8]> {
        let len = self.read_u32()? as usize;
        self.read_bytes(len)
    }

    /// Read a length-prefixed UTF-8 string.
    pub fn read_str(&mut self) -> Result<&'a str> {
        let bytes = self.read_len_prefixed()?;
        Ok(std::str::from_utf8(bytes)?)
    }

    /// Read a length-prefixed list of native-endian `u32`.
    pub fn read_u32_list(&mut self) -> Result<Vec<u32>> {
        let count = self.read_u32()? as usize;
        self.ensure(count.saturating_mul(4))?;
        Ok((0..count).map(|_| self.buf.get_u32_ne()).collect())
    }
}

/// Cursor over the reserved range of one record.
#[derive(Debug)]
pub struct PayloadWriter<'a> {
    buf: &'a mut [u8],
    start_len: usize,
}

impl<'a> PayloadWriter<'a> {
    /// Create a writer over `out`.
    pub fn new(out: &'a mut [u8]) -> Self {
        let start_len = out.len();
        Self {
            buf: out,
            start_len,
        }
    }

    /// Bytes written so far.
    #[inline]
    pub fn written(&self) -> usize {
        self.start_len - self.buf.remaining_mut()
    }

    /// Bytes left in the range.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.buf.remaining_mut()
    }

    #[inline]
    fn ensure(&self, needed: usize) -> Result<()> {
        if self.buf.remaining_mut() < needed {
            return Err(WorkpipeError::PayloadOverflow {
                needed,
                available: self.buf.remaining_mut(),
            });
        }
        Ok(())
    }

    /// Write one byte.
    pub fn put_u8(&mut self, value: u8) -> Result<()> {
        self.ensure(1)?;
        self.buf.put_u8(value);
        Ok(())
    }

    /// Write a native-endian `u16`.
    pub fn put_u16(&mut self, value: u16) -> Result<()> {
        self.ensure(2)?;
        self.buf.put_u16_ne(value);
        Ok(())
    }

    /// Write a native-endian `u32`.
    pub fn put_u32(&mut self, value: u32) -> Result<()> {
        self.ensure(4)?;
        self.buf.put_u32_ne(value);
        Ok(())
    }

    /// Write a native-endian `u64`.
    pub fn put_u64(&mut self, value: u64) -> Result<()> {
        self.ensure(8)?;
        self.buf.put_u64_ne(value);
        Ok(())
    }

    /// Write a native-endian `i32`.
    pub fn put_i32(&mut self, value: i32) -> Result<()> {
        self.ensure(4)?;
        self.buf.put_i32_ne(value);
        Ok(())
    }

    /// Write a native-endian `i64`.
    pub fn put_i64(&mut self, value: i64) -> Result<()> {
        self.ensure(8)?;
        self.buf.put_i64_ne(value);
        Ok(())
    }

    /// Write a native-endian `f64`.
    pub fn put_f64(&mut self, value: f64) -> Result<()> {
        self.ensure(8)?;
        self.buf.put_f64_ne(value);
        Ok(())
    }

    /// Write raw bytes with no prefix.
    pub fn put_bytes(&mut self, data: &[u8]) -> Result<()> {
        self.ensure(data.len())?;
        self.buf.put_slice(data);
        Ok(())
    }

    /// Write a length-prefixed byte field.
    pub fn put_len_prefixed(&mut self, data: &[u8]) -> Result<()> {
        let len = len_prefix(data.len())?;
        self.ensure(len_prefixed_size(data.len()))?;
        self.buf.put_u32_ne(len);
        self.buf.put_slice(data);
        Ok(())
    }

    /// Write a length-prefixed UTF-8 string.
    pub fn put_str(&mut self, value: &str) -> Result<()> {
        self.put_len_prefixed(value.as_bytes())
    }

    /// Write a length-prefixed list of native-endian `u32`.
    pub fn put_u32_list(&mut self, values: &[u32]) -> Result<()> {
        let count = len_prefix(values.len())?;
        self.ensure(u32_list_size(values.len()))?;
        self.buf.put_u32_ne(count);
        for &value in values {
            self.buf.put_u32_ne(value);
        }
        Ok(())
    }
}
