//! Encoder and executor contracts for work types.
//!
//! A work type is any `'static` type implementing [`WorkEncoder`]. Its
//! matching executor implements [`WorkExecutor`] and is stored type-erased in
//! a [`WorkRegistry`](super::WorkRegistry) slot.
//!
//! # Example
//!
//! ```
//! use workpipe::codec::{PayloadReader, PayloadWriter};
//! use workpipe::handler::{FnExecutor, WorkEncoder, WorkExecutor};
//! use workpipe::Result;
//!
//! struct Answer(u32);
//!
//! impl WorkEncoder for Answer {
//!     fn required_size(&self) -> usize {
//!         4
//!     }
//!
//!     fn write_payload(&self, out: &mut PayloadWriter<'_>) -> Result<()> {
//!         out.put_u32(self.0)
//!     }
//!
//!     fn create_executor() -> Option<Box<dyn WorkExecutor>> {
//!         Some(Box::new(FnExecutor::new(|reader: &mut PayloadReader<'_>| {
//!             println!("Answer: {}", reader.read_u32()?);
//!             Ok(())
//!         })))
//!     }
//! }
//! ```

use std::marker::PhantomData;

use crate::codec::{PayloadReader, PayloadWriter};
use crate::error::{Result, WorkpipeError};
use crate::protocol::{encode_work_type_id_into, record_size, WorkTypeId, ID_SIZE};

/// Decode-and-execute side of a work type.
pub trait WorkExecutor: Send + Sync + 'static {
    /// Parse one record payload from `data` and perform the work.
    ///
    /// Returns the number of payload bytes consumed, which must equal what
    /// the matching encoder wrote. `data` may extend past this record.
    fn decode_and_execute(&self, data: &[u8]) -> Result<usize>;
}

/// Produce side of a work type.
pub trait WorkEncoder: 'static {
    /// Payload size in bytes, excluding the identifier header.
    fn required_size(&self) -> usize;

    /// Write exactly `required_size()` bytes.
    ///
    /// Nested variable-length fields must be self-delimiting.
    fn write_payload(&self, out: &mut PayloadWriter<'_>) -> Result<()>;

    /// Full record size in the pipe, identifier header included.
    #[inline]
    fn encoded_size(&self) -> usize {
        record_size(self.required_size())
    }

    /// Factory for lazy registration on first encode.
    ///
    /// Types returning `None` must be registered explicitly before use.
    fn create_executor() -> Option<Box<dyn WorkExecutor>>
    where
        Self: Sized,
    {
        None
    }

    /// Name reported in errors, logs and schemas.
    fn type_name() -> &'static str
    where
        Self: Sized,
    {
        std::any::type_name::<Self>()
    }
}

/// A value that can parse itself back out of a payload.
pub trait DecodeWork: Sized {
    /// Read one value, leaving the reader just past it.
    fn decode(reader: &mut PayloadReader<'_>) -> Result<Self>;
}

/// Executor built from a closure over a [`PayloadReader`].
///
/// Consumption is whatever the closure read, so it cannot be misreported.
pub struct FnExecutor<F>
where
    F: Fn(&mut PayloadReader<'_>) -> Result<()> + Send + Sync + 'static,
{
    handler: F,
}

impl<F> FnExecutor<F>
where
    F: Fn(&mut PayloadReader<'_>) -> Result<()> + Send + Sync + 'static,
{
    /// Create a new closure executor.
    pub fn new(handler: F) -> Self {
        Self { handler }
    }
}

impl<F> WorkExecutor for FnExecutor<F>
where
    F: Fn(&mut PayloadReader<'_>) -> Result<()> + Send + Sync + 'static,
{
    fn decode_and_execute(&self, data: &[u8]) -> Result<usize> {
        let mut reader = PayloadReader::new(data);
        (self.handler)(&mut reader)?;
        Ok(reader.consumed())
    }
}

/// Wrapper that decodes the payload before calling the handler.
pub struct TypedExecutor<T, F>
where
    T: DecodeWork + 'static,
    F: Fn(T) -> Result<()> + Send + Sync + 'static,
{
    handler: F,
    _phantom: PhantomData<fn() -> T>,
}

impl<T, F> TypedExecutor<T, F>
where
    T: DecodeWork + 'static,
    F: Fn(T) -> Result<()> + Send + Sync + 'static,
{
    /// Create a new typed executor.
    pub fn new(handler: F) -> Self {
        Self {
            handler,
            _phantom: PhantomData,
        }
    }
}

impl<T, F> WorkExecutor for TypedExecutor<T, F>
where
    T: DecodeWork + 'static,
    F: Fn(T) -> Result<()> + Send + Sync + 'static,
{
    fn decode_and_execute(&self, data: &[u8]) -> Result<usize> {
        let mut reader = PayloadReader::new(data);
        let value = T::decode(&mut reader)?;
        let consumed = reader.consumed();
        (self.handler)(value)?;
        Ok(consumed)
    }
}

/// Write a whole record (identifier header + payload) into `out`.
///
/// Returns the number of bytes used. `out` must hold at least
/// `work.encoded_size()` bytes.
pub fn encode_record<T: WorkEncoder>(
    work: &T,
    id: WorkTypeId,
    out: &mut [u8],
) -> Result<usize> {
    encode_record_sized(work, id, work.required_size(), out)
}

/// [`encode_record`] with `required_size()` already evaluated.
///
/// The payload must be exactly `payload_size` bytes.
pub(crate) fn encode_record_sized<T: WorkEncoder>(
    work: &T,
    id: WorkTypeId,
    payload_size: usize,
    out: &mut [u8],
) -> Result<usize> {
    let total = record_size(payload_size);
    if out.len() < total {
        return Err(WorkpipeError::PayloadOverflow {
            needed: total,
            available: out.len(),
        });
    }

    encode_work_type_id_into(out, id);

    let mut writer = PayloadWriter::new(&mut out[ID_SIZE..total]);
    work.write_payload(&mut writer)?;
    if writer.written() != payload_size {
        return Err(WorkpipeError::SizeMismatch {
            expected: payload_size,
            written: writer.written(),
        });
    }

    Ok(total)
}
