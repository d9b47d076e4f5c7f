//! MsgPack records using `rmp-serde`.
//!
//! Any serde type can travel through a pipe wrapped in [`MsgPackWork`]. The
//! value is serialized once at construction (`to_vec_named`, struct-as-map)
//! and written as a length-prefixed field, so the record is self-delimiting.
//! [`MsgPackExecutor`] reads it back and calls a typed handler.
//!
//! # Example
//!
//! ```
//! use workpipe::codec::{MsgPackExecutor, MsgPackWork};
//! use workpipe::context::OffloadContext;
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Serialize, Deserialize, PartialEq, Debug)]
//! struct Message {
//!     id: u32,
//!     content: String,
//! }
//!
//! let mut ctx = OffloadContext::new();
//! ctx.register::<MsgPackWork<Message>, _>(MsgPackExecutor::new(|msg: Message| {
//!     assert_eq!(msg.content, "hello");
//!     Ok(())
//! }))
//! .unwrap();
//!
//! let msg = Message { id: 42, content: "hello".to_string() };
//! ctx.encode(&MsgPackWork::new(&msg).unwrap()).unwrap();
//! assert_eq!(ctx.drain().unwrap().records, 1);
//! ```

use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::payload::{len_prefixed_size, PayloadReader, PayloadWriter};
use crate::error::Result;
use crate::handler::{WorkEncoder, WorkExecutor};

/// MessagePack codec for structured data.
///
/// Uses `rmp_serde::to_vec_named` so structs are serialized as maps
/// (with field names) rather than arrays (positional).
pub struct MsgPackCodec;

impl MsgPackCodec {
    /// Encode a value to MsgPack bytes.
    ///
    /// # Errors
    ///
    /// Returns error if the value cannot be serialized.
    #[inline]
    pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
        Ok(rmp_serde::to_vec_named(value)?)
    }

    /// Decode MsgPack bytes to a value.
    ///
    /// # Errors
    ///
    /// Returns error if the bytes cannot be deserialized to type T.
    #[inline]
    pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
        Ok(rmp_serde::from_slice(bytes)?)
    }
}

/// A serde value pre-encoded as a MsgPack work record.
///
/// Each `T` is a distinct work type with its own identifier.
pub struct MsgPackWork<T> {
    bytes: Vec<u8>,
    _phantom: PhantomData<fn() -> T>,
}

impl<T: Serialize + 'static> MsgPackWork<T> {
    /// Serialize `value` into a new record.
    pub fn new(value: &T) -> Result<Self> {
        Ok(Self {
            bytes: MsgPackCodec::encode(value)?,
            _phantom: PhantomData,
        })
    }

    /// The encoded MsgPack body, without length prefix.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl<T: Serialize + 'static> WorkEncoder for MsgPackWork<T> {
    fn required_size(&self) -> usize {
        len_prefixed_size(self.bytes.len())
    }

    fn write_payload(&self, out: &mut PayloadWriter<'_>) -> Result<()> {
        out.put_len_prefixed(&self.bytes)
    }

    fn type_name() -> &'static str {
        std::any::type_name::<T>()
    }
}

/// Executor that decodes a [`MsgPackWork`] record before calling the handler.
pub struct MsgPackExecutor<T, F>
where
    T: DeserializeOwned + 'static,
    F: Fn(T) -> Result<()> + Send + Sync + 'static,
{
    handler: F,
    _phantom: PhantomData<fn() -> T>,
}

impl<T, F> MsgPackExecutor<T, F>
where
    T: DeserializeOwned + 'static,
    F: Fn(T) -> Result<()> + Send + Sync + 'static,
{
    /// Create a new MsgPack executor.
    pub fn new(handler: F) -> Self {
        Self {
            handler,
            _phantom: PhantomData,
        }
    }
}

impl<T, F> WorkExecutor for MsgPackExecutor<T, F>
where
    T: DeserializeOwned + 'static,
    F: Fn(T) -> Result<()> + Send + Sync + 'static,
{
    fn decode_and_execute(&self, data: &[u8]) -> Result<usize> {
        let mut reader = PayloadReader::new(data);
        let body = reader.read_len_prefixed()?;
        let value: T = MsgPackCodec::decode(body)?;
        let consumed = reader.consumed();
        (self.handler)(value)?;
        Ok(consumed)
    }
}
