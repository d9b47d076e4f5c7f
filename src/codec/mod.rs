//! Codec module - payload serialization.
//!
//! This module provides the building blocks work types use for their bytes:
//!
//! - [`PayloadReader`] / [`PayloadWriter`] - bounds-checked native-layout fields
//! - [`MsgPackCodec`] - MessagePack using `rmp-serde` (`to_vec_named`)
//! - [`MsgPackWork`] / [`MsgPackExecutor`] - any serde type as a work record
//!
//! # Example
//!
//! ```
//! use workpipe::codec::MsgPackCodec;
//!
//! let encoded = MsgPackCodec::encode(&"hello").unwrap();
//! let decoded: String = MsgPackCodec::decode(&encoded).unwrap();
//! assert_eq!(decoded, "hello");
//! ```

mod msgpack;
mod payload;

pub use msgpack::{MsgPackCodec, MsgPackExecutor, MsgPackWork};
pub use payload::{
    len_prefixed_size, u32_list_size, PayloadReader, PayloadWriter, LEN_PREFIX_SIZE,
};
