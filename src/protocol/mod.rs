//! Protocol module - record wire format and the append/drain pipe.
//!
//! This module implements the storage side of the command buffer:
//! - Native-width work type identifier header
//! - `Pipe` with independent write and read cursors

mod pipe;
mod wire_format;

pub use pipe::{Pipe, DEFAULT_INITIAL_CAPACITY, DEFAULT_WARN_CAPACITY};
pub use wire_format::{
    decode_work_type_id, encode_work_type_id_into, record_size, validate_work_type_id,
    WorkTypeId, ID_SIZE, UNASSIGNED_WORK_TYPE_ID,
};
