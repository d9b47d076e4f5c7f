//! Record wire format.
//!
//! Every record in a pipe is an identifier header followed by the payload:
//! ```text
//! ┌─────────────────┬──────────────────────────────┐
//! │ Work type ID    │ Payload                      │
//! │ usize, native   │ required_size() bytes        │
//! └─────────────────┴──────────────────────────────┘
//! ```
//!
//! The layout follows native memory: width and byte order of the identifier
//! match the host. Buffers are never meant to leave the process.

use crate::error::{Result, WorkpipeError};

/// Runtime-assigned identifier of a work type within one registry.
pub type WorkTypeId = usize;

/// Size of the identifier header in bytes.
pub const ID_SIZE: usize = std::mem::size_of::<WorkTypeId>();

/// Reserved identifier: never assigned, never dispatched.
pub const UNASSIGNED_WORK_TYPE_ID: WorkTypeId = 0;

/// Total bytes a record occupies in the pipe.
///
/// Saturates at `usize::MAX`, which no pipe can reserve.
#[inline]
pub fn record_size(payload_size: usize) -> usize {
    ID_SIZE.saturating_add(payload_size)
}

/// Encode an identifier into the front of `buf`.
///
/// # Panics
///
/// Panics if buffer is smaller than `ID_SIZE`.
#[inline]
pub fn encode_work_type_id_into(buf: &mut [u8], id: WorkTypeId) {
    buf[..ID_SIZE].copy_from_slice(&id.to_ne_bytes());
}

/// Decode an identifier from the front of `buf`.
///
/// Returns `None` if buffer is too short.
///
/// # Example
///
/// ```
/// use workpipe::protocol::{decode_work_type_id, encode_work_type_id_into, ID_SIZE};
///
/// let mut buf = [0u8; ID_SIZE];
/// encode_work_type_id_into(&mut buf, 7);
/// assert_eq!(decode_work_type_id(&buf), Some(7));
/// ```
#[inline]
pub fn decode_work_type_id(buf: &[u8]) -> Option<WorkTypeId> {
    let bytes: [u8; ID_SIZE] = buf.get(..ID_SIZE)?.try_into().ok()?;
    Some(WorkTypeId::from_ne_bytes(bytes))
}

/// Check an identifier against a registry holding `registered` types.
///
/// Valid identifiers are `1..=registered`.
pub fn validate_work_type_id(id: WorkTypeId, registered: usize) -> Result<()> {
    if id == UNASSIGNED_WORK_TYPE_ID || id > registered {
        return Err(WorkpipeError::InvalidWorkTypeId { id, registered });
    }
    Ok(())
}
