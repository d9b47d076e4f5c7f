//! Single-record execution.
//!
//! [`execute_record`] is one step of the drain loop: read the identifier at
//! the front of a byte range, find its executor, run it, and report how far
//! to advance.

use super::WorkRegistry;
use crate::error::{Result, WorkpipeError};
use crate::protocol::{decode_work_type_id, ID_SIZE};

/// Execute the record at the front of `record`.
///
/// Returns the number of bytes the record occupied (header + payload).
/// `record` may hold further records after this one; they are not touched.
///
/// # Errors
///
/// - `PayloadTruncated` if fewer than `ID_SIZE` bytes are present.
/// - `InvalidWorkTypeId` if the identifier was not issued by `registry`.
/// - `OverConsumed` if the executor claims more bytes than exist.
/// - Anything the executor itself returns.
pub fn execute_record(registry: &WorkRegistry, record: &[u8]) -> Result<usize> {
    let id = decode_work_type_id(record).ok_or(WorkpipeError::PayloadTruncated {
        needed: ID_SIZE,
        available: record.len(),
    })?;

    // Lock is released before the executor runs
    let executor = registry.lookup(id)?;

    let payload = &record[ID_SIZE..];
    let consumed = executor.decode_and_execute(payload)?;
    if consumed > payload.len() {
        return Err(WorkpipeError::OverConsumed {
            consumed,
            available: payload.len(),
        });
    }

    tracing::trace!("Executed record {} ({} payload bytes)", id, consumed);
    Ok(ID_SIZE + consumed)
}
