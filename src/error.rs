//! Error types for workpipe.

use thiserror::Error;

use crate::protocol::WorkTypeId;

/// Main error type for all workpipe operations.
#[derive(Debug, Error)]
pub enum WorkpipeError {
    /// Identifier 0 or an identifier the registry never issued.
    ///
    /// Seeing this while draining means the buffer is corrupt or was
    /// encoded against a different registry.
    #[error("Invalid work type ID {id} (registry holds {registered} types)")]
    InvalidWorkTypeId {
        /// The identifier read from the record header.
        id: WorkTypeId,
        /// Number of types registered at lookup time.
        registered: usize,
    },

    /// The type has no executor in this registry and cannot create one itself.
    #[error("Work type not registered: {0}")]
    UnregisteredWorkType(&'static str),

    /// Explicit registration of a type that is already bound.
    #[error("Work type already registered: {0}")]
    AlreadyRegistered(&'static str),

    /// A read went past the committed bytes.
    #[error("Payload truncated: needed {needed} bytes, {available} available")]
    PayloadTruncated {
        /// Bytes the read required.
        needed: usize,
        /// Bytes left in the range.
        available: usize,
    },

    /// A write went past the reserved range.
    #[error("Payload overflow: needed {needed} bytes, {available} available")]
    PayloadOverflow {
        /// Bytes the write required.
        needed: usize,
        /// Bytes left in the range.
        available: usize,
    },

    /// `write_payload` disagreed with `required_size`.
    #[error("Encoder wrote {written} bytes but declared {expected}")]
    SizeMismatch {
        /// Declared payload size.
        expected: usize,
        /// Bytes actually written.
        written: usize,
    },

    /// An executor reported more consumed bytes than the pipe holds.
    #[error("Executor consumed {consumed} bytes but only {available} remain")]
    OverConsumed {
        /// Reported consumption.
        consumed: usize,
        /// Bytes remaining after the record header.
        available: usize,
    },

    /// Text field was not valid UTF-8.
    #[error("UTF-8 error: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    /// MsgPack serialization error.
    #[error("MsgPack encode error: {0}")]
    MsgPackEncode(#[from] rmp_serde::encode::Error),

    /// MsgPack deserialization error.
    #[error("MsgPack decode error: {0}")]
    MsgPackDecode(#[from] rmp_serde::decode::Error),

    /// JSON error (configuration and schema export).
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The work itself failed.
    #[error("Execution error: {0}")]
    Execution(String),
}

impl WorkpipeError {
    /// Create an execution error from any displayable message.
    pub fn execution(message: impl Into<String>) -> Self {
        Self::Execution(message.into())
    }
}

/// Result type alias using WorkpipeError.
pub type Result<T> = std::result::Result<T, WorkpipeError>;
