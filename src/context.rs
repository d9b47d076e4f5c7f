//! Offload context: one pipe paired with one registry.
//!
//! A context is the unit a single producer writes into. `encode` appends a
//! record (resolving the work type ID on first use), `drain` executes every
//! committed record in FIFO order and returns.
//!
//! Both take `&mut self`, so encode and drain on one pipe can never
//! interleave. Hand each producer thread its own context instead of sharing
//! one.
//!
//! # Example
//!
//! ```
//! use workpipe::codec::{PayloadReader, PayloadWriter};
//! use workpipe::context::OffloadContext;
//! use workpipe::handler::{FnExecutor, WorkEncoder};
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
//! }
//!
//! let mut ctx = OffloadContext::new();
//! ctx.register::<Answer, _>(FnExecutor::new(|reader: &mut PayloadReader<'_>| {
//!     assert_eq!(reader.read_u32()?, 42);
//!     Ok(())
//! }))
//! .unwrap();
//!
//! ctx.encode(&Answer(42)).unwrap();
//! let stats = ctx.drain().unwrap();
//! assert_eq!(stats.records, 1);
//! assert!(ctx.pipe().is_empty());
//! ```

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::Result;
use crate::handler::{encode_record_sized, execute_record, WorkEncoder, WorkExecutor, WorkRegistry};
use crate::protocol::{record_size, Pipe, WorkTypeId};

/// Outcome of a drain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainStats {
    /// Records executed.
    pub records: usize,
    /// Bytes consumed, headers included.
    pub bytes: usize,
}

impl DrainStats {
    /// Add another drain's counts into this one.
    pub fn merge(&mut self, other: DrainStats) {
        self.records += other.records;
        self.bytes += other.bytes;
    }
}

/// A pipe and the registry its records are encoded against.
#[derive(Debug)]
pub struct OffloadContext {
    /// Record storage.
    pipe: Pipe,
    /// Executors for the identifiers in `pipe`.
    registry: Arc<WorkRegistry>,
    /// Identifiers this context already resolved, so encode skips the lock.
    id_cache: HashMap<TypeId, WorkTypeId>,
    /// Shift undrained bytes to offset 0 after each drain.
    compact_on_drain: bool,
}

impl OffloadContext {
    /// Create a context with a default pipe and a fresh registry.
    pub fn new() -> Self {
        Self::with_parts(Pipe::new(), Arc::new(WorkRegistry::new()))
    }

    /// Create a context from an existing pipe and registry.
    pub fn with_parts(pipe: Pipe, registry: Arc<WorkRegistry>) -> Self {
        Self {
            pipe,
            registry,
            id_cache: HashMap::new(),
            compact_on_drain: false,
        }
    }

    /// Compact the pipe after every drain.
    pub fn compact_on_drain(mut self, enabled: bool) -> Self {
        self.compact_on_drain = enabled;
        self
    }

    /// Bind `T` to `executor` in this context's registry.
    ///
    /// Call once at setup for every work type the producer will use.
    pub fn register<T, E>(&mut self, executor: E) -> Result<WorkTypeId>
    where
        T: WorkEncoder,
        E: WorkExecutor,
    {
        let id = self.registry.register_type::<T, E>(executor)?;
        self.id_cache.insert(TypeId::of::<T>(), id);
        Ok(id)
    }

    /// Identifier of `T` in this context, assigning one on first use.
    pub fn work_type_id<T: WorkEncoder>(&mut self) -> Result<WorkTypeId> {
        if let Some(&id) = self.id_cache.get(&TypeId::of::<T>()) {
            return Ok(id);
        }
        let id = self.registry.resolve::<T>()?;
        self.id_cache.insert(TypeId::of::<T>(), id);
        Ok(id)
    }

    /// Append one record for `work`.
    ///
    /// Returns the number of bytes appended. On error nothing is committed.
    pub fn encode<T: WorkEncoder>(&mut self, work: &T) -> Result<usize> {
        let id = self.work_type_id::<T>()?;
        let payload_size = work.required_size();

        let space = self.pipe.try_reserve(record_size(payload_size))?;
        let used = encode_record_sized(work, id, payload_size, space)?;
        self.pipe.commit(used);
        Ok(used)
    }

    /// Execute every committed record in order.
    ///
    /// Returns once the pipe is empty; never waits for more data. If any
    /// record fails, the rest of the pipe is discarded and the error is
    /// returned: after a failure the position of the next record is unknown.
    pub fn drain(&mut self) -> Result<DrainStats> {
        let mut stats = DrainStats::default();

        while !self.pipe.is_empty() {
            match execute_record(&self.registry, self.pipe.undrained()) {
                Ok(used) => {
                    self.pipe.advance_read(used);
                    stats.records += 1;
                    stats.bytes += used;
                }
                Err(e) => {
                    let read_cursor = self.pipe.read_cursor();
                    let write_cursor = self.pipe.write_cursor();
                    let dropped = self.pipe.discard_undrained();
                    tracing::error!(
                        "Drain aborted after {} records at offset {}/{}: {} ({} bytes discarded)",
                        stats.records,
                        read_cursor,
                        write_cursor,
                        e,
                        dropped
                    );
                    if self.compact_on_drain {
                        self.pipe.compact();
                    }
                    return Err(e);
                }
            }
        }

        if self.compact_on_drain {
            self.pipe.compact();
        }

        if stats.records > 0 {
            tracing::debug!("Drained {} records ({} bytes)", stats.records, stats.bytes);
        }
        Ok(stats)
    }

    /// The underlying pipe.
    pub fn pipe(&self) -> &Pipe {
        &self.pipe
    }

    /// The registry records are encoded against.
    pub fn registry(&self) -> &Arc<WorkRegistry> {
        &self.registry
    }
}

impl Default for OffloadContext {
    fn default() -> Self {
        Self::new()
    }
}
