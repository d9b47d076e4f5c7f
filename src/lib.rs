//! # workpipe
//!
//! Deferred-execution command buffer for heterogeneous work.
//!
//! A producer encodes typed work values into a byte pipe; a consumer later
//! drains the pipe in order, dispatching each record to the executor of its
//! work type. Producer and consumer share no compile-time type information:
//! each record carries a small identifier assigned by a registry on first
//! use.
//!
//! ## Architecture
//!
//! - **Registry**: work type ID → executor, thread-safe
//! - **Pipe**: growable byte buffer with write and read cursors
//! - **Context**: one pipe + one registry, used by one producer
//! - **Worker**: owns many contexts, drains them as a batch
//!
//! ```text
//! encode(work) ─► resolve ID ─► [ID | payload] ─► Pipe ─► drain ─► lookup ─► execute
//! ```
//!
//! Records use native memory layout and never leave the process.
//!
//! ## Example
//!
//! ```
//! use workpipe::codec::{PayloadReader, PayloadWriter};
//! use workpipe::handler::{FnExecutor, WorkEncoder, WorkExecutor};
//! use workpipe::{Result, Worker};
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
//!
//! let mut worker = Worker::new();
//! worker.create_context().encode(&Answer(42)).unwrap();
//! worker.drain_all().unwrap();
//! ```

pub mod codec;
pub mod context;
pub mod error;
pub mod handler;
pub mod protocol;
pub mod schema;

mod worker;

pub use context::{DrainStats, OffloadContext};
pub use error::{Result, WorkpipeError};
pub use handler::{WorkEncoder, WorkExecutor, WorkRegistry};
pub use worker::{Worker, WorkerBuilder, WorkerConfig};
