//! Handler module - work type contracts and dispatch.
//!
//! Provides:
//! - [`WorkEncoder`] / [`WorkExecutor`] - the produce and consume contracts
//! - [`WorkRegistry`] - maps work type IDs to executors
//! - [`execute_record`] - runs one record from a byte range
//!
//! # Example
//!
//! ```
//! use workpipe::codec::PayloadReader;
//! use workpipe::handler::{execute_record, encode_record, FnExecutor, WorkExecutor, WorkRegistry};
//!
//! let registry = WorkRegistry::new();
//! let id = registry.register("ping", || -> Box<dyn WorkExecutor> {
//!     Box::new(FnExecutor::new(|reader: &mut PayloadReader<'_>| {
//!         assert_eq!(reader.read_u8()?, 1);
//!         Ok(())
//!     }))
//! });
//!
//! # struct Ping;
//! # impl workpipe::handler::WorkEncoder for Ping {
//! #     fn required_size(&self) -> usize { 1 }
//! #     fn write_payload(&self, out: &mut workpipe::codec::PayloadWriter<'_>) -> workpipe::Result<()> {
//! #         out.put_u8(1)
//! #     }
//! # }
//! let mut buf = [0u8; 64];
//! let used = encode_record(&Ping, id, &mut buf).unwrap();
//! assert_eq!(execute_record(&registry, &buf).unwrap(), used);
//! ```

mod executor;
mod registry;
mod work;

pub use executor::execute_record;
pub use registry::WorkRegistry;
pub use work::{
    encode_record, DecodeWork, FnExecutor, TypedExecutor, WorkEncoder, WorkExecutor,
};
pub(crate) use work::encode_record_sized;
