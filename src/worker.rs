//! Worker owning a set of offload contexts.
//!
//! The [`Worker`] creates contexts on demand and drains them as a batch.
//! Drain order within a context is FIFO; across contexts it follows
//! creation order, but no ordering between contexts is promised.
//!
//! Producers get `&mut` access to their context, so the usual pattern is
//! to hand each producer thread one context through [`Worker::contexts_mut`]
//! inside `std::thread::scope`, then call [`Worker::drain_all`] once the
//! scope ends.
//!
//! # Example
//!
//! ```
//! use workpipe::codec::{PayloadReader, PayloadWriter};
//! use workpipe::handler::{FnExecutor, WorkEncoder, WorkExecutor};
//! use workpipe::{Result, Worker};
//!
//! struct Tick;
//!
//! impl WorkEncoder for Tick {
//!     fn required_size(&self) -> usize {
//!         0
//!     }
//!
//!     fn write_payload(&self, _out: &mut PayloadWriter<'_>) -> Result<()> {
//!         Ok(())
//!     }
//!
//!     fn create_executor() -> Option<Box<dyn WorkExecutor>> {
//!         Some(Box::new(FnExecutor::new(|_: &mut PayloadReader<'_>| Ok(()))))
//!     }
//! }
//!
//! let mut worker = Worker::builder().initial_capacity(1024).build();
//! worker.create_context().encode(&Tick).unwrap();
//! worker.create_context().encode(&Tick).unwrap();
//!
//! assert_eq!(worker.drain_all().unwrap().records, 2);
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::context::{DrainStats, OffloadContext};
use crate::error::{Result, WorkpipeError};
use crate::handler::WorkRegistry;
use crate::protocol::{Pipe, DEFAULT_INITIAL_CAPACITY, DEFAULT_WARN_CAPACITY};

/// Configuration for the contexts a worker creates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Initial pipe allocation in bytes.
    pub initial_capacity: usize,
    /// Shift undrained bytes to offset 0 after every drain.
    pub compact_on_drain: bool,
    /// Pipe size at which growth is logged as a warning.
    pub warn_capacity: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            initial_capacity: DEFAULT_INITIAL_CAPACITY,
            compact_on_drain: false,
            warn_capacity: DEFAULT_WARN_CAPACITY,
        }
    }
}

impl WorkerConfig {
    /// Parse a configuration from JSON. Missing fields keep their defaults.
    ///
    /// ```
    /// use workpipe::WorkerConfig;
    ///
    /// let config = WorkerConfig::from_json(r#"{ "compact_on_drain": true }"#).unwrap();
    /// assert!(config.compact_on_drain);
    /// assert_eq!(config.initial_capacity, 64 * 1024);
    /// ```
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Builder for configuring and creating a [`Worker`].
#[derive(Debug, Clone, Default)]
pub struct WorkerBuilder {
    config: WorkerConfig,
}

impl WorkerBuilder {
    /// Create a new worker builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing configuration.
    pub fn with_config(config: WorkerConfig) -> Self {
        Self { config }
    }

    /// Set the initial pipe capacity.
    ///
    /// Default: 64KB
    pub fn initial_capacity(mut self, capacity: usize) -> Self {
        self.config.initial_capacity = capacity;
        self
    }

    /// Compact pipes after every drain.
    ///
    /// Default: false (append-only, pipes keep their peak size)
    pub fn compact_on_drain(mut self, enabled: bool) -> Self {
        self.config.compact_on_drain = enabled;
        self
    }

    /// Set the pipe size at which growth is logged.
    ///
    /// Default: 64MB
    pub fn warn_capacity(mut self, capacity: usize) -> Self {
        self.config.warn_capacity = capacity;
        self
    }

    /// Build the worker.
    pub fn build(self) -> Worker {
        Worker {
            contexts: Vec::new(),
            config: self.config,
        }
    }
}

/// Owner of a collection of offload contexts.
#[derive(Debug, Default)]
pub struct Worker {
    contexts: Vec<OffloadContext>,
    config: WorkerConfig,
}

impl Worker {
    /// Create a worker with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new worker builder.
    pub fn builder() -> WorkerBuilder {
        WorkerBuilder::new()
    }

    /// Create a context with a fresh pipe and a fresh registry.
    ///
    /// The worker keeps ownership; the returned reference stays usable until
    /// the next call that borrows the worker.
    pub fn create_context(&mut self) -> &mut OffloadContext {
        self.create_context_with_registry(Arc::new(WorkRegistry::new()))
    }

    /// Create a context with a fresh pipe bound to an existing registry.
    ///
    /// Contexts sharing a registry share identifier assignments.
    pub fn create_context_with_registry(
        &mut self,
        registry: Arc<WorkRegistry>,
    ) -> &mut OffloadContext {
        let pipe = Pipe::with_capacity(self.config.initial_capacity)
            .with_warn_capacity(self.config.warn_capacity);
        let context =
            OffloadContext::with_parts(pipe, registry).compact_on_drain(self.config.compact_on_drain);

        self.contexts.push(context);
        let index = self.contexts.len() - 1;
        tracing::debug!("Created offload context {}", index);
        &mut self.contexts[index]
    }

    /// Drain every context in turn.
    ///
    /// A failing context does not stop the others; after all contexts were
    /// processed the first failure is returned.
    pub fn drain_all(&mut self) -> Result<DrainStats> {
        let mut total = DrainStats::default();
        let mut first_error: Option<WorkpipeError> = None;

        for (index, context) in self.contexts.iter_mut().enumerate() {
            match context.drain() {
                Ok(stats) => total.merge(stats),
                Err(e) => {
                    tracing::error!("Drain of context {} failed: {}", index, e);
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(total),
        }
    }

    /// Get a context by creation index.
    pub fn context(&self, index: usize) -> Option<&OffloadContext> {
        self.contexts.get(index)
    }

    /// Get a context mutably by creation index.
    pub fn context_mut(&mut self, index: usize) -> Option<&mut OffloadContext> {
        self.contexts.get_mut(index)
    }

    /// Iterate over the contexts.
    pub fn contexts(&self) -> std::slice::Iter<'_, OffloadContext> {
        self.contexts.iter()
    }

    /// Iterate mutably over the contexts.
    pub fn contexts_mut(&mut self) -> std::slice::IterMut<'_, OffloadContext> {
        self.contexts.iter_mut()
    }

    /// Number of contexts.
    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    /// Check if no context was created yet.
    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }

    /// Configuration used for new contexts.
    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{PayloadReader, PayloadWriter};
    use crate::handler::{FnExecutor, WorkEncoder, WorkExecutor};
    use std::sync::atomic::{AtomicUsize, Ordering};

    static TICKS: AtomicUsize = AtomicUsize::new(0);

    struct Tick;

    impl WorkEncoder for Tick {
        fn required_size(&self) -> usize {
            0
        }

        fn write_payload(&self, _out: &mut PayloadWriter<'_>) -> Result<()> {
            Ok(())
        }

        fn create_executor() -> Option<Box<dyn WorkExecutor>> {
            Some(Box::new(FnExecutor::new(|_: &mut PayloadReader<'_>| {
                TICKS.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })))
        }
    }

    struct Poison;

    impl WorkEncoder for Poison {
        fn required_size(&self) -> usize {
            0
        }

        fn write_payload(&self, _out: &mut PayloadWriter<'_>) -> Result<()> {
            Ok(())
        }

        fn create_executor() -> Option<Box<dyn WorkExecutor>> {
            Some(Box::new(FnExecutor::new(|_: &mut PayloadReader<'_>| {
                Err(WorkpipeError::execution("poisoned"))
            })))
        }
    }

    #[test]
    fn test_default_config() {
        let config = WorkerConfig::default();
        assert_eq!(config.initial_capacity, DEFAULT_INITIAL_CAPACITY);
        assert!(!config.compact_on_drain);
        assert_eq!(config.warn_capacity, DEFAULT_WARN_CAPACITY);
    }

    #[test]
    fn test_config_from_json() {
        let config = WorkerConfig::from_json(
            r#"{ "initial_capacity": 128, "compact_on_drain": true, "warn_capacity": 4096 }"#,
        )
        .unwrap();

        assert_eq!(config.initial_capacity, 128);
        assert!(config.compact_on_drain);
        assert_eq!(config.warn_capacity, 4096);
    }

    #[test]
    fn test_config_from_invalid_json() {
        assert!(matches!(
            WorkerConfig::from_json("{ not json"),
            Err(WorkpipeError::Json(_))
        ));
    }

    #[test]
    fn test_builder_applies_config() {
        let mut worker = Worker::builder()
            .initial_capacity(32)
            .compact_on_drain(true)
            .warn_capacity(1024)
            .build();

        assert_eq!(worker.config().initial_capacity, 32);
        let ctx = worker.create_context();
        assert_eq!(ctx.pipe().capacity(), 32);
    }

    #[test]
    fn test_builder_with_config() {
        let config = WorkerConfig {
            initial_capacity: 16,
            ..WorkerConfig::default()
        };
        let worker = WorkerBuilder::with_config(config.clone()).build();
        assert_eq!(worker.config(), &config);
    }

    #[test]
    fn test_create_context_gets_fresh_registry() {
        let mut worker = Worker::new();

        worker.create_context().encode(&Tick).unwrap();
        worker.create_context();

        assert_eq!(worker.len(), 2);
        assert_eq!(worker.context(0).unwrap().registry().len(), 1);
        assert!(worker.context(1).unwrap().registry().is_empty());
    }

    #[test]
    fn test_drain_all_counts_every_context() {
        let mut worker = Worker::builder().initial_capacity(64).build();
        for _ in 0..3 {
            let ctx = worker.create_context();
            ctx.encode(&Tick).unwrap();
            ctx.encode(&Tick).unwrap();
        }

        let stats = worker.drain_all().unwrap();

        assert_eq!(stats.records, 6);
        assert!(worker.contexts().all(|c| c.pipe().is_empty()));
    }

    #[test]
    fn test_drain_all_empty_worker() {
        let mut worker = Worker::new();
        assert!(worker.is_empty());
        assert_eq!(worker.drain_all().unwrap(), DrainStats::default());
    }

    #[test]
    fn test_drain_all_continues_past_failure() {
        let mut worker = Worker::builder().initial_capacity(64).build();
        worker.create_context().encode(&Poison).unwrap();
        worker.create_context().encode(&Tick).unwrap();

        let result = worker.drain_all();

        assert!(result.unwrap_err().to_string().contains("poisoned"));
        assert!(worker.contexts().all(|c| c.pipe().is_empty()));
    }

    #[test]
    fn test_shared_registry_contexts() {
        let registry = Arc::new(WorkRegistry::new());
        let mut worker = Worker::builder().initial_capacity(64).build();

        worker
            .create_context_with_registry(registry.clone())
            .encode(&Tick)
            .unwrap();
        worker
            .create_context_with_registry(registry.clone())
            .encode(&Tick)
            .unwrap();

        assert_eq!(registry.len(), 1);
        assert_eq!(worker.drain_all().unwrap().records, 2);
    }

    #[test]
    fn test_context_mut_by_index() {
        let mut worker = Worker::builder().initial_capacity(64).build();
        worker.create_context();

        worker.context_mut(0).unwrap().encode(&Tick).unwrap();

        assert!(worker.context_mut(1).is_none());
        assert_eq!(worker.drain_all().unwrap().records, 1);
    }
}
