//! Work registry mapping identifiers to executors.
//!
//! Identifiers are assigned sequentially in first-use order starting from 1
//! (0 is reserved). Identifier `id` lives at `slots[id - 1]`. Slots are
//! append-only: an identifier, once issued, is never revoked or reused.
//!
//! Registration and lookup share one `parking_lot::Mutex`. The lock covers
//! only the slot access. Executor factories run before it is taken and
//! executors run after it is released, so either may use the registry.
//!
//! # Example
//!
//! ```
//! use workpipe::codec::PayloadReader;
//! use workpipe::handler::{FnExecutor, WorkExecutor, WorkRegistry};
//!
//! let registry = WorkRegistry::new();
//! let id = registry.register("noop", || -> Box<dyn WorkExecutor> {
//!     Box::new(FnExecutor::new(|_: &mut PayloadReader<'_>| Ok(())))
//! });
//!
//! assert_eq!(id, 1);
//! assert!(registry.lookup(id).is_ok());
//! assert!(registry.lookup(0).is_err());
//! ```

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use super::work::{WorkEncoder, WorkExecutor};
use crate::error::{Result, WorkpipeError};
use crate::protocol::{validate_work_type_id, WorkTypeId};
use crate::schema::RegistrySchema;

/// One registered work type.
struct Slot {
    /// The executor instance.
    executor: Arc<dyn WorkExecutor>,
    /// Name for diagnostics.
    type_name: &'static str,
}

#[derive(Default)]
struct RegistryState {
    /// Executors by `id - 1`.
    slots: Vec<Slot>,
    /// Identifiers already bound to a Rust type.
    ids: HashMap<TypeId, WorkTypeId>,
}

impl RegistryState {
    fn push(&mut self, type_name: &'static str, executor: Box<dyn WorkExecutor>) -> WorkTypeId {
        self.slots.push(Slot {
            executor: Arc::from(executor),
            type_name,
        });
        self.slots.len()
    }
}

/// Thread-safe registry of executors, one per work type.
///
/// Identifiers are only meaningful against the registry that issued them.
#[derive(Default)]
pub struct WorkRegistry {
    state: Mutex<RegistryState>,
}

impl WorkRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a freshly constructed executor and return its identifier.
    ///
    /// The slot is not bound to any Rust type; use it when records are
    /// written by hand with [`encode_record`](super::encode_record).
    pub fn register<F>(&self, type_name: &'static str, factory: F) -> WorkTypeId
    where
        F: FnOnce() -> Box<dyn WorkExecutor>,
    {
        let executor = factory();
        let id = self.state.lock().push(type_name, executor);
        tracing::debug!("Registered work type {} as {}", type_name, id);
        id
    }

    /// Bind `T` to `executor` explicitly.
    ///
    /// Fails if `T` already has an identifier in this registry.
    pub fn register_type<T, E>(&self, executor: E) -> Result<WorkTypeId>
    where
        T: WorkEncoder,
        E: WorkExecutor,
    {
        let type_name = T::type_name();
        let mut state = self.state.lock();
        if state.ids.contains_key(&TypeId::of::<T>()) {
            return Err(WorkpipeError::AlreadyRegistered(type_name));
        }

        let id = state.push(type_name, Box::new(executor));
        state.ids.insert(TypeId::of::<T>(), id);
        tracing::debug!("Registered work type {} as {}", type_name, id);
        Ok(id)
    }

    /// Return the identifier of `T`, assigning one on first use.
    ///
    /// Assignment runs at most once per type. Concurrent first callers may
    /// each build an executor, but only the first to re-take the lock binds
    /// its own; the others drop theirs and return the bound identifier.
    pub fn resolve<T: WorkEncoder>(&self) -> Result<WorkTypeId> {
        if let Some(id) = self.id_of::<T>() {
            return Ok(id);
        }

        let type_name = T::type_name();
        let executor =
            T::create_executor().ok_or(WorkpipeError::UnregisteredWorkType(type_name))?;

        let mut state = self.state.lock();
        if let Some(&id) = state.ids.get(&TypeId::of::<T>()) {
            return Ok(id);
        }
        let id = state.push(type_name, executor);
        state.ids.insert(TypeId::of::<T>(), id);
        tracing::debug!("Assigned ID {} to {} on first use", id, type_name);
        Ok(id)
    }

    /// Get the identifier of `T` without assigning one.
    pub fn id_of<T: WorkEncoder>(&self) -> Option<WorkTypeId> {
        self.state.lock().ids.get(&TypeId::of::<T>()).copied()
    }

    /// Get the executor for an identifier.
    ///
    /// Fails with `InvalidWorkTypeId` for 0 or any identifier not issued here.
    pub fn lookup(&self, id: WorkTypeId) -> Result<Arc<dyn WorkExecutor>> {
        let state = self.state.lock();
        validate_work_type_id(id, state.slots.len())?;
        Ok(state.slots[id - 1].executor.clone())
    }

    /// Get the type name registered under an identifier.
    pub fn type_name(&self, id: WorkTypeId) -> Option<&'static str> {
        let state = self.state.lock();
        validate_work_type_id(id, state.slots.len()).ok()?;
        Some(state.slots[id - 1].type_name)
    }

    /// Number of registered work types.
    pub fn len(&self) -> usize {
        self.state.lock().slots.len()
    }

    /// Check if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.state.lock().slots.is_empty()
    }

    /// Snapshot the identifier assignments.
    pub fn build_schema(&self) -> RegistrySchema {
        let state = self.state.lock();
        let mut schema = RegistrySchema::new();
        for (index, slot) in state.slots.iter().enumerate() {
            schema.add_work_type(index + 1, slot.type_name);
        }
        schema
    }
}

impl std::fmt::Debug for WorkRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkRegistry")
            .field("work_types", &self.len())
            .finish()
    }
}
