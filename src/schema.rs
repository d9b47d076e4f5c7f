//! Registry schema snapshot.
//!
//! A schema lists which work type each identifier stands for in one
//! registry. It is diagnostic output only: identifiers are never valid
//! outside the registry that issued them.
//!
//! # Example
//!
//! ```
//! use workpipe::schema::RegistrySchema;
//!
//! let mut schema = RegistrySchema::new();
//! schema.add_work_type(1, "app::Answer");
//! schema.add_work_type(2, "app::Greeting");
//!
//! let json = schema.to_json().unwrap();
//! assert!(json.contains("app::Greeting"));
//! ```

use serde::Serialize;

use crate::error::Result;
use crate::protocol::WorkTypeId;

/// One identifier assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkTypeSchema {
    /// Assigned identifier (1-based).
    pub id: WorkTypeId,
    /// Rust type name of the work type.
    #[serde(rename = "type")]
    pub type_name: String,
}

/// Identifier assignments of one registry, in identifier order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RegistrySchema {
    /// Registered work types.
    pub work_types: Vec<WorkTypeSchema>,
}

impl RegistrySchema {
    /// Create a new empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a work type to the schema.
    pub fn add_work_type(&mut self, id: WorkTypeId, type_name: &str) {
        self.work_types.push(WorkTypeSchema {
            id,
            type_name: type_name.to_string(),
        });
    }

    /// Get a work type by identifier.
    pub fn get(&self, id: WorkTypeId) -> Option<&WorkTypeSchema> {
        self.work_types.iter().find(|w| w.id == id)
    }

    /// Find the identifier assigned to a type name.
    pub fn id_of(&self, type_name: &str) -> Option<WorkTypeId> {
        self.work_types
            .iter()
            .find(|w| w.type_name == type_name)
            .map(|w| w.id)
    }

    /// Number of work types.
    pub fn len(&self) -> usize {
        self.work_types.len()
    }

    /// Check if schema is empty.
    pub fn is_empty(&self) -> bool {
        self.work_types.is_empty()
    }

    /// Serialize to a compact JSON string.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Serialize to an indented JSON string.
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
