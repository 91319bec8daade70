//! Entity type identifiers
//!
//! Every entity carries a small type id ("Player", "Enemy", "Camera", a
//! trigger box name...). Collision masks are bitsets over those ids, so at
//! most 32 distinct types can exist per world. The registry is owned by the
//! world rather than being process-global.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::RegistryError;

/// Small integer naming an entity type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct EntityTypeId(pub u8);

impl EntityTypeId {
    /// Number of distinct ids a 32-bit collision mask can address
    pub const MAX_TYPES: usize = 32;

    /// Single-bit mask for this type
    pub fn bit(self) -> u32 {
        1u32.checked_shl(u32::from(self.0)).unwrap_or(0)
    }
}

/// Assigns ids to type names on first use
#[derive(Debug, Default, Clone)]
pub struct EntityTypeRegistry {
    ids: HashMap<String, EntityTypeId>,
    names: Vec<String>,
}

impl EntityTypeRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the id for `name`, assigning the next free one if needed
    pub fn id(&mut self, name: &str) -> Result<EntityTypeId, RegistryError> {
        if let Some(&id) = self.ids.get(name) {
            return Ok(id);
        }
        if self.names.len() >= EntityTypeId::MAX_TYPES {
            return Err(RegistryError::TooManyTypes(name.to_string()));
        }
        let id = EntityTypeId(u8::try_from(self.names.len()).map_err(|_| RegistryError::TooManyTypes(name.to_string()))?);
        self.ids.insert(name.to_string(), id);
        self.names.push(name.to_string());
        Ok(id)
    }

    /// Look up an existing id without assigning
    pub fn find(&self, name: &str) -> Option<EntityTypeId> {
        self.ids.get(name).copied()
    }

    /// Name registered for `id`
    pub fn name(&self, id: EntityTypeId) -> Option<&str> {
        self.names.get(usize::from(id.0)).map(String::as_str)
    }

    /// Build a collision mask from type names, registering any new ones
    pub fn mask_of(&mut self, names: &[&str]) -> Result<u32, RegistryError> {
        names.iter().try_fold(0u32, |mask, name| Ok(mask | self.id(name)?.bit()))
    }

    /// Number of registered types
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether no types are registered
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
