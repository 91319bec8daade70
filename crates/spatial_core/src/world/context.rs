//! Callback context handed to collision and trigger handlers

use crate::world::entity::{Entity, EntityHandle, EntityStore};

/// Mutable view of the entity store from inside a handler
///
/// `this` is the entity the handler is attached to. Handlers correct the
/// projected state through it; they must not assume `other` is alive.
pub struct HandlerContext<'a> {
    entities: &'a mut EntityStore,
    this: EntityHandle,
}

impl<'a> HandlerContext<'a> {
    /// Context for the handler attached to `this`
    pub fn new(entities: &'a mut EntityStore, this: EntityHandle) -> Self {
        Self { entities, this }
    }

    /// Handle of the entity owning the handler
    pub fn this(&self) -> EntityHandle {
        self.this
    }

    /// The entity owning the handler
    pub fn entity(&self) -> Option<&Entity> {
        self.entities.get(self.this)
    }

    /// Mutable access to the entity owning the handler
    pub fn entity_mut(&mut self) -> Option<&mut Entity> {
        self.entities.get_mut(self.this)
    }

    /// Any entity by handle
    pub fn get(&self, handle: EntityHandle) -> Option<&Entity> {
        self.entities.get(handle)
    }

    /// Any entity by handle, mutably
    pub fn get_mut(&mut self, handle: EntityHandle) -> Option<&mut Entity> {
        self.entities.get_mut(handle)
    }

    /// The whole store
    pub fn entities(&mut self) -> &mut EntityStore {
        self.entities
    }
}
