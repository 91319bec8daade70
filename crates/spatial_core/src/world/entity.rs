//! Entity implementation
//!
//! An entity is the shared state every subsystem reads: where it is, where
//! physics proposes it goes next, how big it is and which entity types it
//! reacts to. Subsystems keep their own dense registries of records and find
//! their record for an entity through the index fields stored here.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use slotmap::{new_key_type, SlotMap};

use crate::foundation::math::Vec3;
use crate::world::entity_types::EntityTypeId;

new_key_type! {
    /// Generation-checked handle to an entity in an [`EntityStore`]
    pub struct EntityHandle;
}

bitflags! {
    /// Per-entity state flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct EntityFlags: u8 {
        /// Removed from every subsystem at the end of the frame
        const DESTROYED = 1 << 0;
        /// Integrated by the physics step
        const APPLY_PHYSICS = 1 << 1;
    }
}

/// Full extents of an entity's box
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    /// Extent along x
    pub width: f32,
    /// Extent along y
    pub height: f32,
    /// Extent along z
    pub depth: f32,
}

impl Size {
    /// Create a size from full extents
    pub const fn new(width: f32, height: f32, depth: f32) -> Self {
        Self { width, height, depth }
    }

    /// Half extents as a vector
    pub fn half_extents(&self) -> Vec3 {
        Vec3::new(self.width, self.height, self.depth) * 0.5
    }
}

/// Back-references into each subsystem's dense registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SubsystemIndices {
    /// Index in the collision engine
    pub collision: Option<usize>,
    /// Index in the trigger box engine
    pub trigger_box: Option<usize>,
    /// Index in the AI controller
    pub ai: Option<usize>,
}

/// Shared per-entity state
#[derive(Debug, Clone)]
pub struct Entity {
    /// Display name
    pub name: String,
    /// Current position
    pub position: Vec3,
    /// Current velocity
    pub velocity: Vec3,
    /// Current acceleration
    pub acceleration: Vec3,
    /// Next-frame position proposed by physics
    pub projected_position: Vec3,
    /// Next-frame velocity proposed by physics
    pub projected_velocity: Vec3,
    /// Box extents
    pub size: Size,
    /// Bitset of entity type ids this entity reacts to
    pub collision_mask: u32,
    /// This entity's type
    pub type_id: EntityTypeId,
    /// State flags
    pub flags: EntityFlags,
    /// Registry indices
    pub indices: SubsystemIndices,
}

impl Entity {
    /// Create an entity at `position`
    pub fn new(name: impl Into<String>, position: Vec3) -> Self {
        Self {
            name: name.into(),
            position,
            velocity: Vec3::zeros(),
            acceleration: Vec3::zeros(),
            projected_position: position,
            projected_velocity: Vec3::zeros(),
            size: Size::default(),
            collision_mask: 0,
            type_id: EntityTypeId::default(),
            flags: EntityFlags::APPLY_PHYSICS,
            indices: SubsystemIndices::default(),
        }
    }

    /// Set the box size
    pub fn with_size(mut self, size: Size) -> Self {
        self.size = size;
        self
    }

    /// Set the entity type
    pub fn with_type(mut self, type_id: EntityTypeId) -> Self {
        self.type_id = type_id;
        self
    }

    /// Set the collision mask
    pub fn with_collision_mask(mut self, mask: u32) -> Self {
        self.collision_mask = mask;
        self
    }

    /// Set the velocity
    pub fn with_velocity(mut self, velocity: Vec3) -> Self {
        self.velocity = velocity;
        self.projected_velocity = velocity;
        self
    }

    /// Enable or disable physics integration
    pub fn with_physics(mut self, enabled: bool) -> Self {
        self.flags.set(EntityFlags::APPLY_PHYSICS, enabled);
        self
    }

    /// Whether the entity is scheduled for removal
    pub fn is_destroyed(&self) -> bool {
        self.flags.contains(EntityFlags::DESTROYED)
    }

    /// Schedule the entity for removal at the end of the frame
    pub fn destroy(&mut self) {
        self.flags.insert(EntityFlags::DESTROYED);
    }

    /// Whether physics integrates this entity
    pub fn applies_physics(&self) -> bool {
        self.flags.contains(EntityFlags::APPLY_PHYSICS)
    }

    /// Whether the projected position differs from the current one
    pub fn is_moving(&self) -> bool {
        (self.projected_position - self.position).magnitude_squared() > 0.0
    }

    /// Whether this entity's mask accepts `other`'s type
    pub fn reacts_to(&self, other: &Entity) -> bool {
        self.collision_mask & other.type_id.bit() != 0
    }

    /// Propose the next-frame state from velocity and acceleration
    pub fn predict(&mut self, frame_time: f32) {
        if self.applies_physics() {
            self.projected_velocity = self.velocity + self.acceleration * frame_time;
            self.projected_position = self.position + self.projected_velocity * frame_time;
        } else {
            self.projected_velocity = self.velocity;
            self.projected_position = self.position;
        }
    }

    /// Accept the (possibly corrected) projected state
    pub fn commit(&mut self) {
        self.position = self.projected_position;
        self.velocity = self.projected_velocity;
    }
}

/// Owner of every entity in a world
#[derive(Debug, Default)]
pub struct EntityStore {
    entities: SlotMap<EntityHandle, Entity>,
}

impl EntityStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entity and return its handle
    pub fn insert(&mut self, entity: Entity) -> EntityHandle {
        self.entities.insert(entity)
    }

    /// Look up an entity; stale handles give `None`
    pub fn get(&self, handle: EntityHandle) -> Option<&Entity> {
        self.entities.get(handle)
    }

    /// Mutable lookup; stale handles give `None`
    pub fn get_mut(&mut self, handle: EntityHandle) -> Option<&mut Entity> {
        self.entities.get_mut(handle)
    }

    /// Whether `handle` names a live entity
    pub fn contains(&self, handle: EntityHandle) -> bool {
        self.entities.contains_key(handle)
    }

    /// Iterate over all entities
    pub fn iter(&self) -> impl Iterator<Item = (EntityHandle, &Entity)> {
        self.entities.iter()
    }

    /// Iterate mutably over all entities
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (EntityHandle, &mut Entity)> {
        self.entities.iter_mut()
    }

    /// Number of entities
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Whether the store is empty
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Whether `handle` is missing or flagged destroyed
    pub fn is_dead(&self, handle: EntityHandle) -> bool {
        self.get(handle).map_or(true, Entity::is_destroyed)
    }

    /// Drop every destroyed entity, returning how many were removed
    pub fn remove_destroyed(&mut self) -> usize {
        let before = self.entities.len();
        self.entities.retain(|_, entity| !entity.is_destroyed());
        before - self.entities.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_predict_and_commit() {
        let mut entity = Entity::new("ball", Vec3::zeros()).with_velocity(Vec3::new(1.0, 0.0, 0.0));
        entity.acceleration = Vec3::new(0.0, -10.0, 0.0);

        entity.predict(0.5);
        assert_relative_eq!(entity.projected_velocity, Vec3::new(1.0, -5.0, 0.0));
        assert_relative_eq!(entity.projected_position, Vec3::new(0.5, -2.5, 0.0));
        assert_eq!(entity.position, Vec3::zeros());

        entity.commit();
        assert_relative_eq!(entity.position, Vec3::new(0.5, -2.5, 0.0));
    }

    #[test]
    fn test_static_entity_does_not_move() {
        let mut entity = Entity::new("box", Vec3::new(1.0, 2.0, 3.0))
            .with_velocity(Vec3::new(5.0, 0.0, 0.0))
            .with_physics(false);
        entity.predict(1.0);
        assert!(!entity.is_moving());
    }

    #[test]
    fn test_stale_handle_resolves_to_none() {
        let mut store = EntityStore::new();
        let handle = store.insert(Entity::new("a", Vec3::zeros()));
        store.get_mut(handle).unwrap().destroy();

        assert_eq!(store.remove_destroyed(), 1);
        assert!(store.get(handle).is_none());
        assert!(store.is_dead(handle));

        let reused = store.insert(Entity::new("b", Vec3::zeros()));
        assert_ne!(reused, handle);
        assert!(store.get(handle).is_none());
    }

    #[test]
    fn test_mask_filtering() {
        let player = Entity::new("player", Vec3::zeros()).with_type(EntityTypeId(0)).with_collision_mask(0b10);
        let enemy = Entity::new("enemy", Vec3::zeros()).with_type(EntityTypeId(1));
        assert!(player.reacts_to(&enemy));
        assert!(!enemy.reacts_to(&player));
    }
}
