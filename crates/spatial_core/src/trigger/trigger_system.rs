//! Trigger box engine
//!
//! Every pair `a < b` of registered entities is tested once per frame with
//! their current positions and velocities. Only the lower-indexed side of a
//! pair reports entries, through its handler; either side may report a
//! leave. Entries and leaves are edge-triggered per entity type: a record
//! remembers which types it is currently intersecting, so one continuous
//! overlap produces one `on_enter` and one `on_leave`.

use crate::core::config::TriggerConfig;
use crate::debug::draw::{colors, DebugDraw};
use crate::error::RegistryError;
use crate::foundation::collections::{swap_remove_dead, DenseRecord};
use crate::foundation::math::Vec3;
use crate::physics::collision_layers::CollisionLayers;
use crate::trigger::bounding_box::{BoundingBox, SweptHit};
use crate::world::context::HandlerContext;
use crate::world::entity::{Entity, EntityHandle, EntityStore};
use crate::world::entity_types::EntityTypeId;

/// Game-side reaction to trigger boxes
pub trait TriggerBoxHandler {
    /// `other` started intersecting; `time` is the entry time within the
    /// frame and `normal` the face entered through (zero for a static overlap)
    fn on_enter(&mut self, _ctx: &mut HandlerContext<'_>, _other: EntityHandle, _time: f32, _normal: Vec3) {}

    /// `other` stopped intersecting
    fn on_leave(&mut self, _ctx: &mut HandlerContext<'_>, _other: EntityHandle) {}
}

/// Registry record of one trigger box entity
pub struct TriggerBoxEntity {
    entity: EntityHandle,
    intersected: Option<EntityHandle>,
    handler: Option<Box<dyn TriggerBoxHandler>>,
    enter_time: f32,
    intersecting_types: u32,
    dead: bool,
}

impl TriggerBoxEntity {
    fn new(entity: EntityHandle) -> Self {
        Self {
            entity,
            intersected: None,
            handler: None,
            enter_time: 0.0,
            intersecting_types: 0,
            dead: false,
        }
    }

    /// Entity this record belongs to
    pub fn entity(&self) -> EntityHandle {
        self.entity
    }

    /// Entity last seen intersecting
    pub fn intersected(&self) -> Option<EntityHandle> {
        self.intersected
    }

    /// Entry time of the current intersection
    pub fn enter_time(&self) -> f32 {
        self.enter_time
    }

    /// Bitset of entity types currently inside
    pub fn intersecting_types(&self) -> u32 {
        self.intersecting_types
    }

    /// Fire `on_enter` unless `other_type` is already inside
    fn handle_intersection(&mut self, entities: &mut EntityStore, other: EntityHandle, other_type: EntityTypeId, hit: SweptHit) {
        let bit = CollisionLayers::bit(other_type);
        if self.intersecting_types & bit != 0 {
            return;
        }
        self.intersecting_types |= bit;

        if let Some(handler) = self.handler.as_mut() {
            let mut ctx = HandlerContext::new(entities, self.entity);
            handler.on_enter(&mut ctx, other, hit.enter_time, hit.normal);
        }
    }

    /// Fire `on_leave` if `other_type` was inside
    fn on_leaving(&mut self, entities: &mut EntityStore, other: EntityHandle, other_type: EntityTypeId) {
        let bit = CollisionLayers::bit(other_type);
        if self.intersecting_types & bit == 0 {
            return;
        }
        self.intersecting_types &= !bit;

        if let Some(handler) = self.handler.as_mut() {
            let mut ctx = HandlerContext::new(entities, self.entity);
            handler.on_leave(&mut ctx, other);
        }
    }
}

impl DenseRecord for TriggerBoxEntity {
    fn is_dead(&self) -> bool {
        self.dead
    }
}

impl std::fmt::Debug for TriggerBoxEntity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TriggerBoxEntity")
            .field("entity", &self.entity)
            .field("intersected", &self.intersected)
            .field("has_handler", &self.handler.is_some())
            .field("enter_time", &self.enter_time)
            .field("intersecting_types", &format_args!("{:#034b}", self.intersecting_types))
            .finish()
    }
}

/// Trigger box engine owning the dense registry of trigger box entities
pub struct TriggerBoxEngine {
    config: TriggerConfig,
    records: Vec<TriggerBoxEntity>,
}

impl TriggerBoxEngine {
    /// Create an empty engine
    pub fn new(config: TriggerConfig) -> Self {
        log::info!("Trigger box engine initialized");
        Self {
            config,
            records: Vec::new(),
        }
    }

    /// Register an entity and write its index back into it
    pub fn add_trigger_box_entity(&mut self, handle: EntityHandle, entities: &mut EntityStore) -> Result<usize, RegistryError> {
        let entity = entities.get_mut(handle).ok_or(RegistryError::StaleHandle)?;
        if let Some(index) = entity.indices.trigger_box {
            return Err(RegistryError::AlreadyRegistered(index));
        }

        let index = self.records.len();
        entity.indices.trigger_box = Some(index);
        self.records.push(TriggerBoxEntity::new(handle));
        log::debug!("Trigger box entity '{}' registered at {}", entity.name, index);
        Ok(index)
    }

    /// Attach the handler reacting to entries and leaves
    pub fn set_trigger_box_handler(&mut self, index: usize, handler: Box<dyn TriggerBoxHandler>) -> Result<(), RegistryError> {
        let len = self.records.len();
        let record = self.records.get_mut(index).ok_or(RegistryError::InvalidIndex { index, len })?;
        record.handler = Some(handler);
        Ok(())
    }

    /// Record at `index`
    pub fn trigger_box_entity(&self, index: usize) -> Option<&TriggerBoxEntity> {
        self.records.get(index)
    }

    /// Number of registered entities
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether nothing is registered
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Start of frame
    pub fn begin_update(&mut self) {}

    /// Test every pair once
    pub fn update(&mut self, entities: &mut EntityStore, frame_time: f32) {
        for a in 0..self.records.len() {
            for b in a + 1..self.records.len() {
                self.check_intersection(a, b, entities, frame_time);
            }
        }
    }

    /// Swept or static test of `a` against `b`, by which of them is moving
    fn sweep(&self, a: &Entity, b: &Entity, frame_time: f32) -> Option<SweptHit> {
        let box_a = BoundingBox::from_size(a.position, &a.size);
        let box_b = BoundingBox::from_size(b.position, &b.size);
        let a_moving = a.velocity.magnitude_squared() > 0.0;
        let b_moving = b.velocity.magnitude_squared() > 0.0;

        let static_overlap = || {
            box_a.overlap(&box_b).then_some(SweptHit {
                enter_time: 0.0,
                normal: Vec3::zeros(),
            })
        };

        match (a_moving, b_moving) {
            (true, true) => {
                let relative = b.velocity - a.velocity;
                if relative.magnitude_squared() <= self.config.velocity_epsilon {
                    static_overlap()
                } else {
                    BoundingBox::moving_to_stationary(&box_a, &box_b, &relative, frame_time)
                }
            }
            (true, false) => BoundingBox::moving_to_stationary(&box_b, &box_a, &a.velocity, frame_time),
            (false, true) => BoundingBox::moving_to_stationary(&box_a, &box_b, &b.velocity, frame_time),
            (false, false) => static_overlap(),
        }
    }

    fn check_intersection(&mut self, a: usize, b: usize, entities: &mut EntityStore, frame_time: f32) {
        let (handle_a, handle_b) = (self.records[a].entity, self.records[b].entity);
        let (Some(entity_a), Some(entity_b)) = (entities.get(handle_a), entities.get(handle_b)) else {
            return;
        };

        if entity_a.collision_mask == CollisionLayers::NONE || entity_a.is_destroyed() || entity_b.is_destroyed() {
            return;
        }

        let hit = if CollisionLayers::accepts(entity_a.collision_mask, entity_b.type_id) {
            self.sweep(entity_a, entity_b, frame_time)
        } else {
            None
        };
        let (type_a, type_b) = (entity_a.type_id, entity_b.type_id);

        match hit {
            Some(hit) => {
                let record = &mut self.records[a];
                if record.handler.is_some() {
                    log::trace!("Trigger {} intersects {} at {:.3}", a, b, hit.enter_time);
                    record.intersected = Some(handle_b);
                    record.enter_time = hit.enter_time;
                    record.handle_intersection(entities, handle_b, type_b, hit);
                }
            }
            None => {
                for (this, other, other_type) in [(a, handle_b, type_b), (b, handle_a, type_a)] {
                    let record = &mut self.records[this];
                    if record.intersected == Some(other) {
                        record.on_leaving(entities, other, other_type);
                        record.intersected = None;
                    }
                    record.enter_time = 0.0;
                }
            }
        }
    }

    /// Drop records of destroyed entities
    ///
    /// An intersection with an entity that is being destroyed ends here, so
    /// its type can enter again later.
    pub fn end_update(&mut self, entities: &mut EntityStore) {
        for record in &mut self.records {
            if let Some(other) = record.intersected.filter(|&other| entities.is_dead(other)) {
                if let Some(other_type) = entities.get(other).map(|entity| entity.type_id) {
                    record.on_leaving(entities, other, other_type);
                }
                record.intersected = None;
            }
            record.dead = entities.is_dead(record.entity);
        }

        let removed = swap_remove_dead(&mut self.records, |record, index| {
            if let Some(entity) = entities.get_mut(record.entity) {
                entity.indices.trigger_box = Some(index);
            }
        });
        for record in &removed {
            if let Some(entity) = entities.get_mut(record.entity) {
                entity.indices.trigger_box = None;
            }
        }
        if !removed.is_empty() {
            log::debug!("Removed {} trigger box entities", removed.len());
        }
    }

    /// Draw every trigger box
    pub fn draw_debug(&self, entities: &EntityStore, draw: &mut dyn DebugDraw) {
        for record in &self.records {
            if let Some(entity) = entities.get(record.entity) {
                let bounds = BoundingBox::from_size(entity.position, &entity.size).to_aabb();
                draw.aabb(&bounds, colors::TRIGGER_BOX);
            }
        }
    }
}

impl Default for TriggerBoxEngine {
    fn default() -> Self {
        Self::new(TriggerConfig::default())
    }
}
