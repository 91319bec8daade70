//! Entity-vs-entity collision engine
//!
//! Every registered entity that has a handler sweeps two segments per frame
//! against the geometry of the entities registered after it:
//!
//! - **forward**: from its position to its projected position, only when it
//!   is moving;
//! - **down**: from its projected position straight down by its height.
//!
//! The nearest hit of each kind is recorded on both entities of the pair and
//! then reported to the handler, which corrects the projected state. The
//! camera type re-sweeps forward after every correction until it is clear,
//! up to a configured number of iterations.
//!
//! Registration order matters: static level geometry should be registered
//! after the movers that test against it.

use crate::core::config::CollisionConfig;
use crate::debug::draw::{colors, DebugDraw};
use crate::error::RegistryError;
use crate::foundation::collections::{swap_remove_dead, DenseRecord};
use crate::foundation::hash;
use crate::foundation::math::Vec3;
use crate::physics::collision::handler::CollisionHandler;
use crate::physics::collision::mesh::CollisionMesh;
use crate::physics::collision::primitives::{nearest_hit, Segment, TaggedTriangle};
use crate::physics::collision_layers::CollisionLayers;
use crate::spatial::octree::Octree;
use crate::world::context::HandlerContext;
use crate::world::entity::{EntityHandle, EntityStore};

/// Geometry another entity's segments are tested against
#[derive(Debug, Clone)]
pub enum Geometry {
    /// Flat triangle list, tested whole
    Mesh(CollisionMesh),
    /// Octree, queried per segment
    Octree(Octree),
}

impl Geometry {
    /// Triangles that may intersect `segment`
    ///
    /// Octree queries are written into `scratch`.
    fn candidates<'a>(&'a self, segment: &Segment, scratch: &'a mut Vec<TaggedTriangle>) -> &'a [TaggedTriangle] {
        match self {
            Self::Mesh(mesh) => mesh.candidates(segment),
            Self::Octree(tree) => {
                scratch.clear();
                tree.triangles_in_segment(segment.start, segment.end, scratch);
                scratch.as_slice()
            }
        }
    }
}

/// Which segment a contact came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Position to projected position
    Forward,
    /// Projected position downwards by the entity height
    Down,
}

/// Nearest hit recorded for one direction this frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contact {
    /// Entity on the other side of the contact
    pub other: EntityHandle,
    /// Fraction along the swept segment
    pub distance: f32,
    /// World-space contact point
    pub point: Vec3,
    /// Surface tag of the triangle hit
    pub tag: u32,
}

/// Registry record of one collision entity
pub struct CollisionEntity {
    entity: EntityHandle,
    handler: Option<Box<dyn CollisionHandler>>,
    geometry: Option<Geometry>,
    forward: Option<Contact>,
    down: Option<Contact>,
    dead: bool,
}

impl CollisionEntity {
    fn new(entity: EntityHandle) -> Self {
        Self {
            entity,
            handler: None,
            geometry: None,
            forward: None,
            down: None,
            dead: false,
        }
    }

    /// Entity this record belongs to
    pub fn entity(&self) -> EntityHandle {
        self.entity
    }

    /// Geometry others are tested against
    pub fn geometry(&self) -> Option<&Geometry> {
        self.geometry.as_ref()
    }

    /// Whether a handler is attached
    pub fn has_handler(&self) -> bool {
        self.handler.is_some()
    }

    /// Forward contact found this frame
    pub fn forward(&self) -> Option<&Contact> {
        self.forward.as_ref()
    }

    /// Down contact found this frame
    pub fn down(&self) -> Option<&Contact> {
        self.down.as_ref()
    }

    fn contact(&self, direction: Direction) -> Option<&Contact> {
        match direction {
            Direction::Forward => self.forward.as_ref(),
            Direction::Down => self.down.as_ref(),
        }
    }

    /// Keep `contact` if it is nearer than the one already recorded
    fn offer(&mut self, direction: Direction, contact: Contact) {
        let slot = match direction {
            Direction::Forward => &mut self.forward,
            Direction::Down => &mut self.down,
        };
        if slot.map_or(true, |current| contact.distance < current.distance) {
            *slot = Some(contact);
        }
    }

    fn clear_contacts(&mut self) {
        self.forward = None;
        self.down = None;
    }
}

impl DenseRecord for CollisionEntity {
    fn is_dead(&self) -> bool {
        self.dead
    }
}

impl std::fmt::Debug for CollisionEntity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollisionEntity")
            .field("entity", &self.entity)
            .field("has_handler", &self.has_handler())
            .field("geometry", &self.geometry.is_some())
            .field("forward", &self.forward)
            .field("down", &self.down)
            .finish()
    }
}

/// Collision engine owning the dense registry of collision entities
pub struct CollisionEngine {
    config: CollisionConfig,
    records: Vec<CollisionEntity>,
    scratch: Vec<TaggedTriangle>,
}

impl CollisionEngine {
    /// Create an empty engine
    pub fn new(config: CollisionConfig) -> Self {
        log::info!(
            "Collision engine initialized (camera iterations {})",
            config.camera_max_iterations
        );
        Self {
            config,
            records: Vec::new(),
            scratch: Vec::new(),
        }
    }

    /// Engine configuration
    pub fn config(&self) -> &CollisionConfig {
        &self.config
    }

    /// Replace the configuration
    pub fn set_config(&mut self, config: CollisionConfig) {
        self.config = config;
    }

    /// Register an entity and write its index back into it
    pub fn add_collision_entity(&mut self, handle: EntityHandle, entities: &mut EntityStore) -> Result<usize, RegistryError> {
        let entity = entities.get_mut(handle).ok_or(RegistryError::StaleHandle)?;
        if let Some(index) = entity.indices.collision {
            return Err(RegistryError::AlreadyRegistered(index));
        }

        let index = self.records.len();
        entity.indices.collision = Some(index);
        self.records.push(CollisionEntity::new(handle));
        log::debug!("Collision entity '{}' registered at {}", entity.name, index);
        Ok(index)
    }

    fn record_mut(&mut self, index: usize) -> Result<&mut CollisionEntity, RegistryError> {
        let len = self.records.len();
        self.records.get_mut(index).ok_or(RegistryError::InvalidIndex { index, len })
    }

    /// Use a triangle mesh as the entity's geometry
    pub fn set_mesh(&mut self, index: usize, mesh: CollisionMesh) -> Result<(), RegistryError> {
        self.set_geometry(index, Geometry::Mesh(mesh))
    }

    /// Use an octree as the entity's geometry
    pub fn set_octree(&mut self, index: usize, octree: Octree) -> Result<(), RegistryError> {
        self.set_geometry(index, Geometry::Octree(octree))
    }

    /// Set the entity's geometry
    pub fn set_geometry(&mut self, index: usize, geometry: Geometry) -> Result<(), RegistryError> {
        self.record_mut(index)?.geometry = Some(geometry);
        Ok(())
    }

    /// Attach the handler that resolves this entity's contacts
    pub fn set_collision_handler(&mut self, index: usize, handler: Box<dyn CollisionHandler>) -> Result<(), RegistryError> {
        self.record_mut(index)?.handler = Some(handler);
        Ok(())
    }

    /// Record at `index`
    pub fn collision_entity(&self, index: usize) -> Option<&CollisionEntity> {
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

    /// Reset the per-frame contacts
    pub fn begin_update(&mut self) {
        for record in &mut self.records {
            record.clear_contacts();
        }
    }

    /// Sweep, record and resolve contacts for every entity with a handler
    pub fn update(&mut self, entities: &mut EntityStore) {
        for a in 0..self.records.len() {
            let this = self.records[a].entity;
            if entities.is_dead(this) {
                continue;
            }
            let Some(mut handler) = self.records[a].handler.take() else {
                continue;
            };

            self.check_against_later(a, Direction::Forward, entities);
            self.resolve_forward(a, handler.as_mut(), entities);

            self.check_against_later(a, Direction::Down, entities);
            self.resolve_down(a, handler.as_mut(), entities);

            self.records[a].handler = Some(handler);
        }
    }

    fn resolve_forward(&mut self, a: usize, handler: &mut dyn CollisionHandler, entities: &mut EntityStore) {
        let this = self.records[a].entity;
        let is_camera = self
            .config
            .camera_type_id
            .is_some_and(|camera| entities.get(this).is_some_and(|entity| entity.type_id == camera));

        if !is_camera {
            if let Some(contact) = self.records[a].forward {
                let mut ctx = HandlerContext::new(entities, this);
                handler.handle_collision(&mut ctx, contact.other, 0.0, contact.point, contact.tag);
            }
            return;
        }

        let mut iterations = 0;
        while let Some(contact) = self.records[a].forward {
            if iterations >= self.config.camera_max_iterations {
                log::warn!(
                    "Camera still blocked after {} collision iterations, giving up this frame",
                    iterations
                );
                break;
            }
            iterations += 1;

            let mut ctx = HandlerContext::new(entities, this);
            handler.handle_collision(&mut ctx, contact.other, 0.0, contact.point, contact.tag);

            self.records[a].forward = None;
            self.check_against_later(a, Direction::Forward, entities);
        }

        handler.on_leaving_collision(&mut HandlerContext::new(entities, this));
    }

    fn resolve_down(&mut self, a: usize, handler: &mut dyn CollisionHandler, entities: &mut EntityStore) {
        let this = self.records[a].entity;

        if let Some(contact) = self.records[a].down {
            let mut ctx = HandlerContext::new(entities, this);
            handler.handle_collision(&mut ctx, contact.other, 1.0, contact.point, contact.tag);
            return;
        }

        // Nothing underneath: let the handler drop the entity, then look again.
        let mut ctx = HandlerContext::new(entities, this);
        handler.handle_collision(&mut ctx, this, 1.0, Vec3::zeros(), hash::untagged());

        self.check_against_later(a, Direction::Down, entities);
        if let Some(contact) = self.records[a].down {
            let mut ctx = HandlerContext::new(entities, this);
            handler.handle_collision(&mut ctx, contact.other, 1.0, contact.point, contact.tag);
        }
    }

    fn check_against_later(&mut self, a: usize, direction: Direction, entities: &EntityStore) {
        for b in a + 1..self.records.len() {
            self.check_collision(a, b, direction, entities);
        }
    }

    /// Sweep `a` against `b`'s geometry and record the nearer hit on both
    fn check_collision(&mut self, a: usize, b: usize, direction: Direction, entities: &EntityStore) {
        let Self { config, records, scratch } = self;

        let (handle_a, handle_b) = (records[a].entity, records[b].entity);
        let (Some(entity_a), Some(entity_b)) = (entities.get(handle_a), entities.get(handle_b)) else {
            log::trace!("Collision pair {}/{} skipped: stale entity", a, b);
            return;
        };

        if entity_a.collision_mask == CollisionLayers::NONE || entity_a.is_destroyed() || entity_b.is_destroyed() {
            return;
        }
        if !CollisionLayers::accepts(entity_a.collision_mask, entity_b.type_id) {
            return;
        }

        let segment = match direction {
            Direction::Forward => {
                if !entity_a.is_moving() {
                    return;
                }
                Segment::new(entity_a.position, entity_a.projected_position)
            }
            Direction::Down => {
                let probe = entity_a.size.height * config.ground_probe_scale;
                Segment::new(
                    entity_a.projected_position,
                    entity_a.projected_position - Vec3::new(0.0, probe, 0.0),
                )
            }
        };

        let Some(geometry) = records[b].geometry.as_ref() else {
            return;
        };
        let closer_than = records[a].contact(direction).map_or(f32::MAX, |contact| contact.distance);
        let candidates = geometry.candidates(&segment, scratch);
        let Some(nearest) = nearest_hit(&segment, candidates, closer_than) else {
            return;
        };

        log::trace!(
            "{:?} contact '{}' -> '{}' at {:.3}",
            direction,
            entity_a.name,
            entity_b.name,
            nearest.hit.distance
        );

        let contact = |other| Contact {
            other,
            distance: nearest.hit.distance,
            point: nearest.hit.point,
            tag: nearest.tag,
        };
        records[a].offer(direction, contact(handle_b));
        records[b].offer(direction, contact(handle_a));
    }

    /// Drop records of destroyed entities and clear the contacts
    pub fn end_update(&mut self, entities: &mut EntityStore) {
        for record in &mut self.records {
            record.dead = entities.is_dead(record.entity);
        }

        let removed = swap_remove_dead(&mut self.records, |record, index| {
            if let Some(entity) = entities.get_mut(record.entity) {
                entity.indices.collision = Some(index);
            }
        });

        for record in &removed {
            if let Some(entity) = entities.get_mut(record.entity) {
                entity.indices.collision = None;
            }
        }
        if !removed.is_empty() {
            log::debug!("Removed {} collision entities", removed.len());
        }

        self.begin_update();
    }

    /// Draw mesh geometry and this frame's contacts
    ///
    /// Contacts are gone once [`Self::end_update`] has run.
    pub fn draw_debug(&self, entities: &EntityStore, draw: &mut dyn DebugDraw) {
        for record in &self.records {
            if let Some(Geometry::Mesh(mesh)) = &record.geometry {
                for tagged in mesh.triangles() {
                    let t = &tagged.triangle;
                    draw.line(t.v0, t.v1, colors::COLLISION);
                    draw.line(t.v1, t.v2, colors::COLLISION);
                    draw.line(t.v2, t.v0, colors::COLLISION);
                }
            }

            if let Some(entity) = entities.get(record.entity) {
                for contact in [record.forward, record.down].into_iter().flatten() {
                    draw.line(entity.position, contact.point, colors::COLLISION);
                }
            }
        }
    }
}

impl Default for CollisionEngine {
    fn default() -> Self {
        Self::new(CollisionConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::collision::primitives::{Triangle, TaggedTriangle};
    use crate::world::entity::{Entity, Size};
    use crate::world::entity_types::EntityTypeId;
    use approx::assert_relative_eq;
    use std::cell::RefCell;
    use std::rc::Rc;

    const PLAYER: EntityTypeId = EntityTypeId(0);
    const LEVEL: EntityTypeId = EntityTypeId(1);
    const CAMERA: EntityTypeId = EntityTypeId(2);

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Hit { other: EntityHandle, time: f32, point: Vec3, tag: u32 },
        Leaving,
    }

    type Log = Rc<RefCell<Vec<Call>>>;

    /// Records every call; optionally snaps the entity onto a fixed height when falling
    struct Recorder {
        log: Log,
        drop_to: Option<f32>,
    }

    impl CollisionHandler for Recorder {
        fn handle_collision(&mut self, ctx: &mut HandlerContext<'_>, other: EntityHandle, time: f32, point: Vec3, tag: u32) {
            self.log.borrow_mut().push(Call::Hit { other, time, point, tag });
            if other == ctx.this() {
                if let (Some(y), Some(entity)) = (self.drop_to, ctx.entity_mut()) {
                    entity.projected_position.y = y;
                }
            }
        }

        fn on_leaving_collision(&mut self, _ctx: &mut HandlerContext<'_>) {
            self.log.borrow_mut().push(Call::Leaving);
        }
    }

    /// Pushes the camera back to where it started
    struct CameraRevert {
        log: Log,
    }

    impl CollisionHandler for CameraRevert {
        fn handle_collision(&mut self, ctx: &mut HandlerContext<'_>, other: EntityHandle, time: f32, point: Vec3, tag: u32) {
            self.log.borrow_mut().push(Call::Hit { other, time, point, tag });
            if time == 0.0 {
                if let Some(entity) = ctx.entity_mut() {
                    entity.projected_position = entity.position;
                }
            }
        }

        fn on_leaving_collision(&mut self, _ctx: &mut HandlerContext<'_>) {
            self.log.borrow_mut().push(Call::Leaving);
        }
    }

    fn floor_triangles(tag: u32) -> Vec<TaggedTriangle> {
        let a = Vec3::new(-10.0, 0.0, -10.0);
        let b = Vec3::new(10.0, 0.0, -10.0);
        let c = Vec3::new(10.0, 0.0, 10.0);
        let d = Vec3::new(-10.0, 0.0, 10.0);
        vec![
            TaggedTriangle::new(Triangle::new(a, b, c), tag),
            TaggedTriangle::new(Triangle::new(a, c, d), tag),
        ]
    }

    fn wall_mesh() -> CollisionMesh {
        // Plane x = 5
        let a = Vec3::new(5.0, -10.0, -10.0);
        let b = Vec3::new(5.0, 10.0, -10.0);
        let c = Vec3::new(5.0, 10.0, 10.0);
        let d = Vec3::new(5.0, -10.0, 10.0);
        CollisionMesh::from_triangles(vec![
            TaggedTriangle::new(Triangle::new(a, b, c), hash::untagged()),
            TaggedTriangle::new(Triangle::new(a, c, d), hash::untagged()),
        ])
    }

    fn player(position: Vec3) -> Entity {
        Entity::new("player", position)
            .with_type(PLAYER)
            .with_size(Size::new(1.0, 2.0, 1.0))
            .with_collision_mask(CollisionLayers::mask(&[LEVEL]))
    }

    fn level() -> Entity {
        Entity::new("level", Vec3::zeros()).with_type(LEVEL).with_physics(false)
    }

    struct Scene {
        engine: CollisionEngine,
        entities: EntityStore,
        log: Log,
    }

    /// Player registered first with a recorder, level mesh registered last
    fn scene(player_entity: Entity, drop_to: Option<f32>) -> (Scene, EntityHandle, EntityHandle) {
        let mut entities = EntityStore::new();
        let mut engine = CollisionEngine::default();
        let log: Log = Rc::default();

        let p = entities.insert(player_entity);
        let l = entities.insert(level());
        let pi = engine.add_collision_entity(p, &mut entities).unwrap();
        let li = engine.add_collision_entity(l, &mut entities).unwrap();
        engine
            .set_collision_handler(pi, Box::new(Recorder { log: log.clone(), drop_to }))
            .unwrap();
        engine
            .set_mesh(li, CollisionMesh::from_triangles(floor_triangles(hash::string_hash("grass"))))
            .unwrap();

        (Scene { engine, entities, log }, p, l)
    }

    fn run_frame(scene: &mut Scene, frame_time: f32) {
        for (_, entity) in scene.entities.iter_mut() {
            entity.predict(frame_time);
        }
        scene.engine.begin_update();
        scene.engine.update(&mut scene.entities);
    }

    #[test]
    fn test_resting_contact_reports_ground() {
        let (mut scene, p, l) = scene(player(Vec3::new(0.0, 1.0, 0.0)), None);
        run_frame(&mut scene, 0.016);

        let log = scene.log.borrow();
        assert_eq!(log.len(), 1);
        let Call::Hit { other, time, point, tag } = &log[0] else {
            panic!("expected a hit");
        };
        assert_eq!(*other, l);
        assert_relative_eq!(*time, 1.0);
        assert_relative_eq!(*point, Vec3::zeros(), epsilon = 1e-5);
        assert_eq!(*tag, hash::string_hash("grass"));

        let down = scene.engine.collision_entity(1).unwrap().down().unwrap();
        assert_eq!(down.other, p);
    }

    #[test]
    fn test_falling_entity_gets_self_call_then_ground() {
        let (mut scene, p, l) = scene(player(Vec3::new(0.0, 10.0, 0.0)), Some(0.5));
        run_frame(&mut scene, 0.016);

        let log = scene.log.borrow();
        assert_eq!(log.len(), 2);
        assert!(matches!(log[0], Call::Hit { other, time, tag, .. } if other == p && time == 1.0 && tag == hash::untagged()));
        assert!(matches!(log[1], Call::Hit { other, .. } if other == l));
    }

    #[test]
    fn test_contacts_do_not_outlive_their_frame() {
        let (mut scene, p, l) = scene(player(Vec3::new(0.0, 1.0, 0.0)), None);
        run_frame(&mut scene, 0.016);
        assert_eq!(scene.engine.collision_entity(0).unwrap().down().map(|c| c.other), Some(l));

        // Off the edge of the floor: nothing underneath this time
        scene.entities.get_mut(p).unwrap().position = Vec3::new(50.0, 1.0, 0.0);
        scene.log.borrow_mut().clear();
        run_frame(&mut scene, 0.016);

        for index in 0..2 {
            let record = scene.engine.collision_entity(index).unwrap();
            assert!(record.forward().is_none());
            assert!(record.down().is_none());
        }
        assert_eq!(
            *scene.log.borrow(),
            vec![Call::Hit { other: p, time: 1.0, point: Vec3::zeros(), tag: hash::untagged() }]
        );

        scene.entities.get_mut(p).unwrap().position = Vec3::new(0.0, 1.0, 0.0);
        run_frame(&mut scene, 0.016);
        assert!(scene.engine.collision_entity(1).unwrap().down().is_some());

        scene.engine.end_update(&mut scene.entities);
        for index in 0..2 {
            let record = scene.engine.collision_entity(index).unwrap();
            assert!(record.forward().is_none());
            assert!(record.down().is_none());
        }
    }

    #[test]
    fn test_disjoint_masks_give_no_contacts() {
        let (mut scene, p, _) = scene(
            player(Vec3::new(0.0, 1.0, 0.0)).with_collision_mask(CollisionLayers::mask(&[CAMERA])),
            None,
        );
        run_frame(&mut scene, 0.016);

        assert!(scene
            .log
            .borrow()
            .iter()
            .all(|call| matches!(call, Call::Hit { other, .. } if *other == p)));
        assert!(scene.engine.collision_entity(1).unwrap().down().is_none());
    }

    #[test]
    fn test_head_on_contact_is_symmetric() {
        let mut entities = EntityStore::new();
        let mut engine = CollisionEngine::default();
        let log: Log = Rc::default();

        let mover = entities.insert(
            player(Vec3::new(4.0, 1.0, 0.0))
                .with_velocity(Vec3::new(120.0, 0.0, 0.0)),
        );
        let wall = entities.insert(level());
        let mi = engine.add_collision_entity(mover, &mut entities).unwrap();
        let wi = engine.add_collision_entity(wall, &mut entities).unwrap();
        engine.set_collision_handler(mi, Box::new(Recorder { log: log.clone(), drop_to: None })).unwrap();
        engine.set_mesh(wi, wall_mesh()).unwrap();

        for (_, entity) in entities.iter_mut() {
            entity.predict(1.0 / 60.0);
        }
        engine.begin_update();
        engine.update(&mut entities);

        let a = engine.collision_entity(mi).unwrap().forward().copied().unwrap();
        let b = engine.collision_entity(wi).unwrap().forward().copied().unwrap();
        assert_eq!(a.other, wall);
        assert_eq!(b.other, mover);
        assert_relative_eq!(a.distance, b.distance);
        assert_relative_eq!(a.point, Vec3::new(5.0, 1.0, 0.0), epsilon = 1e-4);
        assert!(matches!(log.borrow()[0], Call::Hit { time, .. } if time == 0.0));
    }

    #[test]
    fn test_camera_loop_stops_when_clear() {
        let mut entities = EntityStore::new();
        let mut engine = CollisionEngine::new(CollisionConfig::default().with_camera_type(CAMERA));
        let log: Log = Rc::default();

        let camera = entities.insert(
            player(Vec3::new(4.0, 1.0, 0.0))
                .with_type(CAMERA)
                .with_velocity(Vec3::new(120.0, 0.0, 0.0)),
        );
        let wall = entities.insert(level());
        let ci = engine.add_collision_entity(camera, &mut entities).unwrap();
        let wi = engine.add_collision_entity(wall, &mut entities).unwrap();
        engine.set_collision_handler(ci, Box::new(CameraRevert { log: log.clone() })).unwrap();
        engine.set_mesh(wi, wall_mesh()).unwrap();

        for (_, entity) in entities.iter_mut() {
            entity.predict(1.0 / 60.0);
        }
        engine.update(&mut entities);

        let log = log.borrow();
        let forward_hits = log.iter().filter(|c| matches!(c, Call::Hit { time, .. } if *time == 0.0)).count();
        assert_eq!(forward_hits, 1);
        assert_eq!(log.iter().filter(|c| **c == Call::Leaving).count(), 1);
        assert_eq!(entities.get(camera).unwrap().projected_position, Vec3::new(4.0, 1.0, 0.0));
    }

    #[test]
    fn test_camera_loop_is_capped() {
        let mut entities = EntityStore::new();
        let config = CollisionConfig::default()
            .with_camera_type(CAMERA)
            .with_camera_max_iterations(3);
        let mut engine = CollisionEngine::new(config);
        let log: Log = Rc::default();

        let camera = entities.insert(
            player(Vec3::new(4.0, 1.0, 0.0))
                .with_type(CAMERA)
                .with_velocity(Vec3::new(120.0, 0.0, 0.0)),
        );
        let wall = entities.insert(level());
        let ci = engine.add_collision_entity(camera, &mut entities).unwrap();
        let wi = engine.add_collision_entity(wall, &mut entities).unwrap();
        engine.set_collision_handler(ci, Box::new(Recorder { log: log.clone(), drop_to: None })).unwrap();
        engine.set_mesh(wi, wall_mesh()).unwrap();

        for (_, entity) in entities.iter_mut() {
            entity.predict(1.0 / 60.0);
        }
        engine.update(&mut entities);

        let log = log.borrow();
        let forward_hits = log.iter().filter(|c| matches!(c, Call::Hit { time, .. } if *time == 0.0)).count();
        assert_eq!(forward_hits, 3);
        assert_eq!(log.iter().filter(|c| **c == Call::Leaving).count(), 1);
    }

    #[test]
    fn test_octree_geometry_is_queried() {
        let (mut scene, _, l) = scene(player(Vec3::new(2.0, 1.0, 3.0)), None);
        let tree = Octree::build(Vec3::zeros(), 16.0, floor_triangles(7), 3);
        scene.engine.set_octree(1, tree).unwrap();
        run_frame(&mut scene, 0.016);

        let log = scene.log.borrow();
        assert!(matches!(log[0], Call::Hit { other, tag: 7, .. } if other == l));
    }

    #[test]
    fn test_removal_relinks_moved_record() {
        let mut entities = EntityStore::new();
        let mut engine = CollisionEngine::default();
        let handles: Vec<_> = (0..5)
            .map(|i| entities.insert(Entity::new(format!("e{i}"), Vec3::zeros())))
            .collect();
        for &handle in &handles {
            engine.add_collision_entity(handle, &mut entities).unwrap();
        }

        entities.get_mut(handles[2]).unwrap().destroy();
        engine.end_update(&mut entities);

        assert_eq!(engine.len(), 4);
        assert_eq!(engine.collision_entity(2).unwrap().entity(), handles[4]);
        assert_eq!(entities.get(handles[4]).unwrap().indices.collision, Some(2));
        assert_eq!(entities.get(handles[3]).unwrap().indices.collision, Some(3));
        assert_eq!(entities.get(handles[2]).unwrap().indices.collision, None);
    }

    #[test]
    fn test_registration_errors() {
        let mut entities = EntityStore::new();
        let mut engine = CollisionEngine::default();
        let handle = entities.insert(level());
        engine.add_collision_entity(handle, &mut entities).unwrap();

        assert_eq!(
            engine.add_collision_entity(handle, &mut entities),
            Err(RegistryError::AlreadyRegistered(0))
        );
        assert_eq!(
            engine.set_mesh(3, CollisionMesh::default()),
            Err(RegistryError::InvalidIndex { index: 3, len: 1 })
        );

        entities.get_mut(handle).unwrap().destroy();
        entities.remove_destroyed();
        assert_eq!(
            engine.add_collision_entity(handle, &mut entities),
            Err(RegistryError::StaleHandle)
        );
    }
}
