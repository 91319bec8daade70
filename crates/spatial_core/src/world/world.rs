//! World: entity store plus every subsystem, driven one frame at a time
//!
//! A frame is three explicit calls:
//!
//! 1. [`World::begin_update`]
//! 2. [`World::update`]: predict, collision, trigger boxes, commit, AI
//! 3. [`World::end_update`]: subsystem sweeps, then destroyed entities leave
//!    the store
//!
//! Several worlds can coexist; nothing here is global.

use crate::ai::controller::{AiController, AiError};
use crate::ai::waypoint::WayPointGraph;
use crate::core::config::EngineConfig;
use crate::debug::draw::{colors, DebugDraw};
use crate::error::{CoreResult, RegistryError};
use crate::physics::collision_system::{CollisionEngine, Geometry};
use crate::spatial::octree::Octree;
use crate::trigger::trigger_system::TriggerBoxEngine;
use crate::world::entity::{Entity, EntityHandle, EntityStore};
use crate::world::entity_types::{EntityTypeId, EntityTypeRegistry};
use crate::world::world_config::WorldConfiguration;

/// One simulated level
pub struct World {
    config: EngineConfig,
    entities: EntityStore,
    types: EntityTypeRegistry,
    collision: CollisionEngine,
    triggers: TriggerBoxEngine,
    ai: AiController,
    way_points: WayPointGraph,
}

impl World {
    /// Create an empty world
    pub fn new(config: EngineConfig) -> Self {
        log::info!("Creating world");
        Self {
            collision: CollisionEngine::new(config.collision.clone()),
            triggers: TriggerBoxEngine::new(config.trigger.clone()),
            ai: AiController::new(config.ai.clone()),
            entities: EntityStore::new(),
            types: EntityTypeRegistry::new(),
            way_points: WayPointGraph::new(),
            config,
        }
    }

    /// Engine configuration the world was built with
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Add an entity
    pub fn spawn(&mut self, entity: Entity) -> EntityHandle {
        self.entities.insert(entity)
    }

    /// Id of an entity type, registering the name if needed
    pub fn entity_type(&mut self, name: &str) -> Result<EntityTypeId, RegistryError> {
        self.types.id(name)
    }

    /// Entity type registry
    pub fn types(&self) -> &EntityTypeRegistry {
        &self.types
    }

    /// All entities
    pub fn entities(&self) -> &EntityStore {
        &self.entities
    }

    /// All entities, mutably
    pub fn entities_mut(&mut self) -> &mut EntityStore {
        &mut self.entities
    }

    /// Collision engine
    pub fn collision(&self) -> &CollisionEngine {
        &self.collision
    }

    /// Collision engine, for attaching geometry and handlers
    pub fn collision_mut(&mut self) -> &mut CollisionEngine {
        &mut self.collision
    }

    /// Trigger box engine
    pub fn triggers(&self) -> &TriggerBoxEngine {
        &self.triggers
    }

    /// Trigger box engine, for attaching handlers
    pub fn triggers_mut(&mut self) -> &mut TriggerBoxEngine {
        &mut self.triggers
    }

    /// AI controller
    pub fn ai(&self) -> &AiController {
        &self.ai
    }

    /// AI controller, mutably
    pub fn ai_mut(&mut self) -> &mut AiController {
        &mut self.ai
    }

    /// Waypoint graph
    pub fn way_points(&self) -> &WayPointGraph {
        &self.way_points
    }

    /// Waypoint graph, mutably
    pub fn way_points_mut(&mut self) -> &mut WayPointGraph {
        &mut self.way_points
    }

    /// Register an entity with the collision engine
    ///
    /// Level geometry must be registered after the entities that collide
    /// with it.
    pub fn add_collision_entity(&mut self, handle: EntityHandle) -> Result<usize, RegistryError> {
        self.collision.add_collision_entity(handle, &mut self.entities)
    }

    /// Register an entity with the trigger box engine
    pub fn add_trigger_box_entity(&mut self, handle: EntityHandle) -> Result<usize, RegistryError> {
        self.triggers.add_trigger_box_entity(handle, &mut self.entities)
    }

    /// Register an entity with the AI controller
    pub fn add_ai_entity(&mut self, handle: EntityHandle) -> Result<usize, RegistryError> {
        self.ai.add_ai_entity(handle, &mut self.entities)
    }

    /// Send the AI entity at `index` to waypoint `destination`
    pub fn update_destination_to(&mut self, index: usize, destination: u32) -> Result<(), AiError> {
        self.ai.update_destination_to(index, destination, &self.way_points, &self.entities)
    }

    /// Create the trigger boxes and waypoints of a world configuration
    ///
    /// Each trigger box becomes a static entity whose type is its name and
    /// whose collision mask is `mask`. Returns the new entities in file
    /// order.
    pub fn apply_configuration(&mut self, configuration: &WorldConfiguration, mask: u32) -> CoreResult<Vec<EntityHandle>> {
        let mut spawned = Vec::with_capacity(configuration.trigger_boxes.len());
        for trigger_box in &configuration.trigger_boxes {
            let type_id = self.types.id(&trigger_box.name)?;
            let entity = Entity::new(trigger_box.name.clone(), trigger_box.centre)
                .with_type(type_id)
                .with_size(trigger_box.size)
                .with_collision_mask(mask)
                .with_physics(false);
            let handle = self.entities.insert(entity);
            self.triggers.add_trigger_box_entity(handle, &mut self.entities)?;
            spawned.push(handle);
        }

        for (id, way_point) in &configuration.way_points {
            self.way_points.add_way_point(*id, *way_point);
        }
        for link in &configuration.links {
            self.way_points.add_way_point_link(*link);
        }

        log::info!(
            "Applied world configuration: {} trigger boxes, {} waypoints",
            spawned.len(),
            self.way_points.len()
        );
        Ok(spawned)
    }

    /// Load and apply the configured world configuration file, if any
    pub fn load_world_configuration(&mut self, mask: u32) -> CoreResult<Vec<EntityHandle>> {
        match self.config.paths.world_configuration.clone() {
            Some(path) => {
                let configuration = WorldConfiguration::load_or_empty(path);
                self.apply_configuration(&configuration, mask)
            }
            None => Ok(Vec::new()),
        }
    }

    /// Load the configured level octree, if any
    pub fn load_octree(&self) -> Option<Octree> {
        self.config.paths.octree.as_ref().map(Octree::load_or_empty)
    }

    /// Start of frame
    pub fn begin_update(&mut self) {
        self.collision.begin_update();
        self.triggers.begin_update();
        self.ai.begin_update();
    }

    /// Advance the world by `frame_time` seconds
    pub fn update(&mut self, frame_time: f32) {
        for (_, entity) in self.entities.iter_mut() {
            if !entity.is_destroyed() {
                entity.predict(frame_time);
            }
        }

        self.collision.update(&mut self.entities);
        self.triggers.update(&mut self.entities, frame_time);

        for (_, entity) in self.entities.iter_mut() {
            if !entity.is_destroyed() {
                entity.commit();
            }
        }

        self.ai.update(&mut self.entities, &self.way_points, frame_time);
    }

    /// End of frame: drop destroyed entities everywhere
    pub fn end_update(&mut self) {
        self.collision.end_update(&mut self.entities);
        self.triggers.end_update(&mut self.entities);
        self.ai.end_update(&mut self.entities);

        let removed = self.entities.remove_destroyed();
        if removed > 0 {
            log::debug!("Removed {} destroyed entities", removed);
        }
    }

    /// Draw waypoints, links, AI paths, trigger boxes, collision geometry
    /// and octree nodes
    ///
    /// Collision contacts are included when called between
    /// [`World::update`] and [`World::end_update`], which clears them.
    /// Does nothing unless debug drawing is enabled in the configuration.
    pub fn draw_debug(&self, draw: &mut dyn DebugDraw) {
        if !self.config.debug_draw {
            return;
        }

        for (_, way_point) in self.way_points.way_points() {
            draw.sphere(way_point.centre, way_point.radius, colors::WAY_POINT);
        }
        for link in self.way_points.links() {
            if let (Some(from), Some(to)) = (self.way_points.way_point(link.from), self.way_points.way_point(link.to)) {
                draw.line(from.centre, to.centre, colors::LINK);
            }
        }

        self.ai.draw_debug(&self.entities, &self.way_points, draw);
        self.triggers.draw_debug(&self.entities, draw);
        self.collision.draw_debug(&self.entities, draw);

        for index in 0..self.collision.len() {
            let Some(Geometry::Octree(tree)) = self.collision.collision_entity(index).and_then(|record| record.geometry()) else {
                continue;
            };
            for node in tree.nodes() {
                draw.aabb(&node.bounds, colors::OCTREE_NODE);
            }
        }
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::controller::AiState;
    use crate::ai::waypoint::{WayPoint, WayPointLink};
    use crate::foundation::math::{Vec3, Vec4};
    use crate::foundation::hash;
    use crate::physics::collision::{CollisionHandler, CollisionMesh, TaggedTriangle, Triangle, AABB};
    use crate::physics::collision_layers::CollisionLayers;
    use crate::trigger::trigger_system::TriggerBoxHandler;
    use crate::world::context::HandlerContext;
    use crate::world::entity::Size;
    use crate::world::world_config::TriggerBoxConfig;
    use approx::assert_relative_eq;
    use std::cell::RefCell;
    use std::rc::Rc;

    const FRAME: f32 = 0.1;

    #[derive(Clone, Default)]
    struct Log {
        events: Rc<RefCell<Vec<String>>>,
    }

    impl TriggerBoxHandler for Log {
        fn on_enter(&mut self, ctx: &mut HandlerContext<'_>, other: EntityHandle, _time: f32, _normal: Vec3) {
            let name = ctx.get(other).map(|e| e.name.clone()).unwrap_or_default();
            self.events.borrow_mut().push(format!("enter {name}"));
        }

        fn on_leave(&mut self, ctx: &mut HandlerContext<'_>, other: EntityHandle) {
            let name = ctx.get(other).map(|e| e.name.clone()).unwrap_or_default();
            self.events.borrow_mut().push(format!("leave {name}"));
        }
    }

    #[derive(Default)]
    struct CountingDraw {
        lines: usize,
        boxes: usize,
        spheres: usize,
    }

    impl DebugDraw for CountingDraw {
        fn line(&mut self, _start: Vec3, _end: Vec3, _color: Vec4) {
            self.lines += 1;
        }

        fn aabb(&mut self, _bounds: &AABB, _color: Vec4) {
            self.boxes += 1;
        }

        fn sphere(&mut self, _center: Vec3, _radius: f32, _color: Vec4) {
            self.spheres += 1;
        }
    }

    struct Stand;

    impl CollisionHandler for Stand {
        fn handle_collision(&mut self, _ctx: &mut HandlerContext<'_>, _other: EntityHandle, _time: f32, _point: Vec3, _tag: u32) {}
    }

    fn floor() -> CollisionMesh {
        let a = Vec3::new(-10.0, 0.0, -10.0);
        let b = Vec3::new(10.0, 0.0, -10.0);
        let c = Vec3::new(10.0, 0.0, 10.0);
        let d = Vec3::new(-10.0, 0.0, 10.0);
        CollisionMesh::from_triangles(vec![
            TaggedTriangle::new(Triangle::new(a, b, c), hash::untagged()),
            TaggedTriangle::new(Triangle::new(a, c, d), hash::untagged()),
        ])
    }

    fn line_of_way_points() -> WorldConfiguration {
        WorldConfiguration {
            trigger_boxes: vec![TriggerBoxConfig {
                name: "FlagZone".to_string(),
                centre: Vec3::new(4.0, 0.0, 0.0),
                size: Size::new(2.0, 2.0, 2.0),
            }],
            way_points: (0..3u8)
                .map(|id| (u32::from(id), WayPoint::new(Vec3::new(f32::from(id), 0.0, 0.0), 0.25)))
                .collect(),
            links: vec![WayPointLink::new(0, 1), WayPointLink::new(1, 2)],
        }
    }

    fn run(world: &mut World, frames: usize) {
        for _ in 0..frames {
            world.begin_update();
            world.update(FRAME);
            world.end_update();
        }
    }

    #[test]
    fn test_apply_configuration_creates_static_trigger_entities() {
        let mut world = World::default();
        let player = world.entity_type("Player").unwrap();
        let spawned = world
            .apply_configuration(&line_of_way_points(), player.bit())
            .unwrap();

        assert_eq!(spawned.len(), 1);
        let zone = world.entities().get(spawned[0]).unwrap();
        assert!(!zone.applies_physics());
        assert_eq!(zone.type_id, world.types().find("FlagZone").unwrap());
        assert_eq!(zone.collision_mask, player.bit());
        assert_eq!(zone.indices.trigger_box, Some(0));

        assert_eq!(world.way_points().len(), 3);
        assert_eq!(world.way_points().links().count(), 2);
    }

    #[test]
    fn test_player_walking_through_configured_zone() {
        let mut world = World::default();
        let player_type = world.entity_type("Player").unwrap();
        world.apply_configuration(&line_of_way_points(), player_type.bit()).unwrap();

        let log = Log::default();
        world.triggers_mut().set_trigger_box_handler(0, Box::new(log.clone())).unwrap();

        let player = world.spawn(
            Entity::new("player", Vec3::zeros())
                .with_type(player_type)
                .with_size(Size::new(1.0, 1.0, 1.0))
                .with_velocity(Vec3::new(2.0, 0.0, 0.0)),
        );
        world.add_trigger_box_entity(player).unwrap();

        run(&mut world, 60);
        assert_eq!(*log.events.borrow(), vec!["enter player".to_string(), "leave player".to_string()]);
    }

    #[test]
    fn test_enemy_walks_the_way_point_line() {
        let mut world = World::default();
        world.apply_configuration(&line_of_way_points(), 0).unwrap();

        let enemy = world.spawn(Entity::new("enemy", Vec3::zeros()));
        let index = world.add_ai_entity(enemy).unwrap();
        world.update_destination_to(index, 2).unwrap();

        run(&mut world, 100);

        assert_eq!(world.ai().state(index), Some(AiState::Deactivated));
        let position = world.entities().get(enemy).unwrap().position;
        assert_relative_eq!(position.x, 2.0, epsilon = 0.1);
        assert_eq!(world.entities().get(enemy).unwrap().velocity, Vec3::zeros());
    }

    #[test]
    fn test_destroyed_entities_leave_every_registry() {
        let mut world = World::default();
        let handles: Vec<_> = (0..3)
            .map(|i| world.spawn(Entity::new(format!("box{i}"), Vec3::new(i as f32 * 10.0, 0.0, 0.0))))
            .collect();
        for &handle in &handles {
            world.add_trigger_box_entity(handle).unwrap();
            world.add_ai_entity(handle).unwrap();
        }

        world.entities_mut().get_mut(handles[0]).unwrap().destroy();
        run(&mut world, 1);

        assert_eq!(world.entities().len(), 2);
        assert_eq!(world.triggers().len(), 2);
        assert_eq!(world.ai().len(), 2);
        let moved = world.entities().get(handles[2]).unwrap();
        assert_eq!(moved.indices.trigger_box, Some(0));
        assert_eq!(moved.indices.ai, Some(0));
        assert!(world.entities().get(handles[0]).is_none());
    }

    #[test]
    fn test_debug_draw_is_gated_by_config() {
        let mut world = World::new(EngineConfig::default().with_debug_draw(true));
        world.apply_configuration(&line_of_way_points(), 0).unwrap();

        let mut draw = CountingDraw::default();
        world.draw_debug(&mut draw);
        assert_eq!(draw.spheres, 3);
        assert_eq!(draw.lines, 2);
        assert_eq!(draw.boxes, 1);

        let mut world = World::new(EngineConfig::default().with_debug_draw(false));
        world.apply_configuration(&line_of_way_points(), 0).unwrap();
        let mut draw = CountingDraw::default();
        world.draw_debug(&mut draw);
        assert_eq!(draw.spheres + draw.lines + draw.boxes, 0);
    }

    #[test]
    fn test_contacts_are_drawn_until_end_update() {
        let mut world = World::new(EngineConfig::default().with_debug_draw(true));
        let player_type = world.entity_type("Player").unwrap();
        let level_type = world.entity_type("Level").unwrap();

        let player = world.spawn(
            Entity::new("player", Vec3::new(0.0, 1.0, 0.0))
                .with_type(player_type)
                .with_size(Size::new(1.0, 2.0, 1.0))
                .with_collision_mask(CollisionLayers::mask(&[level_type])),
        );
        let level = world.spawn(Entity::new("level", Vec3::zeros()).with_type(level_type).with_physics(false));
        let pi = world.add_collision_entity(player).unwrap();
        let li = world.add_collision_entity(level).unwrap();
        world.collision_mut().set_collision_handler(pi, Box::new(Stand)).unwrap();
        world.collision_mut().set_mesh(li, floor()).unwrap();

        world.begin_update();
        world.update(FRAME);

        // Two triangles, plus the ground contact recorded on both sides
        let mut draw = CountingDraw::default();
        world.draw_debug(&mut draw);
        assert_eq!(draw.lines, 8);

        world.end_update();
        let mut draw = CountingDraw::default();
        world.draw_debug(&mut draw);
        assert_eq!(draw.lines, 6);
    }
}
