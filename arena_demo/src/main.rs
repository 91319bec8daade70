//! Arena Demo
//!
//! Headless run of a small capture-the-flag style arena:
//! - A player walks across a walled floor and is stopped by the far wall
//! - An enemy wanders between random waypoints
//! - A camera follows the player and is pushed back out of walls
//! - A flag zone reports who enters and leaves it
//!
//! Usage: `arena_demo [config.toml|config.ron] [frames]`

use std::cell::Cell;
use std::rc::Rc;

use rand::Rng;
use spatial_core::foundation::{hash, logging, time::FrameClock};
use spatial_core::physics::MeshError;
use spatial_core::prelude::*;
use spatial_core::world::world_config::TriggerBoxConfig;
use thiserror::Error;

// Simulation settings
const DEFAULT_FRAMES: u64 = 600;
const FRAME_STEP: f32 = 1.0 / 60.0;
const REPORT_EVERY: u64 = 60;

// Arena layout
const ARENA_HALF: f32 = 20.0;
const WALL_HEIGHT: f32 = 4.0;
const GRAVITY: f32 = -9.81;

// Movers
const PLAYER_SPEED: f32 = 4.0;
const ENEMY_SPEED: f32 = 3.0;
const CAMERA_OFFSET: Vec3 = Vec3::new(-6.0, 3.0, 0.0);
const CAMERA_FOLLOW: f32 = 4.0;

#[derive(Error, Debug)]
enum ArenaError {
    #[error("Core error: {0}")]
    Core(#[from] CoreError),

    #[error("Config error: {0}")]
    Config(#[from] spatial_core::config::ConfigError),

    #[error("Mesh error: {0}")]
    Mesh(#[from] MeshError),

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),
}

/// Keeps walkers on the floor and out of walls
struct WalkerHandler {
    surface_floor: u32,
}

impl CollisionHandler for WalkerHandler {
    fn handle_collision(&mut self, ctx: &mut HandlerContext<'_>, other: EntityHandle, time: f32, point: Vec3, tag: u32) {
        let this = ctx.this();
        let Some(entity) = ctx.entity_mut() else {
            return;
        };

        if time == 0.0 {
            // Blocked this frame: keep the vertical motion, drop the horizontal
            entity.projected_position.x = entity.position.x;
            entity.projected_position.z = entity.position.z;
            entity.projected_velocity.x = 0.0;
            entity.projected_velocity.z = 0.0;
            log::debug!("'{}' blocked at {:?}", entity.name, point);
            return;
        }

        if other == this {
            entity.acceleration.y = GRAVITY;
            return;
        }

        entity.projected_position.y = point.y + entity.size.height * 0.5;
        entity.projected_velocity.y = 0.0;
        entity.acceleration.y = 0.0;
        if tag != self.surface_floor {
            log::trace!("'{}' standing on surface {:#010x}", entity.name, tag);
        }
    }
}

/// Pushes the camera back to its last free position
#[derive(Default)]
struct CameraHandler {
    pushes: u32,
}

impl CollisionHandler for CameraHandler {
    fn handle_collision(&mut self, ctx: &mut HandlerContext<'_>, _other: EntityHandle, time: f32, _point: Vec3, _tag: u32) {
        if time != 0.0 {
            return;
        }
        if let Some(camera) = ctx.entity_mut() {
            camera.projected_position = camera.position;
            camera.projected_velocity = Vec3::zeros();
            self.pushes += 1;
        }
    }

    fn on_leaving_collision(&mut self, _ctx: &mut HandlerContext<'_>) {
        if self.pushes > 0 {
            log::debug!("Camera pushed back {} times this frame", self.pushes);
            self.pushes = 0;
        }
    }
}

/// Counts visits to the flag zone
struct FlagZoneHandler {
    entries: Rc<Cell<u32>>,
    leaves: Rc<Cell<u32>>,
}

impl TriggerBoxHandler for FlagZoneHandler {
    fn on_enter(&mut self, ctx: &mut HandlerContext<'_>, other: EntityHandle, time: f32, normal: Vec3) {
        self.entries.set(self.entries.get() + 1);
        if let Some(visitor) = ctx.get(other) {
            log::info!("'{}' entered the flag zone at t={:.3} through {:?}", visitor.name, time, normal);
        }
    }

    fn on_leave(&mut self, ctx: &mut HandlerContext<'_>, other: EntityHandle) {
        self.leaves.set(self.leaves.get() + 1);
        if let Some(visitor) = ctx.get(other) {
            log::info!("'{}' left the flag zone", visitor.name);
        }
    }
}

struct Arena {
    world: World,
    player: EntityHandle,
    enemy: EntityHandle,
    camera: EntityHandle,
    enemy_ai: usize,
    way_point_ids: Vec<u32>,
    entries: Rc<Cell<u32>>,
    leaves: Rc<Cell<u32>>,
    debug_draw: DebugDrawSystem,
}

impl Arena {
    fn new(config: EngineConfig) -> Result<Self, ArenaError> {
        let mut world = World::new(config);

        let player_type = world.entity_type("Player")?;
        let enemy_type = world.entity_type("Enemy")?;
        let camera_type = world.entity_type("Camera")?;
        let level_type = world.entity_type("Level")?;

        let collision_config = world.config().collision.clone().with_camera_type(camera_type);
        world.collision_mut().set_config(collision_config);

        // Zones report entries only for entities registered after them
        let visitors = CollisionLayers::mask(&[player_type, enemy_type]);
        let mut zones = world.load_world_configuration(visitors)?;
        if zones.is_empty() && world.way_points().is_empty() {
            zones = world.apply_configuration(&default_configuration(), visitors)?;
        }

        let level_mask = CollisionLayers::mask(&[level_type]);
        let player = world.spawn(
            Entity::new("player", Vec3::new(-15.0, 1.0, 0.0))
                .with_type(player_type)
                .with_size(Size::new(1.0, 2.0, 1.0))
                .with_collision_mask(level_mask)
                .with_velocity(Vec3::new(PLAYER_SPEED, 0.0, 0.0)),
        );
        let enemy = world.spawn(
            Entity::new("enemy", Vec3::new(10.0, 1.0, 10.0))
                .with_type(enemy_type)
                .with_size(Size::new(1.0, 2.0, 1.0))
                .with_collision_mask(level_mask),
        );
        let camera = world.spawn(
            Entity::new("camera", Vec3::new(-15.0, 1.0, 0.0) + CAMERA_OFFSET)
                .with_type(camera_type)
                .with_size(Size::new(0.5, 0.5, 0.5))
                .with_collision_mask(level_mask),
        );

        // Movers first, level geometry last
        let surface_floor = hash::string_hash("Floor");
        for walker in [player, enemy] {
            let index = world.add_collision_entity(walker)?;
            world.collision_mut().set_collision_handler(index, Box::new(WalkerHandler { surface_floor }))?;
            world.add_trigger_box_entity(walker)?;
        }
        let index = world.add_collision_entity(camera)?;
        world.collision_mut().set_collision_handler(index, Box::new(CameraHandler::default()))?;

        let level = world.spawn(Entity::new("level", Vec3::zeros()).with_type(level_type).with_physics(false));
        let index = world.add_collision_entity(level)?;
        let geometry = match world.load_octree().filter(|tree| !tree.is_empty()) {
            Some(tree) => Geometry::Octree(tree),
            None => Geometry::Mesh(arena_mesh()?),
        };
        world.collision_mut().set_geometry(index, geometry)?;

        let entries = Rc::new(Cell::new(0));
        let leaves = Rc::new(Cell::new(0));
        for zone in zones {
            let Some(index) = world.entities().get(zone).and_then(|entity| entity.indices.trigger_box) else {
                continue;
            };
            world.triggers_mut().set_trigger_box_handler(
                index,
                Box::new(FlagZoneHandler {
                    entries: Rc::clone(&entries),
                    leaves: Rc::clone(&leaves),
                }),
            )?;
        }

        let enemy_ai = world.add_ai_entity(enemy)?;
        world.ai_mut().set_speed(enemy_ai, ENEMY_SPEED).map_err(CoreError::from)?;
        let way_point_ids = world.way_points().way_points().map(|(id, _)| id).collect();

        let mut debug_draw = DebugDrawSystem::new();
        debug_draw.enabled = world.config().debug_draw;

        Ok(Self {
            world,
            player,
            enemy,
            camera,
            enemy_ai,
            way_point_ids,
            entries,
            leaves,
            debug_draw,
        })
    }

    fn send_enemy_somewhere(&mut self, rng: &mut impl Rng) {
        if self.way_point_ids.is_empty() || self.world.ai().is_active(self.enemy_ai) {
            return;
        }
        let destination = self.way_point_ids[rng.gen_range(0..self.way_point_ids.len())];
        match self.world.update_destination_to(self.enemy_ai, destination) {
            Ok(()) => log::info!("Enemy heading to waypoint {}", destination),
            Err(e) => log::warn!("Enemy cannot go to waypoint {}: {}", destination, e),
        }
    }

    fn steer_camera(&mut self) {
        let Some(target) = self.world.entities().get(self.player).map(|player| player.position + CAMERA_OFFSET) else {
            return;
        };
        if let Some(camera) = self.world.entities_mut().get_mut(self.camera) {
            camera.velocity = (target - camera.position) * CAMERA_FOLLOW;
        }
    }

    fn report(&self, frame: u64) {
        let entities = self.world.entities();
        for (label, handle) in [("player", self.player), ("enemy", self.enemy), ("camera", self.camera)] {
            if let Some(entity) = entities.get(handle) {
                log::info!(
                    "frame {:>4} {:<6} at ({:6.2}, {:5.2}, {:6.2})",
                    frame,
                    label,
                    entity.position.x,
                    entity.position.y,
                    entity.position.z
                );
            }
        }
    }

    fn run(mut self, frames: u64) {
        let mut clock = FrameClock::fixed(FRAME_STEP);
        let mut rng = rand::thread_rng();

        for frame in 0..frames {
            let frame_time = clock.tick();

            self.send_enemy_somewhere(&mut rng);
            self.steer_camera();

            self.world.begin_update();
            self.world.update(frame_time);

            // Contacts only live until end_update
            self.debug_draw.update(frame_time);
            self.world.draw_debug(&mut self.debug_draw);

            self.world.end_update();

            if frame % REPORT_EVERY == 0 {
                self.report(frame);
            }
        }

        log::info!(
            "Ran {} frames ({:.1}s): {} flag zone entries, {} leaves, {} debug shapes",
            clock.frame_count(),
            clock.total_time(),
            self.entries.get(),
            self.leaves.get(),
            self.debug_draw.shape_count()
        );
    }
}

/// Floor plus four walls around the origin
fn arena_mesh() -> Result<CollisionMesh, MeshError> {
    let (h, top) = (ARENA_HALF, WALL_HEIGHT);
    let vertices = [
        // Floor corners
        Vec3::new(-h, 0.0, -h),
        Vec3::new(h, 0.0, -h),
        Vec3::new(h, 0.0, h),
        Vec3::new(-h, 0.0, h),
        // Wall tops
        Vec3::new(-h, top, -h),
        Vec3::new(h, top, -h),
        Vec3::new(h, top, h),
        Vec3::new(-h, top, h),
    ];
    #[rustfmt::skip]
    let indices = [
        0, 1, 2, 0, 2, 3, // floor
        0, 4, 5, 0, 5, 1, // -z wall
        1, 5, 6, 1, 6, 2, // +x wall
        2, 6, 7, 2, 7, 3, // +z wall
        3, 7, 4, 3, 4, 0, // -x wall
    ];

    let floor = hash::string_hash("Floor");
    let wall = hash::string_hash("Wall");
    let mut tags = vec![wall; indices.len() / 3];
    tags[..2].fill(floor);

    CollisionMesh::from_indexed(&vertices, &indices)?.with_tags(&tags)
}

/// Flag zone in the middle and a ring of waypoints around it
fn default_configuration() -> WorldConfiguration {
    let ring = [
        Vec3::new(10.0, 1.0, 10.0),
        Vec3::new(-10.0, 1.0, 10.0),
        Vec3::new(-10.0, 1.0, -10.0),
        Vec3::new(10.0, 1.0, -10.0),
    ];

    let mut links = Vec::new();
    for id in 0..ring.len() as u32 {
        let next = (id + 1) % ring.len() as u32;
        links.push(WayPointLink::new(id, next));
        links.push(WayPointLink::new(next, id));
    }

    WorldConfiguration {
        trigger_boxes: vec![TriggerBoxConfig {
            name: "FlagZone".to_string(),
            centre: Vec3::new(0.0, 1.0, 0.0),
            size: Size::new(4.0, 2.0, 4.0),
        }],
        way_points: (0u32..).zip(ring.iter().map(|&centre| WayPoint::new(centre, 0.5))).collect(),
        links,
    }
}

fn main() -> Result<(), ArenaError> {
    logging::init_with_default("info");

    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(path) => EngineConfig::load_from_file(&path)?,
        None => EngineConfig::default(),
    };
    config.validate()?;
    let frames = args.next().and_then(|arg| arg.parse().ok()).unwrap_or(DEFAULT_FRAMES);

    log::info!("=== Arena Demo: {} frames ===", frames);
    Arena::new(config)?.run(frames);
    Ok(())
}
