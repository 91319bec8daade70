//! AI entity controller
//!
//! Each AI entity walks a queue of waypoint ids. The controller only sets
//! velocity; physics, collision and the commit step move the entity.
//!
//! ```text
//! Deactivated --update_destination_to--> GoToTargetNode
//! GoToTargetNode --within tolerance--> ArrivedAtTargetNode
//! ArrivedAtTargetNode --queue has next--> GoToTargetNode
//! ArrivedAtTargetNode --queue empty--> Deactivated
//! ```

use std::collections::VecDeque;

use thiserror::Error;

use crate::ai::pathfinder::{PathError, Pathfinder};
use crate::ai::waypoint::WayPointGraph;
use crate::core::config::AiConfig;
use crate::debug::draw::{colors, DebugDraw};
use crate::error::RegistryError;
use crate::foundation::collections::{swap_remove_dead, DenseRecord};
use crate::foundation::math::{utils, Vec3};
use crate::world::entity::{EntityHandle, EntityStore};

/// AI controller errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AiError {
    /// Index does not name an AI entity
    #[error("AI index {index} out of range (len {len})")]
    InvalidIndex {
        /// Requested index
        index: usize,
        /// Registry length
        len: usize,
    },

    /// Destination requested on an empty waypoint graph
    #[error("No waypoints to navigate")]
    NoWayPoints,

    /// AI entity's entity no longer exists
    #[error("AI entity refers to a stale entity handle")]
    StaleEntity,

    /// Path search failed
    #[error("Path error: {0}")]
    Path(#[from] PathError),
}

/// Navigation state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AiState {
    /// Idle
    #[default]
    Deactivated,
    /// Steering towards the current target waypoint
    GoToTargetNode,
    /// Reached the target; the next one is taken on the following tick
    ArrivedAtTargetNode,
    /// Reserved for asynchronous searches; idles like `Deactivated`
    PathFinding,
}

/// Registry record of one AI entity
#[derive(Debug, Clone)]
pub struct AiEntity {
    entity: EntityHandle,
    path: VecDeque<u32>,
    target: Option<u32>,
    state: AiState,
    speed: f32,
    dead: bool,
}

impl AiEntity {
    fn new(entity: EntityHandle) -> Self {
        Self {
            entity,
            path: VecDeque::new(),
            target: None,
            state: AiState::Deactivated,
            speed: 1.0,
            dead: false,
        }
    }

    /// Entity this record steers
    pub fn entity(&self) -> EntityHandle {
        self.entity
    }

    /// Remaining waypoint queue
    pub fn path(&self) -> &VecDeque<u32> {
        &self.path
    }

    /// Waypoint currently steered to
    pub fn target(&self) -> Option<u32> {
        self.target
    }

    /// Current state
    pub fn state(&self) -> AiState {
        self.state
    }

    /// Steering speed in units per second
    pub fn speed(&self) -> f32 {
        self.speed
    }

    fn deactivate(&mut self) {
        self.state = AiState::Deactivated;
        self.path.clear();
    }
}

impl DenseRecord for AiEntity {
    fn is_dead(&self) -> bool {
        self.dead
    }
}

/// Steers registered entities along waypoint paths
#[derive(Debug, Default)]
pub struct AiController {
    config: AiConfig,
    pathfinder: Pathfinder,
    records: Vec<AiEntity>,
}

impl AiController {
    /// Create an empty controller
    pub fn new(config: AiConfig) -> Self {
        log::info!("AI controller initialized ({:?} edge cost)", config.edge_cost);
        Self {
            pathfinder: Pathfinder::new(config.edge_cost),
            config,
            records: Vec::new(),
        }
    }

    /// Pathfinder used for destinations
    pub fn pathfinder(&self) -> &Pathfinder {
        &self.pathfinder
    }

    fn record(&self, index: usize) -> Result<&AiEntity, AiError> {
        let len = self.records.len();
        self.records.get(index).ok_or(AiError::InvalidIndex { index, len })
    }

    fn record_mut(&mut self, index: usize) -> Result<&mut AiEntity, AiError> {
        let len = self.records.len();
        self.records.get_mut(index).ok_or(AiError::InvalidIndex { index, len })
    }

    /// Register an entity and write its index back into it
    pub fn add_ai_entity(&mut self, handle: EntityHandle, entities: &mut EntityStore) -> Result<usize, RegistryError> {
        let entity = entities.get_mut(handle).ok_or(RegistryError::StaleHandle)?;
        if let Some(index) = entity.indices.ai {
            return Err(RegistryError::AlreadyRegistered(index));
        }

        let index = self.records.len();
        entity.indices.ai = Some(index);
        self.records.push(AiEntity::new(handle));
        Ok(index)
    }

    /// Unregister the entity at `index`, keeping the order of the rest
    pub fn remove_ai_entity(&mut self, index: usize, entities: &mut EntityStore) -> Result<(), AiError> {
        self.record(index)?;
        let removed = self.records.remove(index);
        if let Some(entity) = entities.get_mut(removed.entity) {
            entity.indices.ai = None;
        }

        for (moved, record) in self.records.iter().enumerate().skip(index) {
            if let Some(entity) = entities.get_mut(record.entity) {
                entity.indices.ai = Some(moved);
            }
        }
        Ok(())
    }

    /// Set the steering speed of the entity at `index`
    pub fn set_speed(&mut self, index: usize, speed: f32) -> Result<(), AiError> {
        self.record_mut(index)?.speed = speed;
        Ok(())
    }

    /// Plan a path from the entity's nearest waypoint to `destination`
    ///
    /// On failure the entity stays deactivated.
    pub fn update_destination_to(
        &mut self,
        index: usize,
        destination: u32,
        graph: &WayPointGraph,
        entities: &EntityStore,
    ) -> Result<(), AiError> {
        self.abort(index)?;

        let handle = self.record(index)?.entity;
        let position = entities.get(handle).ok_or(AiError::StaleEntity)?.position;
        let closest = Pathfinder::find_closest_node_id(graph, &position).ok_or(AiError::NoWayPoints)?;

        let path = match self.pathfinder.find_optimal_path(graph, closest, destination) {
            Ok(path) => path,
            Err(e) => {
                log::warn!("AI {} cannot reach waypoint {}: {}", index, destination, e);
                return Err(e.into());
            }
        };

        let record = self.record_mut(index)?;
        record.path = path.into();
        record.target = Some(closest);
        record.state = AiState::GoToTargetNode;
        log::debug!("AI {} heading to {} via {:?}", index, destination, record.path);
        Ok(())
    }

    /// Stop navigating
    pub fn abort(&mut self, index: usize) -> Result<(), AiError> {
        self.record_mut(index)?.deactivate();
        Ok(())
    }

    /// Whether the entity at `index` is navigating
    pub fn is_active(&self, index: usize) -> bool {
        self.records
            .get(index)
            .is_some_and(|record| record.state != AiState::Deactivated)
    }

    /// State of the entity at `index`
    pub fn state(&self, index: usize) -> Option<AiState> {
        self.records.get(index).map(AiEntity::state)
    }

    /// Record at `index`
    pub fn ai_entity(&self, index: usize) -> Option<&AiEntity> {
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

    /// Advance every state machine by one tick
    pub fn update(&mut self, entities: &mut EntityStore, graph: &WayPointGraph, frame_time: f32) {
        let tolerance_scale = self.config.arrival_tolerance_scale;

        for (index, record) in self.records.iter_mut().enumerate() {
            let Some(entity) = entities.get_mut(record.entity) else {
                continue;
            };
            if entity.is_destroyed() {
                continue;
            }

            match record.state {
                AiState::Deactivated | AiState::PathFinding => continue,
                AiState::GoToTargetNode => {}
                AiState::ArrivedAtTargetNode => {
                    let Some(next) = record.path.pop_front() else {
                        log::debug!("AI {} finished its path", index);
                        record.deactivate();
                        entity.velocity = Vec3::zeros();
                        continue;
                    };
                    let previous = record.target.replace(next);
                    if previous == Some(next) {
                        if let Some(after) = record.path.pop_front() {
                            record.target = Some(after);
                        }
                    }
                    record.state = AiState::GoToTargetNode;
                }
            }

            let Some(way_point) = record.target.and_then(|id| graph.way_point(id)) else {
                log::debug!("AI {} lost its target waypoint {:?}", index, record.target);
                record.deactivate();
                entity.velocity = Vec3::zeros();
                continue;
            };

            let tolerance = frame_time * record.speed * tolerance_scale;
            if utils::are_within_range_xz(&entity.position, &way_point.centre, tolerance) {
                entity.velocity = Vec3::zeros();
                record.state = AiState::ArrivedAtTargetNode;
            } else {
                entity.velocity = utils::normalize_or_zero(&(way_point.centre - entity.position)) * record.speed;
            }
        }
    }

    /// Drop records of destroyed entities
    pub fn end_update(&mut self, entities: &mut EntityStore) {
        for record in &mut self.records {
            record.dead = entities.is_dead(record.entity);
        }

        let removed = swap_remove_dead(&mut self.records, |record, index| {
            if let Some(entity) = entities.get_mut(record.entity) {
                entity.indices.ai = Some(index);
            }
        });

        for record in &removed {
            if let Some(entity) = entities.get_mut(record.entity) {
                entity.indices.ai = None;
            }
        }
        if !removed.is_empty() {
            log::debug!("Removed {} AI entities", removed.len());
        }
    }

    /// Draw every active entity's remaining path
    pub fn draw_debug(&self, entities: &EntityStore, graph: &WayPointGraph, draw: &mut dyn DebugDraw) {
        for record in &self.records {
            let Some(entity) = entities.get(record.entity) else {
                continue;
            };
            let mut from = entity.position;
            for id in record.target.iter().chain(record.path.iter()) {
                if let Some(way_point) = graph.way_point(*id) {
                    draw.line(from, way_point.centre, colors::AI_PATH);
                    from = way_point.centre;
                }
            }
        }
    }
}
