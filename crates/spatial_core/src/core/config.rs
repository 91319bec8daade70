//! # Unified Configuration System
//!
//! Tunables for every subsystem of the spatial core, grouped the same way the
//! subsystems are: collision, trigger boxes, AI and the world's data files.
//!
//! ## Design Goals
//!
//! - **Centralized**: All configuration types in one place for easy discovery
//! - **Serializable**: Stored as TOML or RON through [`Config`]
//! - **Type Safe**: Strong typing with validation and defaults

use serde::{Deserialize, Serialize};

use crate::ai::pathfinder::EdgeCost;
use crate::world::entity_types::EntityTypeId;

pub use crate::config::{Config, ConfigError, ConfigFormat};

/// # Collision Configuration
///
/// Controls the ray-cast collision engine, in particular the bounded
/// forward-resolution loop run for the camera entity type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CollisionConfig {
    /// Entity type that gets iterative forward resolution
    pub camera_type_id: Option<EntityTypeId>,
    /// Upper bound on camera forward-resolution iterations per frame
    pub camera_max_iterations: u32,
    /// Multiplier on entity height for the downward ground probe
    pub ground_probe_scale: f32,
}

impl CollisionConfig {
    /// Create a collision configuration with defaults
    pub fn new() -> Self {
        Self {
            camera_type_id: None,
            camera_max_iterations: 8,
            ground_probe_scale: 1.0,
        }
    }

    /// Set the camera entity type
    pub fn with_camera_type(mut self, type_id: EntityTypeId) -> Self {
        self.camera_type_id = Some(type_id);
        self
    }

    /// Set the camera iteration cap
    pub fn with_camera_max_iterations(mut self, iterations: u32) -> Self {
        self.camera_max_iterations = iterations;
        self
    }

    /// Set the ground probe scale
    pub fn with_ground_probe_scale(mut self, scale: f32) -> Self {
        self.ground_probe_scale = scale;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.camera_max_iterations == 0 {
            return Err(ConfigError::Invalid("camera_max_iterations must be at least 1".to_string()));
        }
        if !(self.ground_probe_scale > 0.0) {
            return Err(ConfigError::Invalid("ground_probe_scale must be positive".to_string()));
        }
        Ok(())
    }
}

impl Default for CollisionConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// # Trigger Box Configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TriggerConfig {
    /// Squared speed below which relative motion counts as stationary
    pub velocity_epsilon: f32,
}

impl TriggerConfig {
    /// Create a trigger configuration with defaults
    pub fn new() -> Self {
        Self { velocity_epsilon: 1.0e-6 }
    }

    /// Set the stationary threshold
    pub fn with_velocity_epsilon(mut self, epsilon: f32) -> Self {
        self.velocity_epsilon = epsilon;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.velocity_epsilon < 0.0 {
            return Err(ConfigError::Invalid("velocity_epsilon cannot be negative".to_string()));
        }
        Ok(())
    }
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// # AI Configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AiConfig {
    /// Cost model for traversing a waypoint link
    pub edge_cost: EdgeCost,
    /// Multiplier on frame time used as the waypoint arrival tolerance
    pub arrival_tolerance_scale: f32,
}

impl AiConfig {
    /// Create an AI configuration with defaults
    pub fn new() -> Self {
        Self {
            edge_cost: EdgeCost::Uniform,
            arrival_tolerance_scale: 1.0,
        }
    }

    /// Set the edge cost model
    pub fn with_edge_cost(mut self, edge_cost: EdgeCost) -> Self {
        self.edge_cost = edge_cost;
        self
    }

    /// Set the arrival tolerance multiplier
    pub fn with_arrival_tolerance_scale(mut self, scale: f32) -> Self {
        self.arrival_tolerance_scale = scale;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.arrival_tolerance_scale > 0.0) {
            return Err(ConfigError::Invalid("arrival_tolerance_scale must be positive".to_string()));
        }
        Ok(())
    }
}

impl Default for AiConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// # World Data Paths
///
/// Binary files loaded once when a world is built.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct WorldPaths {
    /// Precomputed octree of the level geometry
    pub octree: Option<String>,
    /// Trigger boxes, waypoints and links
    pub world_configuration: Option<String>,
}

impl WorldPaths {
    /// Set the octree path
    pub fn with_octree(mut self, path: impl Into<String>) -> Self {
        self.octree = Some(path.into());
        self
    }

    /// Set the world configuration path
    pub fn with_world_configuration(mut self, path: impl Into<String>) -> Self {
        self.world_configuration = Some(path.into());
        self
    }
}

/// # Engine Configuration
///
/// Top-level configuration for a [`crate::world::World`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EngineConfig {
    /// Log filter used when `RUST_LOG` is unset
    pub log_level: String,
    /// Whether the world emits debug-draw requests
    pub debug_draw: bool,
    /// Collision engine settings
    pub collision: CollisionConfig,
    /// Trigger box engine settings
    pub trigger: TriggerConfig,
    /// AI settings
    pub ai: AiConfig,
    /// Data files
    pub paths: WorldPaths,
}

impl EngineConfig {
    /// Create a new engine configuration
    pub fn new() -> Self {
        Self {
            log_level: "info".to_string(),
            debug_draw: cfg!(debug_assertions),
            collision: CollisionConfig::default(),
            trigger: TriggerConfig::default(),
            ai: AiConfig::default(),
            paths: WorldPaths::default(),
        }
    }

    /// Set log level
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Enable debug drawing
    pub fn with_debug_draw(mut self, enabled: bool) -> Self {
        self.debug_draw = enabled;
        self
    }

    /// Set collision configuration
    pub fn with_collision(mut self, collision: CollisionConfig) -> Self {
        self.collision = collision;
        self
    }

    /// Set trigger configuration
    pub fn with_trigger(mut self, trigger: TriggerConfig) -> Self {
        self.trigger = trigger;
        self
    }

    /// Set AI configuration
    pub fn with_ai(mut self, ai: AiConfig) -> Self {
        self.ai = ai;
        self
    }

    /// Set data paths
    pub fn with_paths(mut self, paths: WorldPaths) -> Self {
        self.paths = paths;
        self
    }

    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.log_level.is_empty() {
            return Err(ConfigError::Invalid("log_level cannot be empty".to_string()));
        }
        self.collision.validate()?;
        self.trigger.validate()?;
        self.ai.validate()?;
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl Config for EngineConfig {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.collision.camera_max_iterations, 8);
        assert_eq!(config.ai.edge_cost, EdgeCost::Uniform);
    }

    #[test]
    fn test_zero_camera_iterations_rejected() {
        let config = EngineConfig::default()
            .with_collision(CollisionConfig::default().with_camera_max_iterations(0));
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_toml_round_trip_keeps_camera_settings() {
        let config = EngineConfig::default()
            .with_collision(CollisionConfig::default().with_camera_type(EntityTypeId(3)))
            .with_paths(WorldPaths::default().with_octree("level.oct"));

        let text = config.to_string_as(ConfigFormat::Toml).expect("serialize");
        let parsed = EngineConfig::from_str_as(&text, ConfigFormat::Toml).expect("parse");

        assert_eq!(parsed, config);
    }

    #[test]
    fn test_ron_with_missing_file_falls_back_to_default() {
        let config = EngineConfig::load_or_default("does/not/exist.ron");
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_unknown_extension_is_unsupported() {
        let result = EngineConfig::load_from_file("settings.ini");
        assert!(matches!(result, Err(ConfigError::UnsupportedFormat(_))));
    }
}
