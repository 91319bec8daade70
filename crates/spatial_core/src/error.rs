//! Crate-wide error types

use thiserror::Error;

use crate::ai::controller::AiError;
use crate::ai::pathfinder::PathError;
use crate::config::ConfigError;
use crate::physics::collision::mesh::MeshError;
use crate::spatial::octree::OctreeError;
use crate::world::world_config::WorldConfigError;

/// Errors raised by the dense subsystem registries and the entity store
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Registry index does not name a record
    #[error("Registry index {index} out of range (len {len})")]
    InvalidIndex {
        /// Requested index
        index: usize,
        /// Registry length at the time of the call
        len: usize,
    },

    /// Entity handle no longer refers to a live entity
    #[error("Entity handle is stale or was never issued")]
    StaleHandle,

    /// Entity is already registered with this subsystem
    #[error("Entity is already registered at index {0}")]
    AlreadyRegistered(usize),

    /// More entity types than a 32-bit collision mask can address
    #[error("Cannot register entity type '{0}': all 32 type ids are in use")]
    TooManyTypes(String),
}

/// Top-level error for the spatial core
#[derive(Error, Debug)]
pub enum CoreError {
    /// Registry misuse
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Octree loading
    #[error("Octree error: {0}")]
    Octree(#[from] OctreeError),

    /// World configuration loading
    #[error("World configuration error: {0}")]
    WorldConfig(#[from] WorldConfigError),

    /// Collision mesh construction
    #[error("Mesh error: {0}")]
    Mesh(#[from] MeshError),

    /// Pathfinding
    #[error("Path error: {0}")]
    Path(#[from] PathError),

    /// AI controller
    #[error("AI error: {0}")]
    Ai(#[from] AiError),

    /// Engine configuration
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// Result alias using [`CoreError`]
pub type CoreResult<T> = Result<T, CoreError>;
