//! # Core Engine Module
//!
//! Shared configuration for the spatial core subsystems.

pub mod config;

pub use config::{
    AiConfig,
    CollisionConfig,
    Config,
    ConfigError,
    ConfigFormat,
    EngineConfig,
    TriggerConfig,
    WorldPaths,
};
