//! Foundation module - Core utilities and types
//!
//! This module provides fundamental utilities used throughout the engine:
//! - Math types and guarded numeric helpers
//! - Dense registries with swap-and-pop removal
//! - String hashing for surface tags
//! - Little-endian record IO for the binary data files
//! - Frame timing
//! - Logging utilities

pub mod math;
pub mod collections;
pub mod hash;
pub mod binary;
pub mod time;
pub mod logging;
