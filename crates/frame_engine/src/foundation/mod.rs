//! Foundation module - Core utilities and types
//!
//! This module provides fundamental utilities used throughout the engine:
//! - Math types and transform composition
//! - Monotonic frame timing
//! - Logging initialization

pub mod math;
pub mod time;
pub mod logging;
