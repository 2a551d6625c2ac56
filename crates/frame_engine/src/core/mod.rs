//! # Core Module
//!
//! Shared configuration for the engine and the applications built on it.

pub mod config;

pub use config::{
    ApplicationConfig,
    AssetConfig,
    CameraConfig,
    Config,
    ConfigError,
    EngineConfig,
    RendererConfig,
    ShaderConfig,
};
