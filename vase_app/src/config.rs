//! Application configuration
//!
//! The engine sections (`engine`, `renderer`, `camera`, `assets`) keep the
//! layout of [`ApplicationConfig`]; the app adds the window backend choice
//! and the headless drawing context settings.

use serde::{Deserialize, Serialize};

use frame_engine::core::config::{
    ApplicationConfig, AssetConfig, CameraConfig, Config, ConfigError, EngineConfig, RendererConfig,
};
use frame_engine::render::headless::HeadlessRendererConfig;

/// Which window and drawing context the app runs on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowBackend {
    /// Scripted window that closes after `headless.max_frames` iterations
    #[default]
    Headless,
    /// GLFW window drawn through Vulkan (requires the `glfw-window` feature)
    Glfw,
}

/// Surface and frame slot settings
///
/// The GLFW backend reads `frames_in_flight` and opens its window at
/// `width` by `height`; the remaining fields only apply headless.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeadlessConfig {
    /// Frame slots
    pub frames_in_flight: usize,
    /// Surface width in pixels
    pub width: u32,
    /// Surface height in pixels
    pub height: u32,
    /// Loop iterations before the headless window closes
    pub max_frames: usize,
    /// Report "no frame available" on every n-th acquisition
    pub not_ready_every: Option<u64>,
}

impl Default for HeadlessConfig {
    fn default() -> Self {
        Self {
            frames_in_flight: 2,
            width: 800,
            height: 600,
            max_frames: 600,
            not_ready_every: None,
        }
    }
}

impl HeadlessConfig {
    /// Renderer settings for a surface of `width` by `height`
    pub fn renderer_config(&self, width: u32, height: u32) -> HeadlessRendererConfig {
        HeadlessRendererConfig {
            frames_in_flight: self.frames_in_flight,
            width,
            height,
            not_ready_on: Vec::new(),
            not_ready_every: self.not_ready_every,
        }
    }
}

/// Everything the app reads at startup
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Logging
    pub engine: EngineConfig,
    /// Window title, shaders and ambient light
    pub renderer: RendererConfig,
    /// Projection and starting position
    pub camera: CameraConfig,
    /// Model directory
    pub assets: AssetConfig,
    /// Window collaborator
    pub window: WindowBackend,
    /// Headless drawing context
    pub headless: HeadlessConfig,
}

impl AppConfig {
    /// The engine sections as an [`ApplicationConfig`]
    pub fn application(&self) -> ApplicationConfig {
        ApplicationConfig {
            engine: self.engine.clone(),
            renderer: self.renderer.clone(),
            camera: self.camera.clone(),
            assets: self.assets.clone(),
        }
    }

    /// Reject unusable values
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.application().validate()?;
        if self.headless.frames_in_flight == 0 {
            return Err(ConfigError::Invalid("frames_in_flight must be at least 1".to_string()));
        }
        if self.headless.width == 0 || self.headless.height == 0 {
            return Err(ConfigError::Invalid("headless surface must have a non-zero size".to_string()));
        }
        if self.headless.not_ready_every == Some(0) {
            return Err(ConfigError::Invalid("not_ready_every must be positive when set".to_string()));
        }
        Ok(())
    }
}

impl Config for AppConfig {}
