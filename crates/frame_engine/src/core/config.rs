//! # Configuration
//!
//! Serializable configuration for the renderer, the camera and asset
//! lookup. Files are read and written as TOML or RON depending on their
//! extension through the [`Config`] trait.
//!
//! ## Configuration Categories
//!
//! - **Engine**: logging defaults
//! - **Renderer**: application name, shader pairs and the ambient light term
//! - **Camera**: fixed projection parameters and the viewer start position
//! - **Assets**: base directory for model files

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration errors
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// Unsupported format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// A value failed validation
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// File formats understood by [`Config`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Toml,
    Ron,
}

fn format_of(path: &Path) -> Result<Format, ConfigError> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("toml") => Ok(Format::Toml),
        Some("ron") => Ok(Format::Ron),
        _ => Err(ConfigError::UnsupportedFormat(path.display().to_string())),
    }
}

/// Load and save support for configuration structs
pub trait Config: Serialize + for<'de> Deserialize<'de> + Default {
    /// Load configuration from a `.toml` or `.ron` file
    fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let format = format_of(path)?;
        let contents = std::fs::read_to_string(path)?;

        match format {
            Format::Toml => toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string())),
            Format::Ron => ron::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string())),
        }
    }

    /// Save configuration to a `.toml` or `.ron` file
    fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let contents = match format_of(path)? {
            Format::Toml => toml::to_string_pretty(self)
                .map_err(|e| ConfigError::Serialize(e.to_string()))?,
            Format::Ron => ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
                .map_err(|e| ConfigError::Serialize(e.to_string()))?,
        };

        std::fs::write(path, contents)?;
        Ok(())
    }
}

/// # Shader Configuration
///
/// A vertex/fragment SPIR-V pair for one pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShaderConfig {
    /// Path to the vertex shader SPIR-V file
    pub vertex_shader_path: String,
    /// Path to the fragment shader SPIR-V file
    pub fragment_shader_path: String,
}

impl ShaderConfig {
    /// Create a new shader configuration
    pub fn new(vertex_path: impl Into<String>, fragment_path: impl Into<String>) -> Self {
        Self {
            vertex_shader_path: vertex_path.into(),
            fragment_shader_path: fragment_path.into(),
        }
    }

    /// Resolve a shader pair against the usual output directories
    ///
    /// The first directory containing a file wins; when nothing is found
    /// the path falls back to `target/shaders/`.
    pub fn with_path_resolution(base_vertex: &str, base_fragment: &str) -> Self {
        const SHADER_DIRS: [&str; 4] = [
            "target/shaders/",
            "../target/shaders/",
            "resources/shaders/",
            "./",
        ];

        let resolve = |name: &str| {
            SHADER_DIRS
                .iter()
                .map(|dir| format!("{dir}{name}"))
                .find(|candidate| Path::new(candidate).exists())
                .unwrap_or_else(|| format!("target/shaders/{name}"))
        };

        Self {
            vertex_shader_path: resolve(base_vertex),
            fragment_shader_path: resolve(base_fragment),
        }
    }

    /// Shaders for lit mesh drawing
    pub fn object_shaders() -> Self {
        Self::with_path_resolution("simple_shader.vert.spv", "simple_shader.frag.spv")
    }

    /// Shaders for point light billboards
    pub fn point_light_shaders() -> Self {
        Self::with_path_resolution("point_light.vert.spv", "point_light.frag.spv")
    }

    /// Reject empty paths
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.vertex_shader_path.is_empty() || self.fragment_shader_path.is_empty() {
            return Err(ConfigError::Invalid("shader paths cannot be empty".to_string()));
        }
        Ok(())
    }
}

impl Default for ShaderConfig {
    fn default() -> Self {
        Self::object_shaders()
    }
}

/// # Renderer Configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RendererConfig {
    /// Application name used for the window title and Vulkan instance
    pub application_name: String,
    /// Shaders for the object pass
    pub object_shaders: ShaderConfig,
    /// Shaders for the point light pass
    pub light_shaders: ShaderConfig,
    /// Ambient light color in rgb, intensity in the fourth component
    pub ambient_light: [f32; 4],
}

impl RendererConfig {
    /// Create a renderer configuration with default shaders
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            application_name: app_name.into(),
            object_shaders: ShaderConfig::object_shaders(),
            light_shaders: ShaderConfig::point_light_shaders(),
            ambient_light: [1.0, 1.0, 1.0, 0.02],
        }
    }

    /// Set the ambient light term
    pub fn with_ambient_light(mut self, ambient: [f32; 4]) -> Self {
        self.ambient_light = ambient;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.application_name.is_empty() {
            return Err(ConfigError::Invalid("application name cannot be empty".to_string()));
        }
        if self.ambient_light.iter().any(|c| !c.is_finite() || *c < 0.0) {
            return Err(ConfigError::Invalid(format!(
                "ambient light must be finite and non-negative, got {:?}",
                self.ambient_light
            )));
        }
        self.object_shaders.validate()?;
        self.light_shaders.validate()
    }
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self::new("Point Lights")
    }
}

/// # Camera Configuration
///
/// Projection parameters stay fixed for the whole run; only the aspect
/// ratio follows the drawing surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraConfig {
    /// Vertical field of view in degrees
    pub fov_y_degrees: f32,
    /// Near clip distance
    pub near: f32,
    /// Far clip distance
    pub far: f32,
    /// Initial viewer position
    pub start_translation: [f32; 3],
}

impl CameraConfig {
    /// Vertical field of view in radians
    pub fn fov_y_radians(&self) -> f32 {
        self.fov_y_degrees.to_radians()
    }

    /// Validate the projection parameters
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.fov_y_degrees > 0.0 && self.fov_y_degrees < 180.0) {
            return Err(ConfigError::Invalid(format!(
                "field of view must be in (0, 180) degrees, got {}",
                self.fov_y_degrees
            )));
        }
        if self.near <= 0.0 {
            return Err(ConfigError::Invalid(format!("near plane must be positive, got {}", self.near)));
        }
        if self.far <= self.near {
            return Err(ConfigError::Invalid(format!(
                "far plane ({}) must lie beyond near plane ({})",
                self.far, self.near
            )));
        }
        Ok(())
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_y_degrees: 50.0,
            near: 0.1,
            far: 100.0,
            start_translation: [0.0, 0.0, -2.5],
        }
    }
}

/// # Engine Configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Default log filter when `RUST_LOG` is unset
    pub log_level: String,
}

impl EngineConfig {
    /// Set log level
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// # Asset Configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetConfig {
    /// Base directory for model files
    pub assets_dir: String,
}

impl AssetConfig {
    /// Set assets directory
    pub fn with_assets_dir(mut self, dir: impl Into<String>) -> Self {
        self.assets_dir = dir.into();
        self
    }
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            assets_dir: "resources/models".to_string(),
        }
    }
}

/// # Complete Application Configuration
///
/// Top-level configuration that applications load at startup.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationConfig {
    /// Engine core configuration
    pub engine: EngineConfig,
    /// Rendering configuration
    pub renderer: RendererConfig,
    /// Camera configuration
    pub camera: CameraConfig,
    /// Asset configuration
    pub assets: AssetConfig,
}

impl ApplicationConfig {
    /// Create a configuration with defaults and the given application name
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            renderer: RendererConfig::new(app_name),
            ..Self::default()
        }
    }

    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.renderer.validate()?;
        self.camera.validate()?;
        if self.assets.assets_dir.is_empty() {
            return Err(ConfigError::Invalid("assets directory cannot be empty".to_string()));
        }
        Ok(())
    }
}

impl Config for ApplicationConfig {}
