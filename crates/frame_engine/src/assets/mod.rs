//! Asset loading
//!
//! Models are parsed from OBJ files and uploaded once through the
//! [`GpuDevice`]; the resulting [`SharedModel`] handles are then attached to
//! any number of scene objects.

pub mod mesh;
pub mod model;
pub mod obj_loader;

pub use mesh::{MeshData, Vertex};
pub use model::{Model, SharedModel};
pub use obj_loader::{ObjError, ObjLoader};

use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

use crate::render::{GpuDevice, RenderError};

/// Asset loading errors
#[derive(Error, Debug)]
pub enum AssetError {
    /// The model file could not be parsed
    #[error("Failed to load model '{path}': {source}")]
    Obj {
        /// File that failed
        path: PathBuf,
        /// Underlying parse error
        source: ObjError,
    },

    /// Uploading the mesh failed
    #[error("Failed to upload model: {0}")]
    Render(#[from] RenderError),
}

/// Source of shareable models
pub trait ModelLoader {
    /// Load the model at `path`
    fn load(&self, path: &Path) -> Result<SharedModel, AssetError>;
}

/// Loads OBJ files relative to a base directory and uploads them
pub struct DeviceModelLoader<'a> {
    device: &'a dyn GpuDevice,
    base_dir: PathBuf,
}

impl<'a> DeviceModelLoader<'a> {
    /// Create a loader that resolves relative paths against `base_dir`
    pub fn new(device: &'a dyn GpuDevice, base_dir: impl Into<PathBuf>) -> Self {
        Self {
            device,
            base_dir: base_dir.into(),
        }
    }

    /// Directory relative paths are resolved against
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }
}

impl ModelLoader for DeviceModelLoader<'_> {
    fn load(&self, path: &Path) -> Result<SharedModel, AssetError> {
        let full_path = self.base_dir.join(path);
        let mesh = ObjLoader::load_obj(&full_path).map_err(|source| AssetError::Obj {
            path: full_path.clone(),
            source,
        })?;
        let buffers = self.device.upload_mesh(&mesh)?;

        let name = path
            .file_stem()
            .map_or_else(|| path.display().to_string(), |stem| stem.to_string_lossy().into_owned());
        log::info!(
            "Loaded model '{}' ({} vertices, {} triangles)",
            name,
            mesh.vertices.len(),
            mesh.triangle_count()
        );
        Ok(Arc::new(Model::new(name, buffers)))
    }
}
