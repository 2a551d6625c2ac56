//! GPU-resident models

use std::sync::Arc;

use crate::render::device::MeshBuffers;

/// An uploaded mesh, immutable once created
#[derive(Debug)]
pub struct Model {
    name: String,
    buffers: MeshBuffers,
}

/// Model handle shared between every object drawing it
pub type SharedModel = Arc<Model>;

impl Model {
    /// Wrap uploaded buffers
    pub fn new(name: impl Into<String>, buffers: MeshBuffers) -> Self {
        Self {
            name: name.into(),
            buffers,
        }
    }

    /// Name the model was loaded under
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Device buffers backing the mesh
    pub fn buffers(&self) -> &MeshBuffers {
        &self.buffers
    }
}
