//! CPU-side mesh data

/// Vertex layout consumed by the object pipeline
///
/// `#[repr(C)]` keeps the field offsets stable for the vertex input
/// description: position at 0, color at 12, normal at 24, uv at 36.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vertex {
    /// Position in model space
    pub position: [f32; 3],
    /// Vertex color (white when the file has none)
    pub color: [f32; 3],
    /// Normal vector
    pub normal: [f32; 3],
    /// Texture coordinates
    pub uv: [f32; 2],
}

unsafe impl bytemuck::Zeroable for Vertex {}
unsafe impl bytemuck::Pod for Vertex {}

impl Vertex {
    /// Byte offsets of each attribute, in shader location order
    pub const ATTRIBUTE_OFFSETS: [u32; 4] = [0, 12, 24, 36];

    /// Size of one vertex in bytes
    pub const STRIDE: u32 = std::mem::size_of::<Self>() as u32;
}

/// Vertex and index data ready for upload
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData {
    /// Unique vertices
    pub vertices: Vec<Vertex>,
    /// Triangle list indices into `vertices`; empty for non-indexed meshes
    pub indices: Vec<u32>,
}

impl MeshData {
    /// Create mesh data
    pub fn new(vertices: Vec<Vertex>, indices: Vec<u32>) -> Self {
        Self { vertices, indices }
    }

    /// Whether the mesh draws through an index buffer
    pub fn is_indexed(&self) -> bool {
        !self.indices.is_empty()
    }

    /// Number of triangles
    pub fn triangle_count(&self) -> usize {
        if self.is_indexed() {
            self.indices.len() / 3
        } else {
            self.vertices.len() / 3
        }
    }
}
