//! Device abstraction
//!
//! The frame core talks to the GPU through [`GpuDevice`]. Handles are plain
//! opaque integers so the core never sees backend types; the Vulkan backend
//! maps them to raw `ash` handles, the headless backend to registry keys.

use bitflags::bitflags;

use super::descriptors::{DescriptorPoolConfig, DescriptorSetLayoutConfig};
use super::error::RenderResult;
use super::pipeline::PipelineConfig;
use crate::assets::MeshData;

macro_rules! device_handle {
    ($($(#[$meta:meta])* $name:ident;)*) => {
        $(
            $(#[$meta])*
            #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
            pub struct $name(pub u64);
        )*
    };
}

device_handle! {
    /// Descriptor set layout
    DescriptorSetLayoutHandle;
    /// Descriptor pool
    DescriptorPoolHandle;
    /// Descriptor set allocated from a pool
    DescriptorSetHandle;
    /// Graphics pipeline
    PipelineHandle;
    /// Pipeline layout
    PipelineLayoutHandle;
    /// Render pass owned by the drawing context
    RenderPassHandle;
    /// Device buffer
    BufferHandle;
}

bitflags! {
    /// How a buffer will be bound
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BufferUsage: u32 {
        /// Uniform buffer
        const UNIFORM = 1 << 0;
        /// Vertex buffer
        const VERTEX = 1 << 1;
        /// Index buffer
        const INDEX = 1 << 2;
    }
}

/// Uploaded mesh buffers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeshBuffers {
    /// Vertex data
    pub vertex_buffer: BufferHandle,
    /// Index data, if the mesh is indexed
    pub index_buffer: Option<BufferHandle>,
    /// Number of vertices
    pub vertex_count: u32,
    /// Number of indices (0 when not indexed)
    pub index_count: u32,
}

/// Buffer range bound to a descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferBinding {
    /// Buffer
    pub buffer: BufferHandle,
    /// Byte offset
    pub offset: u64,
    /// Byte length
    pub range: u64,
}

/// Pipeline plus the layout it was created with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GraphicsPipeline {
    /// Pipeline object
    pub pipeline: PipelineHandle,
    /// Layout for descriptor binds and push constants
    pub layout: PipelineLayoutHandle,
}

/// Host-visible buffer mapped for its whole lifetime
///
/// Memory is treated as non-coherent: bytes written through [`write`]
/// are not guaranteed visible to the device until [`flush`] returns.
/// Dropping the buffer unmaps and frees it.
///
/// [`write`]: MappedBuffer::write
/// [`flush`]: MappedBuffer::flush
pub trait MappedBuffer {
    /// Size in bytes
    fn size(&self) -> u64;

    /// Whole-buffer binding for descriptor writes
    fn binding(&self) -> BufferBinding;

    /// Copy `bytes` into the mapping at `offset`
    fn write(&mut self, offset: u64, bytes: &[u8]) -> RenderResult<()>;

    /// Make every written byte visible to the device
    fn flush(&mut self) -> RenderResult<()>;

    /// Host view of the mapping
    fn mapped(&self) -> &[u8];
}

/// GPU device operations the frame core depends on
pub trait GpuDevice {
    /// Allocate a persistently mapped host-visible buffer
    fn create_host_buffer(&self, size: u64, usage: BufferUsage) -> RenderResult<Box<dyn MappedBuffer>>;

    /// Create a descriptor set layout
    fn create_descriptor_set_layout(
        &self,
        config: &DescriptorSetLayoutConfig,
    ) -> RenderResult<DescriptorSetLayoutHandle>;

    /// Create a descriptor pool
    fn create_descriptor_pool(&self, config: &DescriptorPoolConfig) -> RenderResult<DescriptorPoolHandle>;

    /// Allocate one set with `layout` from `pool`
    fn allocate_descriptor_set(
        &self,
        pool: DescriptorPoolHandle,
        layout: DescriptorSetLayoutHandle,
    ) -> RenderResult<DescriptorSetHandle>;

    /// Point `binding` of `set` at a buffer range
    fn write_descriptor_set(
        &self,
        set: DescriptorSetHandle,
        binding: u32,
        buffer: &BufferBinding,
    ) -> RenderResult<()>;

    /// Build a graphics pipeline compatible with `render_pass`
    fn create_pipeline(
        &self,
        config: &PipelineConfig,
        render_pass: RenderPassHandle,
    ) -> RenderResult<GraphicsPipeline>;

    /// Upload vertex and index data into device buffers
    fn upload_mesh(&self, mesh: &MeshData) -> RenderResult<MeshBuffers>;

    /// Block until the device has finished all submitted work
    fn wait_idle(&self) -> RenderResult<()>;
}
