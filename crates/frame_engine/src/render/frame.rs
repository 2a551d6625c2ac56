//! Per-frame context and drawing-context collaborator traits

use super::camera::Camera;
use super::descriptors::ShaderStages;
use super::device::{
    DescriptorSetHandle, MeshBuffers, PipelineHandle, PipelineLayoutHandle, RenderPassHandle,
};
use super::error::RenderResult;
use crate::scene::SceneStore;

/// Command recording for one frame
///
/// Obtained from [`FrameRenderer::begin_frame`] and handed back through
/// [`FrameRenderer::end_frame`].
pub trait DrawRecorder {
    /// Bind a graphics pipeline
    fn bind_pipeline(&mut self, pipeline: PipelineHandle);

    /// Bind a descriptor set at `set_index`
    fn bind_descriptor_set(
        &mut self,
        layout: PipelineLayoutHandle,
        set_index: u32,
        set: DescriptorSetHandle,
    );

    /// Upload push constant bytes
    fn push_constants(
        &mut self,
        layout: PipelineLayoutHandle,
        stages: ShaderStages,
        offset: u32,
        bytes: &[u8],
    );

    /// Non-indexed draw
    fn draw(&mut self, vertex_count: u32, instance_count: u32, first_vertex: u32, first_instance: u32);

    /// Bind a mesh's buffers and draw it
    fn draw_mesh(&mut self, mesh: &MeshBuffers);
}

/// The drawing context: swapchain, render pass and frame pacing
///
/// `begin_frame` blocks until the slot it hands out has no GPU work in
/// flight, so slot resources can be rewritten as soon as it returns.
pub trait FrameRenderer {
    /// Render pass pipelines must be compatible with
    fn render_pass(&self) -> RenderPassHandle;

    /// Number of frame slots
    fn max_frames_in_flight(&self) -> usize;

    /// Current surface width over height
    fn aspect_ratio(&self) -> f32;

    /// Report the window's drawable size
    ///
    /// Called before [`aspect_ratio`](Self::aspect_ratio) on every
    /// iteration. A zero dimension means the surface is minimized and
    /// `begin_frame` must return `Ok(None)` until it grows again.
    fn set_extent(&mut self, width: u32, height: u32);

    /// Acquire the next image
    ///
    /// `Ok(None)` means no frame can be produced this iteration (for
    /// example while the surface is being recreated); the caller skips it.
    fn begin_frame(&mut self) -> RenderResult<Option<Box<dyn DrawRecorder>>>;

    /// Slot index of the frame in progress, in `[0, max_frames_in_flight)`
    fn frame_index(&self) -> usize;

    /// Begin the main render pass
    fn begin_pass(&mut self, commands: &mut dyn DrawRecorder) -> RenderResult<()>;

    /// End the main render pass
    fn end_pass(&mut self, commands: &mut dyn DrawRecorder) -> RenderResult<()>;

    /// Submit and present, advancing to the next slot
    fn end_frame(&mut self, commands: Box<dyn DrawRecorder>) -> RenderResult<()>;
}

/// Everything a render system sees for one frame
///
/// Built by the orchestrator each iteration and dropped before the next.
pub struct FrameContext<'a> {
    /// Slot index
    pub frame_index: usize,
    /// Seconds since the previous rendered frame
    pub frame_time: f32,
    /// Command recorder for this frame
    pub commands: &'a mut dyn DrawRecorder,
    /// Camera for this frame
    pub camera: &'a Camera,
    /// Global descriptor set bound to this slot's uniform buffer
    pub global_descriptor_set: DescriptorSetHandle,
    /// Scene being drawn
    pub scene: &'a SceneStore,
}
