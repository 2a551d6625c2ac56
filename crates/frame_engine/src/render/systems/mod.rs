//! Render systems
//!
//! Each system contributes to a frame in two phases. During `update` every
//! system may write into the shared [`GlobalUniformBlock`]; the block is
//! then copied to the frame slot and flushed. During `render` systems only
//! read the published block and record draw work. The orchestrator runs
//! the systems in registration order for both phases.

mod object_renderer;
mod point_light;

pub use object_renderer::{ObjectPushConstants, ObjectRenderSystem};
pub use point_light::{PointLightPushConstants, PointLightSystem};

use super::error::RenderResult;
use super::frame::FrameContext;
use super::uniform::GlobalUniformBlock;
use crate::scene::SceneStore;

/// A pass that contributes uniforms and draw work to every frame
pub trait RenderSystem {
    /// Name used in logs
    fn name(&self) -> &'static str;

    /// Check the scene before the loop starts
    fn validate(&self, _scene: &SceneStore) -> RenderResult<()> {
        Ok(())
    }

    /// Write this system's share of the frame's uniforms
    fn update(&mut self, _frame: &FrameContext<'_>, _uniforms: &mut GlobalUniformBlock) -> RenderResult<()> {
        Ok(())
    }

    /// Record draw work for the frame inside the main pass
    fn render(&mut self, frame: &mut FrameContext<'_>, uniforms: &GlobalUniformBlock) -> RenderResult<()>;
}
