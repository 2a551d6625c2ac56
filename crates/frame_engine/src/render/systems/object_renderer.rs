//! Lit mesh rendering

use super::RenderSystem;
use crate::core::config::ShaderConfig;
use crate::foundation::math::Mat4;
use crate::render::descriptors::ShaderStages;
use crate::render::device::{DescriptorSetLayoutHandle, GpuDevice, GraphicsPipeline, RenderPassHandle};
use crate::render::error::RenderResult;
use crate::render::frame::FrameContext;
use crate::render::pipeline::{PipelineConfig, VertexInput};
use crate::render::uniform::GlobalUniformBlock;

/// Per-object push constants
#[repr(C, align(16))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObjectPushConstants {
    /// Object to world transform
    pub model_matrix: Mat4,
    /// Inverse-transpose of the model matrix
    pub normal_matrix: Mat4,
}

unsafe impl bytemuck::Pod for ObjectPushConstants {}
unsafe impl bytemuck::Zeroable for ObjectPushConstants {}

impl ObjectPushConstants {
    const SIZE: u32 = std::mem::size_of::<Self>() as u32;
    const STAGES: ShaderStages = ShaderStages::ALL_GRAPHICS;
}

/// Draws every scene object that has a model
pub struct ObjectRenderSystem {
    pipeline: GraphicsPipeline,
}

impl ObjectRenderSystem {
    /// Build the object pipeline against `render_pass` and the global layout
    pub fn new(
        device: &dyn GpuDevice,
        render_pass: RenderPassHandle,
        global_layout: DescriptorSetLayoutHandle,
        shaders: &ShaderConfig,
    ) -> RenderResult<Self> {
        let config = PipelineConfig::builder("objects")
            .shaders(shaders.clone())
            .vertex_input(VertexInput::Mesh)
            .depth_test(true)
            .push_constant(ObjectPushConstants::STAGES, ObjectPushConstants::SIZE)
            .set_layout(global_layout)
            .build()?;
        let pipeline = device.create_pipeline(&config, render_pass)?;
        log::debug!("Object render system ready: {pipeline:?}");
        Ok(Self { pipeline })
    }

    /// Pipeline used for drawing
    pub fn pipeline(&self) -> GraphicsPipeline {
        self.pipeline
    }
}

impl RenderSystem for ObjectRenderSystem {
    fn name(&self) -> &'static str {
        "objects"
    }

    fn render(&mut self, frame: &mut FrameContext<'_>, _uniforms: &GlobalUniformBlock) -> RenderResult<()> {
        let scene = frame.scene;
        let commands = &mut *frame.commands;

        commands.bind_pipeline(self.pipeline.pipeline);
        commands.bind_descriptor_set(self.pipeline.layout, 0, frame.global_descriptor_set);

        for (_, transform, model) in scene.drawables() {
            let push = ObjectPushConstants {
                model_matrix: transform.to_matrix(),
                normal_matrix: transform.normal_matrix(),
            };
            commands.push_constants(
                self.pipeline.layout,
                ObjectPushConstants::STAGES,
                0,
                bytemuck::bytes_of(&push),
            );
            commands.draw_mesh(model.buffers());
        }
        Ok(())
    }
}
