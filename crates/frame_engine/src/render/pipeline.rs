//! Graphics pipeline descriptions
//!
//! [`PipelineConfig`] captures everything the render systems vary between
//! their pipelines. Fixed state shared by all of them (triangle lists,
//! dynamic viewport and scissor, single-sample) lives in the backend.

use crate::core::config::ShaderConfig;

use super::descriptors::ShaderStages;
use super::device::DescriptorSetLayoutHandle;
use super::error::{RenderError, RenderResult};

/// Largest push constant block every Vulkan implementation must accept
pub const MAX_PUSH_CONSTANT_SIZE: u32 = 128;

/// Vertex input the pipeline expects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VertexInput {
    /// Interleaved [`Vertex`](crate::assets::Vertex) buffer at binding 0
    Mesh,
    /// Vertices generated in the shader from `gl_VertexIndex`
    None,
}

/// Push constant range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PushConstantRange {
    /// Stages reading the range
    pub stages: ShaderStages,
    /// Byte offset
    pub offset: u32,
    /// Byte size
    pub size: u32,
}

/// Immutable pipeline description
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    name: String,
    shaders: ShaderConfig,
    vertex_input: VertexInput,
    depth_test: bool,
    alpha_blend: bool,
    push_constants: Option<PushConstantRange>,
    set_layouts: Vec<DescriptorSetLayoutHandle>,
}

impl PipelineConfig {
    /// Start building a pipeline named `name`
    pub fn builder(name: impl Into<String>) -> PipelineConfigBuilder {
        PipelineConfigBuilder {
            name: name.into(),
            shaders: None,
            vertex_input: VertexInput::Mesh,
            depth_test: true,
            alpha_blend: false,
            push_constants: None,
            set_layouts: Vec::new(),
        }
    }

    /// Debug name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Shader pair
    pub fn shaders(&self) -> &ShaderConfig {
        &self.shaders
    }

    /// Vertex input kind
    pub fn vertex_input(&self) -> VertexInput {
        self.vertex_input
    }

    /// Whether depth testing and writing are enabled
    pub fn depth_test(&self) -> bool {
        self.depth_test
    }

    /// Whether source-alpha blending is enabled
    pub fn alpha_blend(&self) -> bool {
        self.alpha_blend
    }

    /// Push constant range, if any
    pub fn push_constants(&self) -> Option<PushConstantRange> {
        self.push_constants
    }

    /// Descriptor set layouts in set order
    pub fn set_layouts(&self) -> &[DescriptorSetLayoutHandle] {
        &self.set_layouts
    }
}

/// Builder for [`PipelineConfig`]
#[derive(Debug, Clone)]
pub struct PipelineConfigBuilder {
    name: String,
    shaders: Option<ShaderConfig>,
    vertex_input: VertexInput,
    depth_test: bool,
    alpha_blend: bool,
    push_constants: Option<PushConstantRange>,
    set_layouts: Vec<DescriptorSetLayoutHandle>,
}

impl PipelineConfigBuilder {
    /// Set the shader pair
    pub fn shaders(mut self, shaders: ShaderConfig) -> Self {
        self.shaders = Some(shaders);
        self
    }

    /// Set the vertex input kind
    pub fn vertex_input(mut self, input: VertexInput) -> Self {
        self.vertex_input = input;
        self
    }

    /// Enable or disable depth testing
    pub fn depth_test(mut self, enabled: bool) -> Self {
        self.depth_test = enabled;
        self
    }

    /// Enable or disable alpha blending
    pub fn alpha_blend(mut self, enabled: bool) -> Self {
        self.alpha_blend = enabled;
        self
    }

    /// Declare a push constant block of `size` bytes at offset 0
    pub fn push_constant(mut self, stages: ShaderStages, size: u32) -> Self {
        self.push_constants = Some(PushConstantRange { stages, offset: 0, size });
        self
    }

    /// Append a descriptor set layout
    pub fn set_layout(mut self, layout: DescriptorSetLayoutHandle) -> Self {
        self.set_layouts.push(layout);
        self
    }

    /// Validate and freeze the description
    pub fn build(self) -> RenderResult<PipelineConfig> {
        let shaders = self.shaders.ok_or_else(|| {
            RenderError::InvalidConfiguration(format!("pipeline '{}' has no shaders", self.name))
        })?;
        shaders
            .validate()
            .map_err(|e| RenderError::InvalidConfiguration(format!("pipeline '{}': {e}", self.name)))?;

        if let Some(range) = self.push_constants {
            if range.size == 0 || range.size % 4 != 0 || range.size > MAX_PUSH_CONSTANT_SIZE {
                return Err(RenderError::InvalidConfiguration(format!(
                    "pipeline '{}': push constant size {} must be a non-zero multiple of 4 up to {}",
                    self.name, range.size, MAX_PUSH_CONSTANT_SIZE
                )));
            }
            if range.stages.is_empty() {
                return Err(RenderError::InvalidConfiguration(format!(
                    "pipeline '{}': push constants must be visible to a stage",
                    self.name
                )));
            }
        }

        Ok(PipelineConfig {
            name: self.name,
            shaders,
            vertex_input: self.vertex_input,
            depth_test: self.depth_test,
            alpha_blend: self.alpha_blend,
            push_constants: self.push_constants,
            set_layouts: self.set_layouts,
        })
    }
}
