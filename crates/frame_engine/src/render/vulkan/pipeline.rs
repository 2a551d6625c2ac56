//! SPIR-V shader modules and graphics pipeline creation

use std::ffi::CStr;
use std::io::Cursor;
use std::path::Path;

use ash::vk::Handle;
use ash::{vk, Device};

use super::descriptor_set::stage_flags;
use super::{VulkanError, VulkanResult};
use crate::assets::Vertex;
use crate::render::error::{RenderError, RenderResult};
use crate::render::pipeline::{PipelineConfig, VertexInput};

const ENTRY_POINT: &CStr = unsafe { CStr::from_bytes_with_nul_unchecked(b"main\0") };

/// Shader module destroyed on drop
pub struct ShaderModule {
    device: Device,
    module: vk::ShaderModule,
}

impl ShaderModule {
    /// Create a module from SPIR-V words
    pub fn from_spirv(device: Device, code: &[u32]) -> VulkanResult<Self> {
        let create_info = vk::ShaderModuleCreateInfo::builder().code(code);
        let module = unsafe {
            device
                .create_shader_module(&create_info, None)
                .map_err(VulkanError::Api)?
        };
        Ok(Self { device, module })
    }

    /// Load a module from a SPIR-V file
    pub fn from_file(device: Device, path: &Path) -> RenderResult<Self> {
        let shader_load = |source| RenderError::ShaderLoad {
            path: path.to_path_buf(),
            source,
        };
        let bytes = std::fs::read(path).map_err(shader_load)?;
        let code = ash::util::read_spv(&mut Cursor::new(&bytes)).map_err(shader_load)?;
        let module = Self::from_spirv(device, &code)?;
        log::debug!("Loaded shader module {}", path.display());
        Ok(module)
    }

    /// Raw module handle
    pub fn handle(&self) -> vk::ShaderModule {
        self.module
    }

    fn stage_info(&self, stage: vk::ShaderStageFlags) -> vk::PipelineShaderStageCreateInfo {
        vk::PipelineShaderStageCreateInfo::builder()
            .stage(stage)
            .module(self.module)
            .name(ENTRY_POINT)
            .build()
    }
}

impl Drop for ShaderModule {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_shader_module(self.module, None);
        }
    }
}

/// Vertex input description for the interleaved mesh layout
pub(crate) fn mesh_vertex_input() -> (
    [vk::VertexInputBindingDescription; 1],
    [vk::VertexInputAttributeDescription; 4],
) {
    let binding = vk::VertexInputBindingDescription {
        binding: 0,
        stride: Vertex::STRIDE,
        input_rate: vk::VertexInputRate::VERTEX,
    };
    let formats = [
        vk::Format::R32G32B32_SFLOAT,
        vk::Format::R32G32B32_SFLOAT,
        vk::Format::R32G32B32_SFLOAT,
        vk::Format::R32G32_SFLOAT,
    ];
    let mut attributes = [vk::VertexInputAttributeDescription::default(); 4];
    for (location, attribute) in attributes.iter_mut().enumerate() {
        *attribute = vk::VertexInputAttributeDescription {
            location: location as u32,
            binding: 0,
            format: formats[location],
            offset: Vertex::ATTRIBUTE_OFFSETS[location],
        };
    }
    ([binding], attributes)
}

/// Build the pipeline layout and pipeline described by `config`
///
/// Viewport and scissor are dynamic state, so the pipeline survives
/// surface resizes as long as the render pass stays compatible.
pub fn create_graphics_pipeline(
    device: &Device,
    config: &PipelineConfig,
    render_pass: vk::RenderPass,
) -> RenderResult<(vk::Pipeline, vk::PipelineLayout)> {
    let shaders = config.shaders();
    let vertex_shader = ShaderModule::from_file(device.clone(), Path::new(&shaders.vertex_shader_path))?;
    let fragment_shader = ShaderModule::from_file(device.clone(), Path::new(&shaders.fragment_shader_path))?;

    let shader_stages = [
        vertex_shader.stage_info(vk::ShaderStageFlags::VERTEX),
        fragment_shader.stage_info(vk::ShaderStageFlags::FRAGMENT),
    ];

    let (bindings, attributes) = mesh_vertex_input();
    let vertex_input_info = match config.vertex_input() {
        VertexInput::Mesh => vk::PipelineVertexInputStateCreateInfo::builder()
            .vertex_binding_descriptions(&bindings)
            .vertex_attribute_descriptions(&attributes),
        VertexInput::None => vk::PipelineVertexInputStateCreateInfo::builder(),
    };

    let input_assembly = vk::PipelineInputAssemblyStateCreateInfo::builder()
        .topology(vk::PrimitiveTopology::TRIANGLE_LIST)
        .primitive_restart_enable(false);

    let viewport_state = vk::PipelineViewportStateCreateInfo::builder()
        .viewport_count(1)
        .scissor_count(1);

    let rasterizer = vk::PipelineRasterizationStateCreateInfo::builder()
        .depth_clamp_enable(false)
        .rasterizer_discard_enable(false)
        .polygon_mode(vk::PolygonMode::FILL)
        .line_width(1.0)
        .cull_mode(vk::CullModeFlags::NONE)
        .front_face(vk::FrontFace::CLOCKWISE)
        .depth_bias_enable(false);

    let multisampling = vk::PipelineMultisampleStateCreateInfo::builder()
        .sample_shading_enable(false)
        .rasterization_samples(vk::SampleCountFlags::TYPE_1);

    let depth_stencil = vk::PipelineDepthStencilStateCreateInfo::builder()
        .depth_test_enable(config.depth_test())
        .depth_write_enable(config.depth_test())
        .depth_compare_op(vk::CompareOp::LESS)
        .depth_bounds_test_enable(false)
        .stencil_test_enable(false);

    let color_blend_attachment = if config.alpha_blend() {
        vk::PipelineColorBlendAttachmentState::builder()
            .color_write_mask(vk::ColorComponentFlags::RGBA)
            .blend_enable(true)
            .src_color_blend_factor(vk::BlendFactor::SRC_ALPHA)
            .dst_color_blend_factor(vk::BlendFactor::ONE_MINUS_SRC_ALPHA)
            .color_blend_op(vk::BlendOp::ADD)
            .src_alpha_blend_factor(vk::BlendFactor::ONE)
            .dst_alpha_blend_factor(vk::BlendFactor::ZERO)
            .alpha_blend_op(vk::BlendOp::ADD)
            .build()
    } else {
        vk::PipelineColorBlendAttachmentState::builder()
            .color_write_mask(vk::ColorComponentFlags::RGBA)
            .blend_enable(false)
            .build()
    };
    let color_blend_attachments = [color_blend_attachment];
    let color_blending = vk::PipelineColorBlendStateCreateInfo::builder()
        .logic_op_enable(false)
        .attachments(&color_blend_attachments);

    let dynamic_states = [vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR];
    let dynamic_state = vk::PipelineDynamicStateCreateInfo::builder().dynamic_states(&dynamic_states);

    let push_constant_ranges: Vec<vk::PushConstantRange> = config
        .push_constants()
        .map(|range| vk::PushConstantRange {
            stage_flags: stage_flags(range.stages),
            offset: range.offset,
            size: range.size,
        })
        .into_iter()
        .collect();
    let set_layouts: Vec<vk::DescriptorSetLayout> = config
        .set_layouts()
        .iter()
        .map(|layout| vk::DescriptorSetLayout::from_raw(layout.0))
        .collect();

    let layout_info = vk::PipelineLayoutCreateInfo::builder()
        .set_layouts(&set_layouts)
        .push_constant_ranges(&push_constant_ranges);
    let layout = unsafe {
        device
            .create_pipeline_layout(&layout_info, None)
            .map_err(VulkanError::Api)?
    };

    let pipeline_info = vk::GraphicsPipelineCreateInfo::builder()
        .stages(&shader_stages)
        .vertex_input_state(&vertex_input_info)
        .input_assembly_state(&input_assembly)
        .viewport_state(&viewport_state)
        .rasterization_state(&rasterizer)
        .multisample_state(&multisampling)
        .depth_stencil_state(&depth_stencil)
        .color_blend_state(&color_blending)
        .dynamic_state(&dynamic_state)
        .layout(layout)
        .render_pass(render_pass)
        .subpass(0);

    let pipelines = unsafe {
        device.create_graphics_pipelines(vk::PipelineCache::null(), &[pipeline_info.build()], None)
    };
    match pipelines {
        Ok(pipelines) => match pipelines.first() {
            Some(&pipeline) => {
                log::info!("Created pipeline '{}'", config.name());
                Ok((pipeline, layout))
            }
            None => {
                unsafe { device.destroy_pipeline_layout(layout, None) };
                Err(VulkanError::InitializationFailed(format!("no pipeline returned for '{}'", config.name())).into())
            }
        },
        Err((_, err)) => {
            unsafe { device.destroy_pipeline_layout(layout, None) };
            Err(VulkanError::Api(err).into())
        }
    }
}
