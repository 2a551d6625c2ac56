//! Command buffer recording

use ash::vk::Handle;
use ash::{vk, Device};

use super::descriptor_set::stage_flags;
use crate::render::descriptors::ShaderStages;
use crate::render::device::{DescriptorSetHandle, MeshBuffers, PipelineHandle, PipelineLayoutHandle};
use crate::render::frame::DrawRecorder;

/// Records into a primary command buffer that is already in the recording state
///
/// The drawing context begins and ends the buffer and the render pass;
/// this type only issues the commands render systems ask for.
pub struct VulkanCommandRecorder {
    device: Device,
    command_buffer: vk::CommandBuffer,
}

impl VulkanCommandRecorder {
    /// Wrap a command buffer in the recording state
    pub fn new(device: Device, command_buffer: vk::CommandBuffer) -> Self {
        Self { device, command_buffer }
    }

    /// Command buffer being recorded
    pub fn command_buffer(&self) -> vk::CommandBuffer {
        self.command_buffer
    }
}

impl DrawRecorder for VulkanCommandRecorder {
    fn bind_pipeline(&mut self, pipeline: PipelineHandle) {
        unsafe {
            self.device.cmd_bind_pipeline(
                self.command_buffer,
                vk::PipelineBindPoint::GRAPHICS,
                vk::Pipeline::from_raw(pipeline.0),
            );
        }
    }

    fn bind_descriptor_set(&mut self, layout: PipelineLayoutHandle, set_index: u32, set: DescriptorSetHandle) {
        unsafe {
            self.device.cmd_bind_descriptor_sets(
                self.command_buffer,
                vk::PipelineBindPoint::GRAPHICS,
                vk::PipelineLayout::from_raw(layout.0),
                set_index,
                &[vk::DescriptorSet::from_raw(set.0)],
                &[],
            );
        }
    }

    fn push_constants(&mut self, layout: PipelineLayoutHandle, stages: ShaderStages, offset: u32, bytes: &[u8]) {
        unsafe {
            self.device.cmd_push_constants(
                self.command_buffer,
                vk::PipelineLayout::from_raw(layout.0),
                stage_flags(stages),
                offset,
                bytes,
            );
        }
    }

    fn draw(&mut self, vertex_count: u32, instance_count: u32, first_vertex: u32, first_instance: u32) {
        unsafe {
            self.device
                .cmd_draw(self.command_buffer, vertex_count, instance_count, first_vertex, first_instance);
        }
    }

    fn draw_mesh(&mut self, mesh: &MeshBuffers) {
        unsafe {
            self.device.cmd_bind_vertex_buffers(
                self.command_buffer,
                0,
                &[vk::Buffer::from_raw(mesh.vertex_buffer.0)],
                &[0],
            );
            match mesh.index_buffer {
                Some(index_buffer) => {
                    self.device.cmd_bind_index_buffer(
                        self.command_buffer,
                        vk::Buffer::from_raw(index_buffer.0),
                        0,
                        vk::IndexType::UINT32,
                    );
                    self.device.cmd_draw_indexed(self.command_buffer, mesh.index_count, 1, 0, 0, 0);
                }
                None => self.device.cmd_draw(self.command_buffer, mesh.vertex_count, 1, 0, 0),
            }
        }
    }
}
