//! [`GpuDevice`] over an `ash` logical device
//!
//! Every object the device creates is recorded here and destroyed when the
//! device is dropped, after the GPU has gone idle. Engine handles carry the
//! raw Vulkan handle values.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use ash::vk::Handle;
use ash::{vk, Device};

use super::buffer::HostVisibleBuffer;
use super::context::VulkanContext;
use super::{descriptor_set, pipeline, VulkanError};
use crate::assets::MeshData;
use crate::render::descriptors::{DescriptorPoolConfig, DescriptorSetLayoutConfig};
use crate::render::device::{
    BufferBinding, BufferHandle, BufferUsage, DescriptorPoolHandle, DescriptorSetHandle,
    DescriptorSetLayoutHandle, GpuDevice, GraphicsPipeline, MappedBuffer, MeshBuffers,
    PipelineHandle, PipelineLayoutHandle, RenderPassHandle,
};
use crate::render::error::{RenderError, RenderResult};
use crate::render::pipeline::PipelineConfig;

#[derive(Default)]
struct OwnedObjects {
    set_layouts: Vec<vk::DescriptorSetLayout>,
    pools: Vec<vk::DescriptorPool>,
    pipelines: Vec<(vk::Pipeline, vk::PipelineLayout)>,
    mesh_buffers: HashMap<u64, HostVisibleBuffer>,
}

/// Vulkan implementation of [`GpuDevice`]
pub struct VulkanDevice {
    device: Device,
    owned: RefCell<OwnedObjects>,
    context: Rc<VulkanContext>,
}

impl VulkanDevice {
    /// Create resources on the context's logical device
    pub fn new(context: Rc<VulkanContext>) -> Self {
        Self {
            device: context.device().clone(),
            owned: RefCell::new(OwnedObjects::default()),
            context,
        }
    }

    /// Underlying logical device
    pub fn raw(&self) -> &Device {
        &self.device
    }

    fn host_buffer(&self, size: u64, usage: BufferUsage) -> RenderResult<HostVisibleBuffer> {
        HostVisibleBuffer::new(
            self.device.clone(),
            self.context.instance(),
            self.context.physical_device(),
            size,
            usage,
        )
    }

    fn upload(&self, bytes: &[u8], usage: BufferUsage) -> RenderResult<BufferHandle> {
        let mut buffer = self.host_buffer(bytes.len() as u64, usage)?;
        buffer.write(0, bytes)?;
        buffer.flush()?;
        let handle = buffer.binding().buffer;
        self.owned.borrow_mut().mesh_buffers.insert(handle.0, buffer);
        Ok(handle)
    }
}

impl GpuDevice for VulkanDevice {
    fn create_host_buffer(&self, size: u64, usage: BufferUsage) -> RenderResult<Box<dyn MappedBuffer>> {
        Ok(Box::new(self.host_buffer(size, usage)?))
    }

    fn create_descriptor_set_layout(
        &self,
        config: &DescriptorSetLayoutConfig,
    ) -> RenderResult<DescriptorSetLayoutHandle> {
        let layout = descriptor_set::create_layout(&self.device, config)?;
        self.owned.borrow_mut().set_layouts.push(layout);
        Ok(DescriptorSetLayoutHandle(layout.as_raw()))
    }

    fn create_descriptor_pool(&self, config: &DescriptorPoolConfig) -> RenderResult<DescriptorPoolHandle> {
        let pool = descriptor_set::create_pool(&self.device, config)?;
        self.owned.borrow_mut().pools.push(pool);
        Ok(DescriptorPoolHandle(pool.as_raw()))
    }

    fn allocate_descriptor_set(
        &self,
        pool: DescriptorPoolHandle,
        layout: DescriptorSetLayoutHandle,
    ) -> RenderResult<DescriptorSetHandle> {
        let set = descriptor_set::allocate_set(
            &self.device,
            vk::DescriptorPool::from_raw(pool.0),
            vk::DescriptorSetLayout::from_raw(layout.0),
        )?;
        Ok(DescriptorSetHandle(set.as_raw()))
    }

    fn write_descriptor_set(
        &self,
        set: DescriptorSetHandle,
        binding: u32,
        buffer: &BufferBinding,
    ) -> RenderResult<()> {
        if buffer.range == 0 {
            return Err(RenderError::InvalidConfiguration(
                "descriptor buffer range must be non-zero".to_string(),
            ));
        }
        descriptor_set::write_uniform_buffer(
            &self.device,
            vk::DescriptorSet::from_raw(set.0),
            binding,
            vk::Buffer::from_raw(buffer.buffer.0),
            buffer.offset,
            buffer.range,
        );
        Ok(())
    }

    fn create_pipeline(
        &self,
        config: &PipelineConfig,
        render_pass: RenderPassHandle,
    ) -> RenderResult<GraphicsPipeline> {
        let (pipeline, layout) =
            pipeline::create_graphics_pipeline(&self.device, config, vk::RenderPass::from_raw(render_pass.0))?;
        self.owned.borrow_mut().pipelines.push((pipeline, layout));
        Ok(GraphicsPipeline {
            pipeline: PipelineHandle(pipeline.as_raw()),
            layout: PipelineLayoutHandle(layout.as_raw()),
        })
    }

    fn upload_mesh(&self, mesh: &MeshData) -> RenderResult<MeshBuffers> {
        if mesh.vertices.is_empty() {
            return Err(RenderError::InvalidConfiguration("mesh has no vertices".to_string()));
        }
        let vertex_buffer = self.upload(bytemuck::cast_slice(&mesh.vertices), BufferUsage::VERTEX)?;
        let index_buffer = if mesh.is_indexed() {
            Some(self.upload(bytemuck::cast_slice(&mesh.indices), BufferUsage::INDEX)?)
        } else {
            None
        };

        Ok(MeshBuffers {
            vertex_buffer,
            index_buffer,
            vertex_count: mesh.vertices.len() as u32,
            index_count: mesh.indices.len() as u32,
        })
    }

    fn wait_idle(&self) -> RenderResult<()> {
        let idle = unsafe { self.device.device_wait_idle() };
        idle.map_err(|e| VulkanError::Api(e).into())
    }
}

impl Drop for VulkanDevice {
    fn drop(&mut self) {
        if let Err(e) = unsafe { self.device.device_wait_idle() } {
            log::warn!("device_wait_idle failed during teardown: {e:?}");
        }

        let owned = self.owned.get_mut();
        owned.mesh_buffers.clear();
        unsafe {
            for (pipeline, layout) in owned.pipelines.drain(..) {
                self.device.destroy_pipeline(pipeline, None);
                self.device.destroy_pipeline_layout(layout, None);
            }
            for pool in owned.pools.drain(..) {
                self.device.destroy_descriptor_pool(pool, None);
            }
            for layout in owned.set_layouts.drain(..) {
                self.device.destroy_descriptor_set_layout(layout, None);
            }
        }
        log::debug!("Vulkan device resources released");
    }
}
