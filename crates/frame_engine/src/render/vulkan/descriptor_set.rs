//! Descriptor layouts, pools and writes

use ash::{vk, Device};

use super::{VulkanError, VulkanResult};
use crate::render::descriptors::{DescriptorPoolConfig, DescriptorSetLayoutConfig, DescriptorType, ShaderStages};

/// Vulkan stage flags for engine shader stages
pub(crate) fn stage_flags(stages: ShaderStages) -> vk::ShaderStageFlags {
    let mut flags = vk::ShaderStageFlags::empty();
    if stages.contains(ShaderStages::VERTEX) {
        flags |= vk::ShaderStageFlags::VERTEX;
    }
    if stages.contains(ShaderStages::FRAGMENT) {
        flags |= vk::ShaderStageFlags::FRAGMENT;
    }
    flags
}

pub(crate) fn descriptor_type(descriptor_type: DescriptorType) -> vk::DescriptorType {
    match descriptor_type {
        DescriptorType::UniformBuffer => vk::DescriptorType::UNIFORM_BUFFER,
        DescriptorType::StorageBuffer => vk::DescriptorType::STORAGE_BUFFER,
    }
}

/// Create a layout from a validated config
pub fn create_layout(device: &Device, config: &DescriptorSetLayoutConfig) -> VulkanResult<vk::DescriptorSetLayout> {
    let bindings: Vec<vk::DescriptorSetLayoutBinding> = config
        .bindings()
        .iter()
        .map(|binding| {
            vk::DescriptorSetLayoutBinding::builder()
                .binding(binding.binding)
                .descriptor_type(descriptor_type(binding.descriptor_type))
                .descriptor_count(binding.count)
                .stage_flags(stage_flags(binding.stages))
                .build()
        })
        .collect();

    let layout_info = vk::DescriptorSetLayoutCreateInfo::builder().bindings(&bindings);
    unsafe {
        device
            .create_descriptor_set_layout(&layout_info, None)
            .map_err(VulkanError::Api)
    }
}

/// Create a pool from a validated config
pub fn create_pool(device: &Device, config: &DescriptorPoolConfig) -> VulkanResult<vk::DescriptorPool> {
    let pool_sizes: Vec<vk::DescriptorPoolSize> = config
        .pool_sizes()
        .iter()
        .map(|size| vk::DescriptorPoolSize {
            ty: descriptor_type(size.descriptor_type),
            descriptor_count: size.count,
        })
        .collect();

    let pool_info = vk::DescriptorPoolCreateInfo::builder()
        .pool_sizes(&pool_sizes)
        .max_sets(config.max_sets());
    unsafe { device.create_descriptor_pool(&pool_info, None).map_err(VulkanError::Api) }
}

/// Allocate a single set
pub fn allocate_set(
    device: &Device,
    pool: vk::DescriptorPool,
    layout: vk::DescriptorSetLayout,
) -> VulkanResult<vk::DescriptorSet> {
    let layouts = [layout];
    let alloc_info = vk::DescriptorSetAllocateInfo::builder()
        .descriptor_pool(pool)
        .set_layouts(&layouts);

    let sets = unsafe { device.allocate_descriptor_sets(&alloc_info).map_err(VulkanError::Api)? };
    sets.into_iter()
        .next()
        .ok_or_else(|| VulkanError::InitializationFailed("descriptor pool returned no set".to_string()))
}

/// Point a uniform buffer binding at a buffer range
pub fn write_uniform_buffer(
    device: &Device,
    set: vk::DescriptorSet,
    binding: u32,
    buffer: vk::Buffer,
    offset: vk::DeviceSize,
    range: vk::DeviceSize,
) {
    let buffer_info = [vk::DescriptorBufferInfo {
        buffer,
        offset,
        range,
    }];
    let write = vk::WriteDescriptorSet::builder()
        .dst_set(set)
        .dst_binding(binding)
        .dst_array_element(0)
        .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
        .buffer_info(&buffer_info)
        .build();
    unsafe { device.update_descriptor_sets(&[write], &[]) };
}
