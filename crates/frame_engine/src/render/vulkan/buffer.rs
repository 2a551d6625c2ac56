//! Persistently mapped host-visible buffers
//!
//! Memory is mapped once at creation and stays mapped until drop. The
//! memory type is only required to be `HOST_VISIBLE`, so every write must
//! be followed by a flush before the device reads it.

use ash::vk::Handle;
use ash::{vk, Device, Instance};

use super::{VulkanError, VulkanResult};
use crate::render::device::{BufferBinding, BufferHandle, BufferUsage, MappedBuffer};
use crate::render::error::{RenderError, RenderResult};

/// Vulkan buffer usage flags for an engine usage
pub(crate) fn usage_flags(usage: BufferUsage) -> vk::BufferUsageFlags {
    let mut flags = vk::BufferUsageFlags::empty();
    if usage.contains(BufferUsage::UNIFORM) {
        flags |= vk::BufferUsageFlags::UNIFORM_BUFFER;
    }
    if usage.contains(BufferUsage::VERTEX) {
        flags |= vk::BufferUsageFlags::VERTEX_BUFFER;
    }
    if usage.contains(BufferUsage::INDEX) {
        flags |= vk::BufferUsageFlags::INDEX_BUFFER;
    }
    flags
}

/// Find a memory type allowed by `type_filter` with all of `properties`
pub(crate) fn find_memory_type(
    memory_properties: &vk::PhysicalDeviceMemoryProperties,
    type_filter: u32,
    properties: vk::MemoryPropertyFlags,
) -> VulkanResult<u32> {
    (0..memory_properties.memory_type_count)
        .find(|&i| {
            (type_filter & (1 << i)) != 0
                && memory_properties.memory_types[i as usize]
                    .property_flags
                    .contains(properties)
        })
        .ok_or(VulkanError::NoSuitableMemoryType {
            type_filter,
            properties,
        })
}

fn map_allocation_error(error: vk::Result, requested: u64) -> RenderError {
    match error {
        vk::Result::ERROR_OUT_OF_DEVICE_MEMORY | vk::Result::ERROR_OUT_OF_HOST_MEMORY => {
            RenderError::OutOfDeviceMemory { requested }
        }
        other => VulkanError::Api(other).into(),
    }
}

/// Buffer plus its dedicated host-visible allocation
pub struct HostVisibleBuffer {
    device: Device,
    buffer: vk::Buffer,
    memory: vk::DeviceMemory,
    size: vk::DeviceSize,
    mapped: *mut u8,
}

impl HostVisibleBuffer {
    /// Create, allocate, bind and map a buffer of `size` bytes
    pub fn new(
        device: Device,
        instance: &Instance,
        physical_device: vk::PhysicalDevice,
        size: vk::DeviceSize,
        usage: BufferUsage,
    ) -> RenderResult<Self> {
        if size == 0 {
            return Err(RenderError::InvalidConfiguration(
                "buffer size must be non-zero".to_string(),
            ));
        }

        let buffer_info = vk::BufferCreateInfo::builder()
            .size(size)
            .usage(usage_flags(usage))
            .sharing_mode(vk::SharingMode::EXCLUSIVE);

        let buffer = unsafe {
            device
                .create_buffer(&buffer_info, None)
                .map_err(|e| map_allocation_error(e, size))?
        };

        let requirements = unsafe { device.get_buffer_memory_requirements(buffer) };
        let memory_properties = unsafe { instance.get_physical_device_memory_properties(physical_device) };

        let allocate = || -> RenderResult<(vk::DeviceMemory, *mut u8)> {
            let memory_type_index = find_memory_type(
                &memory_properties,
                requirements.memory_type_bits,
                vk::MemoryPropertyFlags::HOST_VISIBLE,
            )?;
            let alloc_info = vk::MemoryAllocateInfo::builder()
                .allocation_size(requirements.size)
                .memory_type_index(memory_type_index);

            let memory = unsafe {
                device
                    .allocate_memory(&alloc_info, None)
                    .map_err(|e| map_allocation_error(e, requirements.size))?
            };

            let mapped = unsafe {
                device
                    .bind_buffer_memory(buffer, memory, 0)
                    .and_then(|()| device.map_memory(memory, 0, vk::WHOLE_SIZE, vk::MemoryMapFlags::empty()))
            };
            match mapped {
                Ok(ptr) => Ok((memory, ptr.cast::<u8>())),
                Err(e) => {
                    unsafe { device.free_memory(memory, None) };
                    Err(VulkanError::Api(e).into())
                }
            }
        };

        match allocate() {
            Ok((memory, mapped)) => Ok(Self {
                device,
                buffer,
                memory,
                size,
                mapped,
            }),
            Err(e) => {
                unsafe { device.destroy_buffer(buffer, None) };
                Err(e)
            }
        }
    }

    /// Raw buffer handle
    pub fn handle(&self) -> vk::Buffer {
        self.buffer
    }
}

impl MappedBuffer for HostVisibleBuffer {
    fn size(&self) -> u64 {
        self.size
    }

    fn binding(&self) -> BufferBinding {
        BufferBinding {
            buffer: BufferHandle(self.buffer.as_raw()),
            offset: 0,
            range: self.size,
        }
    }

    fn write(&mut self, offset: u64, bytes: &[u8]) -> RenderResult<()> {
        let len = bytes.len() as u64;
        if offset.checked_add(len).map_or(true, |end| end > self.size) {
            return Err(RenderError::BufferOverflow {
                offset,
                len,
                size: self.size,
            });
        }
        // Bounds checked above; the mapping spans the whole buffer
        unsafe {
            std::ptr::copy_nonoverlapping(bytes.as_ptr(), self.mapped.add(offset as usize), bytes.len());
        }
        Ok(())
    }

    fn flush(&mut self) -> RenderResult<()> {
        let range = vk::MappedMemoryRange::builder()
            .memory(self.memory)
            .offset(0)
            .size(vk::WHOLE_SIZE)
            .build();
        unsafe {
            self.device
                .flush_mapped_memory_ranges(&[range])
                .map_err(VulkanError::Api)?;
        }
        Ok(())
    }

    fn mapped(&self) -> &[u8] {
        unsafe { std::slice::from_raw_parts(self.mapped, self.size as usize) }
    }
}

impl Drop for HostVisibleBuffer {
    fn drop(&mut self) {
        unsafe {
            self.device.unmap_memory(self.memory);
            self.device.destroy_buffer(self.buffer, None);
            self.device.free_memory(self.memory, None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_properties(flags: &[vk::MemoryPropertyFlags]) -> vk::PhysicalDeviceMemoryProperties {
        let mut properties = vk::PhysicalDeviceMemoryProperties {
            memory_type_count: flags.len() as u32,
            ..Default::default()
        };
        for (i, &property_flags) in flags.iter().enumerate() {
            properties.memory_types[i] = vk::MemoryType {
                property_flags,
                heap_index: 0,
            };
        }
        properties
    }

    #[test]
    fn test_find_memory_type_respects_filter_and_flags() {
        let properties = memory_properties(&[
            vk::MemoryPropertyFlags::DEVICE_LOCAL,
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
            vk::MemoryPropertyFlags::HOST_VISIBLE,
        ]);

        let found = find_memory_type(&properties, 0b111, vk::MemoryPropertyFlags::HOST_VISIBLE).unwrap();
        assert_eq!(found, 1);

        let found = find_memory_type(&properties, 0b100, vk::MemoryPropertyFlags::HOST_VISIBLE).unwrap();
        assert_eq!(found, 2);
    }

    #[test]
    fn test_find_memory_type_without_match() {
        let properties = memory_properties(&[vk::MemoryPropertyFlags::DEVICE_LOCAL]);
        assert!(matches!(
            find_memory_type(&properties, 0b1, vk::MemoryPropertyFlags::HOST_VISIBLE),
            Err(VulkanError::NoSuitableMemoryType { type_filter: 1, .. })
        ));
    }

    #[test]
    fn test_usage_flags() {
        assert_eq!(usage_flags(BufferUsage::UNIFORM), vk::BufferUsageFlags::UNIFORM_BUFFER);
        assert_eq!(
            usage_flags(BufferUsage::VERTEX | BufferUsage::INDEX),
            vk::BufferUsageFlags::VERTEX_BUFFER | vk::BufferUsageFlags::INDEX_BUFFER
        );
    }

    #[test]
    fn test_out_of_memory_maps_to_render_error() {
        assert!(matches!(
            map_allocation_error(vk::Result::ERROR_OUT_OF_DEVICE_MEMORY, 64),
            RenderError::OutOfDeviceMemory { requested: 64 }
        ));
        assert!(matches!(
            map_allocation_error(vk::Result::ERROR_DEVICE_LOST, 64),
            RenderError::Vulkan(VulkanError::Api(vk::Result::ERROR_DEVICE_LOST))
        ));
    }
}
