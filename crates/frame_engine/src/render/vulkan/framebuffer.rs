//! Per-image render targets: depth buffer, framebuffer and present semaphore

use ash::{vk, Device};

use super::buffer::find_memory_type;
use super::render_pass::DEPTH_FORMAT;
use super::sync::Semaphore;
use super::{VulkanError, VulkanResult};

/// Device-local depth image with its view
pub struct DepthBuffer {
    device: Device,
    image: vk::Image,
    memory: vk::DeviceMemory,
    view: vk::ImageView,
}

impl DepthBuffer {
    /// Allocate a depth image of `extent`
    pub fn new(
        device: Device,
        memory_properties: &vk::PhysicalDeviceMemoryProperties,
        extent: vk::Extent2D,
    ) -> VulkanResult<Self> {
        let image_info = vk::ImageCreateInfo::builder()
            .image_type(vk::ImageType::TYPE_2D)
            .extent(vk::Extent3D {
                width: extent.width,
                height: extent.height,
                depth: 1,
            })
            .mip_levels(1)
            .array_layers(1)
            .format(DEPTH_FORMAT)
            .tiling(vk::ImageTiling::OPTIMAL)
            .initial_layout(vk::ImageLayout::UNDEFINED)
            .usage(vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT)
            .sharing_mode(vk::SharingMode::EXCLUSIVE)
            .samples(vk::SampleCountFlags::TYPE_1);
        let image = unsafe { device.create_image(&image_info, None).map_err(VulkanError::Api)? };

        // Fields start null; Drop skips what was never created
        let mut depth = Self {
            device,
            image,
            memory: vk::DeviceMemory::null(),
            view: vk::ImageView::null(),
        };

        let requirements = unsafe { depth.device.get_image_memory_requirements(image) };
        let memory_type_index = find_memory_type(
            memory_properties,
            requirements.memory_type_bits,
            vk::MemoryPropertyFlags::DEVICE_LOCAL,
        )?;
        let alloc_info = vk::MemoryAllocateInfo::builder()
            .allocation_size(requirements.size)
            .memory_type_index(memory_type_index);
        depth.memory = unsafe { depth.device.allocate_memory(&alloc_info, None).map_err(VulkanError::Api)? };
        unsafe {
            depth
                .device
                .bind_image_memory(image, depth.memory, 0)
                .map_err(VulkanError::Api)?;
        }

        let view_info = vk::ImageViewCreateInfo::builder()
            .image(image)
            .view_type(vk::ImageViewType::TYPE_2D)
            .format(DEPTH_FORMAT)
            .subresource_range(vk::ImageSubresourceRange {
                aspect_mask: vk::ImageAspectFlags::DEPTH,
                base_mip_level: 0,
                level_count: 1,
                base_array_layer: 0,
                layer_count: 1,
            });
        depth.view = unsafe { depth.device.create_image_view(&view_info, None).map_err(VulkanError::Api)? };
        Ok(depth)
    }

    /// Image view used as the depth attachment
    pub fn view(&self) -> vk::ImageView {
        self.view
    }
}

impl Drop for DepthBuffer {
    fn drop(&mut self) {
        unsafe {
            if self.view != vk::ImageView::null() {
                self.device.destroy_image_view(self.view, None);
            }
            self.device.destroy_image(self.image, None);
            if self.memory != vk::DeviceMemory::null() {
                self.device.free_memory(self.memory, None);
            }
        }
    }
}

/// Framebuffer destroyed on drop
pub struct Framebuffer {
    device: Device,
    framebuffer: vk::Framebuffer,
}

impl Framebuffer {
    /// Bind `attachments` to `render_pass` at `extent`
    pub fn new(
        device: Device,
        render_pass: vk::RenderPass,
        attachments: &[vk::ImageView],
        extent: vk::Extent2D,
    ) -> VulkanResult<Self> {
        let create_info = vk::FramebufferCreateInfo::builder()
            .render_pass(render_pass)
            .attachments(attachments)
            .width(extent.width)
            .height(extent.height)
            .layers(1);
        let framebuffer = unsafe { device.create_framebuffer(&create_info, None).map_err(VulkanError::Api)? };
        Ok(Self { device, framebuffer })
    }

    /// Raw handle
    pub fn handle(&self) -> vk::Framebuffer {
        self.framebuffer
    }
}

impl Drop for Framebuffer {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_framebuffer(self.framebuffer, None);
        }
    }
}

/// Everything tied to one swapchain image
///
/// `render_finished` is per image rather than per slot: presentation may
/// still be waiting on it when the same slot comes round again.
pub struct RenderTarget {
    /// Framebuffer over the swapchain view and `depth`
    pub framebuffer: Framebuffer,
    /// Signaled when drawing into this image completes
    pub render_finished: Semaphore,
    /// Depth attachment; dropped after the framebuffer that uses it
    pub depth: DepthBuffer,
}

impl RenderTarget {
    /// Build one target per swapchain image view
    pub fn for_images(
        device: &Device,
        memory_properties: &vk::PhysicalDeviceMemoryProperties,
        render_pass: vk::RenderPass,
        image_views: &[vk::ImageView],
        extent: vk::Extent2D,
    ) -> VulkanResult<Vec<Self>> {
        image_views
            .iter()
            .map(|&color| {
                let depth = DepthBuffer::new(device.clone(), memory_properties, extent)?;
                let framebuffer = Framebuffer::new(device.clone(), render_pass, &[color, depth.view()], extent)?;
                Ok(Self {
                    framebuffer,
                    render_finished: Semaphore::new(device.clone())?,
                    depth,
                })
            })
            .collect()
    }
}
