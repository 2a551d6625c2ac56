//! Swapchain and its image views

use ash::{vk, Device};

use super::context::VulkanContext;
use super::{VulkanError, VulkanResult};

/// Prefer sRGB BGRA8, otherwise take whatever the surface lists first
pub(crate) fn choose_surface_format(formats: &[vk::SurfaceFormatKHR]) -> VulkanResult<vk::SurfaceFormatKHR> {
    formats
        .iter()
        .copied()
        .find(|f| f.format == vk::Format::B8G8R8A8_SRGB && f.color_space == vk::ColorSpaceKHR::SRGB_NONLINEAR)
        .or_else(|| formats.first().copied())
        .ok_or_else(|| VulkanError::InitializationFailed("surface reports no formats".to_string()))
}

/// Mailbox when available, FIFO otherwise (always supported)
pub(crate) fn choose_present_mode(modes: &[vk::PresentModeKHR]) -> vk::PresentModeKHR {
    if modes.contains(&vk::PresentModeKHR::MAILBOX) {
        vk::PresentModeKHR::MAILBOX
    } else {
        vk::PresentModeKHR::FIFO
    }
}

/// Surface extent, or the requested size clamped to the surface limits
pub(crate) fn choose_extent(capabilities: &vk::SurfaceCapabilitiesKHR, requested: vk::Extent2D) -> vk::Extent2D {
    if capabilities.current_extent.width != u32::MAX {
        return capabilities.current_extent;
    }
    vk::Extent2D {
        width: requested
            .width
            .clamp(capabilities.min_image_extent.width, capabilities.max_image_extent.width),
        height: requested
            .height
            .clamp(capabilities.min_image_extent.height, capabilities.max_image_extent.height),
    }
}

/// One more than the minimum, capped by the maximum (0 means unbounded)
pub(crate) fn choose_image_count(capabilities: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let desired = capabilities.min_image_count + 1;
    if capabilities.max_image_count > 0 {
        desired.min(capabilities.max_image_count)
    } else {
        desired
    }
}

/// Presentable images for the context's surface
pub struct Swapchain {
    device: Device,
    loader: ash::extensions::khr::Swapchain,
    swapchain: vk::SwapchainKHR,
    image_views: Vec<vk::ImageView>,
    format: vk::Format,
    extent: vk::Extent2D,
}

impl Swapchain {
    /// Create a swapchain sized for `requested`
    ///
    /// Pass the previous swapchain as `old` when recreating; it must be
    /// dropped by the caller afterwards.
    pub fn new(context: &VulkanContext, requested: vk::Extent2D, old: vk::SwapchainKHR) -> VulkanResult<Self> {
        let surface = context.surface();
        let physical_device = context.physical_device();
        let surface_loader = context.surface_loader();
        let (capabilities, formats, modes) = unsafe {
            (
                surface_loader
                    .get_physical_device_surface_capabilities(physical_device, surface)
                    .map_err(VulkanError::Api)?,
                surface_loader
                    .get_physical_device_surface_formats(physical_device, surface)
                    .map_err(VulkanError::Api)?,
                surface_loader
                    .get_physical_device_surface_present_modes(physical_device, surface)
                    .map_err(VulkanError::Api)?,
            )
        };

        let surface_format = choose_surface_format(&formats)?;
        let present_mode = choose_present_mode(&modes);
        let extent = choose_extent(&capabilities, requested);
        let image_count = choose_image_count(&capabilities);

        let families = context.queue_families();
        let family_indices = [families.graphics, families.present];
        let mut create_info = vk::SwapchainCreateInfoKHR::builder()
            .surface(surface)
            .min_image_count(image_count)
            .image_format(surface_format.format)
            .image_color_space(surface_format.color_space)
            .image_extent(extent)
            .image_array_layers(1)
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
            .pre_transform(capabilities.current_transform)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(present_mode)
            .clipped(true)
            .old_swapchain(old);
        create_info = if families.graphics != families.present {
            create_info
                .image_sharing_mode(vk::SharingMode::CONCURRENT)
                .queue_family_indices(&family_indices)
        } else {
            create_info.image_sharing_mode(vk::SharingMode::EXCLUSIVE)
        };

        let loader = context.swapchain_loader().clone();
        let device = context.device().clone();
        let swapchain = unsafe { loader.create_swapchain(&create_info, None).map_err(VulkanError::Api)? };

        let images = match unsafe { loader.get_swapchain_images(swapchain) } {
            Ok(images) => images,
            Err(e) => {
                unsafe { loader.destroy_swapchain(swapchain, None) };
                return Err(VulkanError::Api(e));
            }
        };

        // Views are pushed as they are made so Drop cleans up a partial set
        let mut this = Self {
            device,
            loader,
            swapchain,
            image_views: Vec::with_capacity(images.len()),
            format: surface_format.format,
            extent,
        };
        for image in images {
            let view_info = vk::ImageViewCreateInfo::builder()
                .image(image)
                .view_type(vk::ImageViewType::TYPE_2D)
                .format(surface_format.format)
                .subresource_range(vk::ImageSubresourceRange {
                    aspect_mask: vk::ImageAspectFlags::COLOR,
                    base_mip_level: 0,
                    level_count: 1,
                    base_array_layer: 0,
                    layer_count: 1,
                });
            let view = unsafe { this.device.create_image_view(&view_info, None).map_err(VulkanError::Api)? };
            this.image_views.push(view);
        }

        log::info!(
            "Swapchain ready: {} images, {}x{}, {:?}, {:?}",
            this.image_views.len(),
            extent.width,
            extent.height,
            surface_format.format,
            present_mode
        );
        Ok(this)
    }

    /// Raw handle
    pub fn handle(&self) -> vk::SwapchainKHR {
        self.swapchain
    }

    /// One view per swapchain image
    pub fn image_views(&self) -> &[vk::ImageView] {
        &self.image_views
    }

    /// Color format of the images
    pub fn format(&self) -> vk::Format {
        self.format
    }

    /// Image size
    pub fn extent(&self) -> vk::Extent2D {
        self.extent
    }
}

impl Drop for Swapchain {
    fn drop(&mut self) {
        unsafe {
            for view in self.image_views.drain(..) {
                self.device.destroy_image_view(view, None);
            }
            self.loader.destroy_swapchain(self.swapchain, None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn format(format: vk::Format, color_space: vk::ColorSpaceKHR) -> vk::SurfaceFormatKHR {
        vk::SurfaceFormatKHR { format, color_space }
    }

    fn capabilities(current: (u32, u32), min_count: u32, max_count: u32) -> vk::SurfaceCapabilitiesKHR {
        vk::SurfaceCapabilitiesKHR {
            current_extent: vk::Extent2D {
                width: current.0,
                height: current.1,
            },
            min_image_extent: vk::Extent2D { width: 1, height: 1 },
            max_image_extent: vk::Extent2D {
                width: 4096,
                height: 2048,
            },
            min_image_count: min_count,
            max_image_count: max_count,
            ..Default::default()
        }
    }

    #[test]
    fn test_surface_format_prefers_srgb_bgra() {
        let formats = [
            format(vk::Format::R8G8B8A8_UNORM, vk::ColorSpaceKHR::SRGB_NONLINEAR),
            format(vk::Format::B8G8R8A8_SRGB, vk::ColorSpaceKHR::SRGB_NONLINEAR),
        ];
        assert_eq!(choose_surface_format(&formats).unwrap().format, vk::Format::B8G8R8A8_SRGB);
    }

    #[test]
    fn test_surface_format_falls_back_to_first() {
        let formats = [format(vk::Format::R8G8B8A8_UNORM, vk::ColorSpaceKHR::SRGB_NONLINEAR)];
        assert_eq!(choose_surface_format(&formats).unwrap().format, vk::Format::R8G8B8A8_UNORM);
        assert!(choose_surface_format(&[]).is_err());
    }

    #[test]
    fn test_present_mode() {
        let modes = [vk::PresentModeKHR::FIFO, vk::PresentModeKHR::MAILBOX];
        assert_eq!(choose_present_mode(&modes), vk::PresentModeKHR::MAILBOX);
        assert_eq!(choose_present_mode(&[vk::PresentModeKHR::IMMEDIATE]), vk::PresentModeKHR::FIFO);
    }

    #[test]
    fn test_extent_follows_the_surface_when_fixed() {
        let caps = capabilities((800, 600), 2, 3);
        let requested = vk::Extent2D {
            width: 1600,
            height: 900,
        };
        assert_eq!(choose_extent(&caps, requested), vk::Extent2D { width: 800, height: 600 });
    }

    #[test]
    fn test_extent_clamps_the_request_when_free() {
        let caps = capabilities((u32::MAX, u32::MAX), 2, 3);
        let requested = vk::Extent2D {
            width: 5000,
            height: 600,
        };
        assert_eq!(
            choose_extent(&caps, requested),
            vk::Extent2D {
                width: 4096,
                height: 600
            }
        );
    }

    #[test]
    fn test_image_count() {
        assert_eq!(choose_image_count(&capabilities((1, 1), 2, 3)), 3);
        assert_eq!(choose_image_count(&capabilities((1, 1), 3, 3)), 3);
        assert_eq!(choose_image_count(&capabilities((1, 1), 2, 0)), 3);
    }
}
