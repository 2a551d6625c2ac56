//! Instance, surface and logical device
//!
//! [`VulkanContext`] owns the objects every other Vulkan type borrows from.
//! It is shared through `Rc` by [`VulkanDevice`](super::VulkanDevice) and
//! [`VulkanRenderer`](super::VulkanRenderer), so it is destroyed only after
//! both are gone.

use std::collections::BTreeSet;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;

use ash::extensions::khr::{Surface, Swapchain as SwapchainLoader};
use ash::{vk, Device, Entry, Instance};

use super::{VulkanError, VulkanResult};

const VALIDATION_LAYER: &CStr = unsafe { CStr::from_bytes_with_nul_unchecked(b"VK_LAYER_KHRONOS_validation\0") };
const ENGINE_NAME: &CStr = unsafe { CStr::from_bytes_with_nul_unchecked(b"frame_engine\0") };

/// Queue family indices used for drawing and presenting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueFamilies {
    /// Family with graphics support
    pub graphics: u32,
    /// Family that can present to the surface
    pub present: u32,
}

impl QueueFamilies {
    /// Pick families from `families`, preferring one that does both
    pub(crate) fn select(
        families: &[vk::QueueFamilyProperties],
        mut supports_present: impl FnMut(u32) -> VulkanResult<bool>,
    ) -> VulkanResult<Option<Self>> {
        let mut graphics = None;
        let mut present = None;
        for (index, family) in (0u32..).zip(families) {
            let has_graphics = family.queue_count > 0 && family.queue_flags.contains(vk::QueueFlags::GRAPHICS);
            let has_present = family.queue_count > 0 && supports_present(index)?;
            if has_graphics && has_present {
                return Ok(Some(Self {
                    graphics: index,
                    present: index,
                }));
            }
            if has_graphics && graphics.is_none() {
                graphics = Some(index);
            }
            if has_present && present.is_none() {
                present = Some(index);
            }
        }
        Ok(graphics.zip(present).map(|(graphics, present)| Self { graphics, present }))
    }

    fn unique(self) -> BTreeSet<u32> {
        [self.graphics, self.present].into_iter().collect()
    }
}

fn device_type_rank(device_type: vk::PhysicalDeviceType) -> u32 {
    match device_type {
        vk::PhysicalDeviceType::DISCRETE_GPU => 3,
        vk::PhysicalDeviceType::INTEGRATED_GPU => 2,
        vk::PhysicalDeviceType::VIRTUAL_GPU => 1,
        _ => 0,
    }
}

fn to_cstrings(names: &[String]) -> VulkanResult<Vec<CString>> {
    names
        .iter()
        .map(|name| {
            CString::new(name.as_str())
                .map_err(|_| VulkanError::InitializationFailed(format!("invalid extension name '{name}'")))
        })
        .collect()
}

/// Core Vulkan objects for one window
pub struct VulkanContext {
    _entry: Entry,
    instance: Instance,
    surface_loader: Surface,
    surface: vk::SurfaceKHR,
    physical_device: vk::PhysicalDevice,
    memory_properties: vk::PhysicalDeviceMemoryProperties,
    queue_families: QueueFamilies,
    device: Device,
    graphics_queue: vk::Queue,
    present_queue: vk::Queue,
    swapchain_loader: SwapchainLoader,
}

impl VulkanContext {
    /// Load Vulkan, create the instance and surface, and open a device
    ///
    /// `instance_extensions` are the surface extensions the window system
    /// needs. `create_surface` is called once with the new instance.
    pub fn new(
        app_name: &str,
        instance_extensions: &[String],
        create_surface: impl FnOnce(&Instance) -> VulkanResult<vk::SurfaceKHR>,
    ) -> VulkanResult<Self> {
        let entry = unsafe { Entry::load() }
            .map_err(|e| VulkanError::InitializationFailed(format!("Failed to load Vulkan: {e}")))?;
        let instance = Self::create_instance(&entry, app_name, instance_extensions)?;
        let surface_loader = Surface::new(&entry, &instance);

        let surface = match create_surface(&instance) {
            Ok(surface) => surface,
            Err(e) => {
                unsafe { instance.destroy_instance(None) };
                return Err(e);
            }
        };

        let (physical_device, queue_families, device) =
            match Self::open_device(&instance, &surface_loader, surface) {
                Ok(opened) => opened,
                Err(e) => {
                    unsafe {
                        surface_loader.destroy_surface(surface, None);
                        instance.destroy_instance(None);
                    }
                    return Err(e);
                }
            };

        let memory_properties = unsafe { instance.get_physical_device_memory_properties(physical_device) };
        let graphics_queue = unsafe { device.get_device_queue(queue_families.graphics, 0) };
        let present_queue = unsafe { device.get_device_queue(queue_families.present, 0) };
        let swapchain_loader = SwapchainLoader::new(&instance, &device);

        Ok(Self {
            _entry: entry,
            instance,
            surface_loader,
            surface,
            physical_device,
            memory_properties,
            queue_families,
            device,
            graphics_queue,
            present_queue,
            swapchain_loader,
        })
    }

    fn create_instance(entry: &Entry, app_name: &str, instance_extensions: &[String]) -> VulkanResult<Instance> {
        let app_name = CString::new(app_name)
            .map_err(|_| VulkanError::InitializationFailed("application name contains a NUL byte".to_string()))?;
        let app_info = vk::ApplicationInfo::builder()
            .application_name(&app_name)
            .application_version(vk::make_api_version(0, 1, 0, 0))
            .engine_name(ENGINE_NAME)
            .engine_version(vk::make_api_version(0, 1, 0, 0))
            .api_version(vk::API_VERSION_1_0);

        let extensions = to_cstrings(instance_extensions)?;
        let extension_ptrs: Vec<*const c_char> = extensions.iter().map(|ext| ext.as_ptr()).collect();

        let mut layer_ptrs: Vec<*const c_char> = Vec::new();
        if cfg!(debug_assertions) {
            let layers = entry.enumerate_instance_layer_properties().map_err(VulkanError::Api)?;
            let available = layers
                .iter()
                .any(|layer| unsafe { CStr::from_ptr(layer.layer_name.as_ptr()) } == VALIDATION_LAYER);
            if available {
                layer_ptrs.push(VALIDATION_LAYER.as_ptr());
            } else {
                log::warn!("Validation layer not installed, continuing without it");
            }
        }

        let create_info = vk::InstanceCreateInfo::builder()
            .application_info(&app_info)
            .enabled_extension_names(&extension_ptrs)
            .enabled_layer_names(&layer_ptrs);

        let instance = unsafe { entry.create_instance(&create_info, None).map_err(VulkanError::Api)? };
        log::info!(
            "Created Vulkan instance ({} extensions, {} layers)",
            extension_ptrs.len(),
            layer_ptrs.len()
        );
        Ok(instance)
    }

    fn supports_swapchain(instance: &Instance, physical_device: vk::PhysicalDevice) -> VulkanResult<bool> {
        let extensions = unsafe {
            instance
                .enumerate_device_extension_properties(physical_device)
                .map_err(VulkanError::Api)?
        };
        Ok(extensions
            .iter()
            .any(|ext| unsafe { CStr::from_ptr(ext.extension_name.as_ptr()) } == SwapchainLoader::name()))
    }

    fn open_device(
        instance: &Instance,
        surface_loader: &Surface,
        surface: vk::SurfaceKHR,
    ) -> VulkanResult<(vk::PhysicalDevice, QueueFamilies, Device)> {
        let candidates = unsafe { instance.enumerate_physical_devices().map_err(VulkanError::Api)? };

        let mut best: Option<(u32, vk::PhysicalDevice, QueueFamilies)> = None;
        for physical_device in candidates {
            if !Self::supports_swapchain(instance, physical_device)? {
                continue;
            }
            let families = unsafe { instance.get_physical_device_queue_family_properties(physical_device) };
            let selected = QueueFamilies::select(&families, |index| unsafe {
                surface_loader
                    .get_physical_device_surface_support(physical_device, index, surface)
                    .map_err(VulkanError::Api)
            })?;
            let Some(queue_families) = selected else {
                continue;
            };

            let properties = unsafe { instance.get_physical_device_properties(physical_device) };
            let rank = device_type_rank(properties.device_type);
            if best.map_or(true, |(best_rank, _, _)| rank > best_rank) {
                best = Some((rank, physical_device, queue_families));
            }
        }

        let (_, physical_device, queue_families) =
            best.ok_or_else(|| VulkanError::InitializationFailed("No suitable GPU found".to_string()))?;

        let properties = unsafe { instance.get_physical_device_properties(physical_device) };
        let name = unsafe { CStr::from_ptr(properties.device_name.as_ptr()) };
        log::info!("Selected GPU: {}", name.to_string_lossy());

        let priorities = [1.0f32];
        let queue_infos: Vec<vk::DeviceQueueCreateInfo> = queue_families
            .unique()
            .into_iter()
            .map(|family| {
                vk::DeviceQueueCreateInfo::builder()
                    .queue_family_index(family)
                    .queue_priorities(&priorities)
                    .build()
            })
            .collect();
        let device_extensions = [SwapchainLoader::name().as_ptr()];
        let features = vk::PhysicalDeviceFeatures::default();
        let create_info = vk::DeviceCreateInfo::builder()
            .queue_create_infos(&queue_infos)
            .enabled_extension_names(&device_extensions)
            .enabled_features(&features);

        let device = unsafe {
            instance
                .create_device(physical_device, &create_info, None)
                .map_err(VulkanError::Api)?
        };
        Ok((physical_device, queue_families, device))
    }

    /// Vulkan instance
    pub fn instance(&self) -> &Instance {
        &self.instance
    }

    /// Logical device
    pub fn device(&self) -> &Device {
        &self.device
    }

    /// Selected physical device
    pub fn physical_device(&self) -> vk::PhysicalDevice {
        self.physical_device
    }

    /// Memory heaps and types of the physical device
    pub fn memory_properties(&self) -> &vk::PhysicalDeviceMemoryProperties {
        &self.memory_properties
    }

    /// Window surface
    pub fn surface(&self) -> vk::SurfaceKHR {
        self.surface
    }

    /// Surface extension functions
    pub fn surface_loader(&self) -> &Surface {
        &self.surface_loader
    }

    /// Swapchain extension functions
    pub fn swapchain_loader(&self) -> &SwapchainLoader {
        &self.swapchain_loader
    }

    /// Queue families in use
    pub fn queue_families(&self) -> QueueFamilies {
        self.queue_families
    }

    /// Queue for command submission
    pub fn graphics_queue(&self) -> vk::Queue {
        self.graphics_queue
    }

    /// Queue for presentation
    pub fn present_queue(&self) -> vk::Queue {
        self.present_queue
    }
}

impl Drop for VulkanContext {
    fn drop(&mut self) {
        unsafe {
            if let Err(e) = self.device.device_wait_idle() {
                log::warn!("device_wait_idle failed during teardown: {e:?}");
            }
            self.device.destroy_device(None);
            self.surface_loader.destroy_surface(self.surface, None);
            self.instance.destroy_instance(None);
        }
        log::debug!("Vulkan context destroyed");
    }
}
