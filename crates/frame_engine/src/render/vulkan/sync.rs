//! Semaphores and fences with RAII cleanup

use ash::{vk, Device};

use super::{VulkanError, VulkanResult};

/// Binary semaphore
pub struct Semaphore {
    device: Device,
    semaphore: vk::Semaphore,
}

impl Semaphore {
    /// Create an unsignaled semaphore
    pub fn new(device: Device) -> VulkanResult<Self> {
        let create_info = vk::SemaphoreCreateInfo::builder();
        let semaphore = unsafe { device.create_semaphore(&create_info, None).map_err(VulkanError::Api)? };
        Ok(Self { device, semaphore })
    }

    /// Raw handle
    pub fn handle(&self) -> vk::Semaphore {
        self.semaphore
    }
}

impl Drop for Semaphore {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_semaphore(self.semaphore, None);
        }
    }
}

/// CPU-waitable fence
pub struct Fence {
    device: Device,
    fence: vk::Fence,
}

impl Fence {
    /// Create a fence, optionally already signaled
    pub fn new(device: Device, signaled: bool) -> VulkanResult<Self> {
        let flags = if signaled {
            vk::FenceCreateFlags::SIGNALED
        } else {
            vk::FenceCreateFlags::empty()
        };
        let create_info = vk::FenceCreateInfo::builder().flags(flags);
        let fence = unsafe { device.create_fence(&create_info, None).map_err(VulkanError::Api)? };
        Ok(Self { device, fence })
    }

    /// Block until signaled
    pub fn wait(&self) -> VulkanResult<()> {
        unsafe {
            self.device
                .wait_for_fences(&[self.fence], true, u64::MAX)
                .map_err(VulkanError::Api)
        }
    }

    /// Return to the unsignaled state
    pub fn reset(&self) -> VulkanResult<()> {
        unsafe { self.device.reset_fences(&[self.fence]).map_err(VulkanError::Api) }
    }

    /// Raw handle
    pub fn handle(&self) -> vk::Fence {
        self.fence
    }
}

impl Drop for Fence {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_fence(self.fence, None);
        }
    }
}

/// Objects pacing one frame slot
///
/// `in_flight` starts signaled so the first wait on each slot returns
/// immediately.
pub struct FrameSync {
    /// Signaled when the acquired image is ready to be drawn to
    pub image_available: Semaphore,
    /// Signaled when the slot's last submission completes
    pub in_flight: Fence,
}

impl FrameSync {
    /// Create the objects for one slot
    pub fn new(device: &Device) -> VulkanResult<Self> {
        Ok(Self {
            image_available: Semaphore::new(device.clone())?,
            in_flight: Fence::new(device.clone(), true)?,
        })
    }
}
