//! Vulkan backend
//!
//! Implements the collaborator traits over `ash`. [`VulkanContext`] owns
//! the instance, the window surface and the logical device;
//! [`VulkanDevice`] creates resources on it and [`VulkanRenderer`] drives
//! the swapchain. Both hold the context through `Rc`.

pub mod buffer;
pub mod commands;
pub mod context;
pub mod descriptor_set;
pub mod device;
pub mod framebuffer;
pub mod pipeline;
pub mod render_pass;
pub mod renderer;
pub mod swapchain;
pub mod sync;

pub use buffer::HostVisibleBuffer;
pub use commands::VulkanCommandRecorder;
pub use context::VulkanContext;
pub use device::VulkanDevice;
pub use renderer::VulkanRenderer;

use ash::vk;
use thiserror::Error;

/// Vulkan backend errors
#[derive(Error, Debug)]
pub enum VulkanError {
    /// General Vulkan API error with result code
    #[error("Vulkan API error: {0:?}")]
    Api(vk::Result),

    /// No memory type satisfies the requested properties
    #[error("No suitable memory type (filter {type_filter:#b}, properties {properties:?})")]
    NoSuitableMemoryType {
        /// Memory type bits allowed by the resource
        type_filter: u32,
        /// Required property flags
        properties: vk::MemoryPropertyFlags,
    },

    /// Object creation failed for a reason other than an API result
    #[error("Initialization failed: {0}")]
    InitializationFailed(String),
}

/// Result type for Vulkan operations
pub type VulkanResult<T> = Result<T, VulkanError>;

impl From<vk::Result> for VulkanError {
    fn from(result: vk::Result) -> Self {
        Self::Api(result)
    }
}
