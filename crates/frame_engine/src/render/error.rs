//! Render error types

use std::path::PathBuf;
use thiserror::Error;

use super::vulkan::VulkanError;

/// Errors raised by the frame loop and its collaborators
#[derive(Error, Debug)]
pub enum RenderError {
    /// A builder or constructor was given unusable parameters
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A frame slot index outside the pool
    #[error("Frame slot {index} out of range (pool holds {capacity})")]
    InvalidFrameSlot {
        /// Requested slot
        index: usize,
        /// Number of slots in the pool
        capacity: usize,
    },

    /// More point lights in the scene than the uniform block holds
    #[error("Scene has {found} point lights but the uniform block holds at most {capacity}")]
    LightCapacityExceeded {
        /// Lights found in the scene
        found: usize,
        /// Maximum supported lights
        capacity: usize,
    },

    /// A write or read past the end of a mapped buffer
    #[error("Buffer access of {len} bytes at offset {offset} exceeds buffer size {size}")]
    BufferOverflow {
        /// Byte offset of the access
        offset: u64,
        /// Length of the access
        len: u64,
        /// Buffer size
        size: u64,
    },

    /// Device memory exhausted
    #[error("Out of device memory: {requested} bytes requested")]
    OutOfDeviceMemory {
        /// Bytes requested
        requested: u64,
    },

    /// A SPIR-V file could not be read
    #[error("Failed to load shader '{path}': {source}")]
    ShaderLoad {
        /// Shader path
        path: PathBuf,
        /// Underlying IO error
        source: std::io::Error,
    },

    /// A handle that the device never issued, or already released
    #[error("Unknown device handle")]
    UnknownHandle,

    /// Vulkan backend failure
    #[error(transparent)]
    Vulkan(#[from] VulkanError),
}

/// Result type for rendering operations
pub type RenderResult<T> = Result<T, RenderError>;
