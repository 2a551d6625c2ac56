//! # Rendering
//!
//! The per-frame rendering core and the collaborator traits it is written
//! against.
//!
//! ## Organization
//!
//! - **Data**: [`Camera`], [`GlobalUniformBlock`], [`FrameContext`]
//! - **Resources**: [`frame_pool::FrameResourcePool`] and the
//!   descriptor/pipeline descriptions it is built from
//! - **Systems**: the two-phase [`systems::RenderSystem`] contract with the
//!   object and point light passes
//! - **Backends**: [`GpuDevice`], [`FrameRenderer`] and [`DrawRecorder`]
//!   implemented in memory by [`headless`] and over `ash` by [`vulkan`]

pub mod camera;
pub mod descriptors;
pub mod device;
pub mod error;
pub mod frame;
pub mod frame_pool;
pub mod headless;
pub mod pipeline;
pub mod systems;
pub mod uniform;
pub mod vulkan;

pub use camera::Camera;
pub use device::{GpuDevice, MappedBuffer};
pub use error::{RenderError, RenderResult};
pub use frame::{DrawRecorder, FrameContext, FrameRenderer};
pub use uniform::{GlobalUniformBlock, PointLightRecord, MAX_LIGHTS};
