//! # Frame Engine
//!
//! The frame-orchestration core of a real-time point-light scene renderer.
//!
//! ## Features
//!
//! - **Frames in flight**: N statically allocated frame slots, each holding a
//!   persistently mapped uniform buffer and the descriptor set bound to it
//! - **Two-phase render systems**: every system contributes to the shared
//!   per-frame uniform block before any system records draw work
//! - **Collaborator traits**: window, drawing context, device and navigation
//!   are traits, with a headless backend for tests and an `ash` device layer
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use frame_engine::prelude::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let device = HeadlessDevice::new();
//!     let mut renderer = HeadlessRenderer::new(HeadlessRendererConfig::default());
//!     let mut window = HeadlessWindow::new(120);
//!     let scene = SceneStore::new();
//!
//!     let pool = FrameResourcePool::new(&device, renderer.max_frames_in_flight())?;
//!     let pass = renderer.render_pass();
//!     let objects = ObjectRenderSystem::new(&device, pass, pool.layout(), &ShaderConfig::object_shaders())?;
//!     let lights = PointLightSystem::new(&device, pass, pool.layout(), &ShaderConfig::point_light_shaders())?;
//!
//!     let mut orchestrator = FrameOrchestrator::new(
//!         &mut window,
//!         &mut renderer,
//!         &device,
//!         pool,
//!         vec![Box::new(objects), Box::new(lights)],
//!         Box::new(KeyboardMovementController::default()),
//!         CameraSettings::default(),
//!     );
//!     orchestrator.run(&scene)?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod core;
pub mod foundation;
pub mod scene;
pub mod assets;
pub mod render;
pub mod input;
pub mod window;

mod engine;

pub use engine::{CameraSettings, FrameOrchestrator, FrameOutcome, FrameStats};

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        CameraSettings, FrameOrchestrator, FrameOutcome, FrameStats,
        foundation::{
            math::{Vec3, Vec4, Mat4, Transform},
            time::{FrameClock, MonotonicClock, SystemClock},
        },
        scene::{ObjectId, PointLight, SceneObject, SceneStore},
        assets::{DeviceModelLoader, Model, ModelLoader, SharedModel},
        render::{
            Camera, FrameContext, FrameRenderer, DrawRecorder, GpuDevice, GlobalUniformBlock,
            PointLightRecord, RenderError, RenderResult, MAX_LIGHTS,
            frame_pool::FrameResourcePool,
            systems::{ObjectRenderSystem, PointLightSystem, RenderSystem},
            headless::{HeadlessDevice, HeadlessRenderer, HeadlessRendererConfig, HeadlessWindow},
        },
        input::{InputSurface, KeyCode, KeyboardMovementController, NavigationController},
        window::Window,
        core::config::{ApplicationConfig, Config, ShaderConfig},
    };
}
