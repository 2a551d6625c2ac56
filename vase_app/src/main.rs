//! Point light demo
//!
//! Two vases on a floor, lit by a ring of six colored point lights. WASD/QE
//! move the viewer, the arrow keys look around and Escape quits.
//!
//! `window = "glfw"` draws through Vulkan into a GLFW window; the default
//! headless backend runs the same loop against in-memory collaborators.
//!
//! Usage: `point_lights [config.toml|config.ron]`

mod config;
mod scene;

use std::error::Error;
use std::path::{Path, PathBuf};

use frame_engine::foundation::logging;
use frame_engine::prelude::*;

use config::{AppConfig, WindowBackend};

const DEFAULT_CONFIG: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/config/point_lights.toml");

const WORKSPACE_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/..");

/// Try `path` from the working directory, then from `fallback_dir`
fn resolve_relative(path: &mut String, fallback_dir: &str) {
    let candidate = Path::new(path.as_str());
    if candidate.is_relative() && !candidate.exists() {
        *path = Path::new(fallback_dir).join(candidate).to_string_lossy().into_owned();
    }
}

fn load_config() -> Result<AppConfig, Box<dyn Error>> {
    let path = std::env::args_os()
        .nth(1)
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG), PathBuf::from);
    let mut config = AppConfig::load_from_file(&path)?;

    resolve_relative(&mut config.assets.assets_dir, env!("CARGO_MANIFEST_DIR"));
    for shaders in [&mut config.renderer.object_shaders, &mut config.renderer.light_shaders] {
        resolve_relative(&mut shaders.vertex_shader_path, WORKSPACE_DIR);
        resolve_relative(&mut shaders.fragment_shader_path, WORKSPACE_DIR);
    }
    Ok(config)
}

fn run_loop(
    config: &AppConfig,
    device: &dyn GpuDevice,
    renderer: &mut dyn FrameRenderer,
    window: &mut dyn Window,
) -> Result<(), Box<dyn Error>> {
    let pool = FrameResourcePool::new(device, renderer.max_frames_in_flight())?;

    let render_pass = renderer.render_pass();
    let objects = ObjectRenderSystem::new(device, render_pass, pool.layout(), &config.renderer.object_shaders)?;
    let lights = PointLightSystem::new(device, render_pass, pool.layout(), &config.renderer.light_shaders)?;

    let loader = DeviceModelLoader::new(device, &config.assets.assets_dir);
    let scene = scene::load_scene(&loader)?;

    let viewer = Transform::from_translation(Vec3::from(config.camera.start_translation));
    let settings = CameraSettings::from_config(&config.camera, &config.renderer);

    let mut orchestrator = FrameOrchestrator::new(
        window,
        renderer,
        device,
        pool,
        vec![Box::new(objects), Box::new(lights)],
        Box::new(KeyboardMovementController::default()),
        settings,
    )
    .with_viewer(viewer);

    orchestrator.run(&scene)?;

    let stats = orchestrator.stats();
    log::info!(
        "Rendered {} of {} iterations, viewer ended at {:?}",
        stats.frames_rendered,
        stats.iterations,
        orchestrator.viewer().translation
    );
    Ok(())
}

fn run_headless(config: &AppConfig) -> Result<(), Box<dyn Error>> {
    let headless = &config.headless;
    let device = HeadlessDevice::new();
    let mut renderer = HeadlessRenderer::with_trace(
        headless.renderer_config(headless.width, headless.height),
        device.trace(),
    );
    let mut window = HeadlessWindow::new(headless.max_frames).with_framebuffer_size(headless.width, headless.height);
    run_loop(config, &device, &mut renderer, &mut window)
}

#[cfg(feature = "glfw-window")]
fn run_glfw(config: &AppConfig) -> Result<(), Box<dyn Error>> {
    use std::rc::Rc;

    use frame_engine::render::vulkan::{VulkanContext, VulkanDevice, VulkanError, VulkanRenderer};
    use frame_engine::window::glfw_window::GlfwWindow;

    let headless = &config.headless;
    let mut window = GlfwWindow::new(&config.renderer.application_name, headless.width, headless.height)?;
    let extensions = window.required_instance_extensions()?;

    // Declared after the window so the surface is destroyed first
    let context = Rc::new(VulkanContext::new(&config.renderer.application_name, &extensions, |instance| {
        window
            .create_vulkan_surface(instance.handle())
            .map_err(|e| VulkanError::InitializationFailed(e.to_string()))
    })?);
    let device = VulkanDevice::new(Rc::clone(&context));
    let (width, height) = window.framebuffer_size().unwrap_or((headless.width, headless.height));
    let mut renderer = VulkanRenderer::new(Rc::clone(&context), headless.frames_in_flight, width, height)?;

    run_loop(config, &device, &mut renderer, &mut window)
}

fn run(config: &AppConfig) -> Result<(), Box<dyn Error>> {
    config.validate()?;
    match config.window {
        WindowBackend::Headless => run_headless(config),
        #[cfg(feature = "glfw-window")]
        WindowBackend::Glfw => run_glfw(config),
        #[cfg(not(feature = "glfw-window"))]
        WindowBackend::Glfw => Err("the glfw window backend needs the `glfw-window` feature".into()),
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let config = load_config()?;
    logging::init_with_level(&config.engine.log_level);
    log::info!("Starting '{}'", config.renderer.application_name);

    run(&config).map_err(|e| {
        log::error!("Fatal: {e}");
        e
    })
}
