//! GLFW window for Vulkan rendering

use thiserror::Error;

use super::Window;
use crate::input::{InputSurface, KeyCode};

/// Window management errors
#[derive(Error, Debug)]
pub enum WindowError {
    /// GLFW could not be initialized
    #[error("GLFW initialization failed")]
    InitializationFailed,

    /// The window could not be created
    #[error("Window creation failed")]
    CreationFailed,

    /// Other GLFW failure
    #[error("GLFW error: {0}")]
    GlfwError(String),
}

/// Result type for window operations
pub type WindowResult<T> = Result<T, WindowError>;

/// GLFW window without a client API, ready for a Vulkan surface
pub struct GlfwWindow {
    glfw: glfw::Glfw,
    window: glfw::PWindow,
    events: glfw::GlfwReceiver<(f64, glfw::WindowEvent)>,
}

impl GlfwWindow {
    /// Open a resizable window
    pub fn new(title: &str, width: u32, height: u32) -> WindowResult<Self> {
        let mut glfw = glfw::init(glfw::fail_on_errors).map_err(|_| WindowError::InitializationFailed)?;

        glfw.window_hint(glfw::WindowHint::ClientApi(glfw::ClientApiHint::NoApi));
        glfw.window_hint(glfw::WindowHint::Resizable(true));

        let (mut window, events) = glfw
            .create_window(width, height, title, glfw::WindowMode::Windowed)
            .ok_or(WindowError::CreationFailed)?;

        window.set_key_polling(true);
        window.set_close_polling(true);
        window.set_framebuffer_size_polling(true);

        log::info!("Opened {width}x{height} window '{title}'");
        Ok(Self { glfw, window, events })
    }

    /// Instance extensions GLFW needs for surface creation
    pub fn required_instance_extensions(&self) -> WindowResult<Vec<String>> {
        self.glfw
            .get_required_instance_extensions()
            .ok_or_else(|| WindowError::GlfwError("Vulkan is not supported".to_string()))
    }

    /// Create a Vulkan surface for this window
    pub fn create_vulkan_surface(&mut self, instance: ash::vk::Instance) -> WindowResult<ash::vk::SurfaceKHR> {
        let mut surface = ash::vk::SurfaceKHR::null();
        let result = self.window.create_window_surface(instance, std::ptr::null(), &mut surface);
        if result == ash::vk::Result::SUCCESS {
            Ok(surface)
        } else {
            Err(WindowError::GlfwError(format!("Failed to create Vulkan surface: {result:?}")))
        }
    }

    fn glfw_key(key: KeyCode) -> glfw::Key {
        match key {
            KeyCode::A => glfw::Key::A,
            KeyCode::D => glfw::Key::D,
            KeyCode::E => glfw::Key::E,
            KeyCode::Q => glfw::Key::Q,
            KeyCode::S => glfw::Key::S,
            KeyCode::W => glfw::Key::W,
            KeyCode::Escape => glfw::Key::Escape,
            KeyCode::Up => glfw::Key::Up,
            KeyCode::Down => glfw::Key::Down,
            KeyCode::Left => glfw::Key::Left,
            KeyCode::Right => glfw::Key::Right,
        }
    }
}

impl InputSurface for GlfwWindow {
    fn is_key_pressed(&self, key: KeyCode) -> bool {
        self.window.get_key(Self::glfw_key(key)) == glfw::Action::Press
    }
}

impl Window for GlfwWindow {
    fn poll_events(&mut self) {
        self.glfw.poll_events();
        for (_, event) in glfw::flush_messages(&self.events) {
            match event {
                glfw::WindowEvent::Key(glfw::Key::Escape, _, glfw::Action::Press, _) => {
                    log::info!("Escape pressed, closing window");
                    self.window.set_should_close(true);
                }
                glfw::WindowEvent::FramebufferSize(width, height) => {
                    log::debug!("Framebuffer resized to {width}x{height}");
                }
                _ => {}
            }
        }
    }

    fn should_close(&self) -> bool {
        self.window.should_close()
    }

    fn input(&self) -> &dyn InputSurface {
        self
    }

    fn framebuffer_size(&self) -> Option<(u32, u32)> {
        let (width, height) = self.window.get_framebuffer_size();
        Some((u32::try_from(width).unwrap_or(0), u32::try_from(height).unwrap_or(0)))
    }
}
