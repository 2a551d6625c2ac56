//! Window collaborator
//!
//! The frame loop only needs to pump events, ask whether to stop and read
//! key state. The GLFW implementation sits behind the `glfw-window`
//! feature; tests use [`HeadlessWindow`](crate::render::headless::HeadlessWindow).

#[cfg(feature = "glfw-window")]
pub mod glfw_window;

use crate::input::InputSurface;

/// Operating system window as seen by the frame loop
pub trait Window {
    /// Process pending events
    fn poll_events(&mut self);

    /// Whether the loop should stop
    fn should_close(&self) -> bool;

    /// Current key state
    fn input(&self) -> &dyn InputSurface;

    /// Drawable size in pixels, if the window tracks one
    ///
    /// Read every iteration and forwarded to the drawing context, so a
    /// resize reaches the projection on the next frame.
    fn framebuffer_size(&self) -> Option<(u32, u32)> {
        None
    }
}
