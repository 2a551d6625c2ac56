//! Frame orchestration
//!
//! [`FrameOrchestrator`] drives the per-iteration sequence: input and
//! navigation, camera, frame acquisition, the update phase of every render
//! system, publication of the uniform block to the frame slot, the render
//! phase, and submission. It owns the per-frame state and borrows the
//! window, drawing context and device for the duration of the loop.

use crate::core::config::{CameraConfig, RendererConfig};
use crate::foundation::math::{Transform, Vec3, Vec4};
use crate::foundation::time::{FrameClock, MonotonicClock, SystemClock};
use crate::input::NavigationController;
use crate::render::camera::Camera;
use crate::render::device::GpuDevice;
use crate::render::error::{RenderError, RenderResult};
use crate::render::frame::{FrameContext, FrameRenderer};
use crate::render::frame_pool::FrameResourcePool;
use crate::render::systems::RenderSystem;
use crate::render::uniform::GlobalUniformBlock;
use crate::scene::SceneStore;
use crate::window::Window;

/// Fixed projection parameters and the ambient term
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraSettings {
    /// Vertical field of view in radians
    pub fov_y: f32,
    /// Near clip distance
    pub near: f32,
    /// Far clip distance
    pub far: f32,
    /// Ambient light color (rgb) and intensity (w)
    pub ambient_light: Vec4,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            fov_y: 50f32.to_radians(),
            near: 0.1,
            far: 100.0,
            ambient_light: Vec4::new(1.0, 1.0, 1.0, 0.02),
        }
    }
}

impl CameraSettings {
    /// Settings taken from loaded configuration
    pub fn from_config(camera: &CameraConfig, renderer: &RendererConfig) -> Self {
        Self {
            fov_y: camera.fov_y_radians(),
            near: camera.near,
            far: camera.far,
            ambient_light: Vec4::from(renderer.ambient_light),
        }
    }
}

/// Result of one loop iteration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// A frame was recorded and submitted on `frame_index`
    Rendered {
        /// Slot used
        frame_index: usize,
    },
    /// The drawing context had no frame available
    Skipped,
}

/// Loop counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Iterations started
    pub iterations: u64,
    /// Frames submitted
    pub frames_rendered: u64,
    /// Iterations where no frame was available
    pub frames_skipped: u64,
}

/// Drives the frame loop
pub struct FrameOrchestrator<'a> {
    window: &'a mut dyn Window,
    renderer: &'a mut dyn FrameRenderer,
    device: &'a dyn GpuDevice,
    frame_pool: FrameResourcePool,
    systems: Vec<Box<dyn RenderSystem>>,
    navigation: Box<dyn NavigationController>,
    camera: Camera,
    viewer: Transform,
    clock: Box<dyn MonotonicClock>,
    frame_clock: FrameClock,
    settings: CameraSettings,
    stats: FrameStats,
}

impl<'a> FrameOrchestrator<'a> {
    /// Assemble the loop
    ///
    /// `systems` run in the given order in both phases; the object pass
    /// goes before the light pass so billboards blend over geometry.
    pub fn new(
        window: &'a mut dyn Window,
        renderer: &'a mut dyn FrameRenderer,
        device: &'a dyn GpuDevice,
        frame_pool: FrameResourcePool,
        systems: Vec<Box<dyn RenderSystem>>,
        navigation: Box<dyn NavigationController>,
        settings: CameraSettings,
    ) -> Self {
        let clock: Box<dyn MonotonicClock> = Box::new(SystemClock);
        let frame_clock = FrameClock::new(clock.now());
        Self {
            window,
            renderer,
            device,
            frame_pool,
            systems,
            navigation,
            camera: Camera::new(),
            viewer: Transform::from_translation(Vec3::new(0.0, 0.0, -2.5)),
            clock,
            frame_clock,
            settings,
            stats: FrameStats::default(),
        }
    }

    /// Replace the time source
    pub fn with_clock(mut self, clock: Box<dyn MonotonicClock>) -> Self {
        self.frame_clock = FrameClock::new(clock.now());
        self.clock = clock;
        self
    }

    /// Set the initial viewer transform
    pub fn with_viewer(mut self, viewer: Transform) -> Self {
        self.viewer = viewer;
        self
    }

    /// Loop counters so far
    pub fn stats(&self) -> FrameStats {
        self.stats
    }

    /// Camera as of the last iteration
    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    /// Viewer transform as of the last iteration
    pub fn viewer(&self) -> &Transform {
        &self.viewer
    }

    /// Per-frame uniform buffers
    pub fn frame_pool(&self) -> &FrameResourcePool {
        &self.frame_pool
    }

    fn validate(&self, scene: &SceneStore) -> RenderResult<()> {
        let frames_in_flight = self.renderer.max_frames_in_flight();
        if self.frame_pool.capacity() < frames_in_flight {
            return Err(RenderError::InvalidConfiguration(format!(
                "frame pool holds {} slots but the renderer keeps {} frames in flight",
                self.frame_pool.capacity(),
                frames_in_flight
            )));
        }
        for system in &self.systems {
            system.validate(scene).map_err(|e| {
                log::error!("Render system '{}' rejected the scene: {e}", system.name());
                e
            })?;
        }
        Ok(())
    }

    /// Run until the window asks to close
    ///
    /// The device is drained before returning, on success and on error
    /// alike. The first error encountered is the one returned.
    pub fn run(&mut self, scene: &SceneStore) -> RenderResult<()> {
        log::info!(
            "Starting frame loop: {} objects, {} render systems, {} frames in flight",
            scene.len(),
            self.systems.len(),
            self.renderer.max_frames_in_flight()
        );

        let result = self.validate(scene).and_then(|()| {
            while !self.window.should_close() {
                self.window.poll_events();
                self.run_frame(scene)?;
            }
            Ok(())
        });

        let idle = self.device.wait_idle();
        log::info!(
            "Frame loop stopped after {} iterations ({} rendered, {} skipped)",
            self.stats.iterations,
            self.stats.frames_rendered,
            self.stats.frames_skipped
        );
        result.and(idle)
    }

    /// Execute one iteration of the loop
    pub fn run_frame(&mut self, scene: &SceneStore) -> RenderResult<FrameOutcome> {
        self.stats.iterations += 1;

        let now = self.clock.now();
        let dt = self.frame_clock.tick(now);
        self.navigation.navigate(self.window.input(), dt, &mut self.viewer);

        if let Some((width, height)) = self.window.framebuffer_size() {
            self.renderer.set_extent(width, height);
        }

        self.camera.set_view_yxz(self.viewer.translation, self.viewer.rotation);
        let aspect = self.renderer.aspect_ratio();
        if aspect.is_finite() && aspect > 0.0 {
            self.camera
                .set_perspective_projection(self.settings.fov_y, aspect, self.settings.near, self.settings.far);
        } else {
            // Minimized surface: keep the last projection, begin_frame will skip
            log::trace!("Surface aspect {aspect} unusable, projection unchanged");
        }

        let Some(mut commands) = self.renderer.begin_frame()? else {
            self.stats.frames_skipped += 1;
            log::debug!("No frame available on iteration {}, skipping", self.stats.iterations);
            return Ok(FrameOutcome::Skipped);
        };

        let frame_index = self.renderer.frame_index();
        let mut frame = FrameContext {
            frame_index,
            frame_time: self.frame_clock.frame_time(now),
            commands: commands.as_mut(),
            camera: &self.camera,
            global_descriptor_set: self.frame_pool.descriptor_set(frame_index)?,
            scene,
        };

        let mut uniforms = GlobalUniformBlock::new(&self.camera, self.settings.ambient_light);
        for system in &mut self.systems {
            system.update(&frame, &mut uniforms)?;
        }
        self.frame_pool.write(frame_index, &uniforms)?;
        self.frame_pool.flush(frame_index)?;

        self.renderer.begin_pass(&mut *frame.commands)?;
        for system in &mut self.systems {
            system.render(&mut frame, &uniforms)?;
        }
        self.renderer.end_pass(&mut *frame.commands)?;
        self.renderer.end_frame(commands)?;

        self.frame_clock.mark_frame(now);
        self.stats.frames_rendered += 1;
        log::trace!(
            "Frame {} on slot {frame_index}: {} lights, dt {dt:.4}s",
            self.stats.frames_rendered,
            uniforms.num_lights
        );
        Ok(FrameOutcome::Rendered { frame_index })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::ApplicationConfig;
    use approx::assert_relative_eq;

    #[test]
    fn test_settings_from_config() {
        let mut config = ApplicationConfig::default();
        config.camera.fov_y_degrees = 90.0;
        config.renderer.ambient_light = [0.5, 0.5, 0.5, 0.1];

        let settings = CameraSettings::from_config(&config.camera, &config.renderer);
        assert_relative_eq!(settings.fov_y, std::f32::consts::FRAC_PI_2, epsilon = 1e-6);
        assert_eq!(settings.ambient_light, Vec4::new(0.5, 0.5, 0.5, 0.1));
        assert_eq!(settings.near, 0.1);
    }

    #[test]
    fn test_default_settings_match_default_config() {
        let config = ApplicationConfig::default();
        assert_eq!(
            CameraSettings::from_config(&config.camera, &config.renderer),
            CameraSettings::default()
        );
    }
}
