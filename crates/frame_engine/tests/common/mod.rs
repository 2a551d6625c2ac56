//! Shared fixtures for the frame loop integration tests

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::{Duration, Instant};

use frame_engine::core::config::ShaderConfig;
use frame_engine::foundation::math::Vec3;
use frame_engine::render::headless::{TraceEvent, TraceLog};
use frame_engine::render::device::RenderPassHandle;
use frame_engine::prelude::*;

/// Clock advanced by hand
#[derive(Clone)]
pub struct ManualClock(Rc<Cell<Instant>>);

impl ManualClock {
    pub fn new() -> Self {
        Self(Rc::new(Cell::new(Instant::now())))
    }

    pub fn advance(&self, millis: u64) {
        self.0.set(self.0.get() + Duration::from_millis(millis));
    }
}

impl MonotonicClock for ManualClock {
    fn now(&self) -> Instant {
        self.0.get()
    }
}

/// What a [`MarkerSystem`] saw during `update`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observed {
    pub frame_index: usize,
    pub frame_time: f32,
    pub num_lights: u32,
}

/// Render system that leaves markers in the trace and records what it saw
pub struct MarkerSystem {
    name: &'static str,
    trace: TraceLog,
    pub observed: Rc<RefCell<Vec<Observed>>>,
}

impl MarkerSystem {
    pub fn new(name: &'static str, trace: TraceLog) -> Self {
        Self {
            name,
            trace,
            observed: Rc::new(RefCell::new(Vec::new())),
        }
    }
}

impl RenderSystem for MarkerSystem {
    fn name(&self) -> &'static str {
        self.name
    }

    fn update(&mut self, frame: &FrameContext<'_>, uniforms: &mut GlobalUniformBlock) -> RenderResult<()> {
        self.trace
            .borrow_mut()
            .push(TraceEvent::Marker(format!("update:{}", self.name)));
        self.observed.borrow_mut().push(Observed {
            frame_index: frame.frame_index,
            frame_time: frame.frame_time,
            num_lights: uniforms.num_lights,
        });
        Ok(())
    }

    fn render(&mut self, _frame: &mut FrameContext<'_>, _uniforms: &GlobalUniformBlock) -> RenderResult<()> {
        self.trace
            .borrow_mut()
            .push(TraceEvent::Marker(format!("render:{}", self.name)));
        Ok(())
    }
}

/// The standard object then light system pair
pub fn standard_systems(
    device: &HeadlessDevice,
    render_pass: RenderPassHandle,
    pool: &FrameResourcePool,
) -> Vec<Box<dyn RenderSystem>> {
    let objects =
        ObjectRenderSystem::new(device, render_pass, pool.layout(), &ShaderConfig::object_shaders()).unwrap();
    let lights =
        PointLightSystem::new(device, render_pass, pool.layout(), &ShaderConfig::point_light_shaders()).unwrap();
    vec![Box::new(objects), Box::new(lights)]
}

/// Colors of the six-light ring
pub const RING_COLORS: [[f32; 3]; 6] = [
    [1.0, 0.1, 0.1],
    [0.1, 0.1, 1.0],
    [0.1, 1.0, 0.1],
    [1.0, 1.0, 0.1],
    [0.1, 1.0, 1.0],
    [1.0, 1.0, 1.0],
];

/// Position of light `i` of `count` in the ring around the vertical axis
pub fn ring_position(i: usize, count: usize) -> Vec3 {
    let axis = nalgebra::Vector3::y_axis();
    let angle = -(i as f32) * std::f32::consts::TAU / count as f32;
    nalgebra::Rotation3::from_axis_angle(&axis, angle) * Vec3::new(-1.0, -1.0, -1.0)
}

/// Scene holding `count` ring lights (intensity 0.2, radius 0.1)
pub fn light_ring_scene(count: usize) -> SceneStore {
    let mut scene = SceneStore::new();
    for i in 0..count {
        let [r, g, b] = RING_COLORS[i % RING_COLORS.len()];
        let light = PointLight::new(Vec3::new(r, g, b), 0.2, 0.1);
        scene.insert(SceneObject::point_light(ring_position(i, count), light));
    }
    scene
}

/// Events in `trace`, cloned
pub fn events(trace: &TraceLog) -> Vec<TraceEvent> {
    trace.borrow().clone()
}

/// Slot indices of every `BeginFrame` in `trace`
pub fn begun_slots(trace: &TraceLog) -> Vec<usize> {
    trace
        .borrow()
        .iter()
        .filter_map(|event| match event {
            TraceEvent::BeginFrame { frame_index } => Some(*frame_index),
            _ => None,
        })
        .collect()
}
