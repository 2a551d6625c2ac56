//! Headless backend
//!
//! In-memory implementations of every collaborator the frame loop depends
//! on. They perform no GPU work but keep enough state to check how the
//! loop drives them:
//!
//! - [`HeadlessDevice`] models non-coherent memory. Each host buffer has a
//!   separate device view that only changes on flush.
//! - [`HeadlessRenderer`] hands out frame slots round robin and can be
//!   scripted to report "not ready" on chosen iterations.
//! - [`HeadlessWindow`] closes after a fixed number of polls and can hold
//!   scripted keys.
//!
//! Device and renderer append to a shared [`TraceLog`], so the relative
//! order of buffer flushes, passes and draws can be asserted.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::rc::Rc;

use super::descriptors::{DescriptorPoolConfig, DescriptorSetLayoutConfig, ShaderStages};
use super::device::{
    BufferBinding, BufferHandle, BufferUsage, DescriptorPoolHandle, DescriptorSetHandle,
    DescriptorSetLayoutHandle, GpuDevice, GraphicsPipeline, MappedBuffer, MeshBuffers,
    PipelineHandle, PipelineLayoutHandle, RenderPassHandle,
};
use super::error::{RenderError, RenderResult};
use super::frame::{DrawRecorder, FrameRenderer};
use super::pipeline::PipelineConfig;
use crate::assets::MeshData;
use crate::input::{InputSurface, KeyCode};
use crate::window::Window;

/// Recorded command inside a frame
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    /// Pipeline bound
    BindPipeline(PipelineHandle),
    /// Descriptor set bound
    BindDescriptorSet {
        /// Pipeline layout
        layout: PipelineLayoutHandle,
        /// Set number
        set_index: u32,
        /// Bound set
        set: DescriptorSetHandle,
    },
    /// Push constants uploaded
    PushConstants {
        /// Pipeline layout
        layout: PipelineLayoutHandle,
        /// Visible stages
        stages: ShaderStages,
        /// Byte offset
        offset: u32,
        /// Pushed bytes
        bytes: Vec<u8>,
    },
    /// Non-indexed draw
    Draw {
        /// Vertices per instance
        vertex_count: u32,
        /// Instances
        instance_count: u32,
        /// First vertex
        first_vertex: u32,
        /// First instance
        first_instance: u32,
    },
    /// Mesh draw
    DrawMesh(MeshBuffers),
}

/// One observable event
#[derive(Debug, Clone, PartialEq)]
pub enum TraceEvent {
    /// Host bytes written to a mapped buffer
    BufferWrite {
        /// Target buffer
        buffer: BufferHandle,
        /// Byte offset
        offset: u64,
        /// Byte count
        len: u64,
    },
    /// Mapped buffer flushed to the device view
    BufferFlush {
        /// Flushed buffer
        buffer: BufferHandle,
    },
    /// A frame began on `frame_index`
    BeginFrame {
        /// Slot index
        frame_index: usize,
    },
    /// `begin_frame` reported no frame available
    FrameNotReady,
    /// Main pass began
    BeginPass {
        /// Slot index
        frame_index: usize,
    },
    /// A recorded command
    Draw(DrawCommand),
    /// Main pass ended
    EndPass,
    /// Frame submitted on `frame_index`
    EndFrame {
        /// Slot index
        frame_index: usize,
    },
    /// Device drained
    WaitIdle,
    /// Free-form marker
    Marker(String),
}

/// Shared, ordered event log
pub type TraceLog = Rc<RefCell<Vec<TraceEvent>>>;

/// Create an empty trace
pub fn new_trace() -> TraceLog {
    Rc::new(RefCell::new(Vec::new()))
}

fn record(trace: &TraceLog, event: TraceEvent) {
    trace.borrow_mut().push(event);
}

/// Host-visible buffer with a separate device view
struct HeadlessBuffer {
    handle: BufferHandle,
    host: Vec<u8>,
    device_view: Rc<RefCell<Vec<u8>>>,
    trace: TraceLog,
}

impl MappedBuffer for HeadlessBuffer {
    fn size(&self) -> u64 {
        self.host.len() as u64
    }

    fn binding(&self) -> BufferBinding {
        BufferBinding {
            buffer: self.handle,
            offset: 0,
            range: self.size(),
        }
    }

    fn write(&mut self, offset: u64, bytes: &[u8]) -> RenderResult<()> {
        let size = self.size();
        let out_of_range = || RenderError::BufferOverflow {
            offset,
            len: bytes.len() as u64,
            size,
        };
        let start = usize::try_from(offset).map_err(|_| out_of_range())?;
        let end = start
            .checked_add(bytes.len())
            .filter(|end| *end <= self.host.len())
            .ok_or_else(out_of_range)?;

        self.host[start..end].copy_from_slice(bytes);
        record(
            &self.trace,
            TraceEvent::BufferWrite {
                buffer: self.handle,
                offset,
                len: bytes.len() as u64,
            },
        );
        Ok(())
    }

    fn flush(&mut self) -> RenderResult<()> {
        self.device_view.borrow_mut().copy_from_slice(&self.host);
        record(&self.trace, TraceEvent::BufferFlush { buffer: self.handle });
        Ok(())
    }

    fn mapped(&self) -> &[u8] {
        &self.host
    }
}

struct PoolState {
    config: DescriptorPoolConfig,
    allocated: u32,
}

struct SetState {
    layout: DescriptorSetLayoutHandle,
    bindings: HashMap<u32, BufferBinding>,
}

#[derive(Default)]
struct DeviceState {
    host_buffers: HashMap<BufferHandle, Rc<RefCell<Vec<u8>>>>,
    mesh_buffers: HashMap<BufferHandle, u64>,
    allocated_bytes: u64,
    layouts: HashMap<DescriptorSetLayoutHandle, DescriptorSetLayoutConfig>,
    pools: HashMap<DescriptorPoolHandle, PoolState>,
    sets: HashMap<DescriptorSetHandle, SetState>,
    pipelines: HashMap<PipelineHandle, (PipelineConfig, RenderPassHandle)>,
    wait_idle_calls: usize,
}

/// In-memory [`GpuDevice`]
pub struct HeadlessDevice {
    trace: TraceLog,
    next_handle: Cell<u64>,
    memory_budget: Option<u64>,
    state: RefCell<DeviceState>,
}

impl Default for HeadlessDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessDevice {
    /// Device with its own trace and unlimited memory
    pub fn new() -> Self {
        Self::with_trace(new_trace())
    }

    /// Device appending to `trace`
    pub fn with_trace(trace: TraceLog) -> Self {
        Self {
            trace,
            next_handle: Cell::new(1),
            memory_budget: None,
            state: RefCell::new(DeviceState::default()),
        }
    }

    /// Fail allocations once `bytes` of buffer memory are in use
    pub fn with_memory_budget(mut self, bytes: u64) -> Self {
        self.memory_budget = Some(bytes);
        self
    }

    /// The shared trace
    pub fn trace(&self) -> TraceLog {
        Rc::clone(&self.trace)
    }

    fn next(&self) -> u64 {
        let handle = self.next_handle.get();
        self.next_handle.set(handle + 1);
        handle
    }

    fn reserve(&self, state: &mut DeviceState, size: u64) -> RenderResult<()> {
        let total = state.allocated_bytes.saturating_add(size);
        if self.memory_budget.is_some_and(|budget| total > budget) {
            return Err(RenderError::OutOfDeviceMemory { requested: size });
        }
        state.allocated_bytes = total;
        Ok(())
    }

    /// What the device currently sees in a host buffer
    pub fn device_contents(&self, buffer: BufferHandle) -> Option<Vec<u8>> {
        self.state
            .borrow()
            .host_buffers
            .get(&buffer)
            .map(|view| view.borrow().clone())
    }

    /// Host buffers whose owning [`MappedBuffer`] is still alive
    pub fn live_host_buffers(&self) -> usize {
        self.state
            .borrow()
            .host_buffers
            .values()
            .filter(|view| Rc::strong_count(view) > 1)
            .count()
    }

    /// Buffer range bound at `binding` of `set`
    pub fn descriptor_binding(&self, set: DescriptorSetHandle, binding: u32) -> Option<BufferBinding> {
        self.state
            .borrow()
            .sets
            .get(&set)
            .and_then(|state| state.bindings.get(&binding).copied())
    }

    /// Layout a set was allocated with
    pub fn descriptor_set_layout(&self, set: DescriptorSetHandle) -> Option<DescriptorSetLayoutHandle> {
        self.state.borrow().sets.get(&set).map(|state| state.layout)
    }

    /// Sets allocated from `pool`
    pub fn descriptor_sets_allocated(&self, pool: DescriptorPoolHandle) -> u32 {
        self.state.borrow().pools.get(&pool).map_or(0, |state| state.allocated)
    }

    /// Description a pipeline was created from
    pub fn pipeline_config(&self, pipeline: PipelineHandle) -> Option<PipelineConfig> {
        self.state
            .borrow()
            .pipelines
            .get(&pipeline)
            .map(|(config, _)| config.clone())
    }

    /// Render pass a pipeline was created against
    pub fn pipeline_render_pass(&self, pipeline: PipelineHandle) -> Option<RenderPassHandle> {
        self.state.borrow().pipelines.get(&pipeline).map(|(_, pass)| *pass)
    }

    /// Number of `wait_idle` calls so far
    pub fn wait_idle_calls(&self) -> usize {
        self.state.borrow().wait_idle_calls
    }
}

impl GpuDevice for HeadlessDevice {
    fn create_host_buffer(&self, size: u64, usage: BufferUsage) -> RenderResult<Box<dyn MappedBuffer>> {
        if size == 0 {
            return Err(RenderError::InvalidConfiguration("buffer size must be non-zero".to_string()));
        }
        let len = usize::try_from(size).map_err(|_| RenderError::OutOfDeviceMemory { requested: size })?;

        let mut state = self.state.borrow_mut();
        self.reserve(&mut state, size)?;

        let handle = BufferHandle(self.next());
        let device_view = Rc::new(RefCell::new(vec![0; len]));
        state.host_buffers.insert(handle, Rc::clone(&device_view));
        log::trace!("Headless host buffer {handle:?}: {size} bytes, {usage:?}");

        Ok(Box::new(HeadlessBuffer {
            handle,
            host: vec![0; len],
            device_view,
            trace: Rc::clone(&self.trace),
        }))
    }

    fn create_descriptor_set_layout(
        &self,
        config: &DescriptorSetLayoutConfig,
    ) -> RenderResult<DescriptorSetLayoutHandle> {
        let handle = DescriptorSetLayoutHandle(self.next());
        self.state.borrow_mut().layouts.insert(handle, config.clone());
        Ok(handle)
    }

    fn create_descriptor_pool(&self, config: &DescriptorPoolConfig) -> RenderResult<DescriptorPoolHandle> {
        let handle = DescriptorPoolHandle(self.next());
        self.state.borrow_mut().pools.insert(
            handle,
            PoolState {
                config: config.clone(),
                allocated: 0,
            },
        );
        Ok(handle)
    }

    fn allocate_descriptor_set(
        &self,
        pool: DescriptorPoolHandle,
        layout: DescriptorSetLayoutHandle,
    ) -> RenderResult<DescriptorSetHandle> {
        let mut state = self.state.borrow_mut();
        if !state.layouts.contains_key(&layout) {
            return Err(RenderError::UnknownHandle);
        }
        let pool_state = state.pools.get_mut(&pool).ok_or(RenderError::UnknownHandle)?;
        if pool_state.allocated >= pool_state.config.max_sets() {
            return Err(RenderError::InvalidConfiguration(format!(
                "descriptor pool exhausted after {} sets",
                pool_state.allocated
            )));
        }
        pool_state.allocated += 1;

        let handle = DescriptorSetHandle(self.next());
        state.sets.insert(
            handle,
            SetState {
                layout,
                bindings: HashMap::new(),
            },
        );
        Ok(handle)
    }

    fn write_descriptor_set(
        &self,
        set: DescriptorSetHandle,
        binding: u32,
        buffer: &BufferBinding,
    ) -> RenderResult<()> {
        let mut state = self.state.borrow_mut();
        if !state.host_buffers.contains_key(&buffer.buffer) {
            return Err(RenderError::UnknownHandle);
        }
        let layout = state.sets.get(&set).ok_or(RenderError::UnknownHandle)?.layout;
        let declared = state
            .layouts
            .get(&layout)
            .is_some_and(|config| config.bindings().iter().any(|b| b.binding == binding));
        if !declared {
            return Err(RenderError::InvalidConfiguration(format!(
                "binding {binding} is not part of the set's layout"
            )));
        }

        let set_state = state.sets.get_mut(&set).ok_or(RenderError::UnknownHandle)?;
        set_state.bindings.insert(binding, *buffer);
        Ok(())
    }

    fn create_pipeline(
        &self,
        config: &PipelineConfig,
        render_pass: RenderPassHandle,
    ) -> RenderResult<GraphicsPipeline> {
        let mut state = self.state.borrow_mut();
        if config.set_layouts().iter().any(|layout| !state.layouts.contains_key(layout)) {
            return Err(RenderError::UnknownHandle);
        }
        let pipeline = PipelineHandle(self.next());
        let layout = PipelineLayoutHandle(self.next());
        state.pipelines.insert(pipeline, (config.clone(), render_pass));
        log::debug!("Headless pipeline '{}' -> {pipeline:?}", config.name());
        Ok(GraphicsPipeline { pipeline, layout })
    }

    fn upload_mesh(&self, mesh: &MeshData) -> RenderResult<MeshBuffers> {
        let vertex_bytes = std::mem::size_of_val(mesh.vertices.as_slice()) as u64;
        let index_bytes = std::mem::size_of_val(mesh.indices.as_slice()) as u64;
        let vertex_count = u32::try_from(mesh.vertices.len())
            .map_err(|_| RenderError::InvalidConfiguration("too many vertices".to_string()))?;
        let index_count = u32::try_from(mesh.indices.len())
            .map_err(|_| RenderError::InvalidConfiguration("too many indices".to_string()))?;

        let mut state = self.state.borrow_mut();
        self.reserve(&mut state, vertex_bytes + index_bytes)?;

        let vertex_buffer = BufferHandle(self.next());
        state.mesh_buffers.insert(vertex_buffer, vertex_bytes);
        let index_buffer = mesh.is_indexed().then(|| {
            let handle = BufferHandle(self.next());
            state.mesh_buffers.insert(handle, index_bytes);
            handle
        });

        Ok(MeshBuffers {
            vertex_buffer,
            index_buffer,
            vertex_count,
            index_count,
        })
    }

    fn wait_idle(&self) -> RenderResult<()> {
        self.state.borrow_mut().wait_idle_calls += 1;
        record(&self.trace, TraceEvent::WaitIdle);
        Ok(())
    }
}

/// Command recorder that appends to the trace
struct HeadlessRecorder {
    trace: TraceLog,
}

impl DrawRecorder for HeadlessRecorder {
    fn bind_pipeline(&mut self, pipeline: PipelineHandle) {
        record(&self.trace, TraceEvent::Draw(DrawCommand::BindPipeline(pipeline)));
    }

    fn bind_descriptor_set(
        &mut self,
        layout: PipelineLayoutHandle,
        set_index: u32,
        set: DescriptorSetHandle,
    ) {
        record(
            &self.trace,
            TraceEvent::Draw(DrawCommand::BindDescriptorSet { layout, set_index, set }),
        );
    }

    fn push_constants(
        &mut self,
        layout: PipelineLayoutHandle,
        stages: ShaderStages,
        offset: u32,
        bytes: &[u8],
    ) {
        record(
            &self.trace,
            TraceEvent::Draw(DrawCommand::PushConstants {
                layout,
                stages,
                offset,
                bytes: bytes.to_vec(),
            }),
        );
    }

    fn draw(&mut self, vertex_count: u32, instance_count: u32, first_vertex: u32, first_instance: u32) {
        record(
            &self.trace,
            TraceEvent::Draw(DrawCommand::Draw {
                vertex_count,
                instance_count,
                first_vertex,
                first_instance,
            }),
        );
    }

    fn draw_mesh(&mut self, mesh: &MeshBuffers) {
        record(&self.trace, TraceEvent::Draw(DrawCommand::DrawMesh(*mesh)));
    }
}

/// Settings for [`HeadlessRenderer`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadlessRendererConfig {
    /// Number of frame slots
    pub frames_in_flight: usize,
    /// Surface width in pixels
    pub width: u32,
    /// Surface height in pixels
    pub height: u32,
    /// Zero-based `begin_frame` calls that report "not ready"
    pub not_ready_on: Vec<u64>,
    /// Report "not ready" on every n-th `begin_frame` call
    pub not_ready_every: Option<u64>,
}

impl Default for HeadlessRendererConfig {
    fn default() -> Self {
        Self {
            frames_in_flight: 2,
            width: 800,
            height: 600,
            not_ready_on: Vec::new(),
            not_ready_every: None,
        }
    }
}

/// Render pass handle reported by [`HeadlessRenderer`]
pub const HEADLESS_RENDER_PASS: RenderPassHandle = RenderPassHandle(u64::MAX);

/// Scripted [`FrameRenderer`]
///
/// Slots advance round robin on every completed frame. Skipped frames do
/// not advance the slot, matching a swapchain that failed to acquire.
pub struct HeadlessRenderer {
    config: HeadlessRendererConfig,
    trace: TraceLog,
    current_frame: usize,
    begin_calls: u64,
    frame_open: bool,
    pass_open: bool,
    frames_completed: u64,
}

impl HeadlessRenderer {
    /// Renderer with its own trace
    pub fn new(config: HeadlessRendererConfig) -> Self {
        Self::with_trace(config, new_trace())
    }

    /// Renderer appending to `trace`
    pub fn with_trace(config: HeadlessRendererConfig, trace: TraceLog) -> Self {
        Self {
            config,
            trace,
            current_frame: 0,
            begin_calls: 0,
            frame_open: false,
            pass_open: false,
            frames_completed: 0,
        }
    }

    /// The shared trace
    pub fn trace(&self) -> TraceLog {
        Rc::clone(&self.trace)
    }

    /// Frames submitted so far
    pub fn frames_completed(&self) -> u64 {
        self.frames_completed
    }

    fn not_ready(&self, call: u64) -> bool {
        self.config.width == 0
            || self.config.height == 0
            || self.config.not_ready_on.contains(&call)
            || self
                .config
                .not_ready_every
                .is_some_and(|every| every > 0 && (call + 1) % every == 0)
    }
}

impl FrameRenderer for HeadlessRenderer {
    fn render_pass(&self) -> RenderPassHandle {
        HEADLESS_RENDER_PASS
    }

    fn max_frames_in_flight(&self) -> usize {
        self.config.frames_in_flight
    }

    fn aspect_ratio(&self) -> f32 {
        self.config.width as f32 / self.config.height.max(1) as f32
    }

    fn set_extent(&mut self, width: u32, height: u32) {
        self.config.width = width;
        self.config.height = height;
    }

    fn begin_frame(&mut self) -> RenderResult<Option<Box<dyn DrawRecorder>>> {
        if self.frame_open {
            return Err(RenderError::InvalidConfiguration(
                "begin_frame called while a frame is in progress".to_string(),
            ));
        }

        let call = self.begin_calls;
        self.begin_calls += 1;
        if self.not_ready(call) {
            record(&self.trace, TraceEvent::FrameNotReady);
            return Ok(None);
        }

        self.frame_open = true;
        record(
            &self.trace,
            TraceEvent::BeginFrame {
                frame_index: self.current_frame,
            },
        );
        Ok(Some(Box::new(HeadlessRecorder {
            trace: Rc::clone(&self.trace),
        })))
    }

    fn frame_index(&self) -> usize {
        self.current_frame
    }

    fn begin_pass(&mut self, _commands: &mut dyn DrawRecorder) -> RenderResult<()> {
        if !self.frame_open || self.pass_open {
            return Err(RenderError::InvalidConfiguration(
                "begin_pass requires an open frame and no open pass".to_string(),
            ));
        }
        self.pass_open = true;
        record(
            &self.trace,
            TraceEvent::BeginPass {
                frame_index: self.current_frame,
            },
        );
        Ok(())
    }

    fn end_pass(&mut self, _commands: &mut dyn DrawRecorder) -> RenderResult<()> {
        if !self.pass_open {
            return Err(RenderError::InvalidConfiguration("end_pass without begin_pass".to_string()));
        }
        self.pass_open = false;
        record(&self.trace, TraceEvent::EndPass);
        Ok(())
    }

    fn end_frame(&mut self, _commands: Box<dyn DrawRecorder>) -> RenderResult<()> {
        if !self.frame_open || self.pass_open {
            return Err(RenderError::InvalidConfiguration(
                "end_frame requires an open frame with its pass ended".to_string(),
            ));
        }
        record(
            &self.trace,
            TraceEvent::EndFrame {
                frame_index: self.current_frame,
            },
        );
        self.frame_open = false;
        self.frames_completed += 1;
        self.current_frame = (self.current_frame + 1) % self.config.frames_in_flight.max(1);
        Ok(())
    }
}

/// Scripted [`Window`]
///
/// `should_close` turns true after `max_polls` calls to `poll_events`.
pub struct HeadlessWindow {
    max_polls: usize,
    polls: usize,
    close_requested: bool,
    pressed: HashSet<KeyCode>,
    key_script: BTreeMap<usize, HashSet<KeyCode>>,
    framebuffer: Option<(u32, u32)>,
    resize_script: BTreeMap<usize, (u32, u32)>,
}

impl HeadlessWindow {
    /// Window that closes after `max_polls` event pumps
    pub fn new(max_polls: usize) -> Self {
        Self {
            max_polls,
            polls: 0,
            close_requested: false,
            pressed: HashSet::new(),
            key_script: BTreeMap::new(),
            framebuffer: None,
            resize_script: BTreeMap::new(),
        }
    }

    /// Report a drawable size of `width` by `height` from the start
    pub fn with_framebuffer_size(mut self, width: u32, height: u32) -> Self {
        self.framebuffer = Some((width, height));
        self
    }

    /// Change the drawable size when poll number `poll` (zero-based) happens
    pub fn with_resize_at(mut self, poll: usize, width: u32, height: u32) -> Self {
        self.resize_script.insert(poll, (width, height));
        self
    }

    /// Hold `keys` from the start
    pub fn with_keys_held(mut self, keys: &[KeyCode]) -> Self {
        self.pressed = keys.iter().copied().collect();
        self
    }

    /// Replace the held keys when poll number `poll` (zero-based) happens
    pub fn with_keys_at(mut self, poll: usize, keys: &[KeyCode]) -> Self {
        self.key_script.insert(poll, keys.iter().copied().collect());
        self
    }

    /// Ask the window to close at the next check
    pub fn request_close(&mut self) {
        self.close_requested = true;
    }

    /// Number of `poll_events` calls so far
    pub fn polls(&self) -> usize {
        self.polls
    }
}

impl InputSurface for HeadlessWindow {
    fn is_key_pressed(&self, key: KeyCode) -> bool {
        self.pressed.contains(&key)
    }
}

impl Window for HeadlessWindow {
    fn poll_events(&mut self) {
        if let Some(keys) = self.key_script.remove(&self.polls) {
            self.pressed = keys;
        }
        if let Some(size) = self.resize_script.remove(&self.polls) {
            log::debug!("Headless window resized to {}x{}", size.0, size.1);
            self.framebuffer = Some(size);
        }
        self.polls += 1;
        if self.pressed.contains(&KeyCode::Escape) {
            self.close_requested = true;
        }
    }

    fn should_close(&self) -> bool {
        self.close_requested || self.polls >= self.max_polls
    }

    fn input(&self) -> &dyn InputSurface {
        self
    }

    fn framebuffer_size(&self) -> Option<(u32, u32)> {
        self.framebuffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slots_cycle_for_various_capacities() {
        for n in 1..=4 {
            let mut renderer = HeadlessRenderer::new(HeadlessRendererConfig {
                frames_in_flight: n,
                ..Default::default()
            });
            let mut seen = Vec::new();
            for _ in 0..(2 * n + 1) {
                let mut commands = renderer.begin_frame().unwrap().unwrap();
                seen.push(renderer.frame_index());
                renderer.begin_pass(commands.as_mut()).unwrap();
                renderer.end_pass(commands.as_mut()).unwrap();
                renderer.end_frame(commands).unwrap();
            }
            let expected: Vec<_> = (0..(2 * n + 1)).map(|i| i % n).collect();
            assert_eq!(seen, expected, "frames in flight = {n}");
        }
    }

    #[test]
    fn test_not_ready_schedule() {
        let mut renderer = HeadlessRenderer::new(HeadlessRendererConfig {
            not_ready_on: vec![1],
            not_ready_every: Some(4),
            ..Default::default()
        });
        let ready: Vec<_> = (0..8)
            .map(|_| match renderer.begin_frame().unwrap() {
                Some(mut commands) => {
                    renderer.begin_pass(commands.as_mut()).unwrap();
                    renderer.end_pass(commands.as_mut()).unwrap();
                    renderer.end_frame(commands).unwrap();
                    true
                }
                None => false,
            })
            .collect();
        assert_eq!(ready, vec![true, false, true, false, true, true, true, false]);
        assert_eq!(renderer.frames_completed(), 5);
    }

    #[test]
    fn test_zero_extent_is_not_ready_and_aspect_follows_extent() {
        let mut renderer = HeadlessRenderer::new(HeadlessRendererConfig::default());
        assert!((renderer.aspect_ratio() - 800.0 / 600.0).abs() < 1e-6);

        renderer.set_extent(0, 0);
        assert!(renderer.begin_frame().unwrap().is_none());

        renderer.set_extent(1000, 500);
        assert!((renderer.aspect_ratio() - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_end_frame_requires_closed_pass() {
        let mut renderer = HeadlessRenderer::new(HeadlessRendererConfig::default());
        let mut commands = renderer.begin_frame().unwrap().unwrap();
        renderer.begin_pass(commands.as_mut()).unwrap();
        assert!(renderer.end_frame(commands).is_err());
    }

    #[test]
    fn test_device_memory_budget() {
        let device = HeadlessDevice::new().with_memory_budget(1024);
        let first = device.create_host_buffer(600, BufferUsage::UNIFORM);
        assert!(first.is_ok());
        assert!(matches!(
            device.create_host_buffer(600, BufferUsage::UNIFORM),
            Err(RenderError::OutOfDeviceMemory { requested: 600 })
        ));
    }

    #[test]
    fn test_dropping_a_buffer_releases_it() {
        let device = HeadlessDevice::new();
        let buffer = device.create_host_buffer(64, BufferUsage::UNIFORM).unwrap();
        assert_eq!(device.live_host_buffers(), 1);
        drop(buffer);
        assert_eq!(device.live_host_buffers(), 0);
    }

    #[test]
    fn test_buffer_write_bounds() {
        let device = HeadlessDevice::new();
        let mut buffer = device.create_host_buffer(16, BufferUsage::UNIFORM).unwrap();
        assert!(buffer.write(8, &[1; 8]).is_ok());
        assert!(matches!(
            buffer.write(12, &[1; 8]),
            Err(RenderError::BufferOverflow { offset: 12, len: 8, size: 16 })
        ));
    }

    #[test]
    fn test_window_script() {
        let mut window = HeadlessWindow::new(3).with_keys_at(1, &[KeyCode::W]);
        window.poll_events();
        assert!(!window.input().is_key_pressed(KeyCode::W));
        window.poll_events();
        assert!(window.input().is_key_pressed(KeyCode::W));
        assert!(!window.should_close());
        window.poll_events();
        assert!(window.should_close());
    }

    #[test]
    fn test_window_resize_script() {
        assert_eq!(HeadlessWindow::new(1).framebuffer_size(), None);

        let mut window = HeadlessWindow::new(4)
            .with_framebuffer_size(640, 480)
            .with_resize_at(1, 0, 0);
        assert_eq!(window.framebuffer_size(), Some((640, 480)));
        window.poll_events();
        assert_eq!(window.framebuffer_size(), Some((640, 480)));
        window.poll_events();
        assert_eq!(window.framebuffer_size(), Some((0, 0)));
    }
}
