//! Frame loop behavior observed through the headless backend

mod common;

use approx::assert_relative_eq;
use common::*;

use frame_engine::foundation::math::Vec3;
use frame_engine::prelude::*;
use frame_engine::render::device::DescriptorSetHandle;
use frame_engine::render::headless::{DrawCommand, TraceEvent};

fn keyboard() -> Box<dyn NavigationController> {
    Box::new(KeyboardMovementController::default())
}

#[test]
fn test_slots_are_used_round_robin() {
    for n in 1..=4 {
        let device = HeadlessDevice::new();
        let trace = device.trace();
        let config = HeadlessRendererConfig {
            frames_in_flight: n,
            ..Default::default()
        };
        let mut renderer = HeadlessRenderer::with_trace(config, device.trace());
        let mut window = HeadlessWindow::new(2 * n + 1);
        let pool = FrameResourcePool::new(&device, n).unwrap();
        let sets: Vec<DescriptorSetHandle> = (0..n).map(|i| pool.descriptor_set(i).unwrap()).collect();
        let systems = standard_systems(&device, renderer.render_pass(), &pool);
        let scene = light_ring_scene(2);

        {
            let mut orchestrator = FrameOrchestrator::new(
                &mut window,
                &mut renderer,
                &device,
                pool,
                systems,
                keyboard(),
                CameraSettings::default(),
            );
            orchestrator.run(&scene).unwrap();
            assert_eq!(orchestrator.stats().frames_rendered, (2 * n + 1) as u64);
        }

        let expected: Vec<usize> = (0..2 * n + 1).map(|i| i % n).collect();
        assert_eq!(begun_slots(&trace), expected, "{n} frames in flight");

        // Both systems bind the set belonging to the frame's slot
        let bound: Vec<DescriptorSetHandle> = events(&trace)
            .into_iter()
            .filter_map(|event| match event {
                TraceEvent::Draw(DrawCommand::BindDescriptorSet { set, .. }) => Some(set),
                _ => None,
            })
            .collect();
        assert_eq!(bound.len(), 2 * expected.len());
        for (frame, slot) in expected.iter().enumerate() {
            assert_eq!(bound[2 * frame], sets[*slot]);
            assert_eq!(bound[2 * frame + 1], sets[*slot]);
        }
    }
}

#[test]
fn test_six_light_ring_is_published_in_store_order() {
    let device = HeadlessDevice::new();
    let trace = device.trace();
    let mut renderer = HeadlessRenderer::with_trace(HeadlessRendererConfig::default(), device.trace());
    let mut window = HeadlessWindow::new(1);
    let pool = FrameResourcePool::new(&device, 2).unwrap();
    let set = pool.descriptor_set(0).unwrap();
    let systems = standard_systems(&device, renderer.render_pass(), &pool);
    let scene = light_ring_scene(6);

    let mut orchestrator = FrameOrchestrator::new(
        &mut window,
        &mut renderer,
        &device,
        pool,
        systems,
        keyboard(),
        CameraSettings::default(),
    );
    orchestrator.run(&scene).unwrap();

    let block = orchestrator.frame_pool().read_back(0).unwrap();
    assert_eq!(block.num_lights, 6);
    for (i, record) in block.active_lights().iter().enumerate() {
        let [r, g, b] = RING_COLORS[i];
        assert_relative_eq!(record.position(), ring_position(i, 6), epsilon = 1e-6);
        assert_eq!(record.color(), Vec3::new(r, g, b));
        assert_relative_eq!(record.intensity(), 0.2);
        assert_relative_eq!(record.radius(), 0.1);
    }

    // First light sits at (-1,-1,-1); the fourth is opposite it
    assert_relative_eq!(block.point_lights[0].position(), Vec3::new(-1.0, -1.0, -1.0), epsilon = 1e-6);
    assert_relative_eq!(block.point_lights[3].position(), Vec3::new(1.0, -1.0, 1.0), epsilon = 1e-5);

    assert_eq!(block.projection, *orchestrator.camera().projection());
    assert_eq!(block.view, *orchestrator.camera().view());

    // The device sees exactly what was written
    let buffer = device.descriptor_binding(set, 0).unwrap().buffer;
    assert_eq!(device.device_contents(buffer).unwrap(), block.as_bytes());

    let billboards = events(&trace)
        .iter()
        .filter(|event| matches!(event, TraceEvent::Draw(DrawCommand::Draw { vertex_count: 6, .. })))
        .count();
    assert_eq!(billboards, 6);
}

#[test]
fn test_updates_and_flush_precede_render_phase() {
    let device = HeadlessDevice::new();
    let trace = device.trace();
    let mut renderer = HeadlessRenderer::with_trace(HeadlessRendererConfig::default(), device.trace());
    let mut window = HeadlessWindow::new(1);
    let pool = FrameResourcePool::new(&device, 2).unwrap();
    let systems: Vec<Box<dyn RenderSystem>> = vec![
        Box::new(MarkerSystem::new("first", device.trace())),
        Box::new(MarkerSystem::new("second", device.trace())),
    ];

    let mut orchestrator = FrameOrchestrator::new(
        &mut window,
        &mut renderer,
        &device,
        pool,
        systems,
        keyboard(),
        CameraSettings::default(),
    );
    orchestrator.run(&SceneStore::new()).unwrap();

    let events = events(&trace);
    let position = |wanted: &TraceEvent| events.iter().position(|event| event == wanted).unwrap();
    let marker = |name: &str| position(&TraceEvent::Marker(name.to_string()));

    let begin_frame = position(&TraceEvent::BeginFrame { frame_index: 0 });
    let write = events
        .iter()
        .position(|event| matches!(event, TraceEvent::BufferWrite { .. }))
        .unwrap();
    let flush = events
        .iter()
        .position(|event| matches!(event, TraceEvent::BufferFlush { .. }))
        .unwrap();
    let begin_pass = position(&TraceEvent::BeginPass { frame_index: 0 });
    let end_pass = position(&TraceEvent::EndPass);
    let end_frame = position(&TraceEvent::EndFrame { frame_index: 0 });

    let order = [
        begin_frame,
        marker("update:first"),
        marker("update:second"),
        write,
        flush,
        begin_pass,
        marker("render:first"),
        marker("render:second"),
        end_pass,
        end_frame,
    ];
    assert!(order.windows(2).all(|pair| pair[0] < pair[1]), "unexpected order: {order:?}");
}

#[test]
fn test_skipped_frame_touches_nothing_and_keeps_frame_time() {
    let device = HeadlessDevice::new();
    let trace = device.trace();
    let config = HeadlessRendererConfig {
        not_ready_on: vec![1],
        ..Default::default()
    };
    let mut renderer = HeadlessRenderer::with_trace(config, device.trace());
    let mut window = HeadlessWindow::new(usize::MAX);
    let pool = FrameResourcePool::new(&device, 2).unwrap();
    let slot1_buffer = device
        .descriptor_binding(pool.descriptor_set(1).unwrap(), 0)
        .unwrap()
        .buffer;
    let marker = MarkerSystem::new("marker", device.trace());
    let observed = std::rc::Rc::clone(&marker.observed);
    let clock = ManualClock::new();
    let scene = light_ring_scene(3);

    let mut orchestrator = FrameOrchestrator::new(
        &mut window,
        &mut renderer,
        &device,
        pool,
        vec![Box::new(marker)],
        keyboard(),
        CameraSettings::default(),
    )
    .with_clock(Box::new(clock.clone()));

    clock.advance(10);
    assert_eq!(
        orchestrator.run_frame(&scene).unwrap(),
        FrameOutcome::Rendered { frame_index: 0 }
    );

    clock.advance(10);
    let events_before = trace.borrow().len();
    let device_view_before = device.device_contents(slot1_buffer).unwrap();
    assert_eq!(orchestrator.run_frame(&scene).unwrap(), FrameOutcome::Skipped);

    // Only the not-ready notice was recorded
    assert_eq!(&trace.borrow()[events_before..], &[TraceEvent::FrameNotReady]);
    assert_eq!(device.device_contents(slot1_buffer).unwrap(), device_view_before);
    assert_eq!(observed.borrow().len(), 1);

    clock.advance(10);
    assert_eq!(
        orchestrator.run_frame(&scene).unwrap(),
        FrameOutcome::Rendered { frame_index: 1 }
    );

    let observed = observed.borrow();
    assert_eq!(observed.len(), 2);
    assert_relative_eq!(observed[0].frame_time, 0.010, epsilon = 1e-6);
    // Measured from the last rendered frame, across the skipped iteration
    assert_relative_eq!(observed[1].frame_time, 0.020, epsilon = 1e-6);
    assert_eq!(observed[1].frame_index, 1);

    let stats = orchestrator.stats();
    assert_eq!(stats.iterations, 3);
    assert_eq!(stats.frames_rendered, 2);
    assert_eq!(stats.frames_skipped, 1);
}

#[test]
fn test_device_is_idle_before_run_returns() {
    let device = HeadlessDevice::new();
    let trace = device.trace();
    let mut renderer = HeadlessRenderer::with_trace(HeadlessRendererConfig::default(), device.trace());
    let mut window = HeadlessWindow::new(3);
    let pool = FrameResourcePool::new(&device, 2).unwrap();
    let systems = standard_systems(&device, renderer.render_pass(), &pool);

    let mut orchestrator = FrameOrchestrator::new(
        &mut window,
        &mut renderer,
        &device,
        pool,
        systems,
        keyboard(),
        CameraSettings::default(),
    );
    orchestrator.run(&light_ring_scene(6)).unwrap();

    assert_eq!(device.wait_idle_calls(), 1);
    assert_eq!(trace.borrow().last(), Some(&TraceEvent::WaitIdle));
}

#[test]
fn test_light_overflow_stops_the_loop_after_draining() {
    let device = HeadlessDevice::new();
    let trace = device.trace();
    let mut renderer = HeadlessRenderer::with_trace(HeadlessRendererConfig::default(), device.trace());
    let mut window = HeadlessWindow::new(5);
    let pool = FrameResourcePool::new(&device, 2).unwrap();
    let systems = standard_systems(&device, renderer.render_pass(), &pool);

    let mut orchestrator = FrameOrchestrator::new(
        &mut window,
        &mut renderer,
        &device,
        pool,
        systems,
        keyboard(),
        CameraSettings::default(),
    );
    let result = orchestrator.run(&light_ring_scene(MAX_LIGHTS + 1));

    assert!(matches!(
        result,
        Err(RenderError::LightCapacityExceeded { found: 11, capacity: MAX_LIGHTS })
    ));
    assert_eq!(orchestrator.stats().iterations, 0);
    assert_eq!(device.wait_idle_calls(), 1);
    assert_eq!(events(&trace), vec![TraceEvent::WaitIdle]);
}

#[test]
fn test_light_overflow_mid_run_is_fatal() {
    let device = HeadlessDevice::new();
    let mut renderer = HeadlessRenderer::with_trace(HeadlessRendererConfig::default(), device.trace());
    let mut window = HeadlessWindow::new(5);
    let pool = FrameResourcePool::new(&device, 2).unwrap();
    let systems = standard_systems(&device, renderer.render_pass(), &pool);

    let mut orchestrator = FrameOrchestrator::new(
        &mut window,
        &mut renderer,
        &device,
        pool,
        systems,
        keyboard(),
        CameraSettings::default(),
    );

    // Pre-flight is skipped when frames are driven one at a time
    let result = orchestrator.run_frame(&light_ring_scene(MAX_LIGHTS + 1));
    assert!(matches!(result, Err(RenderError::LightCapacityExceeded { .. })));
    assert_eq!(orchestrator.stats().frames_rendered, 0);
}

#[test]
fn test_undersized_pool_is_rejected_before_the_loop() {
    let device = HeadlessDevice::new();
    let config = HeadlessRendererConfig {
        frames_in_flight: 3,
        ..Default::default()
    };
    let mut renderer = HeadlessRenderer::with_trace(config, device.trace());
    let mut window = HeadlessWindow::new(5);
    let pool = FrameResourcePool::new(&device, 2).unwrap();

    let mut orchestrator = FrameOrchestrator::new(
        &mut window,
        &mut renderer,
        &device,
        pool,
        Vec::new(),
        keyboard(),
        CameraSettings::default(),
    );
    assert!(matches!(
        orchestrator.run(&SceneStore::new()),
        Err(RenderError::InvalidConfiguration(_))
    ));
    assert_eq!(device.wait_idle_calls(), 1);
}

#[test]
fn test_window_resize_reaches_the_projection() {
    let device = HeadlessDevice::new();
    let mut renderer = HeadlessRenderer::with_trace(HeadlessRendererConfig::default(), device.trace());
    let mut window = HeadlessWindow::new(2)
        .with_framebuffer_size(800, 600)
        .with_resize_at(1, 1600, 600);
    let pool = FrameResourcePool::new(&device, 2).unwrap();

    let mut orchestrator = FrameOrchestrator::new(
        &mut window,
        &mut renderer,
        &device,
        pool,
        Vec::new(),
        keyboard(),
        CameraSettings::default(),
    );
    orchestrator.run(&SceneStore::new()).unwrap();

    let before = orchestrator.frame_pool().read_back(0).unwrap().projection;
    let after = orchestrator.frame_pool().read_back(1).unwrap().projection;
    assert_eq!(*orchestrator.camera().projection(), after);

    assert_relative_eq!(after[(0, 0)] * 2.0, before[(0, 0)], epsilon = 1e-6);
    for row in 0..4 {
        for col in 0..4 {
            if (row, col) != (0, 0) {
                assert_eq!(after[(row, col)], before[(row, col)]);
            }
        }
    }
}

#[test]
fn test_zero_sized_surface_skips_the_frame() {
    let device = HeadlessDevice::new();
    let trace = device.trace();
    let config = HeadlessRendererConfig {
        width: 0,
        height: 0,
        ..Default::default()
    };
    let mut renderer = HeadlessRenderer::with_trace(config, device.trace());
    let mut window = HeadlessWindow::new(usize::MAX);
    let pool = FrameResourcePool::new(&device, 2).unwrap();

    let mut orchestrator = FrameOrchestrator::new(
        &mut window,
        &mut renderer,
        &device,
        pool,
        Vec::new(),
        keyboard(),
        CameraSettings::default(),
    );

    let outcome = orchestrator.run_frame(&SceneStore::new()).unwrap();
    assert_eq!(outcome, FrameOutcome::Skipped);
    assert_eq!(*orchestrator.camera().projection(), Mat4::identity());
    assert_eq!(events(&trace), vec![TraceEvent::FrameNotReady]);
}

#[test]
fn test_minimized_window_keeps_the_last_projection() {
    let device = HeadlessDevice::new();
    let trace = device.trace();
    let mut renderer = HeadlessRenderer::with_trace(HeadlessRendererConfig::default(), device.trace());
    let mut window = HeadlessWindow::new(3)
        .with_framebuffer_size(800, 600)
        .with_resize_at(1, 0, 0)
        .with_resize_at(2, 800, 600);
    let pool = FrameResourcePool::new(&device, 2).unwrap();

    let mut orchestrator = FrameOrchestrator::new(
        &mut window,
        &mut renderer,
        &device,
        pool,
        Vec::new(),
        keyboard(),
        CameraSettings::default(),
    );
    orchestrator.run(&SceneStore::new()).unwrap();

    let stats = orchestrator.stats();
    assert_eq!(stats.frames_rendered, 2);
    assert_eq!(stats.frames_skipped, 1);
    assert_eq!(begun_slots(&trace), vec![0, 1]);
    assert!(events(&trace).contains(&TraceEvent::FrameNotReady));

    let first = orchestrator.frame_pool().read_back(0).unwrap().projection;
    let second = orchestrator.frame_pool().read_back(1).unwrap().projection;
    assert!(second.iter().all(|value| value.is_finite()));
    assert_eq!(first, second);
}

#[test]
fn test_navigation_moves_the_viewer() {
    let device = HeadlessDevice::new();
    let mut renderer = HeadlessRenderer::with_trace(HeadlessRendererConfig::default(), device.trace());
    let mut window = HeadlessWindow::new(usize::MAX).with_keys_held(&[KeyCode::W]);
    let pool = FrameResourcePool::new(&device, 2).unwrap();
    let clock = ManualClock::new();
    let start = Transform::from_translation(Vec3::new(0.0, 0.0, -2.5));

    let mut orchestrator = FrameOrchestrator::new(
        &mut window,
        &mut renderer,
        &device,
        pool,
        Vec::new(),
        keyboard(),
        CameraSettings::default(),
    )
    .with_clock(Box::new(clock.clone()))
    .with_viewer(start);

    clock.advance(500);
    orchestrator.run_frame(&SceneStore::new()).unwrap();

    assert_relative_eq!(orchestrator.viewer().translation, Vec3::new(0.0, 0.0, -1.0), epsilon = 1e-5);
    assert_relative_eq!(orchestrator.camera().position(), Vec3::new(0.0, 0.0, -1.0), epsilon = 1e-5);
}

#[test]
fn test_escape_closes_the_window() {
    let device = HeadlessDevice::new();
    let mut renderer = HeadlessRenderer::with_trace(HeadlessRendererConfig::default(), device.trace());
    let mut window = HeadlessWindow::new(100).with_keys_at(3, &[KeyCode::Escape]);
    let pool = FrameResourcePool::new(&device, 2).unwrap();

    {
        let mut orchestrator = FrameOrchestrator::new(
            &mut window,
            &mut renderer,
            &device,
            pool,
            Vec::new(),
            keyboard(),
            CameraSettings::default(),
        );
        orchestrator.run(&SceneStore::new()).unwrap();
        // Escape is seen on the fourth poll, which still runs its frame
        assert_eq!(orchestrator.stats().iterations, 4);
    }
    assert_eq!(window.polls(), 4);
    assert_eq!(renderer.frames_completed(), 4);
}
