//! Point light gathering and billboard rendering

use super::RenderSystem;
use crate::core::config::ShaderConfig;
use crate::foundation::math::Vec4;
use crate::render::descriptors::ShaderStages;
use crate::render::device::{DescriptorSetLayoutHandle, GpuDevice, GraphicsPipeline, RenderPassHandle};
use crate::render::error::{RenderError, RenderResult};
use crate::render::frame::FrameContext;
use crate::render::pipeline::{PipelineConfig, VertexInput};
use crate::render::uniform::{GlobalUniformBlock, PointLightRecord, MAX_LIGHTS};
use crate::scene::SceneStore;

/// Vertices in one camera-facing quad
const BILLBOARD_VERTICES: u32 = 6;

/// Per-light push constants
#[repr(C, align(16))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointLightPushConstants {
    /// World position, w unused
    pub position: Vec4,
    /// Color (rgb) and intensity (w)
    pub color: Vec4,
    /// Billboard radius
    pub radius: f32,
    _padding: [f32; 3],
}

unsafe impl bytemuck::Pod for PointLightPushConstants {}
unsafe impl bytemuck::Zeroable for PointLightPushConstants {}

impl PointLightPushConstants {
    const SIZE: u32 = std::mem::size_of::<Self>() as u32;
    const STAGES: ShaderStages = ShaderStages::ALL_GRAPHICS;

    fn from_record(record: &PointLightRecord) -> Self {
        Self {
            position: record.position().push(1.0),
            color: record.color,
            radius: record.radius(),
            _padding: [0.0; 3],
        }
    }
}

/// Publishes scene lights into the uniform block and draws them as billboards
pub struct PointLightSystem {
    pipeline: GraphicsPipeline,
}

impl PointLightSystem {
    /// Build the billboard pipeline against `render_pass` and the global layout
    pub fn new(
        device: &dyn GpuDevice,
        render_pass: RenderPassHandle,
        global_layout: DescriptorSetLayoutHandle,
        shaders: &ShaderConfig,
    ) -> RenderResult<Self> {
        let config = PipelineConfig::builder("point_lights")
            .shaders(shaders.clone())
            .vertex_input(VertexInput::None)
            .depth_test(true)
            .alpha_blend(true)
            .push_constant(PointLightPushConstants::STAGES, PointLightPushConstants::SIZE)
            .set_layout(global_layout)
            .build()?;
        let pipeline = device.create_pipeline(&config, render_pass)?;
        log::debug!("Point light system ready: {pipeline:?}");
        Ok(Self { pipeline })
    }

    /// Pipeline used for drawing
    pub fn pipeline(&self) -> GraphicsPipeline {
        self.pipeline
    }

    fn check_capacity(scene: &SceneStore) -> RenderResult<()> {
        let found = scene.point_light_count();
        if found > MAX_LIGHTS {
            return Err(RenderError::LightCapacityExceeded {
                found,
                capacity: MAX_LIGHTS,
            });
        }
        Ok(())
    }
}

impl RenderSystem for PointLightSystem {
    fn name(&self) -> &'static str {
        "point_lights"
    }

    fn validate(&self, scene: &SceneStore) -> RenderResult<()> {
        Self::check_capacity(scene)
    }

    fn update(&mut self, frame: &FrameContext<'_>, uniforms: &mut GlobalUniformBlock) -> RenderResult<()> {
        Self::check_capacity(frame.scene)?;

        uniforms.clear_lights();
        for (_, transform, light) in frame.scene.point_lights() {
            uniforms.push_light(PointLightRecord::new(
                transform.translation,
                light.radius,
                light.color,
                light.intensity,
            ))?;
        }
        log::trace!("Frame {}: published {} point lights", frame.frame_index, uniforms.num_lights);
        Ok(())
    }

    fn render(&mut self, frame: &mut FrameContext<'_>, uniforms: &GlobalUniformBlock) -> RenderResult<()> {
        let commands = &mut *frame.commands;
        commands.bind_pipeline(self.pipeline.pipeline);
        commands.bind_descriptor_set(self.pipeline.layout, 0, frame.global_descriptor_set);

        for record in uniforms.active_lights() {
            let push = PointLightPushConstants::from_record(record);
            commands.push_constants(
                self.pipeline.layout,
                PointLightPushConstants::STAGES,
                0,
                bytemuck::bytes_of(&push),
            );
            commands.draw(BILLBOARD_VERTICES, 1, 0, 0);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Vec3;
    use crate::render::camera::Camera;
    use crate::render::frame::{DrawRecorder, FrameRenderer};
    use crate::render::frame_pool::FrameResourcePool;
    use crate::render::headless::{
        DrawCommand, HeadlessDevice, HeadlessRenderer, HeadlessRendererConfig, TraceEvent,
    };
    use crate::scene::{PointLight, SceneObject};

    struct Fixture {
        device: HeadlessDevice,
        renderer: HeadlessRenderer,
        system: PointLightSystem,
    }

    fn fixture() -> Fixture {
        let device = HeadlessDevice::new();
        let renderer = HeadlessRenderer::with_trace(HeadlessRendererConfig::default(), device.trace());
        let pool = FrameResourcePool::new(&device, 1).unwrap();
        let system = PointLightSystem::new(
            &device,
            renderer.render_pass(),
            pool.layout(),
            &ShaderConfig::point_light_shaders(),
        )
        .unwrap();
        Fixture { device, renderer, system }
    }

    fn scene_with_lights(count: usize) -> SceneStore {
        let mut scene = SceneStore::new();
        for i in 0..count {
            let light = PointLight::new(Vec3::new(1.0, 0.1, 0.1), 0.2, 0.1);
            scene.insert(SceneObject::point_light(Vec3::new(i as f32, -1.0, 0.0), light));
        }
        scene
    }

    fn context<'a>(
        commands: &'a mut dyn DrawRecorder,
        camera: &'a Camera,
        scene: &'a SceneStore,
    ) -> FrameContext<'a> {
        FrameContext {
            frame_index: 0,
            frame_time: 0.016,
            commands,
            camera,
            global_descriptor_set: crate::render::device::DescriptorSetHandle(0),
            scene,
        }
    }

    #[test]
    fn test_push_constant_block_is_48_bytes() {
        assert_eq!(PointLightPushConstants::SIZE, 48);
    }

    #[test]
    fn test_update_writes_records_in_store_order() {
        let Fixture { mut renderer, mut system, .. } = fixture();
        let scene = scene_with_lights(4);
        let camera = Camera::new();
        let mut commands = renderer.begin_frame().unwrap().unwrap();
        let frame = context(commands.as_mut(), &camera, &scene);

        let mut block = GlobalUniformBlock::default();
        system.update(&frame, &mut block).unwrap();

        assert_eq!(block.num_lights, 4);
        for (i, record) in block.active_lights().iter().enumerate() {
            assert_eq!(record.position(), Vec3::new(i as f32, -1.0, 0.0));
            assert_eq!(record.radius(), 0.1);
            assert_eq!(record.intensity(), 0.2);
        }
        assert_eq!(block.point_lights[4], PointLightRecord::default());
    }

    #[test]
    fn test_too_many_lights_is_an_error() {
        let Fixture { mut renderer, mut system, .. } = fixture();
        let scene = scene_with_lights(MAX_LIGHTS + 1);
        assert!(matches!(
            system.validate(&scene),
            Err(RenderError::LightCapacityExceeded { found: 11, capacity: MAX_LIGHTS })
        ));

        let camera = Camera::new();
        let mut commands = renderer.begin_frame().unwrap().unwrap();
        let frame = context(commands.as_mut(), &camera, &scene);
        let mut block = GlobalUniformBlock::default();
        assert!(system.update(&frame, &mut block).is_err());
    }

    #[test]
    fn test_exactly_max_lights_is_accepted() {
        let Fixture { system, .. } = fixture();
        assert!(system.validate(&scene_with_lights(MAX_LIGHTS)).is_ok());
    }

    #[test]
    fn test_render_draws_one_billboard_per_published_record() {
        let Fixture { device, mut renderer, mut system } = fixture();
        // Lights come from the block only, the scene is ignored
        let scene = SceneStore::new();
        let mut block = GlobalUniformBlock::default();
        for i in 0..3 {
            block
                .push_light(PointLightRecord::new(Vec3::new(i as f32, 0.0, 0.0), 0.1, Vec3::new(1.0, 1.0, 1.0), 0.2))
                .unwrap();
        }

        let camera = Camera::new();
        let mut commands = renderer.begin_frame().unwrap().unwrap();
        let mut frame = context(commands.as_mut(), &camera, &scene);
        system.render(&mut frame, &block).unwrap();

        let draws = device
            .trace()
            .borrow()
            .iter()
            .filter(|event| {
                matches!(
                    event,
                    TraceEvent::Draw(DrawCommand::Draw { vertex_count: 6, instance_count: 1, .. })
                )
            })
            .count();
        assert_eq!(draws, 3);
    }
}
