//! Demo scene: two vases on a floor quad, ringed by six point lights

use std::path::Path;

use frame_engine::assets::{AssetError, ModelLoader};
use frame_engine::foundation::math::{constants::TAU, yxz_basis, Transform, Vec3};
use frame_engine::scene::{ObjectId, PointLight, SceneObject, SceneStore};

/// Light colors, one per ring position
pub const LIGHT_COLORS: [[f32; 3]; 6] = [
    [1.0, 0.1, 0.1],
    [0.1, 0.1, 1.0],
    [0.1, 1.0, 0.1],
    [1.0, 1.0, 0.1],
    [0.1, 1.0, 1.0],
    [1.0, 1.0, 1.0],
];

const LIGHT_INTENSITY: f32 = 0.2;
const LIGHT_RADIUS: f32 = 0.1;

/// Build the demo scene, loading models through `loader`
pub fn load_scene(loader: &dyn ModelLoader) -> Result<SceneStore, AssetError> {
    let mut scene = SceneStore::new();

    let models = [
        ("smooth_vase.obj", Vec3::new(-0.5, 0.5, 0.0), Vec3::new(3.0, 1.5, 3.0)),
        ("flat_vase.obj", Vec3::new(0.5, 0.5, 0.0), Vec3::new(3.0, 1.5, 3.0)),
        ("quad.obj", Vec3::new(0.0, 0.5, 0.0), Vec3::new(3.0, 1.0, 3.0)),
    ];
    for (file, translation, scale) in models {
        let model = loader.load(Path::new(file))?;
        scene.insert(SceneObject::with_model(
            model,
            Transform::from_translation(translation).with_scale(scale),
        ));
    }

    seed_light_ring(&mut scene);
    log::info!(
        "Scene ready: {} objects, {} point lights",
        scene.len(),
        scene.point_light_count()
    );
    Ok(scene)
}

/// Light `i` of `count`: `(-1,-1,-1)` turned `i/count` of a full turn about `-Y`
pub fn ring_position(i: usize, count: usize) -> Vec3 {
    let angle = i as f32 * TAU / count as f32;
    // A turn about -Y is the inverse turn about +Y
    let [right, up, forward] = yxz_basis(Vec3::new(0.0, -angle, 0.0));
    -(right + up + forward)
}

/// Insert one light per entry of [`LIGHT_COLORS`], evenly spaced on the ring
pub fn seed_light_ring(scene: &mut SceneStore) -> Vec<ObjectId> {
    let count = LIGHT_COLORS.len();
    LIGHT_COLORS
        .iter()
        .enumerate()
        .map(|(i, &[r, g, b])| {
            let light = PointLight::new(Vec3::new(r, g, b), LIGHT_INTENSITY, LIGHT_RADIUS);
            scene.insert(SceneObject::point_light(ring_position(i, count), light))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use frame_engine::assets::DeviceModelLoader;
    use frame_engine::render::headless::HeadlessDevice;

    fn models_dir() -> &'static str {
        concat!(env!("CARGO_MANIFEST_DIR"), "/resources/models")
    }

    #[test]
    fn test_ring_positions() {
        assert_relative_eq!(ring_position(0, 6), Vec3::new(-1.0, -1.0, -1.0), epsilon = 1e-6);
        assert_relative_eq!(ring_position(3, 6), Vec3::new(1.0, -1.0, 1.0), epsilon = 1e-5);
        for i in 0..6 {
            let p = ring_position(i, 6);
            assert_relative_eq!(p.y, -1.0, epsilon = 1e-6);
            assert_relative_eq!(p.xz().norm(), std::f32::consts::SQRT_2, epsilon = 1e-5);
        }
    }

    #[test]
    fn test_scene_has_three_models_and_six_lights() {
        let device = HeadlessDevice::new();
        let loader = DeviceModelLoader::new(&device, models_dir());
        let scene = load_scene(&loader).unwrap();

        assert_eq!(scene.len(), 9);
        assert_eq!(scene.drawables().count(), 3);
        assert_eq!(scene.point_light_count(), 6);

        let names: Vec<&str> = scene.drawables().map(|(_, _, model)| model.name()).collect();
        assert_eq!(names, vec!["smooth_vase", "flat_vase", "quad"]);

        for (i, (_, transform, light)) in scene.point_lights().enumerate() {
            let [r, g, b] = LIGHT_COLORS[i];
            assert_eq!(light.color, Vec3::new(r, g, b));
            assert_relative_eq!(light.intensity, 0.2);
            assert_relative_eq!(light.radius, 0.1);
            assert_relative_eq!(transform.translation, ring_position(i, 6), epsilon = 1e-6);
        }
    }

    #[test]
    fn test_smooth_vase_stands_left_of_flat_vase() {
        let device = HeadlessDevice::new();
        let loader = DeviceModelLoader::new(&device, models_dir());
        let scene = load_scene(&loader).unwrap();

        let placed: Vec<(&str, Vec3, Vec3)> = scene
            .drawables()
            .map(|(_, transform, model)| (model.name(), transform.translation, transform.scale))
            .collect();
        assert_eq!(placed[0].0, "smooth_vase");
        assert_relative_eq!(placed[0].1, Vec3::new(-0.5, 0.5, 0.0));
        assert_eq!(placed[1].0, "flat_vase");
        assert_relative_eq!(placed[1].1, Vec3::new(0.5, 0.5, 0.0));
        assert_relative_eq!(placed[1].2, Vec3::new(3.0, 1.5, 3.0));
        assert_eq!(placed[2].0, "quad");
        assert_relative_eq!(placed[2].2, Vec3::new(3.0, 1.0, 3.0));
    }

    #[test]
    fn test_missing_model_is_an_error() {
        let device = HeadlessDevice::new();
        let loader = DeviceModelLoader::new(&device, "does/not/exist");
        assert!(load_scene(&loader).is_err());
    }
}
