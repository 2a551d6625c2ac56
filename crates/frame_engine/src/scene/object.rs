//! Scene objects and their optional light component

use crate::assets::SharedModel;
use crate::foundation::math::{Transform, Vec3};

/// Point light attached to a scene object
///
/// The light sits at the owning object's translation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointLight {
    /// RGB color (0.0 to 1.0 range)
    pub color: Vec3,
    /// Intensity multiplier
    pub intensity: f32,
    /// Billboard radius used when drawing the light
    pub radius: f32,
}

impl PointLight {
    /// Create a point light
    pub fn new(color: Vec3, intensity: f32, radius: f32) -> Self {
        Self { color, intensity, radius }
    }
}

impl Default for PointLight {
    fn default() -> Self {
        Self {
            color: Vec3::new(1.0, 1.0, 1.0),
            intensity: 1.0,
            radius: 0.1,
        }
    }
}

/// An entity in the scene
///
/// An object may carry a mesh, a light, both or neither. The mesh is shared
/// with every other object that loaded the same model.
#[derive(Debug, Clone, Default)]
pub struct SceneObject {
    /// Placement in world space
    pub transform: Transform,
    /// Mesh drawn by the object pass
    pub model: Option<SharedModel>,
    /// Light gathered into the per-frame uniform block
    pub point_light: Option<PointLight>,
}

impl SceneObject {
    /// Object that draws `model` at `transform`
    pub fn with_model(model: SharedModel, transform: Transform) -> Self {
        Self {
            transform,
            model: Some(model),
            point_light: None,
        }
    }

    /// Light-only object positioned at `position`
    pub fn point_light(position: Vec3, light: PointLight) -> Self {
        Self {
            transform: Transform::from_translation(position),
            model: None,
            point_light: Some(light),
        }
    }

    /// Whether the object pass draws this object
    pub fn is_drawable(&self) -> bool {
        self.model.is_some()
    }

    /// Whether this object contributes a light
    pub fn is_light(&self) -> bool {
        self.point_light.is_some()
    }
}
