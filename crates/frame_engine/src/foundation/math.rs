//! Math utilities and types
//!
//! Provides the `nalgebra` aliases used across the engine, the scene
//! [`Transform`] and projection helpers for Vulkan's clip space
//! (Y down, depth in `[0, 1]`).

pub use nalgebra::{Vector2, Vector3, Vector4, Matrix3, Matrix4};

/// 2D vector type
pub type Vec2 = Vector2<f32>;

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4D vector type
pub type Vec4 = Vector4<f32>;

/// 3x3 matrix type
pub type Mat3 = Matrix3<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// Orthonormal basis for Tait-Bryan angles applied in Y, X, Z order
///
/// Returns the rotated x, y and z axes; they are the columns of
/// `Ry * Rx * Rz`.
pub fn yxz_basis(rotation: Vec3) -> [Vec3; 3] {
    let (s1, c1) = rotation.y.sin_cos();
    let (s2, c2) = rotation.x.sin_cos();
    let (s3, c3) = rotation.z.sin_cos();
    [
        Vec3::new(c1 * c3 + s1 * s2 * s3, c2 * s3, c1 * s2 * s3 - c3 * s1),
        Vec3::new(c3 * s1 * s2 - c1 * s3, c2 * c3, c1 * c3 * s2 + s1 * s3),
        Vec3::new(c2 * s1, -s2, c1 * c2),
    ]
}

/// Translation, rotation and scale of a scene object
///
/// Rotation is stored as Tait-Bryan angles in radians and applied in
/// Y (yaw), X (pitch), Z (roll) order. Controllers mutate the fields in
/// place; composing them into matrices has no side effects.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    /// Position in world space
    pub translation: Vec3,

    /// Tait-Bryan angles (x = pitch, y = yaw, z = roll)
    pub rotation: Vec3,

    /// Scale factors
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            translation: Vec3::zeros(),
            rotation: Vec3::zeros(),
            scale: Vec3::new(1.0, 1.0, 1.0),
        }
    }
}

impl Transform {
    /// Create a transform with only a translation
    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            ..Default::default()
        }
    }

    /// Set the scale, builder style
    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    /// Set the rotation, builder style
    pub fn with_rotation(mut self, rotation: Vec3) -> Self {
        self.rotation = rotation;
        self
    }

    /// Compose translation * Ry * Rx * Rz * scale into a model matrix
    pub fn to_matrix(&self) -> Mat4 {
        let [x, y, z] = yxz_basis(self.rotation);
        let x = x * self.scale.x;
        let y = y * self.scale.y;
        let z = z * self.scale.z;
        let t = self.translation;
        Mat4::new(
            x.x, y.x, z.x, t.x,
            x.y, y.y, z.y, t.y,
            x.z, y.z, z.z, t.z,
            0.0, 0.0, 0.0, 1.0,
        )
    }

    /// Inverse-transpose of the upper 3x3 of [`Self::to_matrix`]
    ///
    /// Returned as a 4x4 so it can be pushed to shaders without std140
    /// padding concerns.
    pub fn normal_matrix(&self) -> Mat4 {
        let [x, y, z] = yxz_basis(self.rotation);
        let x = x / self.scale.x;
        let y = y / self.scale.y;
        let z = z / self.scale.z;
        Mat4::new(
            x.x, y.x, z.x, 0.0,
            x.y, y.y, z.y, 0.0,
            x.z, y.z, z.z, 0.0,
            0.0, 0.0, 0.0, 1.0,
        )
    }
}

/// Math constants
pub mod constants {
    /// Pi constant
    pub const PI: f32 = std::f32::consts::PI;

    /// 2 * Pi
    pub const TAU: f32 = std::f32::consts::TAU;
}

/// Extension trait for Mat4 with Vulkan projection helpers
pub trait Mat4Ext {
    /// Perspective projection with depth mapped to `[0, 1]`
    fn perspective(fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4;

    /// Orthographic projection with depth mapped to `[0, 1]`
    fn orthographic(left: f32, right: f32, top: f32, bottom: f32, near: f32, far: f32) -> Mat4;
}

impl Mat4Ext for Mat4 {
    fn perspective(fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4 {
        // P = [a⁻¹/tan(φ/2)    0              0          0          ]
        //     [0               1/tan(φ/2)     0          0          ]
        //     [0               0              f/(f-n)    -nf/(f-n)  ]
        //     [0               0              1          0          ]
        let tan_half_fovy = (fov_y * 0.5).tan();

        let mut result = Mat4::zeros();
        result[(0, 0)] = 1.0 / (aspect * tan_half_fovy);
        result[(1, 1)] = 1.0 / tan_half_fovy;
        result[(2, 2)] = far / (far - near);
        result[(2, 3)] = -(near * far) / (far - near);
        result[(3, 2)] = 1.0;
        result
    }

    fn orthographic(left: f32, right: f32, top: f32, bottom: f32, near: f32, far: f32) -> Mat4 {
        let mut result = Mat4::identity();
        result[(0, 0)] = 2.0 / (right - left);
        result[(1, 1)] = 2.0 / (bottom - top);
        result[(2, 2)] = 1.0 / (far - near);
        result[(0, 3)] = -(right + left) / (right - left);
        result[(1, 3)] = -(bottom + top) / (bottom - top);
        result[(2, 3)] = -near / (far - near);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const EPSILON: f32 = 1e-5;

    #[test]
    fn test_identity_transform_matrix() {
        let transform = Transform::default();
        assert_relative_eq!(transform.to_matrix(), Mat4::identity(), epsilon = EPSILON);
        assert_relative_eq!(transform.normal_matrix(), Mat4::identity(), epsilon = EPSILON);
    }

    #[test]
    fn test_translation_and_scale_compose() {
        let transform = Transform::from_translation(Vec3::new(1.0, 2.0, 3.0))
            .with_scale(Vec3::new(2.0, 3.0, 4.0));
        let point = transform.to_matrix().transform_point(&nalgebra::Point3::new(1.0, 1.0, 1.0));
        assert_relative_eq!(point.coords, Vec3::new(3.0, 5.0, 7.0), epsilon = EPSILON);
    }

    #[test]
    fn test_yaw_rotates_forward_axis() {
        // Yaw of +90° turns +Z into +X
        let transform = Transform::default()
            .with_rotation(Vec3::new(0.0, constants::PI / 2.0, 0.0));
        let forward = transform.to_matrix().transform_vector(&Vec3::new(0.0, 0.0, 1.0));
        assert_relative_eq!(forward, Vec3::new(1.0, 0.0, 0.0), epsilon = EPSILON);
    }

    #[test]
    fn test_normal_matrix_is_inverse_transpose() {
        let transform = Transform::from_translation(Vec3::new(4.0, -1.0, 2.0))
            .with_rotation(Vec3::new(0.3, 1.1, -0.4))
            .with_scale(Vec3::new(3.0, 1.5, 0.5));
        let model = transform.to_matrix().fixed_view::<3, 3>(0, 0).into_owned();
        let expected = model.try_inverse().unwrap().transpose();
        let actual = transform.normal_matrix().fixed_view::<3, 3>(0, 0).into_owned();
        assert_relative_eq!(actual, expected, epsilon = 1e-4);
    }

    #[test]
    fn test_perspective_maps_near_and_far_to_unit_depth() {
        let projection = Mat4::perspective(1.0, 1.5, 0.1, 100.0);
        let near = projection * Vec4::new(0.0, 0.0, 0.1, 1.0);
        let far = projection * Vec4::new(0.0, 0.0, 100.0, 1.0);
        assert_relative_eq!(near.z / near.w, 0.0, epsilon = EPSILON);
        assert_relative_eq!(far.z / far.w, 1.0, epsilon = EPSILON);
    }

    #[test]
    fn test_orthographic_maps_box_to_clip_volume() {
        let projection = Mat4::orthographic(-2.0, 2.0, -1.0, 1.0, 0.0, 10.0);
        let corner = projection * Vec4::new(2.0, 1.0, 10.0, 1.0);
        assert_relative_eq!(corner.xyz(), Vec3::new(1.0, 1.0, 1.0), epsilon = EPSILON);
    }
}
