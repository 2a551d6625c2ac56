//! # Camera
//!
//! Projection and view matrices for Vulkan clip space. Setters are pure:
//! each one overwrites the matrices it owns from its arguments alone, so
//! recomputing them every frame from the same inputs yields bit-identical
//! results.
//!
//! ## Coordinate System
//! - X+ = right, Y+ = down, Z+ = forward (into the screen)
//! - Depth maps to `[0, 1]`

use crate::foundation::math::{yxz_basis, Mat4, Mat4Ext, Vec3};

/// View and projection state
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    projection: Mat4,
    view: Mat4,
    inverse_view: Mat4,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            projection: Mat4::identity(),
            view: Mat4::identity(),
            inverse_view: Mat4::identity(),
        }
    }
}

impl Camera {
    /// Create a camera with identity matrices
    pub fn new() -> Self {
        Self::default()
    }

    /// Orthographic projection of the given view box
    pub fn set_orthographic_projection(
        &mut self,
        left: f32,
        right: f32,
        top: f32,
        bottom: f32,
        near: f32,
        far: f32,
    ) {
        self.projection = Mat4::orthographic(left, right, top, bottom, near, far);
    }

    /// Perspective projection
    ///
    /// `fov_y` is the vertical field of view in radians; `aspect` is
    /// width over height. A zero aspect produces a non-finite matrix.
    pub fn set_perspective_projection(&mut self, fov_y: f32, aspect: f32, near: f32, far: f32) {
        self.projection = Mat4::perspective(fov_y, aspect, near, far);
    }

    /// Look from `position` along `direction`
    ///
    /// `up` defaults to `(0, -1, 0)` in callers since Y points down.
    pub fn set_view_direction(&mut self, position: Vec3, direction: Vec3, up: Vec3) {
        let w = direction.normalize();
        let u = w.cross(&up).normalize();
        let v = w.cross(&u);
        self.set_view_basis(position, u, v, w);
    }

    /// Look from `position` towards `target`
    pub fn set_view_target(&mut self, position: Vec3, target: Vec3, up: Vec3) {
        self.set_view_direction(position, target - position, up);
    }

    /// View from `position` with Tait-Bryan `rotation` applied in Y, X, Z order
    pub fn set_view_yxz(&mut self, position: Vec3, rotation: Vec3) {
        let [u, v, w] = yxz_basis(rotation);
        self.set_view_basis(position, u, v, w);
    }

    fn set_view_basis(&mut self, position: Vec3, u: Vec3, v: Vec3, w: Vec3) {
        self.view = Mat4::new(
            u.x, u.y, u.z, -u.dot(&position),
            v.x, v.y, v.z, -v.dot(&position),
            w.x, w.y, w.z, -w.dot(&position),
            0.0, 0.0, 0.0, 1.0,
        );
        self.inverse_view = Mat4::new(
            u.x, v.x, w.x, position.x,
            u.y, v.y, w.y, position.y,
            u.z, v.z, w.z, position.z,
            0.0, 0.0, 0.0, 1.0,
        );
    }

    /// Projection matrix
    pub fn projection(&self) -> &Mat4 {
        &self.projection
    }

    /// World-to-view matrix
    pub fn view(&self) -> &Mat4 {
        &self.view
    }

    /// View-to-world matrix
    pub fn inverse_view(&self) -> &Mat4 {
        &self.inverse_view
    }

    /// Camera position in world space
    pub fn position(&self) -> Vec3 {
        self.inverse_view.fixed_view::<3, 1>(0, 3).into_owned()
    }
}
