//! Input and viewer navigation
//!
//! The window exposes key state through [`InputSurface`]; a
//! [`NavigationController`] turns that state into motion of the viewer
//! transform once per loop iteration.

use crate::foundation::math::{constants::TAU, Transform, Vec3};

/// Keys the engine reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCode {
    /// A key
    A,
    /// D key
    D,
    /// E key
    E,
    /// Q key
    Q,
    /// S key
    S,
    /// W key
    W,
    /// Escape key
    Escape,
    /// Up arrow
    Up,
    /// Down arrow
    Down,
    /// Left arrow
    Left,
    /// Right arrow
    Right,
}

/// Read-only key state
pub trait InputSurface {
    /// Whether `key` is currently held
    fn is_key_pressed(&self, key: KeyCode) -> bool;
}

/// Moves the viewer in response to input
pub trait NavigationController {
    /// Advance `transform` by `dt` seconds of motion
    fn navigate(&mut self, input: &dyn InputSurface, dt: f32, transform: &mut Transform);
}

/// Key bindings for [`KeyboardMovementController`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyMappings {
    /// Strafe left
    pub move_left: KeyCode,
    /// Strafe right
    pub move_right: KeyCode,
    /// Move forward
    pub move_forward: KeyCode,
    /// Move backward
    pub move_backward: KeyCode,
    /// Move up
    pub move_up: KeyCode,
    /// Move down
    pub move_down: KeyCode,
    /// Turn left
    pub look_left: KeyCode,
    /// Turn right
    pub look_right: KeyCode,
    /// Pitch up
    pub look_up: KeyCode,
    /// Pitch down
    pub look_down: KeyCode,
}

impl Default for KeyMappings {
    fn default() -> Self {
        Self {
            move_left: KeyCode::A,
            move_right: KeyCode::D,
            move_forward: KeyCode::W,
            move_backward: KeyCode::S,
            move_up: KeyCode::E,
            move_down: KeyCode::Q,
            look_left: KeyCode::Left,
            look_right: KeyCode::Right,
            look_up: KeyCode::Up,
            look_down: KeyCode::Down,
        }
    }
}

/// Pitch is clamped to this many radians either side of level
pub const PITCH_LIMIT: f32 = 1.5;

/// Fly-through camera driven by WASD/QE movement and arrow-key look
///
/// Movement happens in the horizontal plane relative to the current yaw,
/// plus straight up and down. Y points down, so "up" is `-Y`.
#[derive(Debug, Clone)]
pub struct KeyboardMovementController {
    /// Key bindings
    pub keys: KeyMappings,
    /// Units per second
    pub move_speed: f32,
    /// Radians per second
    pub look_speed: f32,
}

impl Default for KeyboardMovementController {
    fn default() -> Self {
        Self {
            keys: KeyMappings::default(),
            move_speed: 3.0,
            look_speed: 1.5,
        }
    }
}

fn axis(input: &dyn InputSurface, positive: KeyCode, negative: KeyCode) -> f32 {
    f32::from(u8::from(input.is_key_pressed(positive))) - f32::from(u8::from(input.is_key_pressed(negative)))
}

impl NavigationController for KeyboardMovementController {
    fn navigate(&mut self, input: &dyn InputSurface, dt: f32, transform: &mut Transform) {
        let keys = self.keys;

        let rotate = Vec3::new(
            axis(input, keys.look_up, keys.look_down),
            axis(input, keys.look_right, keys.look_left),
            0.0,
        );
        if rotate.norm_squared() > f32::EPSILON {
            transform.rotation += self.look_speed * dt * rotate.normalize();
        }

        transform.rotation.x = transform.rotation.x.clamp(-PITCH_LIMIT, PITCH_LIMIT);
        transform.rotation.y = transform.rotation.y.rem_euclid(TAU);

        let yaw = transform.rotation.y;
        let forward = Vec3::new(yaw.sin(), 0.0, yaw.cos());
        let right = Vec3::new(forward.z, 0.0, -forward.x);
        let up = Vec3::new(0.0, -1.0, 0.0);

        let direction = forward * axis(input, keys.move_forward, keys.move_backward)
            + right * axis(input, keys.move_right, keys.move_left)
            + up * axis(input, keys.move_up, keys.move_down);
        if direction.norm_squared() > f32::EPSILON {
            transform.translation += self.move_speed * dt * direction.normalize();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::collections::HashSet;

    const EPSILON: f32 = 1e-5;

    struct Keys(HashSet<KeyCode>);

    impl Keys {
        fn held(keys: &[KeyCode]) -> Self {
            Self(keys.iter().copied().collect())
        }
    }

    impl InputSurface for Keys {
        fn is_key_pressed(&self, key: KeyCode) -> bool {
            self.0.contains(&key)
        }
    }

    #[test]
    fn test_no_input_leaves_transform_unchanged() {
        let mut controller = KeyboardMovementController::default();
        let mut transform = Transform::from_translation(Vec3::new(0.0, 0.0, -2.5));
        controller.navigate(&Keys::held(&[]), 0.016, &mut transform);
        assert_eq!(transform.translation, Vec3::new(0.0, 0.0, -2.5));
        assert_eq!(transform.rotation, Vec3::zeros());
    }

    #[test]
    fn test_forward_follows_yaw() {
        let mut controller = KeyboardMovementController::default();
        let mut transform = Transform::default();
        transform.rotation.y = std::f32::consts::FRAC_PI_2;

        controller.navigate(&Keys::held(&[KeyCode::W]), 0.5, &mut transform);
        assert_relative_eq!(transform.translation, Vec3::new(1.5, 0.0, 0.0), epsilon = EPSILON);
    }

    #[test]
    fn test_diagonal_movement_is_normalized() {
        let mut controller = KeyboardMovementController::default();
        let mut transform = Transform::default();
        controller.navigate(&Keys::held(&[KeyCode::W, KeyCode::D]), 1.0, &mut transform);
        assert_relative_eq!(transform.translation.norm(), 3.0, epsilon = EPSILON);
    }

    #[test]
    fn test_up_is_negative_y() {
        let mut controller = KeyboardMovementController::default();
        let mut transform = Transform::default();
        controller.navigate(&Keys::held(&[KeyCode::E]), 1.0, &mut transform);
        assert_relative_eq!(transform.translation, Vec3::new(0.0, -3.0, 0.0), epsilon = EPSILON);
    }

    #[test]
    fn test_pitch_is_clamped_and_yaw_wraps() {
        let mut controller = KeyboardMovementController::default();
        let mut transform = Transform::default();
        controller.navigate(&Keys::held(&[KeyCode::Up]), 10.0, &mut transform);
        assert_relative_eq!(transform.rotation.x, PITCH_LIMIT, epsilon = EPSILON);

        let mut transform = Transform::default();
        controller.navigate(&Keys::held(&[KeyCode::Left]), 1.0, &mut transform);
        assert_relative_eq!(transform.rotation.y, TAU - 1.5, epsilon = 1e-4);
    }
}
