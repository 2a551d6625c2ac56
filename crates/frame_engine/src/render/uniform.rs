//! Per-frame global uniform data
//!
//! One [`GlobalUniformBlock`] is built fresh every frame, filled in by the
//! render systems' update phase and copied into the frame slot's uniform
//! buffer. The layout matches the `GlobalUbo` block in the shaders (std140).

use crate::foundation::math::{Mat4, Vec3, Vec4};

use super::camera::Camera;
use super::error::{RenderError, RenderResult};

/// Maximum number of point lights in the uniform block
pub const MAX_LIGHTS: usize = 10;

/// One point light as the shaders see it
#[repr(C, align(16))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointLightRecord {
    /// World position (xyz), billboard radius (w)
    pub position: Vec4,
    /// Color (rgb), intensity (w)
    pub color: Vec4,
}

unsafe impl bytemuck::Pod for PointLightRecord {}
unsafe impl bytemuck::Zeroable for PointLightRecord {}

impl Default for PointLightRecord {
    fn default() -> Self {
        Self {
            position: Vec4::zeros(),
            color: Vec4::zeros(),
        }
    }
}

impl PointLightRecord {
    /// Pack a light at `position`
    pub fn new(position: Vec3, radius: f32, color: Vec3, intensity: f32) -> Self {
        Self {
            position: position.push(radius),
            color: color.push(intensity),
        }
    }

    /// World position
    pub fn position(&self) -> Vec3 {
        self.position.xyz()
    }

    /// Billboard radius
    pub fn radius(&self) -> f32 {
        self.position.w
    }

    /// Color
    pub fn color(&self) -> Vec3 {
        self.color.xyz()
    }

    /// Intensity
    pub fn intensity(&self) -> f32 {
        self.color.w
    }
}

/// Camera matrices, ambient term and point lights for one frame
#[repr(C, align(16))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlobalUniformBlock {
    /// Projection matrix
    pub projection: Mat4,
    /// World-to-view matrix
    pub view: Mat4,
    /// View-to-world matrix
    pub inverse_view: Mat4,
    /// Ambient color (rgb), intensity (w)
    pub ambient_light_color: Vec4,
    /// Light records; only the first `num_lights` are meaningful
    pub point_lights: [PointLightRecord; MAX_LIGHTS],
    /// Active light count
    pub num_lights: u32,
    _padding: [u32; 3],
}

unsafe impl bytemuck::Pod for GlobalUniformBlock {}
unsafe impl bytemuck::Zeroable for GlobalUniformBlock {}

impl Default for GlobalUniformBlock {
    fn default() -> Self {
        Self {
            projection: Mat4::identity(),
            view: Mat4::identity(),
            inverse_view: Mat4::identity(),
            ambient_light_color: Vec4::new(1.0, 1.0, 1.0, 0.02),
            point_lights: [PointLightRecord::default(); MAX_LIGHTS],
            num_lights: 0,
            _padding: [0; 3],
        }
    }
}

impl GlobalUniformBlock {
    /// Size of the block in bytes
    pub const SIZE: u64 = std::mem::size_of::<Self>() as u64;

    /// Block seeded with the camera matrices and ambient term, no lights
    pub fn new(camera: &Camera, ambient_light_color: Vec4) -> Self {
        Self {
            projection: *camera.projection(),
            view: *camera.view(),
            inverse_view: *camera.inverse_view(),
            ambient_light_color,
            ..Self::default()
        }
    }

    /// The populated light records
    pub fn active_lights(&self) -> &[PointLightRecord] {
        let count = (self.num_lights as usize).min(MAX_LIGHTS);
        &self.point_lights[..count]
    }

    /// Append a light record
    ///
    /// Fails without modifying the block when it is already full.
    pub fn push_light(&mut self, record: PointLightRecord) -> RenderResult<()> {
        let index = self.num_lights as usize;
        if index >= MAX_LIGHTS {
            return Err(RenderError::LightCapacityExceeded {
                found: index + 1,
                capacity: MAX_LIGHTS,
            });
        }
        self.point_lights[index] = record;
        self.num_lights += 1;
        Ok(())
    }

    /// Remove all light records
    pub fn clear_lights(&mut self) {
        self.point_lights = [PointLightRecord::default(); MAX_LIGHTS];
        self.num_lights = 0;
    }

    /// Raw bytes for upload
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }

    /// Decode a block from mapped memory
    pub fn from_bytes(bytes: &[u8]) -> RenderResult<Self> {
        bytemuck::try_pod_read_unaligned(bytes).map_err(|_| RenderError::BufferOverflow {
            offset: 0,
            len: Self::SIZE,
            size: bytes.len() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_layout_matches_shader() {
        assert_eq!(std::mem::size_of::<PointLightRecord>(), 32);
        assert_eq!(GlobalUniformBlock::SIZE, 544);
        assert_eq!(std::mem::offset_of!(GlobalUniformBlock, ambient_light_color), 192);
        assert_eq!(std::mem::offset_of!(GlobalUniformBlock, point_lights), 208);
        assert_eq!(std::mem::offset_of!(GlobalUniformBlock, num_lights), 528);
    }

    #[test]
    fn test_push_light_until_full() {
        let mut block = GlobalUniformBlock::default();
        for i in 0..MAX_LIGHTS {
            let record = PointLightRecord::new(Vec3::new(i as f32, 0.0, 0.0), 0.1, Vec3::new(1.0, 1.0, 1.0), 0.2);
            block.push_light(record).unwrap();
        }
        assert_eq!(block.active_lights().len(), MAX_LIGHTS);
        assert_eq!(block.active_lights()[3].position(), Vec3::new(3.0, 0.0, 0.0));

        let overflow = block.push_light(PointLightRecord::default());
        assert!(matches!(
            overflow,
            Err(RenderError::LightCapacityExceeded { found: 11, capacity: MAX_LIGHTS })
        ));
        assert_eq!(block.num_lights as usize, MAX_LIGHTS);

        block.clear_lights();
        assert!(block.active_lights().is_empty());
    }

    #[test]
    fn test_bytes_round_trip() {
        let mut block = GlobalUniformBlock::default();
        block.push_light(PointLightRecord::new(Vec3::new(1.0, -1.0, 2.0), 0.1, Vec3::new(1.0, 0.1, 0.1), 0.2)).unwrap();
        let decoded = GlobalUniformBlock::from_bytes(block.as_bytes()).unwrap();
        assert_eq!(decoded, block);
        assert!(GlobalUniformBlock::from_bytes(&block.as_bytes()[..100]).is_err());
    }
}
