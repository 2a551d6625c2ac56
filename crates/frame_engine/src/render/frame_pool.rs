//! Per-frame resource pool
//!
//! One uniform buffer and one descriptor set per frame slot, all created up
//! front and released together when the pool drops. Slot `i` is only
//! rewritten once the drawing context hands out index `i` again, which it
//! does only after the GPU finished with it.

use super::descriptors::{DescriptorPoolConfig, DescriptorSetLayoutConfig, DescriptorType, ShaderStages};
use super::device::{
    BufferUsage, DescriptorPoolHandle, DescriptorSetHandle, DescriptorSetLayoutHandle, GpuDevice,
    MappedBuffer,
};
use super::error::{RenderError, RenderResult};
use super::uniform::GlobalUniformBlock;

/// Binding number of the global uniform buffer
pub const GLOBAL_UBO_BINDING: u32 = 0;

struct FrameSlot {
    buffer: Box<dyn MappedBuffer>,
    descriptor_set: DescriptorSetHandle,
}

/// Uniform buffers and descriptor sets for every frame in flight
pub struct FrameResourcePool {
    layout: DescriptorSetLayoutHandle,
    descriptor_pool: DescriptorPoolHandle,
    slots: Vec<FrameSlot>,
}

impl FrameResourcePool {
    /// Allocate `capacity` slots on `device`
    pub fn new(device: &dyn GpuDevice, capacity: usize) -> RenderResult<Self> {
        if capacity == 0 {
            return Err(RenderError::InvalidConfiguration(
                "frame resource pool needs at least one slot".to_string(),
            ));
        }
        let set_count = u32::try_from(capacity).map_err(|_| {
            RenderError::InvalidConfiguration(format!("{capacity} frame slots is too many"))
        })?;

        let layout_config = DescriptorSetLayoutConfig::builder()
            .add_uniform_buffer(GLOBAL_UBO_BINDING, ShaderStages::ALL_GRAPHICS)
            .build()?;
        let layout = device.create_descriptor_set_layout(&layout_config)?;

        let pool_config = DescriptorPoolConfig::builder()
            .max_sets(set_count)
            .add_pool_size(DescriptorType::UniformBuffer, set_count)
            .build()?;
        let descriptor_pool = device.create_descriptor_pool(&pool_config)?;

        let mut slots = Vec::with_capacity(capacity);
        for _ in 0..capacity {
            let buffer = device.create_host_buffer(GlobalUniformBlock::SIZE, BufferUsage::UNIFORM)?;
            let descriptor_set = device.allocate_descriptor_set(descriptor_pool, layout)?;
            device.write_descriptor_set(descriptor_set, GLOBAL_UBO_BINDING, &buffer.binding())?;
            slots.push(FrameSlot { buffer, descriptor_set });
        }

        log::debug!(
            "Created frame resource pool with {} slots of {} bytes",
            capacity,
            GlobalUniformBlock::SIZE
        );

        Ok(Self {
            layout,
            descriptor_pool,
            slots,
        })
    }

    fn slot(&self, index: usize) -> RenderResult<&FrameSlot> {
        self.slots.get(index).ok_or(RenderError::InvalidFrameSlot {
            index,
            capacity: self.slots.len(),
        })
    }

    fn slot_mut(&mut self, index: usize) -> RenderResult<&mut FrameSlot> {
        let capacity = self.slots.len();
        self.slots
            .get_mut(index)
            .ok_or(RenderError::InvalidFrameSlot { index, capacity })
    }

    /// Copy `block` into slot `index`'s mapped buffer
    ///
    /// The device may not observe the bytes until [`flush`](Self::flush).
    pub fn write(&mut self, index: usize, block: &GlobalUniformBlock) -> RenderResult<()> {
        self.slot_mut(index)?.buffer.write(0, block.as_bytes())
    }

    /// Make slot `index`'s written bytes visible to the device
    pub fn flush(&mut self, index: usize) -> RenderResult<()> {
        self.slot_mut(index)?.buffer.flush()
    }

    /// Read slot `index` back from its host mapping
    pub fn read_back(&self, index: usize) -> RenderResult<GlobalUniformBlock> {
        let slot = self.slot(index)?;
        let size = usize::try_from(GlobalUniformBlock::SIZE).unwrap_or(usize::MAX);
        let bytes = slot.buffer.mapped().get(..size).ok_or(RenderError::BufferOverflow {
            offset: 0,
            len: GlobalUniformBlock::SIZE,
            size: slot.buffer.size(),
        })?;
        GlobalUniformBlock::from_bytes(bytes)
    }

    /// Descriptor set bound to slot `index`
    pub fn descriptor_set(&self, index: usize) -> RenderResult<DescriptorSetHandle> {
        Ok(self.slot(index)?.descriptor_set)
    }

    /// Layout shared by every slot's descriptor set
    pub fn layout(&self) -> DescriptorSetLayoutHandle {
        self.layout
    }

    /// Pool the sets were allocated from
    pub fn descriptor_pool(&self) -> DescriptorPoolHandle {
        self.descriptor_pool
    }

    /// Number of slots
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::{Vec3, Vec4};
    use crate::render::headless::HeadlessDevice;
    use crate::render::uniform::PointLightRecord;

    #[test]
    fn test_zero_capacity_is_rejected() {
        let device = HeadlessDevice::new();
        assert!(matches!(
            FrameResourcePool::new(&device, 0),
            Err(RenderError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_each_slot_has_its_own_buffer_and_set() {
        let device = HeadlessDevice::new();
        let pool = FrameResourcePool::new(&device, 3).unwrap();
        assert_eq!(pool.capacity(), 3);

        let sets: Vec<_> = (0..3).map(|i| pool.descriptor_set(i).unwrap()).collect();
        assert_ne!(sets[0], sets[1]);
        assert_ne!(sets[1], sets[2]);
        for set in &sets {
            let binding = device.descriptor_binding(*set, GLOBAL_UBO_BINDING).unwrap();
            assert_eq!(binding.range, GlobalUniformBlock::SIZE);
        }
        assert_eq!(device.descriptor_sets_allocated(pool.descriptor_pool()), 3);
    }

    #[test]
    fn test_write_read_back_round_trip() {
        let device = HeadlessDevice::new();
        let mut pool = FrameResourcePool::new(&device, 2).unwrap();

        let mut block = GlobalUniformBlock::default();
        block.ambient_light_color = Vec4::new(0.5, 0.5, 0.5, 0.1);
        block
            .push_light(PointLightRecord::new(Vec3::new(1.0, -1.0, 1.0), 0.1, Vec3::new(1.0, 0.1, 0.1), 0.2))
            .unwrap();

        pool.write(1, &block).unwrap();
        pool.flush(1).unwrap();
        assert_eq!(pool.read_back(1).unwrap(), block);
        // Slot 0 untouched
        assert_eq!(pool.read_back(0).unwrap().num_lights, 0);
    }

    #[test]
    fn test_write_is_not_visible_to_device_before_flush() {
        let device = HeadlessDevice::new();
        let mut pool = FrameResourcePool::new(&device, 1).unwrap();
        let buffer = device.descriptor_binding(pool.descriptor_set(0).unwrap(), 0).unwrap().buffer;

        let mut block = GlobalUniformBlock::default();
        block.ambient_light_color = Vec4::new(0.25, 0.5, 0.75, 1.0);
        pool.write(0, &block).unwrap();

        let before = device.device_contents(buffer).unwrap();
        assert_ne!(&before[..], block.as_bytes());

        pool.flush(0).unwrap();
        let after = device.device_contents(buffer).unwrap();
        assert_eq!(&after[..], block.as_bytes());
    }

    #[test]
    fn test_out_of_range_slot() {
        let device = HeadlessDevice::new();
        let mut pool = FrameResourcePool::new(&device, 2).unwrap();
        assert!(matches!(
            pool.write(2, &GlobalUniformBlock::default()),
            Err(RenderError::InvalidFrameSlot { index: 2, capacity: 2 })
        ));
        assert!(pool.flush(5).is_err());
        assert!(pool.descriptor_set(2).is_err());
    }
}
