//! Descriptor layout and pool descriptions
//!
//! Backend-neutral builders for the resource binding layout shared by the
//! render systems. Both builders validate in `build()` and produce
//! immutable configs that a [`GpuDevice`](super::GpuDevice) turns into real
//! objects.

use bitflags::bitflags;

use super::error::{RenderError, RenderResult};

bitflags! {
    /// Shader stages a binding or push constant range is visible to
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ShaderStages: u32 {
        /// Vertex stage
        const VERTEX = 1 << 0;
        /// Fragment stage
        const FRAGMENT = 1 << 1;
        /// Every graphics stage
        const ALL_GRAPHICS = Self::VERTEX.bits() | Self::FRAGMENT.bits();
    }
}

/// Kinds of descriptor the engine binds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DescriptorType {
    /// Uniform buffer
    UniformBuffer,
    /// Storage buffer
    StorageBuffer,
}

/// One binding slot in a layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DescriptorBinding {
    /// Binding number
    pub binding: u32,
    /// Descriptor kind
    pub descriptor_type: DescriptorType,
    /// Array size
    pub count: u32,
    /// Visible stages
    pub stages: ShaderStages,
}

/// Immutable descriptor set layout description
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptorSetLayoutConfig {
    bindings: Vec<DescriptorBinding>,
}

impl DescriptorSetLayoutConfig {
    /// Start building a layout
    pub fn builder() -> DescriptorSetLayoutBuilder {
        DescriptorSetLayoutBuilder::default()
    }

    /// Bindings sorted by binding number
    pub fn bindings(&self) -> &[DescriptorBinding] {
        &self.bindings
    }
}

/// Builder for [`DescriptorSetLayoutConfig`]
#[derive(Debug, Default)]
pub struct DescriptorSetLayoutBuilder {
    bindings: Vec<DescriptorBinding>,
}

impl DescriptorSetLayoutBuilder {
    /// Add a binding
    pub fn add_binding(
        mut self,
        binding: u32,
        descriptor_type: DescriptorType,
        stages: ShaderStages,
        count: u32,
    ) -> Self {
        self.bindings.push(DescriptorBinding {
            binding,
            descriptor_type,
            count,
            stages,
        });
        self
    }

    /// Add a single uniform buffer binding
    pub fn add_uniform_buffer(self, binding: u32, stages: ShaderStages) -> Self {
        self.add_binding(binding, DescriptorType::UniformBuffer, stages, 1)
    }

    /// Validate and freeze the layout
    pub fn build(mut self) -> RenderResult<DescriptorSetLayoutConfig> {
        if self.bindings.is_empty() {
            return Err(RenderError::InvalidConfiguration(
                "descriptor set layout needs at least one binding".to_string(),
            ));
        }

        self.bindings.sort_by_key(|b| b.binding);
        if let Some(pair) = self.bindings.windows(2).find(|pair| pair[0].binding == pair[1].binding) {
            return Err(RenderError::InvalidConfiguration(format!(
                "binding {} declared twice",
                pair[0].binding
            )));
        }
        if let Some(b) = self.bindings.iter().find(|b| b.count == 0 || b.stages.is_empty()) {
            return Err(RenderError::InvalidConfiguration(format!(
                "binding {} needs a non-zero count and at least one stage",
                b.binding
            )));
        }

        Ok(DescriptorSetLayoutConfig {
            bindings: self.bindings,
        })
    }
}

/// Number of descriptors of one type a pool can hand out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolSize {
    /// Descriptor kind
    pub descriptor_type: DescriptorType,
    /// Total descriptors of that kind
    pub count: u32,
}

/// Immutable descriptor pool description
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptorPoolConfig {
    max_sets: u32,
    pool_sizes: Vec<PoolSize>,
}

impl DescriptorPoolConfig {
    /// Start building a pool
    pub fn builder() -> DescriptorPoolBuilder {
        DescriptorPoolBuilder::default()
    }

    /// Maximum sets allocatable from the pool
    pub fn max_sets(&self) -> u32 {
        self.max_sets
    }

    /// Descriptor budget per type
    pub fn pool_sizes(&self) -> &[PoolSize] {
        &self.pool_sizes
    }
}

/// Builder for [`DescriptorPoolConfig`]
#[derive(Debug, Default)]
pub struct DescriptorPoolBuilder {
    max_sets: u32,
    pool_sizes: Vec<PoolSize>,
}

impl DescriptorPoolBuilder {
    /// Set the maximum number of sets
    pub fn max_sets(mut self, max_sets: u32) -> Self {
        self.max_sets = max_sets;
        self
    }

    /// Reserve `count` descriptors of `descriptor_type`
    pub fn add_pool_size(mut self, descriptor_type: DescriptorType, count: u32) -> Self {
        match self.pool_sizes.iter_mut().find(|size| size.descriptor_type == descriptor_type) {
            Some(size) => size.count += count,
            None => self.pool_sizes.push(PoolSize { descriptor_type, count }),
        }
        self
    }

    /// Validate and freeze the pool description
    pub fn build(self) -> RenderResult<DescriptorPoolConfig> {
        if self.max_sets == 0 {
            return Err(RenderError::InvalidConfiguration(
                "descriptor pool must allow at least one set".to_string(),
            ));
        }
        if self.pool_sizes.is_empty() || self.pool_sizes.iter().any(|size| size.count == 0) {
            return Err(RenderError::InvalidConfiguration(
                "descriptor pool needs a non-zero size for every descriptor type".to_string(),
            ));
        }

        Ok(DescriptorPoolConfig {
            max_sets: self.max_sets,
            pool_sizes: self.pool_sizes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_bindings_are_sorted() {
        let layout = DescriptorSetLayoutConfig::builder()
            .add_uniform_buffer(2, ShaderStages::FRAGMENT)
            .add_uniform_buffer(0, ShaderStages::ALL_GRAPHICS)
            .build()
            .unwrap();
        let numbers: Vec<_> = layout.bindings().iter().map(|b| b.binding).collect();
        assert_eq!(numbers, vec![0, 2]);
    }

    #[test]
    fn test_layout_rejects_duplicates_and_empty() {
        assert!(DescriptorSetLayoutConfig::builder().build().is_err());

        let duplicate = DescriptorSetLayoutConfig::builder()
            .add_uniform_buffer(0, ShaderStages::VERTEX)
            .add_uniform_buffer(0, ShaderStages::FRAGMENT)
            .build();
        assert!(matches!(duplicate, Err(RenderError::InvalidConfiguration(_))));
    }

    #[test]
    fn test_pool_merges_sizes_and_rejects_zero_sets() {
        let pool = DescriptorPoolConfig::builder()
            .max_sets(3)
            .add_pool_size(DescriptorType::UniformBuffer, 2)
            .add_pool_size(DescriptorType::UniformBuffer, 1)
            .build()
            .unwrap();
        assert_eq!(pool.pool_sizes(), &[PoolSize { descriptor_type: DescriptorType::UniformBuffer, count: 3 }]);

        let empty = DescriptorPoolConfig::builder()
            .add_pool_size(DescriptorType::UniformBuffer, 1)
            .build();
        assert!(empty.is_err());
    }
}
