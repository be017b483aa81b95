// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Bind groups, their layouts, and the descriptor pools they are allocated from.

use super::buffer::BufferId;
use super::texture::{SamplerId, TextureViewDimension, TextureViewId};
use bitflags::bitflags;

bitflags! {
    /// Which shader stages can see a binding.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ShaderStages: u32 {
        /// Vertex stage.
        const VERTEX = 1 << 0;
        /// Fragment stage.
        const FRAGMENT = 1 << 1;
        /// Vertex and fragment stages.
        const VERTEX_FRAGMENT = Self::VERTEX.bits() | Self::FRAGMENT.bits();
    }
}

/// The kind of resource a layout entry expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindingType {
    /// A uniform buffer.
    UniformBuffer,
    /// A sampled texture.
    Texture {
        /// The view dimension the shader declares.
        view_dimension: TextureViewDimension,
        /// `true` for depth textures sampled with a comparison sampler.
        depth: bool,
    },
    /// A sampler.
    Sampler {
        /// `true` for comparison samplers.
        comparison: bool,
    },
}

/// One binding slot of a [`BindGroupLayoutDescriptor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BindGroupLayoutEntry {
    /// The binding index in the shader.
    pub binding: u32,
    /// The stages that can access the binding.
    pub visibility: ShaderStages,
    /// The expected resource type.
    pub ty: BindingType,
}

impl BindGroupLayoutEntry {
    /// A uniform buffer binding.
    pub fn uniform(binding: u32, visibility: ShaderStages) -> Self {
        Self {
            binding,
            visibility,
            ty: BindingType::UniformBuffer,
        }
    }

    /// A 2D color texture binding visible to the fragment stage.
    pub fn texture(binding: u32) -> Self {
        Self {
            binding,
            visibility: ShaderStages::FRAGMENT,
            ty: BindingType::Texture {
                view_dimension: TextureViewDimension::D2,
                depth: false,
            },
        }
    }

    /// A filtering sampler binding visible to the fragment stage.
    pub fn sampler(binding: u32) -> Self {
        Self {
            binding,
            visibility: ShaderStages::FRAGMENT,
            ty: BindingType::Sampler { comparison: false },
        }
    }
}

/// A descriptor used to create a [`BindGroupLayoutId`].
#[derive(Debug, Clone)]
pub struct BindGroupLayoutDescriptor<'a> {
    /// An optional debug label.
    pub label: Option<&'a str>,
    /// The bindings in the layout.
    pub entries: &'a [BindGroupLayoutEntry],
}

/// A range of a buffer bound to a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferBinding {
    /// The buffer.
    pub buffer: BufferId,
    /// Byte offset into the buffer.
    pub offset: u64,
    /// Bytes visible to the shader, or `None` for the rest of the buffer.
    pub size: Option<u64>,
}

/// The resource bound to one slot of a bind group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindingResource {
    /// A buffer range.
    Buffer(BufferBinding),
    /// A texture view.
    TextureView(TextureViewId),
    /// A sampler.
    Sampler(SamplerId),
}

/// One bound resource of a [`BindGroupDescriptor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BindGroupEntry {
    /// The binding index, matching a [`BindGroupLayoutEntry::binding`].
    pub binding: u32,
    /// The resource.
    pub resource: BindingResource,
}

impl BindGroupEntry {
    /// Binds a whole buffer.
    pub fn buffer(binding: u32, buffer: BufferId) -> Self {
        Self {
            binding,
            resource: BindingResource::Buffer(BufferBinding {
                buffer,
                offset: 0,
                size: None,
            }),
        }
    }

    /// Binds a texture view.
    pub fn texture_view(binding: u32, view: TextureViewId) -> Self {
        Self {
            binding,
            resource: BindingResource::TextureView(view),
        }
    }

    /// Binds a sampler.
    pub fn sampler(binding: u32, sampler: SamplerId) -> Self {
        Self {
            binding,
            resource: BindingResource::Sampler(sampler),
        }
    }
}

/// A descriptor used to create or rewrite a [`BindGroupId`].
#[derive(Debug, Clone)]
pub struct BindGroupDescriptor<'a> {
    /// An optional debug label.
    pub label: Option<&'a str>,
    /// The layout the group conforms to.
    pub layout: BindGroupLayoutId,
    /// The bound resources.
    pub entries: &'a [BindGroupEntry],
}

/// A descriptor used to create a [`DescriptorPoolId`].
#[derive(Debug, Clone)]
pub struct DescriptorPoolDescriptor<'a> {
    /// An optional debug label.
    pub label: Option<&'a str>,
    /// The layout every set of the pool uses.
    pub layout: BindGroupLayoutId,
    /// The number of sets the pool can hand out.
    pub max_sets: u32,
}

/// An opaque handle to a bind group layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BindGroupLayoutId(pub usize);

/// An opaque handle to a bind group (a descriptor set).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BindGroupId(pub usize);

/// An opaque handle to a fixed-capacity descriptor pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DescriptorPoolId(pub usize);
