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

//! Defines data structures for textures, texture views and samplers.

use bitflags::bitflags;
use std::borrow::Cow;

/// The memory layout of a single texel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureFormat {
    /// 8-bit RGBA, normalised to `[0, 1]`.
    Rgba8Unorm,
    /// 8-bit RGBA in the sRGB color space.
    Rgba8UnormSrgb,
    /// 8-bit BGRA in the sRGB color space, common for swapchains.
    Bgra8UnormSrgb,
    /// Four 32-bit floats per texel. Used for CPU readback.
    Rgba32Float,
    /// One 32-bit float per texel.
    R32Float,
    /// 32-bit float depth.
    Depth32Float,
    /// 24-bit depth with an 8-bit stencil.
    Depth24PlusStencil8,
}

impl TextureFormat {
    /// Returns `true` for depth (and depth/stencil) formats.
    pub fn is_depth(self) -> bool {
        matches!(self, Self::Depth32Float | Self::Depth24PlusStencil8)
    }

    /// The size of one texel in bytes.
    pub fn bytes_per_texel(self) -> u32 {
        match self {
            Self::Rgba8Unorm | Self::Rgba8UnormSrgb | Self::Bgra8UnormSrgb => 4,
            Self::Rgba32Float => 16,
            Self::R32Float | Self::Depth32Float | Self::Depth24PlusStencil8 => 4,
        }
    }
}

bitflags! {
    /// How a texture may be used after creation.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TextureUsage: u32 {
        /// The texture can be the source of a copy.
        const COPY_SRC = 1 << 0;
        /// The texture can be the destination of a copy.
        const COPY_DST = 1 << 1;
        /// The texture can be sampled from a shader.
        const TEXTURE_BINDING = 1 << 2;
        /// The texture can be a color or depth attachment of a render pass.
        const RENDER_ATTACHMENT = 1 << 3;
    }
}

/// The size of a texture. `depth_or_array_layers` is the array layer count for 2D textures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Extent3d {
    /// Width in texels.
    pub width: u32,
    /// Height in texels.
    pub height: u32,
    /// Number of array layers.
    pub depth_or_array_layers: u32,
}

impl Extent3d {
    /// A single-layer 2D extent.
    pub fn new_2d(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            depth_or_array_layers: 1,
        }
    }
}

/// A descriptor used to create a [`TextureId`].
#[derive(Debug, Clone)]
pub struct TextureDescriptor<'a> {
    /// An optional debug label.
    pub label: Option<Cow<'a, str>>,
    /// The size of the texture.
    pub size: Extent3d,
    /// The texel format.
    pub format: TextureFormat,
    /// The allowed usages.
    pub usage: TextureUsage,
    /// The multisample count. 1 for no multisampling.
    pub sample_count: u32,
}

/// How a texture view interprets the texture's layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureViewDimension {
    /// A single 2D layer.
    D2,
    /// A range of 2D layers addressed as an array.
    D2Array,
}

/// A descriptor used to create a [`TextureViewId`].
#[derive(Debug, Clone)]
pub struct TextureViewDescriptor<'a> {
    /// An optional debug label.
    pub label: Option<Cow<'a, str>>,
    /// The view dimension.
    pub dimension: TextureViewDimension,
    /// The first array layer visible through the view.
    pub base_array_layer: u32,
    /// The number of layers, or `None` for all remaining layers.
    pub array_layer_count: Option<u32>,
}

impl Default for TextureViewDescriptor<'_> {
    fn default() -> Self {
        Self {
            label: None,
            dimension: TextureViewDimension::D2,
            base_array_layer: 0,
            array_layer_count: None,
        }
    }
}

/// Texel filtering for a sampler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterMode {
    /// Take the nearest texel.
    Nearest,
    /// Blend the surrounding texels.
    Linear,
}

/// What a sampler does with coordinates outside `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressMode {
    /// Clamp to the edge texel.
    ClampToEdge,
    /// Tile the texture.
    Repeat,
}

/// A comparison used by depth tests and comparison samplers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareFunction {
    /// Passes if the new value is less than the stored one.
    Less,
    /// Passes if the new value is less than or equal to the stored one.
    LessEqual,
    /// Passes if the new value is greater than the stored one.
    Greater,
    /// Always passes.
    Always,
}

/// A descriptor used to create a [`SamplerId`].
#[derive(Debug, Clone)]
pub struct SamplerDescriptor<'a> {
    /// An optional debug label.
    pub label: Option<Cow<'a, str>>,
    /// Minification and magnification filter.
    pub filter: FilterMode,
    /// Addressing for all three coordinates.
    pub address_mode: AddressMode,
    /// Set for shadow-map comparison samplers.
    pub compare: Option<CompareFunction>,
}

/// An opaque handle to a GPU texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(pub usize);

/// An opaque handle to a view into a texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureViewId(pub usize);

/// An opaque handle to a sampler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SamplerId(pub usize);
