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

//! Render pipeline and pipeline layout descriptors.

use super::bind_group::BindGroupLayoutId;
use super::shader::ShaderModuleId;
use super::texture::{CompareFunction, TextureFormat};

/// The format of one vertex attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexFormat {
    /// Two 32-bit floats.
    Float32x2,
    /// Three 32-bit floats.
    Float32x3,
    /// Four 32-bit floats.
    Float32x4,
}

impl VertexFormat {
    /// The size of the attribute in bytes.
    pub fn size(self) -> u64 {
        match self {
            Self::Float32x2 => 8,
            Self::Float32x3 => 12,
            Self::Float32x4 => 16,
        }
    }
}

/// One attribute inside a vertex buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexAttribute {
    /// The attribute format.
    pub format: VertexFormat,
    /// Byte offset from the start of the vertex.
    pub offset: u64,
    /// The `@location` in the shader.
    pub shader_location: u32,
}

/// How a vertex buffer advances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexStepMode {
    /// One element per vertex.
    Vertex,
    /// One element per instance.
    Instance,
}

/// The layout of one vertex buffer slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexBufferLayout<'a> {
    /// Bytes between consecutive elements.
    pub array_stride: u64,
    /// Step mode.
    pub step_mode: VertexStepMode,
    /// The attributes read from each element.
    pub attributes: &'a [VertexAttribute],
}

/// Color blending applied to a color target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendMode {
    /// Overwrite the destination.
    Replace,
    /// Standard `src_alpha, 1 - src_alpha` blending.
    Alpha,
}

/// The state of one color target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ColorTargetState {
    /// The attachment format the pipeline writes.
    pub format: TextureFormat,
    /// Optional blending.
    pub blend: Option<BlendMode>,
}

/// Depth testing state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DepthStencilState {
    /// The depth attachment format.
    pub format: TextureFormat,
    /// Whether passing fragments write depth.
    pub depth_write_enabled: bool,
    /// The depth comparison.
    pub depth_compare: CompareFunction,
}

/// Face culling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CullMode {
    /// Draw both faces.
    None,
    /// Cull front faces. Used by shadow passes to reduce acne.
    Front,
    /// Cull back faces.
    Back,
}

/// A descriptor used to create a [`PipelineLayoutId`].
#[derive(Debug, Clone)]
pub struct PipelineLayoutDescriptor<'a> {
    /// An optional debug label.
    pub label: Option<&'a str>,
    /// The bind group layouts, indexed by group number.
    pub bind_group_layouts: &'a [BindGroupLayoutId],
}

/// A descriptor used to create a [`RenderPipelineId`].
#[derive(Debug, Clone)]
pub struct RenderPipelineDescriptor<'a> {
    /// An optional debug label.
    pub label: Option<&'a str>,
    /// The pipeline layout.
    pub layout: PipelineLayoutId,
    /// The shader module holding both entry points.
    pub shader: ShaderModuleId,
    /// The vertex entry point.
    pub vertex_entry: &'a str,
    /// The fragment entry point. `None` for depth-only pipelines.
    pub fragment_entry: Option<&'a str>,
    /// The vertex buffer layouts.
    pub vertex_buffers: &'a [VertexBufferLayout<'a>],
    /// The color targets. Empty for depth-only pipelines.
    pub color_targets: &'a [ColorTargetState],
    /// Depth testing, if the pass has a depth attachment.
    pub depth_stencil: Option<DepthStencilState>,
    /// Face culling.
    pub cull_mode: CullMode,
    /// The multisample count of the target pass.
    pub sample_count: u32,
}

/// An opaque handle to a pipeline layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PipelineLayoutId(pub usize);

/// An opaque handle to a render pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RenderPipelineId(pub usize);
