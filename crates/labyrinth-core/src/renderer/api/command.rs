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

//! Descriptors for render passes, copies and recorded command buffers.

use super::buffer::BufferId;
use super::texture::{TextureId, TextureViewId};

/// Describes the operation to perform on an attachment at the start of a render pass.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum LoadOp<V> {
    /// The existing contents of the attachment will be loaded into the pass.
    Load,
    /// The attachment will be cleared to the specified value before the pass begins.
    Clear(V),
}

/// Describes the operation to perform on an attachment at the end of a render pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreOp {
    /// The results of the render pass will be stored to the attachment's memory.
    Store,
    /// The results of the render pass will be discarded.
    Discard,
}

/// Defines the load and store operations for a single render pass attachment.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Operations<V> {
    /// The operation to perform at the beginning of the pass.
    pub load: LoadOp<V>,
    /// The operation to perform at the end of the pass.
    pub store: StoreOp,
}

impl<V> Operations<V> {
    /// Clear on load and keep the result.
    pub fn clear(value: V) -> Self {
        Self {
            load: LoadOp::Clear(value),
            store: StoreOp::Store,
        }
    }
}

/// A color attachment of a render pass.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderPassColorAttachment {
    /// The [`TextureViewId`] that will be rendered to.
    pub view: TextureViewId,
    /// Receives the resolved output when `view` is multisampled.
    pub resolve_target: Option<TextureViewId>,
    /// The load and store operations, with an RGBA clear value.
    pub ops: Operations<[f32; 4]>,
}

/// The depth attachment of a render pass.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderPassDepthStencilAttachment {
    /// The [`TextureViewId`] for the depth texture.
    pub view: TextureViewId,
    /// The load and store operations for the depth aspect.
    pub depth_ops: Operations<f32>,
}

/// A descriptor for a render pass.
#[derive(Debug, Default)]
pub struct RenderPassDescriptor<'a> {
    /// An optional debug label for the render pass.
    pub label: Option<&'a str>,
    /// A slice of color attachments to be used in the pass.
    pub color_attachments: &'a [RenderPassColorAttachment],
    /// An optional depth attachment for this pass.
    pub depth_stencil_attachment: Option<RenderPassDepthStencilAttachment>,
}

/// Required alignment of [`TextureToBufferCopy::bytes_per_row`].
pub const COPY_BYTES_PER_ROW_ALIGNMENT: u32 = 256;

/// The destination of a texture-to-buffer copy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TextureToBufferCopy {
    /// The source texture.
    pub texture: TextureId,
    /// The destination buffer.
    pub buffer: BufferId,
    /// Bytes between rows in the destination buffer.
    pub bytes_per_row: u32,
    /// Copied width in texels.
    pub width: u32,
    /// Copied height in texels.
    pub height: u32,
}

/// An opaque handle to a recorded command buffer that is ready for submission.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct CommandBufferId(pub u64);
