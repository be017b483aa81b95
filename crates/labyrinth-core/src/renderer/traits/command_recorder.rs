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

use crate::renderer::api::{
    BindGroupId, BufferId, CommandBufferId, IndexFormat, RenderPassDescriptor, RenderPipelineId,
    TextureToBufferCopy,
};
use std::any::Any;
use std::ops::Range;

/// A trait representing an active render pass, used for recording drawing commands.
///
/// A `RenderPass` object is obtained from a [`CommandEncoder`] and borrows it
/// until dropped, which ends the pass.
pub trait RenderPass {
    /// Sets the active render pipeline for subsequent draw calls.
    fn set_pipeline(&mut self, pipeline: RenderPipelineId);

    /// Binds a bind group to the given group index.
    fn set_bind_group(&mut self, index: u32, bind_group: BindGroupId, offsets: &[u32]);

    /// Binds a vertex buffer to a specific slot.
    fn set_vertex_buffer(&mut self, slot: u32, buffer: BufferId, offset: u64);

    /// Binds an index buffer for indexed drawing.
    fn set_index_buffer(&mut self, buffer: BufferId, offset: u64, index_format: IndexFormat);

    /// Restricts rasterization to a rectangle of the attachments.
    fn set_viewport(&mut self, x: f32, y: f32, width: f32, height: f32);

    /// Records an indexed draw call.
    fn draw_indexed(&mut self, indices: Range<u32>, base_vertex: i32, instances: Range<u32>);
}

/// A trait for an object that records a sequence of GPU commands.
///
/// A `CommandEncoder` is the main tool for building a [`CommandBufferId`]. It
/// creates render passes and records copies that happen outside of a pass.
pub trait CommandEncoder {
    /// Begins a new render pass.
    ///
    /// The returned `RenderPass` borrows the encoder mutably, so only one pass can
    /// be active at a time. Dropping it ends the pass.
    fn begin_render_pass<'encoder>(
        &'encoder mut self,
        descriptor: &RenderPassDescriptor<'_>,
    ) -> Box<dyn RenderPass + 'encoder>;

    /// Records a copy of a texture's first layer into a buffer.
    fn copy_texture_to_buffer(&mut self, copy: &TextureToBufferCopy);

    /// Finalizes the command recording and returns a handle to the resulting command buffer.
    fn finish(self: Box<Self>) -> CommandBufferId;

    /// Returns a mutable reference to the underlying trait object as `Any`.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}
