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

use crate::renderer::api::*;
use crate::renderer::error::{RenderError, ResourceError};
use crate::renderer::traits::CommandEncoder;
use std::fmt::Debug;

/// The device capability object the renderer builds every GPU resource through.
///
/// Every creation either returns a valid handle or fails with a [`ResourceError`];
/// there is no partially-constructed state. Handles stay valid until the matching
/// `destroy_*` call.
pub trait GraphicsDevice: Send + Sync + Debug + 'static {
    /// Creates a shader module from the provided descriptor.
    /// ## Arguments
    /// * `descriptor` - A reference to a `ShaderModuleDescriptor` containing the shader source and other properties.
    /// ## Returns
    /// A `Result` containing the ID of the created shader module or an error if the creation fails.
    /// ## Errors
    /// * `ResourceError` - If the shader module creation fails.
    fn create_shader_module(
        &self,
        descriptor: &ShaderModuleDescriptor,
    ) -> Result<ShaderModuleId, ResourceError>;

    /// Destroys the shader module associated with the given ID.
    /// ## Arguments
    /// * `id` - The ID of the shader module to be destroyed.
    /// ## Errors
    /// * `ResourceError` - If the ID is unknown.
    fn destroy_shader_module(&self, id: ShaderModuleId) -> Result<(), ResourceError>;

    /// Creates a render pipeline from the provided descriptor.
    /// ## Arguments
    /// * `descriptor` - A reference to a `RenderPipelineDescriptor` containing the pipeline configuration.
    /// ## Returns
    /// A `Result` containing the ID of the created render pipeline or an error if the creation fails.
    /// ## Errors
    /// * `ResourceError` - If the render pipeline creation fails.
    fn create_render_pipeline(
        &self,
        descriptor: &RenderPipelineDescriptor,
    ) -> Result<RenderPipelineId, ResourceError>;

    /// Destroys the render pipeline associated with the given ID.
    fn destroy_render_pipeline(&self, id: RenderPipelineId) -> Result<(), ResourceError>;

    /// Creates a pipeline layout from the provided descriptor.
    /// ## Arguments
    /// * `descriptor` - A reference to a `PipelineLayoutDescriptor` listing the bind group layouts.
    /// ## Returns
    /// A `Result` containing the ID of the created pipeline layout or an error if the creation fails.
    fn create_pipeline_layout(
        &self,
        descriptor: &PipelineLayoutDescriptor,
    ) -> Result<PipelineLayoutId, ResourceError>;

    /// Destroys a pipeline layout.
    fn destroy_pipeline_layout(&self, id: PipelineLayoutId) -> Result<(), ResourceError>;

    /// Creates a new GPU buffer.
    /// ## Arguments
    /// * `descriptor` - A reference to a `BufferDescriptor` containing the buffer configuration.
    /// ## Returns
    /// A `Result` containing the ID of the created buffer or an error if the creation fails.
    fn create_buffer(&self, descriptor: &BufferDescriptor) -> Result<BufferId, ResourceError>;

    /// Creates a new GPU buffer and initializes it with the provided data.
    /// ## Arguments
    /// * `descriptor` - A reference to a `BufferDescriptor` containing the buffer configuration.
    /// * `data` - The initial contents. Its length must not exceed `descriptor.size`.
    fn create_buffer_with_data(
        &self,
        descriptor: &BufferDescriptor,
        data: &[u8],
    ) -> Result<BufferId, ResourceError>;

    /// Destroys a GPU buffer.
    fn destroy_buffer(&self, id: BufferId) -> Result<(), ResourceError>;

    /// Writes data to a GPU buffer.
    ///
    /// The write is visible to every command submitted afterwards.
    /// ## Errors
    /// * `ResourceError::OutOfBounds` - If `offset + data.len()` exceeds the buffer size.
    fn write_buffer(&self, id: BufferId, offset: u64, data: &[u8]) -> Result<(), ResourceError>;

    /// Reads the whole contents of a buffer created with [`BufferUsage::MAP_READ`].
    ///
    /// Blocks until every submitted command that writes the buffer has finished.
    fn read_buffer(&self, id: BufferId) -> Result<Vec<u8>, ResourceError>;

    /// Creates a new GPU texture.
    fn create_texture(&self, descriptor: &TextureDescriptor) -> Result<TextureId, ResourceError>;

    /// Destroys a GPU texture.
    fn destroy_texture(&self, id: TextureId) -> Result<(), ResourceError>;

    /// Uploads texel data into the first layer of a texture.
    /// ## Arguments
    /// * `texture` - The destination texture.
    /// * `data` - Tightly packed rows of texels.
    /// * `bytes_per_row` - The stride between rows in `data`.
    fn write_texture(
        &self,
        texture: TextureId,
        data: &[u8],
        bytes_per_row: u32,
    ) -> Result<(), ResourceError>;

    /// Creates a view into an existing texture.
    fn create_texture_view(
        &self,
        texture: TextureId,
        descriptor: &TextureViewDescriptor,
    ) -> Result<TextureViewId, ResourceError>;

    /// Destroys a texture view.
    fn destroy_texture_view(&self, id: TextureViewId) -> Result<(), ResourceError>;

    /// Creates a sampler.
    fn create_sampler(&self, descriptor: &SamplerDescriptor) -> Result<SamplerId, ResourceError>;

    /// Destroys a sampler.
    fn destroy_sampler(&self, id: SamplerId) -> Result<(), ResourceError>;

    /// Creates a bind group layout.
    fn create_bind_group_layout(
        &self,
        descriptor: &BindGroupLayoutDescriptor,
    ) -> Result<BindGroupLayoutId, ResourceError>;

    /// Destroys a bind group layout.
    fn destroy_bind_group_layout(&self, id: BindGroupLayoutId) -> Result<(), ResourceError>;

    /// Creates a bind group that does not belong to any descriptor pool.
    fn create_bind_group(
        &self,
        descriptor: &BindGroupDescriptor,
    ) -> Result<BindGroupId, ResourceError>;

    /// Destroys a bind group created with [`create_bind_group`](Self::create_bind_group).
    fn destroy_bind_group(&self, id: BindGroupId) -> Result<(), ResourceError>;

    /// Creates a fixed-capacity pool of bind groups sharing one layout.
    /// ## Arguments
    /// * `descriptor` - The layout and the number of sets the pool can hold.
    /// ## Returns
    /// The ID of the pool. Sets are allocated with [`allocate_bind_group`](Self::allocate_bind_group).
    fn create_descriptor_pool(
        &self,
        descriptor: &DescriptorPoolDescriptor,
    ) -> Result<DescriptorPoolId, ResourceError>;

    /// Destroys a pool and every set still allocated from it.
    fn destroy_descriptor_pool(&self, id: DescriptorPoolId) -> Result<(), ResourceError>;

    /// Allocates one bind group from a pool and writes its entries.
    /// ## Errors
    /// * `ResourceError::PoolExhausted` - If every set of the pool is in use.
    fn allocate_bind_group(
        &self,
        pool: DescriptorPoolId,
        descriptor: &BindGroupDescriptor,
    ) -> Result<BindGroupId, ResourceError>;

    /// Rewrites the entries of an existing bind group in place.
    ///
    /// The caller guarantees that no command buffer still in flight uses the group.
    fn update_bind_group(
        &self,
        id: BindGroupId,
        entries: &[BindGroupEntry],
    ) -> Result<(), ResourceError>;

    /// Returns a set to its pool.
    fn free_bind_group(&self, pool: DescriptorPoolId, id: BindGroupId)
        -> Result<(), ResourceError>;

    /// Creates a new command encoder to record GPU commands.
    fn create_command_encoder(&self, label: Option<&str>) -> Box<dyn CommandEncoder>;

    /// Submits a recorded command buffer to the device's queue for execution.
    fn submit_command_buffer(&self, command_buffer: CommandBufferId) -> Result<(), RenderError>;

    /// Blocks until the queue is idle.
    fn wait_idle(&self) -> Result<(), RenderError>;
}
