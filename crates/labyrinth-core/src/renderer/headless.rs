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

//! A CPU-only [`GraphicsDevice`].
//!
//! [`HeadlessDevice`] hands out unique handles, keeps buffer and texture
//! contents in memory, enforces descriptor-pool capacities and records every
//! command it is given. It backs headless runs of the renderer and is the
//! device the test suites inspect: live resource counts reveal leaks and
//! evictions, and the recorded command streams reveal draw batching.

use crate::renderer::api::*;
use crate::renderer::error::{RenderError, ResourceError};
use crate::renderer::traits::{CommandEncoder, GraphicsDevice, RenderPass};
use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::ops::Range;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// The category of a handle tracked by the [`HeadlessDevice`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// [`BufferId`]
    Buffer,
    /// [`TextureId`]
    Texture,
    /// [`TextureViewId`]
    TextureView,
    /// [`SamplerId`]
    Sampler,
    /// [`ShaderModuleId`]
    ShaderModule,
    /// [`BindGroupLayoutId`]
    BindGroupLayout,
    /// [`BindGroupId`]
    BindGroup,
    /// [`PipelineLayoutId`]
    PipelineLayout,
    /// [`RenderPipelineId`]
    RenderPipeline,
    /// [`DescriptorPoolId`]
    DescriptorPool,
}

/// One command captured by a headless encoder.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCommand {
    /// A render pass started.
    BeginRenderPass {
        /// The pass label.
        label: Option<String>,
        /// The color attachments.
        color_views: Vec<TextureViewId>,
        /// The depth attachment.
        depth_view: Option<TextureViewId>,
        /// The clear value of the first color attachment, if it is cleared.
        clear_color: Option<[f32; 4]>,
    },
    /// `set_pipeline`
    SetPipeline(RenderPipelineId),
    /// `set_bind_group`
    SetBindGroup {
        /// The group index.
        index: u32,
        /// The bound group.
        bind_group: BindGroupId,
    },
    /// `set_vertex_buffer`
    SetVertexBuffer {
        /// The slot.
        slot: u32,
        /// The buffer.
        buffer: BufferId,
    },
    /// `set_index_buffer`
    SetIndexBuffer {
        /// The buffer.
        buffer: BufferId,
        /// The index format.
        format: IndexFormat,
    },
    /// `set_viewport`
    SetViewport {
        /// Viewport width.
        width: f32,
        /// Viewport height.
        height: f32,
    },
    /// `draw_indexed`
    DrawIndexed {
        /// The index range.
        indices: Range<u32>,
        /// The instance range.
        instances: Range<u32>,
    },
    /// The render pass ended.
    EndRenderPass,
    /// `copy_texture_to_buffer`
    CopyTextureToBuffer(TextureToBufferCopy),
}

#[derive(Debug)]
struct TextureState {
    width: u32,
    height: u32,
    bytes_per_texel: u32,
    data: Vec<u8>,
}

#[derive(Debug)]
struct PoolState {
    max_sets: u32,
    allocated: HashSet<usize>,
}

#[derive(Debug, Default)]
struct State {
    next_id: usize,
    next_command_buffer: u64,
    live: HashMap<ResourceKind, HashSet<usize>>,
    created: HashMap<ResourceKind, usize>,
    buffers: HashMap<usize, Vec<u8>>,
    textures: HashMap<usize, TextureState>,
    bind_group_entries: HashMap<usize, Vec<BindGroupEntry>>,
    pools: HashMap<usize, PoolState>,
    pool_of_group: HashMap<usize, usize>,
    pending: HashMap<u64, Vec<RecordedCommand>>,
    submitted: Vec<Vec<RecordedCommand>>,
}

impl State {
    fn insert(&mut self, kind: ResourceKind) -> usize {
        self.next_id += 1;
        let id = self.next_id;
        self.live.entry(kind).or_default().insert(id);
        *self.created.entry(kind).or_default() += 1;
        id
    }

    fn is_live(&self, kind: ResourceKind, id: usize) -> bool {
        self.live.get(&kind).is_some_and(|ids| ids.contains(&id))
    }

    fn require(&self, kind: ResourceKind, id: usize) -> Result<(), ResourceError> {
        if self.is_live(kind, id) {
            Ok(())
        } else {
            log::error!("HeadlessDevice: {kind:?} {id} is not live");
            Err(ResourceError::InvalidHandle)
        }
    }

    fn remove(&mut self, kind: ResourceKind, id: usize) -> Result<(), ResourceError> {
        let removed = self.live.get_mut(&kind).is_some_and(|ids| ids.remove(&id));
        if removed {
            Ok(())
        } else {
            log::error!("HeadlessDevice: double destroy or unknown {kind:?} {id}");
            Err(ResourceError::InvalidHandle)
        }
    }

    fn check_entries(&self, entries: &[BindGroupEntry]) -> Result<(), ResourceError> {
        for entry in entries {
            match entry.resource {
                BindingResource::Buffer(binding) => {
                    self.require(ResourceKind::Buffer, binding.buffer.0)?
                }
                BindingResource::TextureView(view) => {
                    self.require(ResourceKind::TextureView, view.0)?
                }
                BindingResource::Sampler(sampler) => {
                    self.require(ResourceKind::Sampler, sampler.0)?
                }
            }
        }
        Ok(())
    }

    fn apply_copy(&mut self, copy: &TextureToBufferCopy) -> Result<(), RenderError> {
        let texture = self.textures.get(&copy.texture.0).ok_or_else(|| {
            RenderError::RenderingFailed(format!("copy from unknown texture {:?}", copy.texture))
        })?;
        let row_bytes = (copy.width * texture.bytes_per_texel) as usize;
        let mut rows = Vec::with_capacity(copy.bytes_per_row as usize * copy.height as usize);
        for row in 0..copy.height.min(texture.height) as usize {
            let start = row * (texture.width * texture.bytes_per_texel) as usize;
            let end = (start + row_bytes).min(texture.data.len());
            rows.extend_from_slice(&texture.data[start.min(end)..end]);
            rows.resize((row + 1) * copy.bytes_per_row as usize, 0);
        }
        let buffer = self.buffers.get_mut(&copy.buffer.0).ok_or_else(|| {
            RenderError::RenderingFailed(format!("copy into unknown buffer {:?}", copy.buffer))
        })?;
        let len = rows.len().min(buffer.len());
        buffer[..len].copy_from_slice(&rows[..len]);
        Ok(())
    }
}

/// A [`GraphicsDevice`] that runs entirely on the CPU.
#[derive(Debug, Default)]
pub struct HeadlessDevice {
    state: Arc<Mutex<State>>,
}

impl HeadlessDevice {
    /// Creates an empty device.
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The number of live handles of one kind.
    pub fn live_count(&self, kind: ResourceKind) -> usize {
        self.state().live.get(&kind).map_or(0, HashSet::len)
    }

    /// The number of live handles of every kind.
    pub fn live_resource_count(&self) -> usize {
        self.state().live.values().map(HashSet::len).sum()
    }

    /// The number of handles of one kind ever created.
    pub fn created_count(&self, kind: ResourceKind) -> usize {
        self.state().created.get(&kind).copied().unwrap_or(0)
    }

    /// The current contents of a live buffer.
    pub fn buffer_contents(&self, id: BufferId) -> Option<Vec<u8>> {
        self.state().buffers.get(&id.0).cloned()
    }

    /// The entries a bind group currently holds.
    pub fn bind_group_entries(&self, id: BindGroupId) -> Option<Vec<BindGroupEntry>> {
        self.state().bind_group_entries.get(&id.0).cloned()
    }

    /// Overwrites the texels of a live texture, standing in for what a real
    /// GPU would have rendered.
    pub fn set_texture_contents(&self, id: TextureId, data: &[u8]) -> Result<(), ResourceError> {
        let mut state = self.state();
        let texture = state
            .textures
            .get_mut(&id.0)
            .ok_or(ResourceError::InvalidHandle)?;
        let len = data.len().min(texture.data.len());
        texture.data[..len].copy_from_slice(&data[..len]);
        Ok(())
    }

    /// Every command buffer submitted so far, in submission order.
    pub fn submitted_commands(&self) -> Vec<Vec<RecordedCommand>> {
        self.state().submitted.clone()
    }

    /// Forgets the submitted command buffers.
    pub fn clear_submitted(&self) {
        self.state().submitted.clear();
    }
}

impl GraphicsDevice for HeadlessDevice {
    fn create_shader_module(
        &self,
        descriptor: &ShaderModuleDescriptor,
    ) -> Result<ShaderModuleId, ResourceError> {
        let ShaderSourceData::Wgsl(source) = &descriptor.source;
        if source.trim().is_empty() {
            return Err(crate::renderer::error::ShaderError::CompilationError {
                label: descriptor.label.unwrap_or("unnamed").to_string(),
                details: "empty source".to_string(),
            }
            .into());
        }
        Ok(ShaderModuleId(self.state().insert(ResourceKind::ShaderModule)))
    }

    fn destroy_shader_module(&self, id: ShaderModuleId) -> Result<(), ResourceError> {
        self.state().remove(ResourceKind::ShaderModule, id.0)
    }

    fn create_render_pipeline(
        &self,
        descriptor: &RenderPipelineDescriptor,
    ) -> Result<RenderPipelineId, ResourceError> {
        let mut state = self.state();
        state.require(ResourceKind::PipelineLayout, descriptor.layout.0)?;
        state.require(ResourceKind::ShaderModule, descriptor.shader.0)?;
        if descriptor.fragment_entry.is_none() && !descriptor.color_targets.is_empty() {
            return Err(crate::renderer::error::PipelineError::IncompatibleColorTarget(format!(
                "'{}' has color targets but no fragment stage",
                descriptor.label.unwrap_or("unnamed")
            ))
            .into());
        }
        let id = state.insert(ResourceKind::RenderPipeline);
        log::trace!("HeadlessDevice: render pipeline {id} ({:?})", descriptor.label);
        Ok(RenderPipelineId(id))
    }

    fn destroy_render_pipeline(&self, id: RenderPipelineId) -> Result<(), ResourceError> {
        self.state().remove(ResourceKind::RenderPipeline, id.0)
    }

    fn create_pipeline_layout(
        &self,
        descriptor: &PipelineLayoutDescriptor,
    ) -> Result<PipelineLayoutId, ResourceError> {
        let mut state = self.state();
        for layout in descriptor.bind_group_layouts {
            state.require(ResourceKind::BindGroupLayout, layout.0)?;
        }
        Ok(PipelineLayoutId(state.insert(ResourceKind::PipelineLayout)))
    }

    fn destroy_pipeline_layout(&self, id: PipelineLayoutId) -> Result<(), ResourceError> {
        self.state().remove(ResourceKind::PipelineLayout, id.0)
    }

    fn create_buffer(&self, descriptor: &BufferDescriptor) -> Result<BufferId, ResourceError> {
        let mut state = self.state();
        let id = state.insert(ResourceKind::Buffer);
        state.buffers.insert(id, vec![0; descriptor.size as usize]);
        Ok(BufferId(id))
    }

    fn create_buffer_with_data(
        &self,
        descriptor: &BufferDescriptor,
        data: &[u8],
    ) -> Result<BufferId, ResourceError> {
        if data.len() as u64 > descriptor.size {
            return Err(ResourceError::OutOfBounds);
        }
        let id = self.create_buffer(descriptor)?;
        self.write_buffer(id, 0, data)?;
        Ok(id)
    }

    fn destroy_buffer(&self, id: BufferId) -> Result<(), ResourceError> {
        let mut state = self.state();
        state.remove(ResourceKind::Buffer, id.0)?;
        state.buffers.remove(&id.0);
        Ok(())
    }

    fn write_buffer(&self, id: BufferId, offset: u64, data: &[u8]) -> Result<(), ResourceError> {
        let mut state = self.state();
        let contents = state
            .buffers
            .get_mut(&id.0)
            .ok_or(ResourceError::InvalidHandle)?;
        let start = offset as usize;
        let end = start + data.len();
        if end > contents.len() {
            return Err(ResourceError::OutOfBounds);
        }
        contents[start..end].copy_from_slice(data);
        Ok(())
    }

    fn read_buffer(&self, id: BufferId) -> Result<Vec<u8>, ResourceError> {
        self.state()
            .buffers
            .get(&id.0)
            .cloned()
            .ok_or_else(|| ResourceError::ReadbackFailed(format!("unknown buffer {id:?}")))
    }

    fn create_texture(&self, descriptor: &TextureDescriptor) -> Result<TextureId, ResourceError> {
        let mut state = self.state();
        let id = state.insert(ResourceKind::Texture);
        let size = descriptor.size;
        let bytes_per_texel = descriptor.format.bytes_per_texel();
        let len = size.width as usize
            * size.height as usize
            * size.depth_or_array_layers as usize
            * bytes_per_texel as usize;
        state.textures.insert(
            id,
            TextureState {
                width: size.width,
                height: size.height,
                bytes_per_texel,
                data: vec![0; len],
            },
        );
        Ok(TextureId(id))
    }

    fn destroy_texture(&self, id: TextureId) -> Result<(), ResourceError> {
        let mut state = self.state();
        state.remove(ResourceKind::Texture, id.0)?;
        state.textures.remove(&id.0);
        Ok(())
    }

    fn write_texture(
        &self,
        texture: TextureId,
        data: &[u8],
        _bytes_per_row: u32,
    ) -> Result<(), ResourceError> {
        self.set_texture_contents(texture, data)
    }

    fn create_texture_view(
        &self,
        texture: TextureId,
        _descriptor: &TextureViewDescriptor,
    ) -> Result<TextureViewId, ResourceError> {
        let mut state = self.state();
        state.require(ResourceKind::Texture, texture.0)?;
        Ok(TextureViewId(state.insert(ResourceKind::TextureView)))
    }

    fn destroy_texture_view(&self, id: TextureViewId) -> Result<(), ResourceError> {
        self.state().remove(ResourceKind::TextureView, id.0)
    }

    fn create_sampler(&self, _descriptor: &SamplerDescriptor) -> Result<SamplerId, ResourceError> {
        Ok(SamplerId(self.state().insert(ResourceKind::Sampler)))
    }

    fn destroy_sampler(&self, id: SamplerId) -> Result<(), ResourceError> {
        self.state().remove(ResourceKind::Sampler, id.0)
    }

    fn create_bind_group_layout(
        &self,
        _descriptor: &BindGroupLayoutDescriptor,
    ) -> Result<BindGroupLayoutId, ResourceError> {
        Ok(BindGroupLayoutId(
            self.state().insert(ResourceKind::BindGroupLayout),
        ))
    }

    fn destroy_bind_group_layout(&self, id: BindGroupLayoutId) -> Result<(), ResourceError> {
        self.state().remove(ResourceKind::BindGroupLayout, id.0)
    }

    fn create_bind_group(
        &self,
        descriptor: &BindGroupDescriptor,
    ) -> Result<BindGroupId, ResourceError> {
        let mut state = self.state();
        state.require(ResourceKind::BindGroupLayout, descriptor.layout.0)?;
        state.check_entries(descriptor.entries)?;
        let id = state.insert(ResourceKind::BindGroup);
        state
            .bind_group_entries
            .insert(id, descriptor.entries.to_vec());
        Ok(BindGroupId(id))
    }

    fn destroy_bind_group(&self, id: BindGroupId) -> Result<(), ResourceError> {
        let mut state = self.state();
        if state.pool_of_group.contains_key(&id.0) {
            log::error!("HeadlessDevice: bind group {} belongs to a pool", id.0);
            return Err(ResourceError::InvalidHandle);
        }
        state.remove(ResourceKind::BindGroup, id.0)?;
        state.bind_group_entries.remove(&id.0);
        Ok(())
    }

    fn create_descriptor_pool(
        &self,
        descriptor: &DescriptorPoolDescriptor,
    ) -> Result<DescriptorPoolId, ResourceError> {
        let mut state = self.state();
        state.require(ResourceKind::BindGroupLayout, descriptor.layout.0)?;
        let id = state.insert(ResourceKind::DescriptorPool);
        state.pools.insert(
            id,
            PoolState {
                max_sets: descriptor.max_sets,
                allocated: HashSet::new(),
            },
        );
        Ok(DescriptorPoolId(id))
    }

    fn destroy_descriptor_pool(&self, id: DescriptorPoolId) -> Result<(), ResourceError> {
        let mut state = self.state();
        state.remove(ResourceKind::DescriptorPool, id.0)?;
        if let Some(pool) = state.pools.remove(&id.0) {
            for group in pool.allocated {
                state.pool_of_group.remove(&group);
                state.bind_group_entries.remove(&group);
                let _ = state.remove(ResourceKind::BindGroup, group);
            }
        }
        Ok(())
    }

    fn allocate_bind_group(
        &self,
        pool: DescriptorPoolId,
        descriptor: &BindGroupDescriptor,
    ) -> Result<BindGroupId, ResourceError> {
        let mut state = self.state();
        state.check_entries(descriptor.entries)?;
        let pool_state = state.pools.get(&pool.0).ok_or(ResourceError::InvalidHandle)?;
        if pool_state.allocated.len() as u32 >= pool_state.max_sets {
            return Err(ResourceError::PoolExhausted { pool });
        }
        let id = state.insert(ResourceKind::BindGroup);
        if let Some(pool_state) = state.pools.get_mut(&pool.0) {
            pool_state.allocated.insert(id);
        }
        state.pool_of_group.insert(id, pool.0);
        state
            .bind_group_entries
            .insert(id, descriptor.entries.to_vec());
        Ok(BindGroupId(id))
    }

    fn update_bind_group(
        &self,
        id: BindGroupId,
        entries: &[BindGroupEntry],
    ) -> Result<(), ResourceError> {
        let mut state = self.state();
        state.require(ResourceKind::BindGroup, id.0)?;
        state.check_entries(entries)?;
        let current = state
            .bind_group_entries
            .entry(id.0)
            .or_default();
        for entry in entries {
            match current.iter_mut().find(|e| e.binding == entry.binding) {
                Some(existing) => *existing = *entry,
                None => current.push(*entry),
            }
        }
        Ok(())
    }

    fn free_bind_group(
        &self,
        pool: DescriptorPoolId,
        id: BindGroupId,
    ) -> Result<(), ResourceError> {
        let mut state = self.state();
        let freed = state
            .pools
            .get_mut(&pool.0)
            .is_some_and(|p| p.allocated.remove(&id.0));
        if !freed {
            return Err(ResourceError::InvalidHandle);
        }
        state.pool_of_group.remove(&id.0);
        state.bind_group_entries.remove(&id.0);
        state.remove(ResourceKind::BindGroup, id.0)
    }

    fn create_command_encoder(&self, label: Option<&str>) -> Box<dyn CommandEncoder> {
        Box::new(HeadlessCommandEncoder {
            label: label.map(str::to_string),
            commands: Vec::new(),
            state: self.state.clone(),
        })
    }

    fn submit_command_buffer(&self, command_buffer: CommandBufferId) -> Result<(), RenderError> {
        let mut state = self.state();
        let commands = state.pending.remove(&command_buffer.0).ok_or_else(|| {
            RenderError::RenderingFailed(format!("unknown command buffer {command_buffer:?}"))
        })?;
        for command in &commands {
            if let RecordedCommand::CopyTextureToBuffer(copy) = command {
                state.apply_copy(copy)?;
            }
        }
        state.submitted.push(commands);
        Ok(())
    }

    fn wait_idle(&self) -> Result<(), RenderError> {
        Ok(())
    }
}

struct HeadlessCommandEncoder {
    label: Option<String>,
    commands: Vec<RecordedCommand>,
    state: Arc<Mutex<State>>,
}

struct HeadlessRenderPass<'a> {
    commands: &'a mut Vec<RecordedCommand>,
}

impl RenderPass for HeadlessRenderPass<'_> {
    fn set_pipeline(&mut self, pipeline: RenderPipelineId) {
        self.commands.push(RecordedCommand::SetPipeline(pipeline));
    }

    fn set_bind_group(&mut self, index: u32, bind_group: BindGroupId, _offsets: &[u32]) {
        self.commands
            .push(RecordedCommand::SetBindGroup { index, bind_group });
    }

    fn set_vertex_buffer(&mut self, slot: u32, buffer: BufferId, _offset: u64) {
        self.commands
            .push(RecordedCommand::SetVertexBuffer { slot, buffer });
    }

    fn set_index_buffer(&mut self, buffer: BufferId, _offset: u64, format: IndexFormat) {
        self.commands
            .push(RecordedCommand::SetIndexBuffer { buffer, format });
    }

    fn set_viewport(&mut self, _x: f32, _y: f32, width: f32, height: f32) {
        self.commands
            .push(RecordedCommand::SetViewport { width, height });
    }

    fn draw_indexed(&mut self, indices: Range<u32>, _base_vertex: i32, instances: Range<u32>) {
        self.commands
            .push(RecordedCommand::DrawIndexed { indices, instances });
    }
}

impl Drop for HeadlessRenderPass<'_> {
    fn drop(&mut self) {
        self.commands.push(RecordedCommand::EndRenderPass);
    }
}

impl CommandEncoder for HeadlessCommandEncoder {
    fn begin_render_pass<'encoder>(
        &'encoder mut self,
        descriptor: &RenderPassDescriptor<'_>,
    ) -> Box<dyn RenderPass + 'encoder> {
        let clear_color = descriptor
            .color_attachments
            .first()
            .and_then(|attachment| match attachment.ops.load {
                LoadOp::Clear(color) => Some(color),
                LoadOp::Load => None,
            });
        self.commands.push(RecordedCommand::BeginRenderPass {
            label: descriptor.label.map(str::to_string),
            color_views: descriptor
                .color_attachments
                .iter()
                .map(|attachment| attachment.view)
                .collect(),
            depth_view: descriptor
                .depth_stencil_attachment
                .map(|attachment| attachment.view),
            clear_color,
        });
        Box::new(HeadlessRenderPass {
            commands: &mut self.commands,
        })
    }

    fn copy_texture_to_buffer(&mut self, copy: &TextureToBufferCopy) {
        self.commands.push(RecordedCommand::CopyTextureToBuffer(*copy));
    }

    fn finish(self: Box<Self>) -> CommandBufferId {
        let this = *self;
        let mut state = this.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.next_command_buffer += 1;
        let id = state.next_command_buffer;
        log::trace!(
            "HeadlessDevice: finished {:?} with {} commands",
            this.label,
            this.commands.len()
        );
        state.pending.insert(id, this.commands);
        CommandBufferId(id)
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::borrow::Cow;

    fn layout(device: &HeadlessDevice) -> BindGroupLayoutId {
        device
            .create_bind_group_layout(&BindGroupLayoutDescriptor {
                label: None,
                entries: &[BindGroupLayoutEntry::uniform(0, ShaderStages::VERTEX)],
            })
            .unwrap()
    }

    #[test]
    fn pools_refuse_allocation_past_capacity() {
        let device = HeadlessDevice::new();
        let layout = layout(&device);
        let buffer = device
            .create_buffer(&BufferDescriptor::uniform("model", 64))
            .unwrap();
        let pool = device
            .create_descriptor_pool(&DescriptorPoolDescriptor {
                label: None,
                layout,
                max_sets: 1,
            })
            .unwrap();
        let descriptor = BindGroupDescriptor {
            label: None,
            layout,
            entries: &[BindGroupEntry::buffer(0, buffer)],
        };
        let first = device.allocate_bind_group(pool, &descriptor).unwrap();
        assert!(matches!(
            device.allocate_bind_group(pool, &descriptor),
            Err(ResourceError::PoolExhausted { .. })
        ));
        device.free_bind_group(pool, first).unwrap();
        assert!(device.allocate_bind_group(pool, &descriptor).is_ok());
    }

    #[test]
    fn bind_groups_must_reference_live_resources() {
        let device = HeadlessDevice::new();
        let layout = layout(&device);
        let buffer = device
            .create_buffer(&BufferDescriptor::uniform("model", 64))
            .unwrap();
        device.destroy_buffer(buffer).unwrap();
        let result = device.create_bind_group(&BindGroupDescriptor {
            label: None,
            layout,
            entries: &[BindGroupEntry::buffer(0, buffer)],
        });
        assert!(matches!(result, Err(ResourceError::InvalidHandle)));
    }

    #[test]
    fn double_destroy_is_an_error() {
        let device = HeadlessDevice::new();
        let sampler = device
            .create_sampler(&SamplerDescriptor {
                label: None,
                filter: FilterMode::Linear,
                address_mode: AddressMode::ClampToEdge,
                compare: None,
            })
            .unwrap();
        device.destroy_sampler(sampler).unwrap();
        assert!(device.destroy_sampler(sampler).is_err());
        assert_eq!(device.live_resource_count(), 0);
    }

    #[test]
    fn submitted_commands_are_recorded_in_order() {
        let device = HeadlessDevice::new();
        let texture = device
            .create_texture(&TextureDescriptor {
                label: Some(Cow::Borrowed("target")),
                size: Extent3d::new_2d(2, 1),
                format: TextureFormat::R32Float,
                usage: TextureUsage::RENDER_ATTACHMENT | TextureUsage::COPY_SRC,
                sample_count: 1,
            })
            .unwrap();
        let view = device
            .create_texture_view(texture, &TextureViewDescriptor::default())
            .unwrap();
        let readback = device
            .create_buffer(&BufferDescriptor {
                label: None,
                size: 8,
                usage: BufferUsage::MAP_READ | BufferUsage::COPY_DST,
            })
            .unwrap();
        device
            .set_texture_contents(texture, &[1, 2, 3, 4, 5, 6, 7, 8])
            .unwrap();

        let mut encoder = device.create_command_encoder(Some("frame"));
        {
            let mut pass = encoder.begin_render_pass(&RenderPassDescriptor {
                label: Some("main"),
                color_attachments: &[RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: Operations::clear([0.0, 0.0, 0.0, 1.0]),
                }],
                depth_stencil_attachment: None,
            });
            pass.draw_indexed(0..6, 0, 0..1);
        }
        encoder.copy_texture_to_buffer(&TextureToBufferCopy {
            texture,
            buffer: readback,
            bytes_per_row: 8,
            width: 2,
            height: 1,
        });
        let commands = encoder.finish();
        device.submit_command_buffer(commands).unwrap();

        let submitted = device.submitted_commands();
        assert_eq!(submitted.len(), 1);
        assert!(matches!(
            submitted[0][0],
            RecordedCommand::BeginRenderPass { clear_color: Some(_), .. }
        ));
        assert_eq!(
            submitted[0][1],
            RecordedCommand::DrawIndexed {
                indices: 0..6,
                instances: 0..1
            }
        );
        assert_eq!(submitted[0][2], RecordedCommand::EndRenderPass);
        assert_eq!(device.read_buffer(readback).unwrap(), vec![1, 2, 3, 4, 5, 6, 7, 8]);
    }
}
