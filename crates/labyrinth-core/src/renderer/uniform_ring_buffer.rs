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

//! Persistent ring buffer for GPU uniform data.
//!
//! The [`UniformRingBuffer`] pre-allocates one buffer per frame in flight and
//! cycles through them. Each update goes to the slot after the one the most
//! recent draw bound, so the GPU can still read the previous frame's values
//! while the CPU writes new ones.
//!
//! # Architecture
//!
//! ```text
//! Frame N:     [Slot 0: GPU reads] ← render pass uses this bind group
//! Frame N+1:   [Slot 1: CPU writes] → push() updates this slot
//! Frame N+2:   [Slot 0: CPU writes] → cycle back, GPU finished reading
//! ```
//!
//! Each slot has its own buffer and pre-created bind group, so nothing is
//! allocated on the draw path.

use crate::renderer::{
    api::{BindGroupDescriptor, BindGroupEntry, BindGroupId, BindGroupLayoutId, BufferDescriptor, BufferId},
    error::ResourceError,
    resource::Owned,
    traits::GraphicsDevice,
};
use std::borrow::Cow;
use std::sync::Arc;

/// A single slot in the ring buffer, holding a GPU buffer and its associated bind group.
#[derive(Debug)]
struct RingSlot {
    // Dropped before the buffer it references.
    bind_group: Owned<BindGroupId>,
    buffer: Owned<BufferId>,
}

/// A persistent ring buffer for GPU uniform data that eliminates per-frame allocation.
///
/// # Example
///
/// ```ignore
/// // During initialization:
/// let mut ring = UniformRingBuffer::new(&device, layout_id, 0, &[], data_size, 2, "Camera")?;
///
/// // Each update:
/// ring.push(bytemuck::bytes_of(&camera_uniforms))?;
/// render_pass.set_bind_group(0, ring.current_bind_group(), &[]);
/// ```
#[derive(Debug)]
pub struct UniformRingBuffer {
    slots: Vec<RingSlot>,
    current_index: usize,
    data_size: u64,
    label: &'static str,
}

impl UniformRingBuffer {
    /// Creates a new `UniformRingBuffer` with pre-allocated GPU resources.
    ///
    /// # Arguments
    ///
    /// * `device` - The graphics device to allocate GPU resources on.
    /// * `layout` - The bind group layout that the bind groups should conform to.
    /// * `binding` - The binding index of the uniform buffer within the layout.
    /// * `extra_entries` - Further entries bound in every slot (e.g. a shadow map and its sampler).
    /// * `data_size` - The size of the uniform data in bytes.
    /// * `slot_count` - The number of slots, at least one.
    /// * `label` - A debug label for the buffers.
    ///
    /// # Errors
    ///
    /// Returns a [`ResourceError`] if buffer or bind group creation fails.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        device: &Arc<dyn GraphicsDevice>,
        layout: BindGroupLayoutId,
        binding: u32,
        extra_entries: &[BindGroupEntry],
        data_size: u64,
        slot_count: usize,
        label: &'static str,
    ) -> Result<Self, ResourceError> {
        let slot_count = slot_count.max(1);
        let mut slots = Vec::with_capacity(slot_count);

        for i in 0..slot_count {
            let buffer_label = match i {
                0 => Cow::Borrowed(label),
                _ => Cow::Owned(format!("{label} [slot {i}]")),
            };

            let buffer = Owned::new(
                device.clone(),
                device.create_buffer(&BufferDescriptor {
                    label: Some(buffer_label),
                    ..BufferDescriptor::uniform(label, data_size)
                })?,
            );

            let mut entries = Vec::with_capacity(extra_entries.len() + 1);
            entries.push(BindGroupEntry::buffer(binding, buffer.handle()));
            entries.extend_from_slice(extra_entries);

            let bind_group = Owned::new(
                device.clone(),
                device.create_bind_group(&BindGroupDescriptor {
                    label: Some(label),
                    layout,
                    entries: &entries,
                })?,
            );

            slots.push(RingSlot { bind_group, buffer });
        }

        log::debug!("UniformRingBuffer({label}): created {slot_count} slots of {data_size} bytes");

        Ok(Self {
            slots,
            current_index: 0,
            data_size,
            label,
        })
    }

    /// Advances to the next slot in the ring buffer.
    pub fn advance(&mut self) {
        self.current_index = (self.current_index + 1) % self.slots.len();
    }

    /// Writes uniform data to the current slot's GPU buffer.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::OutOfBounds`] if `data` is not exactly
    /// `data_size` bytes, or the device error if the write fails.
    pub fn write(&self, data: &[u8]) -> Result<(), ResourceError> {
        if data.len() as u64 != self.data_size {
            log::error!(
                "UniformRingBuffer({}): write size mismatch: expected {}, got {}",
                self.label,
                self.data_size,
                data.len()
            );
            return Err(ResourceError::OutOfBounds);
        }

        let slot = &self.slots[self.current_index];
        slot.buffer.device().write_buffer(slot.buffer.handle(), 0, data)
    }

    /// Advances to the next slot and writes `data` into it.
    ///
    /// After this call [`current_bind_group`](Self::current_bind_group) refers to the new data.
    pub fn push(&mut self, data: &[u8]) -> Result<(), ResourceError> {
        self.advance();
        self.write(data)
    }

    /// [`push`](Self::push) for a plain-old-data uniform block.
    pub fn push_pod<T: bytemuck::Pod>(&mut self, value: &T) -> Result<(), ResourceError> {
        self.push(bytemuck::bytes_of(value))
    }

    /// Returns the bind group for the current slot.
    pub fn current_bind_group(&self) -> BindGroupId {
        self.slots[self.current_index].bind_group.handle()
    }

    /// Returns the buffer of the current slot.
    pub fn current_buffer(&self) -> BufferId {
        self.slots[self.current_index].buffer.handle()
    }

    /// Returns the current slot index.
    pub fn current_slot_index(&self) -> usize {
        self.current_index
    }

    /// Returns the number of slots in the ring buffer.
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Returns the data size per slot in bytes.
    pub fn data_size(&self) -> u64 {
        self.data_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::api::{BindGroupLayoutDescriptor, BindGroupLayoutEntry, ShaderStages};
    use crate::renderer::headless::HeadlessDevice;

    fn setup() -> (Arc<HeadlessDevice>, Arc<dyn GraphicsDevice>, BindGroupLayoutId) {
        let headless = Arc::new(HeadlessDevice::new());
        let device: Arc<dyn GraphicsDevice> = headless.clone();
        let layout = device
            .create_bind_group_layout(&BindGroupLayoutDescriptor {
                label: Some("test"),
                entries: &[BindGroupLayoutEntry::uniform(0, ShaderStages::VERTEX)],
            })
            .unwrap();
        (headless, device, layout)
    }

    #[test]
    fn push_cycles_through_slots() {
        let (_, device, layout) = setup();
        let mut ring = UniformRingBuffer::new(&device, layout, 0, &[], 16, 2, "Test").unwrap();
        assert_eq!(ring.slot_count(), 2);
        let first = ring.current_bind_group();

        ring.push(&[1u8; 16]).unwrap();
        assert_eq!(ring.current_slot_index(), 1);
        assert_ne!(ring.current_bind_group(), first);

        ring.push(&[2u8; 16]).unwrap();
        assert_eq!(ring.current_slot_index(), 0);
        assert_eq!(ring.current_bind_group(), first);
    }

    #[test]
    fn push_writes_only_the_new_slot() {
        let (headless, device, layout) = setup();
        let mut ring = UniformRingBuffer::new(&device, layout, 0, &[], 4, 2, "Test").unwrap();
        ring.push(&[7, 7, 7, 7]).unwrap();
        let written = ring.current_buffer();
        ring.advance();
        let other = ring.current_buffer();

        assert_eq!(headless.buffer_contents(written).unwrap(), vec![7, 7, 7, 7]);
        assert_eq!(headless.buffer_contents(other).unwrap(), vec![0, 0, 0, 0]);
    }

    #[test]
    fn wrong_size_write_is_rejected() {
        let (_, device, layout) = setup();
        let ring = UniformRingBuffer::new(&device, layout, 0, &[], 8, 1, "Test").unwrap();
        assert!(matches!(ring.write(&[0u8; 4]), Err(ResourceError::OutOfBounds)));
    }

    #[test]
    fn dropping_the_ring_releases_every_slot() {
        let (headless, device, layout) = setup();
        let before = headless.live_resource_count();
        let ring = UniformRingBuffer::new(&device, layout, 0, &[], 8, 3, "Test").unwrap();
        assert_eq!(headless.live_resource_count(), before + 6);
        drop(ring);
        assert_eq!(headless.live_resource_count(), before);
    }
}
