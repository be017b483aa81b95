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

//! Growable descriptor pools for one bind group layout.
//!
//! Exhausting a device pool is expected: [`DescriptorPools::allocate`] checks
//! [`has_available_descriptor_sets`](DescriptorPools::has_available_descriptor_sets)
//! first and adds a pool when every existing one is full. Dropped sets go back
//! to a free list and are rewritten in place on reuse.

use labyrinth_core::renderer::{
    BindGroupDescriptor, BindGroupEntry, BindGroupId, BindGroupLayoutId, DescriptorPoolDescriptor,
    DescriptorPoolId, GraphicsDevice, Owned, ResourceError,
};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

#[derive(Debug)]
struct PoolSlot {
    pool: Owned<DescriptorPoolId>,
    allocated: u32,
    free: Vec<BindGroupId>,
}

/// Device pools of one layout, grown on demand.
pub struct DescriptorPools {
    device: Arc<dyn GraphicsDevice>,
    layout: Rc<Owned<BindGroupLayoutId>>,
    pool_size: u32,
    label: &'static str,
    pools: RefCell<Vec<PoolSlot>>,
}

impl fmt::Debug for DescriptorPools {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DescriptorPools")
            .field("label", &self.label)
            .field("layout", &self.layout.handle())
            .field("pool_size", &self.pool_size)
            .field("pools", &self.pool_count())
            .finish()
    }
}

impl DescriptorPools {
    /// Creates an empty set of pools. The first pool is created on the first allocation.
    pub fn new(
        device: Arc<dyn GraphicsDevice>,
        layout: Rc<Owned<BindGroupLayoutId>>,
        pool_size: u32,
        label: &'static str,
    ) -> Rc<Self> {
        Rc::new(Self {
            device,
            layout,
            pool_size: pool_size.max(1),
            label,
            pools: RefCell::new(Vec::new()),
        })
    }

    /// The layout every set conforms to.
    pub fn layout(&self) -> BindGroupLayoutId {
        self.layout.handle()
    }

    /// Returns `true` if a set can be handed out without creating a pool.
    pub fn has_available_descriptor_sets(&self) -> bool {
        self.pools
            .borrow()
            .iter()
            .any(|slot| !slot.free.is_empty() || slot.allocated < self.pool_size)
    }

    /// The number of device pools created so far.
    pub fn pool_count(&self) -> usize {
        self.pools.borrow().len()
    }

    /// The number of returned sets waiting for reuse.
    pub fn free_count(&self) -> usize {
        self.pools.borrow().iter().map(|slot| slot.free.len()).sum()
    }

    /// Hands out a set holding `entries`.
    ///
    /// # Errors
    ///
    /// Returns the device error if a pool, a set or an update fails.
    pub fn allocate(self: &Rc<Self>, entries: &[BindGroupEntry]) -> Result<DescriptorSet, ResourceError> {
        if !self.has_available_descriptor_sets() {
            self.grow()?;
        }

        let mut pools = self.pools.borrow_mut();

        if let Some((pool_index, slot)) = pools
            .iter_mut()
            .enumerate()
            .find(|(_, slot)| !slot.free.is_empty())
        {
            if let Some(id) = slot.free.pop() {
                if let Err(e) = self.device.update_bind_group(id, entries) {
                    slot.free.push(id);
                    return Err(e);
                }
                return Ok(DescriptorSet {
                    pools: Rc::clone(self),
                    pool_index,
                    id,
                });
            }
        }

        let (pool_index, slot) = pools
            .iter_mut()
            .enumerate()
            .find(|(_, slot)| slot.allocated < self.pool_size)
            .ok_or(ResourceError::PoolExhausted {
                pool: DescriptorPoolId(usize::MAX),
            })?;
        let id = self.device.allocate_bind_group(
            slot.pool.handle(),
            &BindGroupDescriptor {
                label: Some(self.label),
                layout: self.layout.handle(),
                entries,
            },
        )?;
        slot.allocated += 1;
        Ok(DescriptorSet {
            pools: Rc::clone(self),
            pool_index,
            id,
        })
    }

    fn grow(&self) -> Result<(), ResourceError> {
        let pool = self.device.create_descriptor_pool(&DescriptorPoolDescriptor {
            label: Some(self.label),
            layout: self.layout.handle(),
            max_sets: self.pool_size,
        })?;
        let mut pools = self.pools.borrow_mut();
        pools.push(PoolSlot {
            pool: Owned::new(self.device.clone(), pool),
            allocated: 0,
            free: Vec::new(),
        });
        log::debug!(
            "DescriptorPools({}): grew to {} pools of {} sets",
            self.label,
            pools.len(),
            self.pool_size
        );
        Ok(())
    }

    fn release(&self, pool_index: usize, id: BindGroupId) {
        match self.pools.try_borrow_mut() {
            Ok(mut pools) => {
                if let Some(slot) = pools.get_mut(pool_index) {
                    slot.free.push(id);
                }
            }
            Err(_) => log::warn!(
                "DescriptorPools({}): set {id:?} dropped while the pools are borrowed, it stays allocated",
                self.label
            ),
        }
    }
}

/// A set allocated from [`DescriptorPools`]. Dropping it returns it to its pool.
pub struct DescriptorSet {
    pools: Rc<DescriptorPools>,
    pool_index: usize,
    id: BindGroupId,
}

impl fmt::Debug for DescriptorSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DescriptorSet")
            .field("pools", &self.pools.label)
            .field("pool_index", &self.pool_index)
            .field("id", &self.id)
            .finish()
    }
}

impl DescriptorSet {
    /// The bind group to set in a pass.
    pub fn id(&self) -> BindGroupId {
        self.id
    }

    /// Rewrites some of the set's entries in place.
    pub fn update(&self, entries: &[BindGroupEntry]) -> Result<(), ResourceError> {
        self.pools.device.update_bind_group(self.id, entries)
    }
}

impl Drop for DescriptorSet {
    fn drop(&mut self) {
        self.pools.release(self.pool_index, self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use labyrinth_core::renderer::{
        BindGroupLayoutDescriptor, BindGroupLayoutEntry, BufferDescriptor, BufferId,
        HeadlessDevice, ResourceKind, ShaderStages,
    };

    fn setup(pool_size: u32) -> (Arc<HeadlessDevice>, Rc<DescriptorPools>, BufferId) {
        let headless = Arc::new(HeadlessDevice::new());
        let device: Arc<dyn GraphicsDevice> = headless.clone();
        let layout = device
            .create_bind_group_layout(&BindGroupLayoutDescriptor {
                label: Some("model"),
                entries: &[BindGroupLayoutEntry::uniform(0, ShaderStages::VERTEX)],
            })
            .unwrap();
        let buffer = device
            .create_buffer(&BufferDescriptor::uniform("model", 64))
            .unwrap();
        let pools = DescriptorPools::new(
            device.clone(),
            Rc::new(Owned::new(device, layout)),
            pool_size,
            "test",
        );
        (headless, pools, buffer)
    }

    #[test]
    fn exhaustion_grows_a_new_pool() {
        let (headless, pools, buffer) = setup(2);
        let entries = [BindGroupEntry::buffer(0, buffer)];
        let sets: Vec<_> = (0..5).map(|_| pools.allocate(&entries).unwrap()).collect();
        assert_eq!(pools.pool_count(), 3);
        assert_eq!(headless.live_count(ResourceKind::DescriptorPool), 3);
        assert_eq!(headless.live_count(ResourceKind::BindGroup), 5);
        drop(sets);
    }

    #[test]
    fn dropped_sets_are_reused_in_place() {
        let (headless, pools, buffer) = setup(2);
        let entries = [BindGroupEntry::buffer(0, buffer)];
        let first = pools.allocate(&entries).unwrap();
        let id = first.id();
        drop(first);
        assert_eq!(pools.free_count(), 1);

        let again = pools.allocate(&entries).unwrap();
        assert_eq!(again.id(), id);
        assert_eq!(pools.free_count(), 0);
        assert_eq!(headless.created_count(ResourceKind::BindGroup), 1);
    }

    #[test]
    fn free_sets_count_as_available() {
        let (_, pools, buffer) = setup(1);
        let entries = [BindGroupEntry::buffer(0, buffer)];
        assert!(!pools.has_available_descriptor_sets());
        let set = pools.allocate(&entries).unwrap();
        assert!(!pools.has_available_descriptor_sets());
        drop(set);
        assert!(pools.has_available_descriptor_sets());
        let _set = pools.allocate(&entries).unwrap();
        assert_eq!(pools.pool_count(), 1);
    }

    #[test]
    fn dropping_everything_releases_the_pools() {
        let (headless, pools, buffer) = setup(4);
        let set = pools.allocate(&[BindGroupEntry::buffer(0, buffer)]).unwrap();
        drop(set);
        drop(pools);
        assert_eq!(headless.live_count(ResourceKind::DescriptorPool), 0);
        assert_eq!(headless.live_count(ResourceKind::BindGroup), 0);
        assert_eq!(headless.live_count(ResourceKind::BindGroupLayout), 0);
    }
}
