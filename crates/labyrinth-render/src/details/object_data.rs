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

//! Per-placement GPU state: a model matrix and the descriptor sets reading it.

use super::DescriptorSet;
use crate::drawer::TextureData;
use glam::Mat4;
use labyrinth_core::renderer::{
    BindGroupEntry, BindGroupId, BufferDescriptor, BufferId, GraphicsDevice, Owned, ResourceError,
};
use std::cell::Cell;
use std::rc::Rc;
use std::sync::Arc;

/// Set id of the main pass.
pub const MODEL_MATRIX_ID_MAIN: u32 = 0;
/// Set id of the first shadow pass. Further shadow passes follow.
pub const MODEL_MATRIX_ID_SHADOWS: u32 = 1;

const MODEL_MATRIX_SIZE: u64 = std::mem::size_of::<[[f32; 4]; 4]>() as u64;

/// Which pipeline of a kind draws a placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectVariant {
    /// Per-vertex color.
    Color,
    /// Sampled texture.
    Texture,
    /// Geometry only; the kind ignores textures.
    Geometry,
}

impl ObjectVariant {
    /// The variant a texturing kind uses for `texture`.
    pub fn for_texture(texture: Option<&TextureData>) -> Self {
        match texture {
            Some(_) => ObjectVariant::Texture,
            None => ObjectVariant::Color,
        }
    }
}

/// A uniform buffer holding one model matrix.
#[derive(Debug)]
pub struct ModelMatrixBuffer {
    buffer: Owned<BufferId>,
    matrix: Cell<Mat4>,
}

impl ModelMatrixBuffer {
    /// Creates the buffer holding `matrix`.
    pub fn new(device: &Arc<dyn GraphicsDevice>, matrix: Mat4) -> Result<Rc<Self>, ResourceError> {
        let buffer = device.create_buffer_with_data(
            &BufferDescriptor::uniform("model matrix", MODEL_MATRIX_SIZE),
            bytemuck::bytes_of(&matrix.to_cols_array_2d()),
        )?;
        Ok(Rc::new(Self {
            buffer: Owned::new(device.clone(), buffer),
            matrix: Cell::new(matrix),
        }))
    }

    /// Writes a new matrix.
    pub fn update(&self, matrix: Mat4) -> Result<(), ResourceError> {
        self.buffer.device().write_buffer(
            self.buffer.handle(),
            0,
            bytemuck::bytes_of(&matrix.to_cols_array_2d()),
        )?;
        self.matrix.set(matrix);
        Ok(())
    }

    /// The current matrix.
    pub fn matrix(&self) -> Mat4 {
        self.matrix.get()
    }

    /// The buffer bound at binding 0 of object sets.
    pub fn buffer(&self) -> BufferId {
        self.buffer.handle()
    }
}

/// One placed instance of a draw object.
///
/// Composite kinds hold one set per pass, all reading the same
/// [`ModelMatrixBuffer`].
#[derive(Debug)]
pub struct DrawObjectData {
    model_matrix: Rc<ModelMatrixBuffer>,
    variant: ObjectVariant,
    sets: Vec<(u32, DescriptorSet)>,
}

impl DrawObjectData {
    /// Data with a single main-pass set.
    pub fn new(model_matrix: Rc<ModelMatrixBuffer>, variant: ObjectVariant, set: DescriptorSet) -> Self {
        Self {
            model_matrix,
            variant,
            sets: vec![(MODEL_MATRIX_ID_MAIN, set)],
        }
    }

    /// Aggregates a main-pass data with shadow-pass data.
    ///
    /// The main set of the `i`-th shadow data becomes set
    /// `MODEL_MATRIX_ID_SHADOWS + i`. Every part must share `main`'s matrix buffer.
    pub fn compose(main: DrawObjectData, shadows: Vec<DrawObjectData>) -> Self {
        let DrawObjectData {
            model_matrix,
            variant,
            mut sets,
        } = main;
        for (offset, shadow) in shadows.into_iter().enumerate() {
            if !Rc::ptr_eq(&shadow.model_matrix, &model_matrix) {
                log::warn!("DrawObjectData: composed shadow data does not share the model matrix");
            }
            let id = MODEL_MATRIX_ID_SHADOWS + offset as u32;
            sets.extend(
                shadow
                    .sets
                    .into_iter()
                    .filter(|(set_id, _)| *set_id == MODEL_MATRIX_ID_MAIN)
                    .map(|(_, set)| (id, set)),
            );
        }
        Self {
            model_matrix,
            variant,
            sets,
        }
    }

    /// The bind group of set `id`.
    pub fn descriptor_set(&self, id: u32) -> Option<BindGroupId> {
        self.sets
            .iter()
            .find(|(set_id, _)| *set_id == id)
            .map(|(_, set)| set.id())
    }

    /// The number of sets.
    pub fn set_count(&self) -> usize {
        self.sets.len()
    }

    /// The pipeline variant.
    pub fn variant(&self) -> ObjectVariant {
        self.variant
    }

    /// The shared matrix buffer.
    pub fn model_matrix(&self) -> &Rc<ModelMatrixBuffer> {
        &self.model_matrix
    }

    /// Writes a new model matrix, seen by every pass.
    pub fn update(&self, matrix: Mat4) -> Result<(), ResourceError> {
        self.model_matrix.update(matrix)
    }

    /// Points the main set at another texture without reallocating it.
    ///
    /// Returns `Ok(false)` when the change would need another pipeline
    /// variant, which only a new data can provide.
    pub fn update_texture_data(&self, texture: Option<&TextureData>) -> Result<bool, ResourceError> {
        match (self.variant, texture) {
            (ObjectVariant::Geometry, _) | (ObjectVariant::Color, None) => Ok(true),
            (ObjectVariant::Texture, Some(texture)) => {
                let Some((_, set)) = self
                    .sets
                    .iter()
                    .find(|(id, _)| *id == MODEL_MATRIX_ID_MAIN)
                else {
                    return Ok(false);
                };
                set.update(&[
                    BindGroupEntry::texture_view(1, texture.view()),
                    BindGroupEntry::sampler(2, texture.sampler()),
                ])?;
                Ok(true)
            }
            (ObjectVariant::Color, Some(_)) | (ObjectVariant::Texture, None) => Ok(false),
        }
    }

    /// Returns `true` if both datas write the same matrix buffer.
    pub fn shares_model_matrix_with(&self, other: &DrawObjectData) -> bool {
        Rc::ptr_eq(&self.model_matrix, &other.model_matrix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::details::DescriptorPools;
    use labyrinth_core::renderer::{
        BindGroupLayoutDescriptor, BindGroupLayoutEntry, BindingResource, HeadlessDevice,
        ShaderStages,
    };

    struct Fixture {
        headless: Arc<HeadlessDevice>,
        device: Arc<dyn GraphicsDevice>,
        pools: Rc<DescriptorPools>,
    }

    fn fixture() -> Fixture {
        let headless = Arc::new(HeadlessDevice::new());
        let device: Arc<dyn GraphicsDevice> = headless.clone();
        let layout = device
            .create_bind_group_layout(&BindGroupLayoutDescriptor {
                label: None,
                entries: &[
                    BindGroupLayoutEntry::uniform(0, ShaderStages::VERTEX),
                    BindGroupLayoutEntry::texture(1),
                    BindGroupLayoutEntry::sampler(2),
                ],
            })
            .unwrap();
        let pools = DescriptorPools::new(device.clone(), Rc::new(Owned::new(device.clone(), layout)), 8, "test");
        Fixture {
            headless,
            device,
            pools,
        }
    }

    fn textured(fixture: &Fixture, matrix: &Rc<ModelMatrixBuffer>, texture: &TextureData) -> DrawObjectData {
        let set = fixture
            .pools
            .allocate(&[
                BindGroupEntry::buffer(0, matrix.buffer()),
                BindGroupEntry::texture_view(1, texture.view()),
                BindGroupEntry::sampler(2, texture.sampler()),
            ])
            .unwrap();
        DrawObjectData::new(Rc::clone(matrix), ObjectVariant::Texture, set)
    }

    #[test]
    fn composed_sets_share_one_matrix() {
        let f = fixture();
        let matrix = ModelMatrixBuffer::new(&f.device, Mat4::IDENTITY).unwrap();
        let main_set = f.pools.allocate(&[BindGroupEntry::buffer(0, matrix.buffer())]).unwrap();
        let shadow_set = f.pools.allocate(&[BindGroupEntry::buffer(0, matrix.buffer())]).unwrap();
        let main = DrawObjectData::new(Rc::clone(&matrix), ObjectVariant::Color, main_set);
        let shadow = DrawObjectData::new(Rc::clone(&matrix), ObjectVariant::Geometry, shadow_set);

        let composed = DrawObjectData::compose(main, vec![shadow]);
        assert_eq!(composed.set_count(), 2);
        assert_ne!(
            composed.descriptor_set(MODEL_MATRIX_ID_MAIN),
            composed.descriptor_set(MODEL_MATRIX_ID_SHADOWS)
        );
        assert!(composed.descriptor_set(MODEL_MATRIX_ID_SHADOWS + 1).is_none());
        assert_eq!(composed.variant(), ObjectVariant::Color);

        composed.update(Mat4::from_translation(glam::Vec3::X)).unwrap();
        assert_eq!(matrix.matrix(), Mat4::from_translation(glam::Vec3::X));
        let contents = f.headless.buffer_contents(matrix.buffer()).unwrap();
        let written: [[f32; 4]; 4] = bytemuck::pod_read_unaligned(&contents);
        assert_eq!(written[3][0], 1.0);
    }

    #[test]
    fn texture_update_repoints_the_main_set() {
        let f = fixture();
        let matrix = ModelMatrixBuffer::new(&f.device, Mat4::IDENTITY).unwrap();
        let first = TextureData::from_rgba8(&f.device, 1, 1, &[0; 4]).unwrap();
        let second = TextureData::from_rgba8(&f.device, 1, 1, &[255; 4]).unwrap();
        let data = textured(&f, &matrix, &first);

        assert!(data.update_texture_data(Some(&second)).unwrap());
        let group = data.descriptor_set(MODEL_MATRIX_ID_MAIN).unwrap();
        let entries = f.headless.bind_group_entries(group).unwrap();
        assert!(entries
            .iter()
            .any(|e| e.resource == BindingResource::TextureView(second.view())));
    }

    #[test]
    fn texture_update_refuses_a_variant_change() {
        let f = fixture();
        let matrix = ModelMatrixBuffer::new(&f.device, Mat4::IDENTITY).unwrap();
        let texture = TextureData::from_rgba8(&f.device, 1, 1, &[0; 4]).unwrap();
        let data = textured(&f, &matrix, &texture);
        assert!(!data.update_texture_data(None).unwrap());

        let color_set = f.pools.allocate(&[BindGroupEntry::buffer(0, matrix.buffer())]).unwrap();
        let color = DrawObjectData::new(Rc::clone(&matrix), ObjectVariant::Color, color_set);
        assert!(!color.update_texture_data(Some(&texture)).unwrap());
        assert!(color.update_texture_data(None).unwrap());
        assert!(color.shares_model_matrix_with(&data));
    }
}
