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

//! GPU-resident geometry and textures shared by draw objects.

use bytemuck::{Pod, Zeroable};
use labyrinth_core::renderer::{
    AddressMode, BufferDescriptor, BufferId, BufferUsage, Extent3d, FilterMode, GraphicsDevice,
    IndexFormat, Owned, RenderPass, ResourceError, SamplerDescriptor, SamplerId,
    TextureDescriptor, TextureFormat, TextureId, TextureUsage, TextureViewDescriptor,
    TextureViewId, VertexAttribute, VertexBufferLayout, VertexFormat, VertexStepMode,
};
use std::borrow::Cow;
use std::sync::Arc;

/// The vertex layout every built-in shader reads.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    /// Object-space position.
    pub position: [f32; 3],
    /// Per-vertex color.
    pub color: [f32; 3],
    /// Texture coordinates.
    pub tex_coord: [f32; 2],
    /// Object-space normal.
    pub normal: [f32; 3],
}

impl Vertex {
    const ATTRIBUTES: [VertexAttribute; 4] = [
        VertexAttribute {
            format: VertexFormat::Float32x3,
            offset: 0,
            shader_location: 0,
        },
        VertexAttribute {
            format: VertexFormat::Float32x3,
            offset: 12,
            shader_location: 1,
        },
        VertexAttribute {
            format: VertexFormat::Float32x2,
            offset: 24,
            shader_location: 2,
        },
        VertexAttribute {
            format: VertexFormat::Float32x3,
            offset: 32,
            shader_location: 3,
        },
    ];

    /// The vertex buffer layout matching this struct.
    pub fn layout() -> VertexBufferLayout<'static> {
        VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as u64,
            step_mode: VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

/// Vertex and index buffers of one model.
#[derive(Debug)]
pub struct ModelData {
    vertex_buffer: Owned<BufferId>,
    index_buffer: Owned<BufferId>,
    index_count: u32,
}

impl ModelData {
    /// Uploads a model.
    pub fn new(
        device: &Arc<dyn GraphicsDevice>,
        vertices: &[Vertex],
        indices: &[u32],
    ) -> Result<Self, ResourceError> {
        let vertex_bytes: &[u8] = bytemuck::cast_slice(vertices);
        let index_bytes: &[u8] = bytemuck::cast_slice(indices);
        let vertex_buffer = device.create_buffer_with_data(
            &BufferDescriptor {
                label: Some(Cow::Borrowed("model vertices")),
                size: vertex_bytes.len() as u64,
                usage: BufferUsage::VERTEX | BufferUsage::COPY_DST,
            },
            vertex_bytes,
        )?;
        let vertex_buffer = Owned::new(device.clone(), vertex_buffer);
        let index_buffer = device.create_buffer_with_data(
            &BufferDescriptor {
                label: Some(Cow::Borrowed("model indices")),
                size: index_bytes.len() as u64,
                usage: BufferUsage::INDEX | BufferUsage::COPY_DST,
            },
            index_bytes,
        )?;
        log::debug!(
            "ModelData: uploaded {} vertices, {} indices",
            vertices.len(),
            indices.len()
        );
        Ok(Self {
            vertex_buffer,
            index_buffer: Owned::new(device.clone(), index_buffer),
            index_count: indices.len() as u32,
        })
    }

    /// A unit square in the XY plane facing +Z, in one color.
    pub fn quad(device: &Arc<dyn GraphicsDevice>, color: [f32; 3]) -> Result<Self, ResourceError> {
        let corner = |x: f32, y: f32, u: f32, v: f32| Vertex {
            position: [x, y, 0.0],
            color,
            tex_coord: [u, v],
            normal: [0.0, 0.0, 1.0],
        };
        let vertices = [
            corner(-0.5, -0.5, 0.0, 1.0),
            corner(0.5, -0.5, 1.0, 1.0),
            corner(0.5, 0.5, 1.0, 0.0),
            corner(-0.5, 0.5, 0.0, 0.0),
        ];
        Self::new(device, &vertices, &[0, 1, 2, 0, 2, 3])
    }

    /// The number of indices drawn.
    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    /// Binds the vertex and index buffers.
    pub fn bind(&self, pass: &mut dyn RenderPass) {
        pass.set_vertex_buffer(0, self.vertex_buffer.handle(), 0);
        pass.set_index_buffer(self.index_buffer.handle(), 0, IndexFormat::Uint32);
    }
}

/// A sampled RGBA texture.
#[derive(Debug)]
pub struct TextureData {
    // Dropped before the texture they read.
    view: Owned<TextureViewId>,
    sampler: Owned<SamplerId>,
    texture: Owned<TextureId>,
    width: u32,
    height: u32,
}

impl TextureData {
    /// Uploads tightly packed 8-bit RGBA texels.
    ///
    /// # Errors
    ///
    /// [`ResourceError::OutOfBounds`] if `texels` is not `width * height * 4` bytes.
    pub fn from_rgba8(
        device: &Arc<dyn GraphicsDevice>,
        width: u32,
        height: u32,
        texels: &[u8],
    ) -> Result<Self, ResourceError> {
        if texels.len() != width as usize * height as usize * 4 {
            log::error!(
                "TextureData: {} bytes for a {width}x{height} RGBA texture",
                texels.len()
            );
            return Err(ResourceError::OutOfBounds);
        }
        let texture = device.create_texture(&TextureDescriptor {
            label: Some(Cow::Borrowed("level texture")),
            size: Extent3d::new_2d(width, height),
            format: TextureFormat::Rgba8UnormSrgb,
            usage: TextureUsage::TEXTURE_BINDING | TextureUsage::COPY_DST,
            sample_count: 1,
        })?;
        let texture = Owned::new(device.clone(), texture);
        device.write_texture(texture.handle(), texels, width * 4)?;
        let view = device.create_texture_view(texture.handle(), &TextureViewDescriptor::default())?;
        let view = Owned::new(device.clone(), view);
        let sampler = device.create_sampler(&SamplerDescriptor {
            label: Some(Cow::Borrowed("level texture sampler")),
            filter: FilterMode::Linear,
            address_mode: AddressMode::Repeat,
            compare: None,
        })?;
        Ok(Self {
            view,
            sampler: Owned::new(device.clone(), sampler),
            texture,
            width,
            height,
        })
    }

    /// The view bound in descriptor sets.
    pub fn view(&self) -> TextureViewId {
        self.view.handle()
    }

    /// The sampler bound in descriptor sets.
    pub fn sampler(&self) -> SamplerId {
        self.sampler.handle()
    }

    /// The underlying texture.
    pub fn texture(&self) -> TextureId {
        self.texture.handle()
    }

    /// Width and height in texels.
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use labyrinth_core::renderer::{HeadlessDevice, ResourceKind};

    #[test]
    fn vertex_layout_covers_the_struct() {
        let layout = Vertex::layout();
        assert_eq!(layout.array_stride, 44);
        let last = layout.attributes[layout.attributes.len() - 1];
        assert_eq!(last.offset + last.format.size(), layout.array_stride);
    }

    #[test]
    fn texture_size_must_match_texels() {
        let device: Arc<dyn GraphicsDevice> = Arc::new(HeadlessDevice::new());
        assert!(matches!(
            TextureData::from_rgba8(&device, 2, 2, &[0; 12]),
            Err(ResourceError::OutOfBounds)
        ));
        assert!(TextureData::from_rgba8(&device, 2, 2, &[255; 16]).is_ok());
    }

    #[test]
    fn dropping_models_and_textures_frees_everything() {
        let headless = Arc::new(HeadlessDevice::new());
        let device: Arc<dyn GraphicsDevice> = headless.clone();
        let quad = ModelData::quad(&device, [1.0, 0.0, 0.0]).unwrap();
        assert_eq!(quad.index_count(), 6);
        let texture = TextureData::from_rgba8(&device, 1, 1, &[0, 0, 0, 255]).unwrap();
        assert_eq!(headless.live_count(ResourceKind::Buffer), 2);
        drop((quad, texture));
        assert_eq!(headless.live_resource_count(), 0);
    }
}
