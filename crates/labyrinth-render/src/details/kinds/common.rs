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

//! Resources every leaf kind builds the same way.
//!
//! Group 0 holds the common object data, group 1 the per-placement model
//! matrix (plus texture and sampler for textured placements).

use crate::details::{
    CommonObjectData, CreateDrawObjectDataFn, DescriptorPools, DrawItem, DrawObjectData, KindInfo,
    LoadContext, ModelMatrixBuffer, ObjectVariant, Parameters, RenderDetails, ShadowMapBinding,
};
use crate::drawer::{TextureData, Vertex};
use crate::error::DetailsError;
use labyrinth_core::renderer::{
    BindGroupEntry, BindGroupId, BindGroupLayoutDescriptor, BindGroupLayoutEntry,
    BindGroupLayoutId, BindingType, BlendMode, ColorTargetState, CompareFunction, CullMode,
    DepthStencilState, GraphicsDevice, Owned, PipelineLayoutDescriptor, PipelineLayoutId,
    RenderPass, RenderPipelineDescriptor, RenderPipelineId, ResourceError, ShaderError,
    ShaderModuleDescriptor, ShaderModuleId, ShaderSourceData, ShaderStages, SurfaceDetails,
    TextureFormat, TextureViewDimension,
};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

/// Bind group index of the common object data.
pub(crate) const COD_GROUP: u32 = 0;
/// Bind group index of the draw object data.
pub(crate) const OBJECT_GROUP: u32 = 1;

/// How a leaf kind lays out its resources.
#[derive(Debug, Clone)]
pub(crate) struct KindSetup {
    /// Entries of the common object data layout. Binding 0 is the uniform block.
    pub cod_entries: Vec<BindGroupLayoutEntry>,
    /// Whether textured placements get their own pipeline.
    pub textured: bool,
    /// The variant of untextured placements.
    pub base_variant: ObjectVariant,
    /// Face culling of every pipeline.
    pub cull_mode: CullMode,
    /// Blending of every color target.
    pub blend: Option<BlendMode>,
}

/// The layout of a common object data holding only its uniform block.
pub(crate) fn uniform_only() -> Vec<BindGroupLayoutEntry> {
    vec![BindGroupLayoutEntry::uniform(0, ShaderStages::VERTEX_FRAGMENT)]
}

/// The layout of a common object data sampling shadow maps.
pub(crate) fn shadow_sampling(view_dimension: TextureViewDimension) -> Vec<BindGroupLayoutEntry> {
    vec![
        BindGroupLayoutEntry::uniform(0, ShaderStages::VERTEX_FRAGMENT),
        BindGroupLayoutEntry {
            binding: 1,
            visibility: ShaderStages::FRAGMENT,
            ty: BindingType::Texture {
                view_dimension,
                depth: true,
            },
        },
        BindGroupLayoutEntry {
            binding: 2,
            visibility: ShaderStages::FRAGMENT,
            ty: BindingType::Sampler { comparison: true },
        },
    ]
}

/// The entries binding `shadow_map` after the uniform block.
pub(crate) fn shadow_map_entries(shadow_map: &ShadowMapBinding) -> [BindGroupEntry; 2] {
    [
        BindGroupEntry::texture_view(1, shadow_map.view),
        BindGroupEntry::sampler(2, shadow_map.sampler),
    ]
}

/// Descriptor pools for placements of one kind.
#[derive(Debug)]
pub(crate) struct ObjectSets {
    base: Rc<DescriptorPools>,
    textured: Option<Rc<DescriptorPools>>,
    base_variant: ObjectVariant,
}

impl ObjectSets {
    fn create(
        &self,
        texture: Option<&TextureData>,
        model_matrix: Rc<ModelMatrixBuffer>,
    ) -> Result<DrawObjectData, DetailsError> {
        if let (Some(texture), Some(pools)) = (texture, &self.textured) {
            let set = pools.allocate(&[
                BindGroupEntry::buffer(0, model_matrix.buffer()),
                BindGroupEntry::texture_view(1, texture.view()),
                BindGroupEntry::sampler(2, texture.sampler()),
            ])?;
            return Ok(DrawObjectData::new(model_matrix, ObjectVariant::Texture, set));
        }
        let set = self
            .base
            .allocate(&[BindGroupEntry::buffer(0, model_matrix.buffer())])?;
        Ok(DrawObjectData::new(model_matrix, self.base_variant, set))
    }
}

#[derive(Debug)]
struct SizedPipelines {
    surface: SurfaceDetails,
    base: Owned<RenderPipelineId>,
    textured: Option<Owned<RenderPipelineId>>,
}

impl SizedPipelines {
    fn pipeline(&self, variant: ObjectVariant) -> RenderPipelineId {
        match (variant, &self.textured) {
            (ObjectVariant::Texture, Some(textured)) => textured.handle(),
            _ => self.base.handle(),
        }
    }
}

/// Shader, layouts, pools and surface-sized pipelines of a leaf kind.
pub(crate) struct ObjectKindBase {
    // Pipelines go before the layouts and shader they were built from.
    sized: RefCell<SizedPipelines>,
    device: Arc<dyn GraphicsDevice>,
    info: KindInfo,
    setup: KindSetup,
    shader: Owned<ShaderModuleId>,
    cod_layout: Rc<Owned<BindGroupLayoutId>>,
    objects: Rc<ObjectSets>,
    base_layout: Owned<PipelineLayoutId>,
    textured_layout: Option<Owned<PipelineLayoutId>>,
}

impl fmt::Debug for ObjectKindBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectKindBase")
            .field("name", &self.info.name)
            .field("surface", &self.sized.borrow().surface)
            .field("textured", &self.setup.textured)
            .finish_non_exhaustive()
    }
}

impl ObjectKindBase {
    /// Builds every resource of the kind for `surface`.
    pub fn new(
        info: &KindInfo,
        context: &LoadContext,
        surface: &SurfaceDetails,
        setup: KindSetup,
    ) -> Result<Self, DetailsError> {
        let device = Arc::clone(&context.device);
        let shader_name = info.shaders.first().copied().ok_or_else(|| {
            ResourceError::from(ShaderError::LoadError {
                path: info.name.to_string(),
                source_error: "the kind declares no shader".to_string(),
            })
        })?;
        let source = context
            .shaders
            .shader_source(shader_name)
            .map_err(ResourceError::from)?;
        let shader = device.create_shader_module(&ShaderModuleDescriptor {
            label: Some(shader_name),
            source: ShaderSourceData::Wgsl(source),
        })?;
        let shader = Owned::new(device.clone(), shader);

        let layout = |entries: &[BindGroupLayoutEntry]| -> Result<_, ResourceError> {
            let id = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
                label: Some(info.name),
                entries,
            })?;
            Ok(Rc::new(Owned::new(device.clone(), id)))
        };
        let cod_layout = layout(&setup.cod_entries)?;
        let base_objects = layout(&[BindGroupLayoutEntry::uniform(0, ShaderStages::VERTEX)])?;
        let textured_objects = if setup.textured {
            Some(layout(&[
                BindGroupLayoutEntry::uniform(0, ShaderStages::VERTEX),
                BindGroupLayoutEntry::texture(1),
                BindGroupLayoutEntry::sampler(2),
            ])?)
        } else {
            None
        };

        let pipeline_layout = |objects: BindGroupLayoutId| -> Result<_, ResourceError> {
            let id = device.create_pipeline_layout(&PipelineLayoutDescriptor {
                label: Some(info.name),
                bind_group_layouts: &[cod_layout.handle(), objects],
            })?;
            Ok(Owned::new(device.clone(), id))
        };
        let base_layout = pipeline_layout(base_objects.handle())?;
        let textured_layout = textured_objects
            .as_ref()
            .map(|objects| pipeline_layout(objects.handle()))
            .transpose()?;

        let pool_size = context.config.descriptor_pool_size;
        let objects = Rc::new(ObjectSets {
            base: DescriptorPools::new(device.clone(), base_objects, pool_size, info.name),
            textured: textured_objects
                .map(|layout| DescriptorPools::new(device.clone(), layout, pool_size, info.name)),
            base_variant: setup.base_variant,
        });

        let sized = build_pipelines(
            &device,
            info.name,
            &setup,
            shader.handle(),
            base_layout.handle(),
            textured_layout.as_ref().map(Owned::handle),
            surface,
        )?;
        log::debug!(
            "{}: created for {}x{} ({} pipelines)",
            info.name,
            surface.width,
            surface.height,
            if sized.textured.is_some() { 2 } else { 1 }
        );

        Ok(Self {
            sized: RefCell::new(sized),
            device,
            info: *info,
            setup,
            shader,
            cod_layout,
            objects,
            base_layout,
            textured_layout,
        })
    }

    /// What the kind registered.
    pub fn info(&self) -> &KindInfo {
        &self.info
    }

    /// The layout common object data is created against.
    pub fn cod_layout(&self) -> &Rc<Owned<BindGroupLayoutId>> {
        &self.cod_layout
    }

    /// A factory for placements of this kind.
    pub fn create_fn(&self) -> CreateDrawObjectDataFn {
        let objects = Rc::clone(&self.objects);
        Rc::new(
            move |texture: Option<&TextureData>, model_matrix: Rc<ModelMatrixBuffer>| {
                objects.create(texture, model_matrix)
            },
        )
    }

    /// The surface the pipelines were built for.
    pub fn surface(&self) -> SurfaceDetails {
        self.sized.borrow().surface.clone()
    }

    /// Rebuilds the pipelines for `surface`.
    pub fn reload(&self, surface: &SurfaceDetails) -> Result<(), DetailsError> {
        let sized = build_pipelines(
            &self.device,
            self.info.name,
            &self.setup,
            self.shader.handle(),
            self.base_layout.handle(),
            self.textured_layout.as_ref().map(Owned::handle),
            surface,
        )?;
        log::info!(
            "{}: rebuilt pipelines for {}x{}",
            self.info.name,
            surface.width,
            surface.height
        );
        *self.sized.borrow_mut() = sized;
        Ok(())
    }

    /// Draws `items` in order, binding a pipeline only when the variant changes.
    pub fn record_draws(
        &self,
        pass: &mut dyn RenderPass,
        cod_bind_group: BindGroupId,
        items: &[DrawItem<'_>],
    ) -> Result<usize, DetailsError> {
        let sized = self.sized.borrow();
        let mut bound: Option<RenderPipelineId> = None;
        for item in items {
            let pipeline = sized.pipeline(item.data.variant());
            if bound != Some(pipeline) {
                pass.set_pipeline(pipeline);
                pass.set_bind_group(COD_GROUP, cod_bind_group, &[]);
                bound = Some(pipeline);
            }
            let set = item
                .data
                .descriptor_set(item.set)
                .ok_or(DetailsError::MissingDescriptorSet {
                    kind: self.info.name,
                    id: item.set,
                })?;
            pass.set_bind_group(OBJECT_GROUP, set, &[]);
            item.model.bind(pass);
            pass.draw_indexed(0..item.model.index_count(), 0, 0..1);
        }
        Ok(items.len())
    }
}

fn build_pipelines(
    device: &Arc<dyn GraphicsDevice>,
    name: &'static str,
    setup: &KindSetup,
    shader: ShaderModuleId,
    base_layout: PipelineLayoutId,
    textured_layout: Option<PipelineLayoutId>,
    surface: &SurfaceDetails,
) -> Result<SizedPipelines, ResourceError> {
    let base_fragment = match setup.base_variant {
        ObjectVariant::Geometry => "fs_main",
        ObjectVariant::Color | ObjectVariant::Texture => "fs_color",
    };
    let base = create_pipeline(device, name, setup, shader, base_layout, base_fragment, surface)?;
    let textured = textured_layout
        .map(|layout| create_pipeline(device, name, setup, shader, layout, "fs_texture", surface))
        .transpose()?;
    Ok(SizedPipelines {
        surface: surface.clone(),
        base,
        textured,
    })
}

fn create_pipeline(
    device: &Arc<dyn GraphicsDevice>,
    name: &'static str,
    setup: &KindSetup,
    shader: ShaderModuleId,
    layout: PipelineLayoutId,
    fragment_entry: &'static str,
    surface: &SurfaceDetails,
) -> Result<Owned<RenderPipelineId>, ResourceError> {
    let color_targets: Vec<ColorTargetState> = surface
        .render_pass
        .color_formats
        .iter()
        .map(|&format| ColorTargetState {
            format,
            blend: setup.blend,
        })
        .collect();
    let vertex_buffers = [Vertex::layout()];
    let id = device.create_render_pipeline(&RenderPipelineDescriptor {
        label: Some(name),
        layout,
        shader,
        vertex_entry: "vs_main",
        fragment_entry: (!color_targets.is_empty()).then_some(fragment_entry),
        vertex_buffers: &vertex_buffers,
        color_targets: &color_targets,
        depth_stencil: surface
            .render_pass
            .depth_format
            .map(|format| DepthStencilState {
                format,
                depth_write_enabled: true,
                depth_compare: CompareFunction::Less,
            }),
        cull_mode: setup.cull_mode,
        sample_count: surface.render_pass.sample_count,
    })?;
    Ok(Owned::new(device.clone(), id))
}

/// Downcasts a cached instance to the kind whose functions were called.
pub(crate) fn downcast<T: RenderDetails + 'static>(
    existing: &Rc<dyn RenderDetails>,
    expected: &'static str,
) -> Result<Rc<T>, DetailsError> {
    Rc::clone(existing)
        .into_any()
        .downcast::<T>()
        .map_err(|_| DetailsError::KindMismatch { expected })
}

pub(crate) fn parameters_mismatch(expected: &'static str, found: &Parameters) -> DetailsError {
    DetailsError::ParametersMismatch {
        expected,
        found: found.variant_name(),
    }
}

pub(crate) fn cod_mismatch(kind: &'static str, found: &CommonObjectData) -> DetailsError {
    DetailsError::CommonObjectDataMismatch {
        kind,
        found: found.variant_name(),
    }
}

/// Decodes an `Rgba32Float` readback, bottom row first.
///
/// `raw` holds `height` rows of `bytes_per_row` bytes, top row first.
pub(crate) fn rgba32_bottom_up(
    raw: &[u8],
    width: u32,
    height: u32,
    bytes_per_row: u32,
) -> Result<Vec<[f32; 4]>, DetailsError> {
    if width == 0 || height == 0 {
        return Ok(Vec::new());
    }
    let texel = TextureFormat::Rgba32Float.bytes_per_texel() as usize;
    let row_bytes = width as usize * texel;
    let stride = bytes_per_row as usize;
    let needed = stride * (height as usize - 1) + row_bytes;
    if stride < row_bytes || raw.len() < needed {
        return Err(ResourceError::ReadbackFailed(format!(
            "{} bytes cannot hold {width}x{height} texels at {bytes_per_row} bytes per row",
            raw.len()
        ))
        .into());
    }
    let mut texels = Vec::with_capacity(width as usize * height as usize);
    for row in (0..height as usize).rev() {
        let start = row * stride;
        texels.extend(
            raw[start..start + row_bytes]
                .chunks_exact(texel)
                .map(bytemuck::pod_read_unaligned::<[f32; 4]>),
        );
    }
    Ok(texels)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(rows: &[[f32; 2]], bytes_per_row: usize) -> Vec<u8> {
        let mut raw = Vec::new();
        for row in rows {
            let start = raw.len();
            for &value in row {
                raw.extend_from_slice(bytemuck::bytes_of(&[value, 0.0, 0.0, 1.0]));
            }
            raw.resize(start + bytes_per_row, 0);
        }
        raw
    }

    #[test]
    fn readback_is_flipped_and_unpadded() {
        let raw = image(&[[1.0, 2.0], [3.0, 4.0]], 256);
        let texels = rgba32_bottom_up(&raw, 2, 2, 256).unwrap();
        let reds: Vec<f32> = texels.iter().map(|t| t[0]).collect();
        assert_eq!(reds, [3.0, 4.0, 1.0, 2.0]);
    }

    #[test]
    fn short_readback_fails() {
        let raw = image(&[[1.0, 2.0]], 32);
        assert!(matches!(
            rgba32_bottom_up(&raw, 2, 2, 32),
            Err(DetailsError::Resource(ResourceError::ReadbackFailed(_)))
        ));
        assert!(rgba32_bottom_up(&raw, 2, 1, 16).is_err());
    }
}
