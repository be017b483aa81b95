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

//! Drawing a level's three tables onto a surface or into a readback buffer.

use super::batch::{group_by_batch, plan_runs, Run};
use super::{
    DrawObjDataReference, DrawObjReference, DrawObjectTable, ModelData, OverrideRequest,
    TextureData,
};
use crate::config::DrawerConfig;
use crate::details::{
    DrawItem, EmbeddedShaders, Parameters, Query, Registry, RenderDetailsLoader,
    RenderDetailsReference, ShaderRequester,
};
use crate::error::{DetailsError, DrawerError};
use glam::Mat4;
use labyrinth_core::renderer::{
    BufferDescriptor, BufferId, BufferUsage, Extent3d, GraphicsDevice, Operations, Owned,
    RenderPassColorAttachment, RenderPassDepthStencilAttachment, RenderPassDescriptor,
    RenderPassLayout, SurfaceDetails, TextureDescriptor, TextureFormat, TextureId,
    TextureToBufferCopy, TextureUsage, TextureViewDescriptor, TextureViewId,
    COPY_BYTES_PER_ROW_ALIGNMENT,
};
use std::borrow::Cow;
use std::rc::Rc;
use std::sync::Arc;

/// The format baking surfaces are built with.
pub const BAKE_FORMAT: TextureFormat = TextureFormat::Rgba32Float;
const BAKE_DEPTH_FORMAT: TextureFormat = TextureFormat::Depth32Float;

/// The semantic group a table draws, in draw order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bucket {
    /// Drawn first: backgrounds and level openers.
    Starter,
    /// The level itself.
    Level,
    /// Drawn last: overlays and level closers.
    Finisher,
}

impl Bucket {
    /// Every bucket, in draw order.
    pub const ALL: [Bucket; 3] = [Bucket::Starter, Bucket::Level, Bucket::Finisher];

    fn index(self) -> usize {
        match self {
            Bucket::Starter => 0,
            Bucket::Level => 1,
            Bucket::Finisher => 2,
        }
    }
}

/// The attachments of one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameTarget {
    /// The color attachment.
    pub color_view: TextureViewId,
    /// Where a multisampled color attachment resolves to.
    pub resolve_target: Option<TextureViewId>,
    /// The depth attachment.
    pub depth_view: Option<TextureViewId>,
}

/// What one [`LevelDrawer::draw`] recorded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrawStats {
    /// Contiguous runs drawn, one `add_draw_cmds` call each.
    pub runs: usize,
    /// Indexed draw calls across all runs.
    pub draw_calls: usize,
    /// Auxiliary passes recorded before the main pass.
    pub pre_passes: usize,
}

/// An object to bake with [`LevelDrawer::draw_to_buffer`].
#[derive(Debug, Clone)]
pub struct BakeObject {
    /// The geometry.
    pub model: Rc<ModelData>,
    /// The texture, if any.
    pub texture: Option<Rc<TextureData>>,
    /// One placement per matrix.
    pub model_matrices: Vec<Mat4>,
}

/// Draws a level's three tables onto a surface.
#[derive(Debug)]
pub struct LevelDrawer {
    device: Arc<dyn GraphicsDevice>,
    loader: RenderDetailsLoader,
    tables: [DrawObjectTable; 3],
    requests: [Option<OverrideRequest>; 3],
    surface: SurfaceDetails,
    clear_color: [f32; 4],
    config: DrawerConfig,
}

impl LevelDrawer {
    /// Creates a drawer with the built-in kinds and embedded shaders.
    pub fn new(
        device: Arc<dyn GraphicsDevice>,
        surface: SurfaceDetails,
        config: DrawerConfig,
    ) -> Result<Self, DrawerError> {
        Self::with_registry(
            device,
            surface,
            config,
            Rc::new(Registry::with_builtin_kinds()),
            Rc::new(EmbeddedShaders),
        )
    }

    /// Creates a drawer over a custom registry and shader source.
    pub fn with_registry(
        device: Arc<dyn GraphicsDevice>,
        surface: SurfaceDetails,
        config: DrawerConfig,
        registry: Rc<Registry>,
        shaders: Rc<dyn ShaderRequester>,
    ) -> Result<Self, DrawerError> {
        config.validate()?;
        let loader = RenderDetailsLoader::new(
            Arc::clone(&device),
            shaders,
            registry,
            config.render_details.clone(),
            config.frames_in_flight(),
        );
        log::info!(
            "LevelDrawer: created for {}x{} surface",
            surface.width,
            surface.height
        );
        Ok(Self {
            device,
            loader,
            tables: Default::default(),
            requests: Default::default(),
            surface,
            clear_color: config.clear_color,
            config,
        })
    }

    /// The table of `bucket`.
    pub fn table(&self, bucket: Bucket) -> &DrawObjectTable {
        &self.tables[bucket.index()]
    }

    /// The loader, for inspection.
    pub fn loader(&self) -> &RenderDetailsLoader {
        &self.loader
    }

    /// The surface frames are drawn to.
    pub fn surface(&self) -> &SurfaceDetails {
        &self.surface
    }

    /// The configuration the drawer was created with.
    pub fn config(&self) -> &DrawerConfig {
        &self.config
    }

    /// The color the main pass clears to.
    pub fn clear_color(&self) -> [f32; 4] {
        self.clear_color
    }

    /// Sets the color the main pass clears to.
    pub fn set_clear_color(&mut self, clear_color: [f32; 4]) {
        self.clear_color = clear_color;
    }

    /// Loads the render details objects of `bucket` draw with by default.
    pub fn request_render_details(
        &mut self,
        bucket: Bucket,
        query: Query,
        parameters: Parameters,
    ) -> Result<(), DrawerError> {
        let reference = self.loader.load(&query, &self.surface, &parameters)?;
        self.tables[bucket.index()].set_render_details(reference);
        self.requests[bucket.index()] = Some(OverrideRequest { query, parameters });
        Ok(())
    }

    /// Updates the default render details of `bucket`.
    pub fn update_parameters(
        &mut self,
        bucket: Bucket,
        parameters: Parameters,
    ) -> Result<(), DrawerError> {
        let index = bucket.index();
        let reference = self.tables[index]
            .render_details()
            .ok_or(DrawerError::DefaultRenderDetailsNotSet)?;
        reference.update(&parameters)?;
        if let Some(request) = &mut self.requests[index] {
            request.parameters = parameters;
        }
        Ok(())
    }

    /// `(projection, view)` of the default render details of `bucket`.
    pub fn proj_view_for_level(&self, bucket: Bucket) -> Result<(Mat4, Mat4), DrawerError> {
        self.tables[bucket.index()]
            .render_details()
            .map(RenderDetailsReference::proj_view_for_level)
            .ok_or(DrawerError::DefaultRenderDetailsNotSet)
    }

    /// Adds an object drawn with the default render details of `bucket`.
    pub fn add_object(
        &mut self,
        bucket: Bucket,
        model: Rc<ModelData>,
        texture: Option<Rc<TextureData>>,
    ) -> Result<DrawObjReference, DrawerError> {
        self.tables[bucket.index()].add_object(model, texture)
    }

    /// Adds an object drawn with its own render details.
    pub fn add_object_with_render_details(
        &mut self,
        bucket: Bucket,
        query: Query,
        parameters: Parameters,
        model: Rc<ModelData>,
        texture: Option<Rc<TextureData>>,
    ) -> Result<DrawObjReference, DrawerError> {
        let reference = self.loader.load(&query, &self.surface, &parameters)?;
        let request = OverrideRequest { query, parameters };
        Ok(self.tables[bucket.index()].add_object_with_render_details(
            reference,
            Some(request),
            model,
            texture,
        ))
    }

    /// Removes an object and all its placements.
    pub fn remove_object(
        &mut self,
        bucket: Bucket,
        obj: DrawObjReference,
    ) -> Result<(), DrawerError> {
        self.tables[bucket.index()].remove_object(obj)
    }

    /// Moves one placement to another object of the same bucket.
    pub fn transfer_object(
        &mut self,
        bucket: Bucket,
        from: DrawObjReference,
        data: DrawObjDataReference,
        to: DrawObjReference,
    ) -> Result<Option<DrawObjDataReference>, DrawerError> {
        self.tables[bucket.index()].transfer_object(from, data, to)
    }

    /// Drops every object of `bucket` and its default render details.
    pub fn clear_draw_object_table(&mut self, bucket: Bucket) {
        self.tables[bucket.index()].clear();
        self.requests[bucket.index()] = None;
    }

    /// Places `obj` with `model_matrix`.
    pub fn add_model_matrix_for_object(
        &mut self,
        bucket: Bucket,
        obj: DrawObjReference,
        model_matrix: Mat4,
    ) -> Result<DrawObjDataReference, DrawerError> {
        let table = &mut self.tables[bucket.index()];
        let object = table
            .object(obj)
            .ok_or(DrawerError::InvalidDrawObjReference(obj))?;
        let reference = table
            .resolved_render_details(obj)
            .ok_or(DrawerError::DefaultRenderDetailsNotSet)?;
        let object_data = reference.new_draw_object_data(
            &self.device,
            object.texture().map(|texture| texture.as_ref()),
            model_matrix,
        )?;
        table.add_draw_obj_data(obj, object_data)
    }

    /// Moves a placement.
    pub fn update_model_matrix_for_object(
        &mut self,
        bucket: Bucket,
        obj: DrawObjReference,
        data: DrawObjDataReference,
        model_matrix: Mat4,
    ) -> Result<(), DrawerError> {
        self.tables[bucket.index()].update_object_data(obj, data, model_matrix)
    }

    /// Removes a placement.
    pub fn remove_model_matrix_for_object(
        &mut self,
        bucket: Bucket,
        obj: DrawObjReference,
        data: DrawObjDataReference,
    ) -> Result<(), DrawerError> {
        self.tables[bucket.index()]
            .remove_object_data(obj, data)
            .map(drop)
    }

    /// Switches to a new surface.
    ///
    /// Every table reloads its render details for `surface` and rebuilds its
    /// placements against them. Object and placement references stay valid.
    pub fn set_surface(&mut self, surface: SurfaceDetails) -> Result<(), DrawerError> {
        log::info!(
            "LevelDrawer: surface changed from {}x{} to {}x{}",
            self.surface.width,
            self.surface.height,
            surface.width,
            surface.height
        );
        self.surface = surface;
        for bucket in Bucket::ALL {
            let index = bucket.index();
            if let Some(request) = &self.requests[index] {
                let reference = self
                    .loader
                    .load(&request.query, &self.surface, &request.parameters)?;
                self.tables[index].set_render_details(reference);
            }

            let overrides: Vec<(DrawObjReference, OverrideRequest)> = self.tables[index]
                .objects_with_override()
                .iter()
                .filter_map(|&obj| {
                    let request = self.tables[index].object(obj)?.override_request()?;
                    Some((obj, request.clone()))
                })
                .collect();
            for (obj, request) in overrides {
                let reference = self
                    .loader
                    .load(&request.query, &self.surface, &request.parameters)?;
                self.tables[index].replace_override(obj, reference)?;
            }

            self.tables[index].rebuild_draw_object_data()?;
        }
        Ok(())
    }

    /// Records and submits one frame.
    pub fn draw(&mut self, target: &FrameTarget) -> Result<DrawStats, DrawerError> {
        let plans = self
            .tables
            .iter()
            .map(plan_runs)
            .collect::<Result<Vec<_>, _>>()?;
        let runs: Vec<Run<'_>> = plans.into_iter().flatten().collect();

        let mut encoder = self.device.create_command_encoder(Some("LevelDrawer frame"));
        let mut stats = DrawStats::default();
        for group in group_by_batch(&runs) {
            let mut cod = group.reference.common_object_data.borrow_mut();
            stats.pre_passes += group.reference.render_details.add_pre_render_pass_cmds(
                encoder.as_mut(),
                &mut cod,
                &group.items,
            )?;
        }

        {
            let color_attachments = [RenderPassColorAttachment {
                view: target.color_view,
                resolve_target: target.resolve_target,
                ops: Operations::clear(self.clear_color),
            }];
            let mut pass = encoder.begin_render_pass(&RenderPassDescriptor {
                label: Some("LevelDrawer main pass"),
                color_attachments: &color_attachments,
                depth_stencil_attachment: target.depth_view.map(|view| {
                    RenderPassDepthStencilAttachment {
                        view,
                        depth_ops: Operations::clear(1.0),
                    }
                }),
            });
            pass.set_viewport(
                0.0,
                0.0,
                self.surface.width as f32,
                self.surface.height as f32,
            );
            for run in &runs {
                let cod = run.reference.common_object_data.borrow();
                stats.draw_calls += run.reference.render_details.add_draw_cmds(
                    pass.as_mut(),
                    &cod,
                    &run.items,
                )?;
                stats.runs += 1;
            }
        }

        self.device.submit_command_buffer(encoder.finish())?;
        log::trace!(
            "LevelDrawer: {} runs, {} draw calls, {} pre-passes",
            stats.runs,
            stats.draw_calls,
            stats.pre_passes
        );
        Ok(stats)
    }

    /// Renders `objects` off-screen and returns the post-processed image.
    ///
    /// The kind resolved from `query` must support readback. The result is
    /// bottom row first.
    pub fn draw_to_buffer(
        &mut self,
        query: &Query,
        parameters: &Parameters,
        objects: &[BakeObject],
        width: u32,
        height: u32,
    ) -> Result<Vec<f32>, DrawerError> {
        let surface = SurfaceDetails::new(
            width,
            height,
            RenderPassLayout::color_depth(BAKE_FORMAT, BAKE_DEPTH_FORMAT),
        );
        let reference = self.loader.load(query, &surface, parameters)?;
        let render_details = &reference.render_details;
        if render_details.readback_format() != Some(BAKE_FORMAT) {
            return Err(DetailsError::ReadbackUnsupported {
                kind: render_details.name(),
            }
            .into());
        }

        let mut placements = Vec::new();
        for object in objects {
            for &model_matrix in &object.model_matrices {
                let data = reference.new_draw_object_data(
                    &self.device,
                    object.texture.as_deref(),
                    model_matrix,
                )?;
                placements.push((object, data));
            }
        }
        let items: Vec<DrawItem<'_>> = placements
            .iter()
            .map(|(object, data)| DrawItem::new(&object.model, object.texture.as_deref(), data))
            .collect();

        let target = BakeTarget::new(&self.device, width, height)?;
        let clear_color = render_details
            .clear_color_override()
            .unwrap_or(self.clear_color);
        let mut encoder = self.device.create_command_encoder(Some("LevelDrawer bake"));
        {
            let mut cod = reference.common_object_data.borrow_mut();
            render_details.add_pre_render_pass_cmds(encoder.as_mut(), &mut cod, &items)?;
        }
        {
            let color_attachments = [RenderPassColorAttachment {
                view: target.color_view.handle(),
                resolve_target: None,
                ops: Operations::clear(clear_color),
            }];
            let mut pass = encoder.begin_render_pass(&RenderPassDescriptor {
                label: Some("LevelDrawer bake pass"),
                color_attachments: &color_attachments,
                depth_stencil_attachment: Some(RenderPassDepthStencilAttachment {
                    view: target.depth_view.handle(),
                    depth_ops: Operations::clear(1.0),
                }),
            });
            pass.set_viewport(0.0, 0.0, width as f32, height as f32);
            let cod = reference.common_object_data.borrow();
            render_details.add_draw_cmds(pass.as_mut(), &cod, &items)?;
        }
        encoder.copy_texture_to_buffer(&TextureToBufferCopy {
            texture: target.color.handle(),
            buffer: target.readback.handle(),
            bytes_per_row: target.bytes_per_row,
            width,
            height,
        });
        self.device.submit_command_buffer(encoder.finish())?;
        self.device.wait_idle()?;

        let raw = self.device.read_buffer(target.readback.handle())?;
        let cod = reference.common_object_data.borrow();
        let values = render_details.post_process_image_buffer(
            &cod,
            &raw,
            width,
            height,
            target.bytes_per_row,
        )?;
        log::debug!(
            "LevelDrawer: baked {width}x{height} with '{}' ({} values)",
            render_details.name(),
            values.len()
        );
        Ok(values)
    }
}

/// Off-screen attachments and the buffer they are copied into.
struct BakeTarget {
    color_view: Owned<TextureViewId>,
    depth_view: Owned<TextureViewId>,
    color: Owned<TextureId>,
    _depth: Owned<TextureId>,
    readback: Owned<BufferId>,
    bytes_per_row: u32,
}

impl BakeTarget {
    fn new(
        device: &Arc<dyn GraphicsDevice>,
        width: u32,
        height: u32,
    ) -> Result<Self, DrawerError> {
        let size = Extent3d::new_2d(width, height);
        let texture = |label: &'static str, format: TextureFormat, usage: TextureUsage| {
            device
                .create_texture(&TextureDescriptor {
                    label: Some(Cow::Borrowed(label)),
                    size,
                    format,
                    usage,
                    sample_count: 1,
                })
                .map(|id| Owned::new(device.clone(), id))
        };
        let color = texture(
            "bake color",
            BAKE_FORMAT,
            TextureUsage::RENDER_ATTACHMENT | TextureUsage::COPY_SRC,
        )?;
        let depth = texture(
            "bake depth",
            BAKE_DEPTH_FORMAT,
            TextureUsage::RENDER_ATTACHMENT,
        )?;
        let view = |texture: &Owned<TextureId>| {
            device
                .create_texture_view(texture.handle(), &TextureViewDescriptor::default())
                .map(|id| Owned::new(device.clone(), id))
        };
        let color_view = view(&color)?;
        let depth_view = view(&depth)?;

        let bytes_per_row = padded_bytes_per_row(width, BAKE_FORMAT);
        let readback = device.create_buffer(&BufferDescriptor {
            label: Some(Cow::Borrowed("bake readback")),
            size: u64::from(bytes_per_row) * u64::from(height),
            usage: BufferUsage::COPY_DST | BufferUsage::MAP_READ,
        })?;
        Ok(Self {
            color_view,
            depth_view,
            color,
            _depth: depth,
            readback: Owned::new(device.clone(), readback),
            bytes_per_row,
        })
    }
}

/// Bytes per row of a `format` copy of `width` texels, padded for the copy.
pub fn padded_bytes_per_row(width: u32, format: TextureFormat) -> u32 {
    let unpadded = width * format.bytes_per_texel();
    unpadded.div_ceil(COPY_BYTES_PER_ROW_ALIGNMENT) * COPY_BYTES_PER_ROW_ALIGNMENT
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_are_padded_to_the_copy_alignment() {
        assert_eq!(padded_bytes_per_row(1, BAKE_FORMAT), 256);
        assert_eq!(padded_bytes_per_row(16, BAKE_FORMAT), 256);
        assert_eq!(padded_bytes_per_row(17, BAKE_FORMAT), 512);
        assert_eq!(padded_bytes_per_row(64, TextureFormat::Rgba8Unorm), 256);
    }

    #[test]
    fn buckets_draw_in_fixed_order() {
        let order: Vec<usize> = Bucket::ALL.iter().map(|b| b.index()).collect();
        assert_eq!(order, [0, 1, 2]);
    }
}
