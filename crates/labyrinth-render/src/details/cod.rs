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

//! Common object data: the per-batch camera and light state of a kind.
//!
//! Leaf data keeps its uniform block in a [`UniformRingBuffer`] with one slot
//! per frame in flight. [`Updatable::update`] writes the next slot and draws
//! bind the current one, so a frame being recorded never rewrites the slot an
//! earlier, still executing frame reads.
//!
//! Composite data holds the references of the kinds it chains and marks its
//! shadow maps dirty on every update.

use super::{
    DarkObjectParameters, DarkParameters, DepthMapParameters, LightAnchor, LoadContext,
    NormalMapParameters, ObjectParameters, ObjectWithShadowsParameters, Parameters, PerspectiveState,
    RenderDetailsReference, ShadowMapBinding, ShadowsParameters, LIGHT_DIRECTIONS,
};
use crate::error::DetailsError;
use bytemuck::{Pod, Zeroable};
use glam::Mat4;
use labyrinth_core::renderer::{
    AddressMode, BindGroupEntry, BindGroupId, BindGroupLayoutId, BufferId, CompareFunction,
    Extent3d, FilterMode, GraphicsDevice, Owned, ResourceError, SamplerDescriptor, SamplerId,
    SurfaceDetails, TextureDescriptor, TextureFormat, TextureId, TextureUsage,
    TextureViewDescriptor, TextureViewDimension, TextureViewId, UniformRingBuffer,
};
use std::borrow::Cow;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

/// The most point lights a dark level supports.
pub const MAX_DARK_LIGHTS: usize = 4;

/// Replaces the state of a common object data.
pub trait Updatable {
    /// Applies `parameters` and uploads the result.
    ///
    /// # Errors
    ///
    /// [`DetailsError::ParametersMismatch`] for a variant the data does not
    /// accept, [`DetailsError::InvalidParameters`] for a change the data
    /// cannot absorb without being rebuilt.
    fn update(&mut self, parameters: &Parameters) -> Result<(), DetailsError>;

    /// Runs every check of [`Updatable::update`] without applying anything.
    fn check(&self, parameters: &Parameters) -> Result<(), DetailsError>;
}

fn mat(m: Mat4) -> [[f32; 4]; 4] {
    m.to_cols_array_2d()
}

fn point(v: glam::Vec3) -> [f32; 4] {
    v.extend(1.0).to_array()
}

/// Uniforms of plain lit objects.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct ObjectUniforms {
    /// Pre-transform times projection.
    pub proj: [[f32; 4]; 4],
    /// World to camera.
    pub view: [[f32; 4]; 4],
    /// Light position, `w = 1`.
    pub light_pos: [f32; 4],
}

/// Uniforms of objects sampling a shadow map.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct ObjectWithShadowsUniforms {
    /// Pre-transform times projection.
    pub proj: [[f32; 4]; 4],
    /// World to camera.
    pub view: [[f32; 4]; 4],
    /// World to shadow map clip space.
    pub light_proj_view: [[f32; 4]; 4],
    /// Light position, `w = 1`.
    pub light_pos: [f32; 4],
}

/// Uniforms of a shadow map pass.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct ShadowsUniforms {
    /// World to light clip space.
    pub proj_view: [[f32; 4]; 4],
}

/// Uniforms of dark objects.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct DarkUniforms {
    /// Pre-transform times projection.
    pub proj: [[f32; 4]; 4],
    /// World to camera.
    pub view: [[f32; 4]; 4],
    /// Camera position, `w = 1`.
    pub camera_pos: [f32; 4],
    /// Light positions, `w = 1`.
    pub light_positions: [[f32; 4]; MAX_DARK_LIGHTS],
    /// One matrix per shadow map layer, light-major.
    pub light_proj_views: [[[f32; 4]; 4]; 16],
    /// The number of lights in `x`.
    pub light_count: [u32; 4],
}

/// Uniforms of the depth map bake.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct DepthMapUniforms {
    /// Pre-transform times the orthographic projection.
    pub proj: [[f32; 4]; 4],
    /// World to camera.
    pub view: [[f32; 4]; 4],
    /// Nearest and farthest world depth in `x` and `y`.
    pub depth_range: [f32; 4],
}

/// Uniforms of the normal map bake.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct NormalMapUniforms {
    /// Pre-transform times the orthographic projection.
    pub proj: [[f32; 4]; 4],
    /// World to camera.
    pub view: [[f32; 4]; 4],
}

/// A parameters struct that leaf common object data turns into uniforms.
pub trait UniformParameters: Clone + fmt::Debug + 'static {
    /// The uniform block uploaded for these parameters.
    type Uniforms: Pod;

    /// The [`Parameters`] variant carrying this struct.
    const NAME: &'static str;

    /// Borrows this struct out of `parameters` if the variant matches.
    fn extract(parameters: &Parameters) -> Option<&Self>;

    /// The uniform block, with the surface pre-transform applied to the projection.
    fn uniforms(&self, pre_transform: Mat4) -> Self::Uniforms;

    /// `(projection, view)` without the pre-transform.
    fn proj_view_for_level(&self) -> (Mat4, Mat4);

    /// Rejects contents the kind cannot draw with.
    fn validate(&self) -> Result<(), DetailsError> {
        Ok(())
    }

    /// Rejects a replacement that would invalidate resources built for `self`.
    fn check_update(&self, _next: &Self) -> Result<(), DetailsError> {
        Ok(())
    }
}

impl UniformParameters for ObjectParameters {
    type Uniforms = ObjectUniforms;
    const NAME: &'static str = "Object";

    fn extract(parameters: &Parameters) -> Option<&Self> {
        match parameters {
            Parameters::Object(p) => Some(p),
            _ => None,
        }
    }

    fn uniforms(&self, pre_transform: Mat4) -> ObjectUniforms {
        ObjectUniforms {
            proj: mat(pre_transform * self.projection.matrix()),
            view: mat(self.view.view_matrix()),
            light_pos: point(self.light.position),
        }
    }

    fn proj_view_for_level(&self) -> (Mat4, Mat4) {
        (self.projection.matrix(), self.view.view_matrix())
    }
}

impl UniformParameters for ObjectWithShadowsParameters {
    type Uniforms = ObjectWithShadowsUniforms;
    const NAME: &'static str = "ObjectWithShadows";

    fn extract(parameters: &Parameters) -> Option<&Self> {
        match parameters {
            Parameters::ObjectWithShadows(p) => Some(p),
            _ => None,
        }
    }

    fn uniforms(&self, pre_transform: Mat4) -> ObjectWithShadowsUniforms {
        ObjectWithShadowsUniforms {
            proj: mat(pre_transform * self.object.projection.matrix()),
            view: mat(self.object.view.view_matrix()),
            light_proj_view: mat(self.light_proj_view),
            light_pos: point(self.object.light.position),
        }
    }

    fn proj_view_for_level(&self) -> (Mat4, Mat4) {
        self.object.proj_view_for_level()
    }

    fn check_update(&self, next: &Self) -> Result<(), DetailsError> {
        if self.shadow_map != next.shadow_map {
            return Err(DetailsError::InvalidParameters {
                kind: Self::NAME,
                reason: "the shadow map binding cannot change after creation".to_string(),
            });
        }
        Ok(())
    }
}

impl UniformParameters for ShadowsParameters {
    type Uniforms = ShadowsUniforms;
    const NAME: &'static str = "Shadows";

    fn extract(parameters: &Parameters) -> Option<&Self> {
        match parameters {
            Parameters::Shadows(p) => Some(p),
            _ => None,
        }
    }

    fn uniforms(&self, pre_transform: Mat4) -> ShadowsUniforms {
        ShadowsUniforms {
            proj_view: mat(pre_transform * self.proj_view()),
        }
    }

    fn proj_view_for_level(&self) -> (Mat4, Mat4) {
        (self.perspective.matrix(), self.light.view_matrix())
    }
}

impl UniformParameters for DarkObjectParameters {
    type Uniforms = DarkUniforms;
    const NAME: &'static str = "DarkObject";

    fn extract(parameters: &Parameters) -> Option<&Self> {
        match parameters {
            Parameters::DarkObject(p) => Some(p),
            _ => None,
        }
    }

    fn uniforms(&self, pre_transform: Mat4) -> DarkUniforms {
        let mut uniforms = DarkUniforms {
            proj: mat(pre_transform * self.dark.perspective.matrix()),
            view: mat(self.dark.view.view_matrix()),
            camera_pos: point(self.dark.view.view_point),
            light_count: [self.dark.lights.len().min(MAX_DARK_LIGHTS) as u32, 0, 0, 0],
            ..DarkUniforms::zeroed()
        };
        for (slot, light) in uniforms.light_positions.iter_mut().zip(&self.dark.lights) {
            *slot = point(light.position);
        }
        for (slot, m) in uniforms.light_proj_views.iter_mut().zip(&self.light_proj_views) {
            *slot = mat(*m);
        }
        uniforms
    }

    fn proj_view_for_level(&self) -> (Mat4, Mat4) {
        (self.dark.perspective.matrix(), self.dark.view.view_matrix())
    }

    fn validate(&self) -> Result<(), DetailsError> {
        if self.dark.lights.len() > MAX_DARK_LIGHTS {
            return Err(DetailsError::InvalidParameters {
                kind: Self::NAME,
                reason: format!(
                    "{} lights, at most {MAX_DARK_LIGHTS} are supported",
                    self.dark.lights.len()
                ),
            });
        }
        if self.light_proj_views.len() != self.dark.shadow_map_count() {
            return Err(DetailsError::InvalidParameters {
                kind: Self::NAME,
                reason: format!(
                    "{} light matrices for {} shadow maps",
                    self.light_proj_views.len(),
                    self.dark.shadow_map_count()
                ),
            });
        }
        Ok(())
    }

    fn check_update(&self, next: &Self) -> Result<(), DetailsError> {
        if self.shadow_maps != next.shadow_maps {
            return Err(DetailsError::InvalidParameters {
                kind: Self::NAME,
                reason: "the shadow map binding cannot change after creation".to_string(),
            });
        }
        next.validate()
    }
}

impl UniformParameters for DepthMapParameters {
    type Uniforms = DepthMapUniforms;
    const NAME: &'static str = "DepthMap";

    fn extract(parameters: &Parameters) -> Option<&Self> {
        match parameters {
            Parameters::DepthMap(p) => Some(p),
            _ => None,
        }
    }

    fn uniforms(&self, pre_transform: Mat4) -> DepthMapUniforms {
        DepthMapUniforms {
            proj: mat(pre_transform * self.ortho().matrix()),
            view: mat(self.view.view_matrix()),
            depth_range: [self.nearest_depth, self.farthest_depth, 0.0, 0.0],
        }
    }

    fn proj_view_for_level(&self) -> (Mat4, Mat4) {
        (self.ortho().matrix(), self.view.view_matrix())
    }

    fn validate(&self) -> Result<(), DetailsError> {
        if (self.nearest_depth - self.farthest_depth).abs() <= f32::EPSILON {
            return Err(DetailsError::InvalidParameters {
                kind: Self::NAME,
                reason: "nearest and farthest depth coincide".to_string(),
            });
        }
        Ok(())
    }

    fn check_update(&self, next: &Self) -> Result<(), DetailsError> {
        next.validate()
    }
}

impl UniformParameters for NormalMapParameters {
    type Uniforms = NormalMapUniforms;
    const NAME: &'static str = "NormalMap";

    fn extract(parameters: &Parameters) -> Option<&Self> {
        match parameters {
            Parameters::NormalMap(p) => Some(p),
            _ => None,
        }
    }

    fn uniforms(&self, pre_transform: Mat4) -> NormalMapUniforms {
        NormalMapUniforms {
            proj: mat(pre_transform * self.ortho().matrix()),
            view: mat(self.view.view_matrix()),
        }
    }

    fn proj_view_for_level(&self) -> (Mat4, Mat4) {
        (self.ortho().matrix(), self.view.view_matrix())
    }
}

/// Common object data of a leaf kind: parameters plus their uniform ring.
#[derive(Debug)]
pub struct LeafCod<P: UniformParameters> {
    ring: UniformRingBuffer,
    pre_transform: Mat4,
    parameters: P,
    _layout: Rc<Owned<BindGroupLayoutId>>,
}

impl<P: UniformParameters> LeafCod<P> {
    /// Creates the ring for `layout` and uploads `parameters` into its first slot.
    ///
    /// `extra_entries` are bound after the uniform buffer in every slot.
    pub fn new(
        context: &LoadContext,
        layout: &Rc<Owned<BindGroupLayoutId>>,
        extra_entries: &[BindGroupEntry],
        pre_transform: Mat4,
        parameters: P,
    ) -> Result<Self, DetailsError> {
        parameters.validate()?;
        let ring = UniformRingBuffer::new(
            &context.device,
            layout.handle(),
            0,
            extra_entries,
            std::mem::size_of::<P::Uniforms>() as u64,
            context.frames_in_flight,
            P::NAME,
        )?;
        ring.write(bytemuck::bytes_of(&parameters.uniforms(pre_transform)))?;
        Ok(Self {
            ring,
            pre_transform,
            parameters,
            _layout: Rc::clone(layout),
        })
    }

    /// The bind group holding the latest uniforms.
    pub fn bind_group(&self) -> BindGroupId {
        self.ring.current_bind_group()
    }

    /// The uniform buffer holding the latest uniforms.
    pub fn buffer(&self) -> BufferId {
        self.ring.current_buffer()
    }

    /// The ring slot the latest uniforms live in.
    pub fn slot_index(&self) -> usize {
        self.ring.current_slot_index()
    }

    /// The current parameters.
    pub fn parameters(&self) -> &P {
        &self.parameters
    }
}

impl<P: UniformParameters> LeafCod<P> {
    fn checked<'a>(&self, parameters: &'a Parameters) -> Result<&'a P, DetailsError> {
        let next = P::extract(parameters).ok_or(DetailsError::ParametersMismatch {
            expected: P::NAME,
            found: parameters.variant_name(),
        })?;
        self.parameters.check_update(next)?;
        Ok(next)
    }
}

impl<P: UniformParameters> Updatable for LeafCod<P> {
    fn check(&self, parameters: &Parameters) -> Result<(), DetailsError> {
        self.checked(parameters).map(drop)
    }

    fn update(&mut self, parameters: &Parameters) -> Result<(), DetailsError> {
        let next = self.checked(parameters)?;
        self.ring
            .push_pod(&next.uniforms(self.pre_transform))?;
        self.parameters = next.clone();
        Ok(())
    }
}

/// Depth targets shadow passes render into, and the binding that samples them.
#[derive(Debug)]
pub struct ShadowMapTargets {
    // Views and sampler go before the texture.
    layer_views: Vec<Owned<TextureViewId>>,
    sampling_view: Owned<TextureViewId>,
    sampler: Owned<SamplerId>,
    texture: Owned<TextureId>,
    surface: SurfaceDetails,
}

impl ShadowMapTargets {
    /// Creates a depth texture of `layers` layers sized to `surface`.
    ///
    /// The sampling view is 2D for a single layer and a 2D array otherwise.
    pub fn new(
        device: &Arc<dyn GraphicsDevice>,
        surface: &SurfaceDetails,
        layers: u32,
        label: &'static str,
    ) -> Result<Self, ResourceError> {
        let layers = layers.max(1);
        let texture = device.create_texture(&TextureDescriptor {
            label: Some(Cow::Borrowed(label)),
            size: Extent3d {
                width: surface.width,
                height: surface.height,
                depth_or_array_layers: layers,
            },
            format: TextureFormat::Depth32Float,
            usage: TextureUsage::RENDER_ATTACHMENT | TextureUsage::TEXTURE_BINDING,
            sample_count: 1,
        })?;
        let texture = Owned::new(device.clone(), texture);

        let layer_views = (0..layers)
            .map(|layer| {
                device
                    .create_texture_view(
                        texture.handle(),
                        &TextureViewDescriptor {
                            label: Some(Cow::Owned(format!("{label} layer {layer}"))),
                            dimension: TextureViewDimension::D2,
                            base_array_layer: layer,
                            array_layer_count: Some(1),
                        },
                    )
                    .map(|view| Owned::new(device.clone(), view))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let sampling_view = device.create_texture_view(
            texture.handle(),
            &TextureViewDescriptor {
                label: Some(Cow::Borrowed(label)),
                dimension: if layers == 1 {
                    TextureViewDimension::D2
                } else {
                    TextureViewDimension::D2Array
                },
                base_array_layer: 0,
                array_layer_count: Some(layers),
            },
        )?;
        let sampling_view = Owned::new(device.clone(), sampling_view);

        let sampler = device.create_sampler(&SamplerDescriptor {
            label: Some(Cow::Borrowed(label)),
            filter: FilterMode::Linear,
            address_mode: AddressMode::ClampToEdge,
            compare: Some(CompareFunction::LessEqual),
        })?;

        log::debug!(
            "ShadowMapTargets({label}): {layers} layers of {}x{}",
            surface.width,
            surface.height
        );

        Ok(Self {
            layer_views,
            sampling_view,
            sampler: Owned::new(device.clone(), sampler),
            texture,
            surface: surface.clone(),
        })
    }

    /// What kinds sampling the maps bind.
    pub fn binding(&self) -> ShadowMapBinding {
        ShadowMapBinding {
            view: self.sampling_view.handle(),
            sampler: self.sampler.handle(),
        }
    }

    /// The attachment view of one layer.
    pub fn layer_view(&self, layer: usize) -> Option<TextureViewId> {
        self.layer_views.get(layer).map(Owned::handle)
    }

    /// The number of layers.
    pub fn layer_count(&self) -> usize {
        self.layer_views.len()
    }

    /// The depth texture.
    pub fn texture(&self) -> TextureId {
        self.texture.handle()
    }

    /// The surface the shadow passes render at.
    pub fn surface(&self) -> &SurfaceDetails {
        &self.surface
    }
}

/// The light camera a chained shadow map is rendered from.
pub(crate) fn chained_shadows_parameters(
    object: &ObjectParameters,
    aspect_ratio: f32,
) -> ShadowsParameters {
    ShadowsParameters {
        light: object.light,
        perspective: PerspectiveState {
            view_angle: std::f32::consts::FRAC_PI_4,
            aspect_ratio,
            near_plane: object.projection.near_plane(),
            far_plane: object.projection.far_plane(),
        },
    }
}

/// Shadow pass parameters for every layer of a dark level, light-major.
pub(crate) fn dark_shadows_parameters(
    dark: &DarkParameters,
    aspect_ratio: f32,
) -> Vec<ShadowsParameters> {
    (0..dark.lights.len())
        .flat_map(|light| {
            (0..LIGHT_DIRECTIONS.len())
                .filter_map(move |direction| dark.shadows_parameters(light, direction, aspect_ratio))
        })
        .collect()
}

/// Common object data of `shadowsChaining`.
#[derive(Debug)]
pub struct ShadowsChainingCod {
    pub(crate) object: RenderDetailsReference,
    pub(crate) shadows: RenderDetailsReference,
    pub(crate) targets: ShadowMapTargets,
    parameters: ObjectParameters,
    pub(crate) shadow_maps_need_render: bool,
}

impl ShadowsChainingCod {
    pub(crate) fn new(
        object: RenderDetailsReference,
        shadows: RenderDetailsReference,
        targets: ShadowMapTargets,
        parameters: ObjectParameters,
    ) -> Self {
        Self {
            object,
            shadows,
            targets,
            parameters,
            shadow_maps_need_render: true,
        }
    }

    /// The chained object reference.
    pub fn object(&self) -> &RenderDetailsReference {
        &self.object
    }

    /// The chained shadow pass reference.
    pub fn shadows(&self) -> &RenderDetailsReference {
        &self.shadows
    }

    /// The shadow map.
    pub fn targets(&self) -> &ShadowMapTargets {
        &self.targets
    }

    /// Returns `true` until the shadow map is rendered after the last update.
    pub fn shadow_maps_need_render(&self) -> bool {
        self.shadow_maps_need_render
    }
}

impl ShadowsChainingCod {
    /// The object, object part and shadow part parameters for `parameters`.
    fn split(
        &self,
        parameters: &Parameters,
    ) -> Result<(ObjectParameters, Parameters, Parameters), DetailsError> {
        let Parameters::Object(object) = parameters else {
            return Err(DetailsError::ParametersMismatch {
                expected: ObjectParameters::NAME,
                found: parameters.variant_name(),
            });
        };
        let shadows = chained_shadows_parameters(object, self.targets.surface().aspect_ratio());
        let object_part = Parameters::ObjectWithShadows(ObjectWithShadowsParameters {
            object: *object,
            light_proj_view: shadows.proj_view(),
            shadow_map: self.targets.binding(),
        });
        Ok((*object, object_part, Parameters::Shadows(shadows)))
    }
}

impl Updatable for ShadowsChainingCod {
    fn check(&self, parameters: &Parameters) -> Result<(), DetailsError> {
        let (_, object_part, shadows_part) = self.split(parameters)?;
        self.object.check(&object_part)?;
        self.shadows.check(&shadows_part)
    }

    fn update(&mut self, parameters: &Parameters) -> Result<(), DetailsError> {
        let (object, object_part, shadows_part) = self.split(parameters)?;
        self.object.check(&object_part)?;
        self.shadows.check(&shadows_part)?;
        self.shadow_maps_need_render = true;
        self.object.update(&object_part)?;
        self.shadows.update(&shadows_part)?;
        self.parameters = object;
        Ok(())
    }
}

/// Common object data of `darkChaining`.
#[derive(Debug)]
pub struct DarkChainingCod {
    pub(crate) object: RenderDetailsReference,
    pub(crate) shadows: Vec<RenderDetailsReference>,
    pub(crate) targets: ShadowMapTargets,
    parameters: DarkParameters,
    pub(crate) shadow_maps_need_render: bool,
    pub(crate) ball_shadow_maps_need_render: bool,
    pub(crate) hole_shadow_maps_need_render: bool,
}

impl DarkChainingCod {
    pub(crate) fn new(
        object: RenderDetailsReference,
        shadows: Vec<RenderDetailsReference>,
        targets: ShadowMapTargets,
        parameters: DarkParameters,
    ) -> Self {
        Self {
            object,
            shadows,
            targets,
            parameters,
            shadow_maps_need_render: true,
            ball_shadow_maps_need_render: true,
            hole_shadow_maps_need_render: true,
        }
    }

    /// The chained object reference.
    pub fn object(&self) -> &RenderDetailsReference {
        &self.object
    }

    /// One shadow pass reference per shadow map layer, light-major.
    pub fn shadows(&self) -> &[RenderDetailsReference] {
        &self.shadows
    }

    /// The shadow map array.
    pub fn targets(&self) -> &ShadowMapTargets {
        &self.targets
    }

    /// The current parameters.
    pub fn parameters(&self) -> &DarkParameters {
        &self.parameters
    }

    /// Returns `true` while any shadow map is pending.
    pub fn shadow_maps_need_render(&self) -> bool {
        self.shadow_maps_need_render
    }

    /// Returns `true` while the maps of ball lights are pending.
    pub fn ball_shadow_maps_need_render(&self) -> bool {
        self.ball_shadow_maps_need_render
    }

    /// Returns `true` until the maps of hole lights are first rendered.
    pub fn hole_shadow_maps_need_render(&self) -> bool {
        self.hole_shadow_maps_need_render
    }
}

impl DarkChainingCod {
    /// The dark, object part and shadow part parameters for `parameters`.
    fn split<'a>(
        &self,
        parameters: &'a Parameters,
    ) -> Result<(&'a DarkParameters, Parameters, Vec<Parameters>), DetailsError> {
        let Parameters::Dark(dark) = parameters else {
            return Err(DetailsError::ParametersMismatch {
                expected: "Dark",
                found: parameters.variant_name(),
            });
        };
        if dark.lights.len() != self.parameters.lights.len() {
            return Err(DetailsError::InvalidParameters {
                kind: "Dark",
                reason: format!(
                    "built for {} lights, updated with {}",
                    self.parameters.lights.len(),
                    dark.lights.len()
                ),
            });
        }

        let shadows = dark_shadows_parameters(dark, self.targets.surface().aspect_ratio());
        let object_part = Parameters::DarkObject(DarkObjectParameters {
            dark: dark.clone(),
            light_proj_views: shadows.iter().map(ShadowsParameters::proj_view).collect(),
            shadow_maps: self.targets.binding(),
        });
        let shadow_parts = shadows.into_iter().map(Parameters::Shadows).collect();
        Ok((dark, object_part, shadow_parts))
    }

    fn check_parts(
        &self,
        object_part: &Parameters,
        shadow_parts: &[Parameters],
    ) -> Result<(), DetailsError> {
        self.object.check(object_part)?;
        for (reference, part) in self.shadows.iter().zip(shadow_parts) {
            reference.check(part)?;
        }
        Ok(())
    }
}

impl Updatable for DarkChainingCod {
    fn check(&self, parameters: &Parameters) -> Result<(), DetailsError> {
        let (_, object_part, shadow_parts) = self.split(parameters)?;
        self.check_parts(&object_part, &shadow_parts)
    }

    fn update(&mut self, parameters: &Parameters) -> Result<(), DetailsError> {
        let (dark, object_part, shadow_parts) = self.split(parameters)?;
        self.check_parts(&object_part, &shadow_parts)?;

        let ball_moved = dark
            .lights
            .iter()
            .any(|light| light.anchor == LightAnchor::Ball && light.moved);
        self.ball_shadow_maps_need_render |= ball_moved;
        self.shadow_maps_need_render =
            self.ball_shadow_maps_need_render || self.hole_shadow_maps_need_render;
        self.object.update(&object_part)?;
        for (reference, part) in self.shadows.iter().zip(&shadow_parts) {
            reference.update(part)?;
        }
        self.parameters = dark.clone();
        Ok(())
    }
}

/// The per-batch state of one kind instance.
#[derive(Debug)]
pub enum CommonObjectData {
    /// `objectNoShadows`.
    Object(LeafCod<ObjectParameters>),
    /// `objectWithShadows`.
    ObjectWithShadows(LeafCod<ObjectWithShadowsParameters>),
    /// `shadows`.
    Shadows(LeafCod<ShadowsParameters>),
    /// `shadowsChaining`.
    ShadowsChaining(ShadowsChainingCod),
    /// `darkObject`.
    DarkObject(LeafCod<DarkObjectParameters>),
    /// `darkChaining`.
    DarkChaining(DarkChainingCod),
    /// `depthMap`.
    DepthMap(LeafCod<DepthMapParameters>),
    /// `normalMap`.
    NormalMap(LeafCod<NormalMapParameters>),
}

impl CommonObjectData {
    /// The variant name, for error messages.
    pub fn variant_name(&self) -> &'static str {
        match self {
            Self::Object(_) => "Object",
            Self::ObjectWithShadows(_) => "ObjectWithShadows",
            Self::Shadows(_) => "Shadows",
            Self::ShadowsChaining(_) => "ShadowsChaining",
            Self::DarkObject(_) => "DarkObject",
            Self::DarkChaining(_) => "DarkChaining",
            Self::DepthMap(_) => "DepthMap",
            Self::NormalMap(_) => "NormalMap",
        }
    }

    /// `(projection, view)` as level code sees them, without the pre-transform.
    pub fn proj_view_for_level(&self) -> (Mat4, Mat4) {
        match self {
            Self::Object(cod) => cod.parameters().proj_view_for_level(),
            Self::ObjectWithShadows(cod) => cod.parameters().proj_view_for_level(),
            Self::Shadows(cod) => cod.parameters().proj_view_for_level(),
            Self::ShadowsChaining(cod) => cod.parameters.proj_view_for_level(),
            Self::DarkObject(cod) => cod.parameters().proj_view_for_level(),
            Self::DarkChaining(cod) => (
                cod.parameters.perspective.matrix(),
                cod.parameters.view.view_matrix(),
            ),
            Self::DepthMap(cod) => cod.parameters().proj_view_for_level(),
            Self::NormalMap(cod) => cod.parameters().proj_view_for_level(),
        }
    }

    /// Returns `true` if auxiliary passes are pending.
    pub fn shadow_maps_need_render(&self) -> bool {
        match self {
            Self::ShadowsChaining(cod) => cod.shadow_maps_need_render,
            Self::DarkChaining(cod) => cod.shadow_maps_need_render,
            _ => false,
        }
    }
}

impl Updatable for CommonObjectData {
    fn check(&self, parameters: &Parameters) -> Result<(), DetailsError> {
        match self {
            Self::Object(cod) => cod.check(parameters),
            Self::ObjectWithShadows(cod) => cod.check(parameters),
            Self::Shadows(cod) => cod.check(parameters),
            Self::ShadowsChaining(cod) => cod.check(parameters),
            Self::DarkObject(cod) => cod.check(parameters),
            Self::DarkChaining(cod) => cod.check(parameters),
            Self::DepthMap(cod) => cod.check(parameters),
            Self::NormalMap(cod) => cod.check(parameters),
        }
    }

    fn update(&mut self, parameters: &Parameters) -> Result<(), DetailsError> {
        match self {
            Self::Object(cod) => cod.update(parameters),
            Self::ObjectWithShadows(cod) => cod.update(parameters),
            Self::Shadows(cod) => cod.update(parameters),
            Self::ShadowsChaining(cod) => cod.update(parameters),
            Self::DarkObject(cod) => cod.update(parameters),
            Self::DarkChaining(cod) => cod.update(parameters),
            Self::DepthMap(cod) => cod.update(parameters),
            Self::NormalMap(cod) => cod.update(parameters),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RenderDetailsConfig;
    use crate::details::{EmbeddedShaders, LightSource, LightState, Projection, ViewState};
    use glam::Vec3;
    use labyrinth_core::renderer::{
        BindGroupLayoutDescriptor, BindGroupLayoutEntry, HeadlessDevice, RenderPassLayout,
        ResourceKind, ShaderStages,
    };

    fn context(device: Arc<dyn GraphicsDevice>) -> LoadContext {
        LoadContext {
            device,
            shaders: Rc::new(EmbeddedShaders),
            config: RenderDetailsConfig::default(),
            frames_in_flight: 2,
        }
    }

    fn uniform_layout(device: &Arc<dyn GraphicsDevice>) -> Rc<Owned<BindGroupLayoutId>> {
        let layout = device
            .create_bind_group_layout(&BindGroupLayoutDescriptor {
                label: Some("cod"),
                entries: &[BindGroupLayoutEntry::uniform(0, ShaderStages::VERTEX_FRAGMENT)],
            })
            .unwrap();
        Rc::new(Owned::new(device.clone(), layout))
    }

    fn object(eye: Vec3) -> ObjectParameters {
        ObjectParameters {
            view: ViewState::new(eye, Vec3::ZERO, Vec3::Y),
            projection: Projection::Perspective(PerspectiveState {
                view_angle: 1.0,
                aspect_ratio: 1.5,
                near_plane: 0.5,
                far_plane: 20.0,
            }),
            light: LightState {
                position: Vec3::new(0.0, 0.0, 5.0),
                look_at: Vec3::ZERO,
                up: Vec3::Y,
            },
        }
    }

    #[test]
    fn update_writes_the_next_ring_slot() {
        let headless = Arc::new(HeadlessDevice::new());
        let device: Arc<dyn GraphicsDevice> = headless.clone();
        let ctx = context(device.clone());
        let layout = uniform_layout(&device);
        let mut cod =
            LeafCod::new(&ctx, &layout, &[], Mat4::IDENTITY, object(Vec3::Z * 3.0)).unwrap();
        let first_group = cod.bind_group();
        assert_eq!(cod.slot_index(), 0);

        let moved = object(Vec3::Z * 6.0);
        cod.update(&Parameters::Object(moved)).unwrap();
        assert_eq!(cod.slot_index(), 1);
        assert_ne!(cod.bind_group(), first_group);

        let written = headless.buffer_contents(cod.buffer()).unwrap();
        let uniforms: ObjectUniforms = bytemuck::pod_read_unaligned(&written);
        assert_eq!(uniforms.view, mat(moved.view.view_matrix()));
        assert_eq!(uniforms.light_pos, [0.0, 0.0, 5.0, 1.0]);
        assert_eq!(cod.parameters(), &moved);
    }

    #[test]
    fn pre_transform_applies_to_uploaded_projection_only() {
        let headless = Arc::new(HeadlessDevice::new());
        let device: Arc<dyn GraphicsDevice> = headless.clone();
        let layout = uniform_layout(&device);
        let rotate = Mat4::from_rotation_z(std::f32::consts::FRAC_PI_2);
        let params = object(Vec3::Z * 3.0);
        let cod = LeafCod::new(&context(device), &layout, &[], rotate, params).unwrap();

        let uniforms: ObjectUniforms =
            bytemuck::pod_read_unaligned(&headless.buffer_contents(cod.buffer()).unwrap());
        assert_eq!(uniforms.proj, mat(rotate * params.projection.matrix()));
        let (proj, _) = CommonObjectData::Object(cod).proj_view_for_level();
        assert_eq!(proj, params.projection.matrix());
    }

    #[test]
    fn wrong_variant_is_a_mismatch() {
        let device: Arc<dyn GraphicsDevice> = Arc::new(HeadlessDevice::new());
        let layout = uniform_layout(&device);
        let mut cod = CommonObjectData::Object(
            LeafCod::new(&context(device), &layout, &[], Mat4::IDENTITY, object(Vec3::Z)).unwrap(),
        );
        let err = cod
            .update(&Parameters::Shadows(chained_shadows_parameters(&object(Vec3::Z), 1.0)))
            .unwrap_err();
        assert!(matches!(
            err,
            DetailsError::ParametersMismatch {
                expected: "Object",
                found: "Shadows"
            }
        ));
    }

    #[test]
    fn rejected_chained_update_leaves_every_part_untouched() {
        use crate::details::{DrawingStyle, FeatureList, Query, Registry, RenderDetailsLoader};

        let device: Arc<dyn GraphicsDevice> = Arc::new(HeadlessDevice::new());
        let mut loader = RenderDetailsLoader::new(
            device.clone(),
            Rc::new(EmbeddedShaders),
            Rc::new(Registry::with_builtin_kinds()),
            RenderDetailsConfig::default(),
            2,
        );
        let shadow_surface = SurfaceDetails::new(
            32,
            32,
            RenderPassLayout::depth_only(TextureFormat::Depth32Float),
        );
        let surface = SurfaceDetails::new(
            64,
            64,
            RenderPassLayout::color_depth(TextureFormat::Bgra8UnormSrgb, TextureFormat::Depth32Float),
        );
        let start = object(Vec3::Z * 3.0);
        let shadows = loader
            .load(
                &Query::new(DrawingStyle::ShadowMap),
                &shadow_surface,
                &Parameters::Shadows(chained_shadows_parameters(&start, 1.0)),
            )
            .unwrap();
        // Takes plain object parameters, not the ones the chain derives.
        let plain = loader
            .load(
                &Query::new(DrawingStyle::Standard).prefer(FeatureList::COLOR | FeatureList::TEXTURE),
                &surface,
                &Parameters::Object(start),
            )
            .unwrap();
        assert_eq!(plain.name(), "objectNoShadows");
        let targets = ShadowMapTargets::new(&device, &shadow_surface, 1, "chain").unwrap();
        let mut cod = ShadowsChainingCod::new(plain, shadows, targets, start);
        cod.shadow_maps_need_render = false;

        let light_view = |cod: &ShadowsChainingCod| {
            cod.shadows()
                .common_object_data
                .borrow()
                .proj_view_for_level()
        };
        let before = light_view(&cod);
        let mut next = object(Vec3::Z * 9.0);
        next.light.position = Vec3::new(2.0, 1.0, 4.0);
        let err = cod.update(&Parameters::Object(next)).unwrap_err();
        assert!(matches!(
            err,
            DetailsError::ParametersMismatch {
                expected: "Object",
                found: "ObjectWithShadows"
            }
        ));
        assert_eq!(light_view(&cod), before);
        assert!(!cod.shadow_maps_need_render());
    }

    #[test]
    fn depth_range_must_not_be_empty() {
        let device: Arc<dyn GraphicsDevice> = Arc::new(HeadlessDevice::new());
        let layout = uniform_layout(&device);
        let params = DepthMapParameters {
            view: ViewState::new(Vec3::Z * 10.0, Vec3::ZERO, Vec3::Y),
            width_at_depth: 4.0,
            height_at_depth: 4.0,
            nearest_depth: 1.0,
            farthest_depth: 1.0,
            near_plane: 0.1,
            far_plane: 20.0,
        };
        assert!(matches!(
            LeafCod::new(&context(device), &layout, &[], Mat4::IDENTITY, params),
            Err(DetailsError::InvalidParameters { kind: "DepthMap", .. })
        ));
    }

    #[test]
    fn shadow_targets_have_one_view_per_layer() {
        let headless = Arc::new(HeadlessDevice::new());
        let device: Arc<dyn GraphicsDevice> = headless.clone();
        let surface = SurfaceDetails::new(
            32,
            8,
            RenderPassLayout::depth_only(TextureFormat::Depth32Float),
        );
        let targets = ShadowMapTargets::new(&device, &surface, 8, "dark shadows").unwrap();
        assert_eq!(targets.layer_count(), 8);
        assert!(targets.layer_view(7).is_some());
        assert!(targets.layer_view(8).is_none());
        assert_eq!(headless.live_count(ResourceKind::TextureView), 9);
        assert_eq!(targets.surface().width, 32);
        drop(targets);
        assert_eq!(headless.live_resource_count(), 0);
    }

    #[test]
    fn dark_layers_are_light_major() {
        let dark = DarkParameters {
            view: ViewState::new(Vec3::Z * 10.0, Vec3::ZERO, Vec3::Y),
            perspective: PerspectiveState {
                view_angle: 1.0,
                aspect_ratio: 1.0,
                near_plane: 0.1,
                far_plane: 20.0,
            },
            lights: vec![
                LightSource {
                    position: Vec3::X,
                    anchor: LightAnchor::Ball,
                    moved: false,
                },
                LightSource {
                    position: Vec3::Y,
                    anchor: LightAnchor::Hole,
                    moved: false,
                },
            ],
            light_near_plane: 0.05,
            light_far_plane: 5.0,
        };
        let layers = dark_shadows_parameters(&dark, 4.0);
        assert_eq!(layers.len(), 8);
        assert_eq!(layers[3].light.position, Vec3::X);
        assert_eq!(layers[4].light.position, Vec3::Y);
        assert_eq!(layers[4].light.look_at, Vec3::Y + LIGHT_DIRECTIONS[0]);
    }
}
