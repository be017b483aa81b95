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

//! Render details: the GPU resource bundles that draw level objects.
//!
//! A *kind* is registered in a [`Registry`] under a [`Description`]. The
//! [`RenderDetailsLoader`] resolves a [`Query`] to the best kind and returns a
//! [`RenderDetailsReference`]: the shared instance, a fresh
//! [`CommonObjectData`] for the caller's [`Parameters`], and a factory for
//! per-placement [`DrawObjectData`].
//!
//! Instances implement three capabilities:
//!
//! - [`Drawable`] records draw commands for a run of objects, plus optional
//!   auxiliary passes (shadow maps) before the main pass.
//! - [`StructurallyReloadable`] rebuilds size-dependent resources when the
//!   surface changes.
//! - [`Updatable`], on the common object data, takes new parameters.

pub mod cod;
pub mod description;
pub mod descriptor_pools;
pub mod kinds;
pub mod loader;
pub mod object_data;
pub mod parameters;
pub mod reference;
pub mod registry;
pub mod shaders;

pub use self::cod::{
    CommonObjectData, DarkChainingCod, DarkUniforms, DepthMapUniforms, LeafCod, NormalMapUniforms,
    ObjectUniforms, ObjectWithShadowsUniforms, ShadowMapTargets, ShadowsChainingCod,
    ShadowsUniforms, UniformParameters, Updatable, MAX_DARK_LIGHTS,
};
pub use self::description::{Description, DrawingStyle, FeatureList, Query};
pub use self::descriptor_pools::{DescriptorPools, DescriptorSet};
pub use self::kinds::{
    register_builtin_kinds, DarkChaining, DarkObject, DepthMap, NormalMap, ObjectNoShadows,
    ObjectWithShadows, Shadows, ShadowsChaining,
};
pub use self::loader::{LoadContext, RenderDetailsLoader};
pub use self::object_data::{
    DrawObjectData, ModelMatrixBuffer, ObjectVariant, MODEL_MATRIX_ID_MAIN,
    MODEL_MATRIX_ID_SHADOWS,
};
pub use self::parameters::*;
pub use self::reference::{CreateDrawObjectDataFn, RenderDetailsReference};
pub use self::registry::{KindFunctions, KindInfo, LoadExistingFn, LoadNewFn, Registry};
pub use self::shaders::{EmbeddedShaders, ShaderRequester};

use crate::drawer::{ModelData, TextureData};
use crate::error::DetailsError;
use labyrinth_core::renderer::{CommandEncoder, RenderPass, SurfaceDetails, TextureFormat};
use std::any::Any;
use std::fmt;
use std::rc::Rc;

/// One placement to draw: the geometry, its texture and its descriptor sets.
#[derive(Debug, Clone, Copy)]
pub struct DrawItem<'a> {
    /// The geometry.
    pub model: &'a ModelData,
    /// The texture, if the object has one.
    pub texture: Option<&'a TextureData>,
    /// The placement.
    pub data: &'a DrawObjectData,
    /// Which of the data's descriptor sets the pass binds.
    pub set: u32,
}

impl<'a> DrawItem<'a> {
    /// An item drawn with the main descriptor set.
    pub fn new(
        model: &'a ModelData,
        texture: Option<&'a TextureData>,
        data: &'a DrawObjectData,
    ) -> Self {
        Self {
            model,
            texture,
            data,
            set: MODEL_MATRIX_ID_MAIN,
        }
    }

    /// The same item, bound through another descriptor set.
    pub fn with_set(self, set: u32) -> Self {
        Self { set, ..self }
    }
}

/// Records commands for runs of objects.
pub trait Drawable {
    /// Records auxiliary passes that must run before the main pass.
    ///
    /// `items` are every placement drawn with this instance and `cod` in the
    /// frame. Returns the number of passes recorded.
    fn add_pre_render_pass_cmds(
        &self,
        _encoder: &mut dyn CommandEncoder,
        _cod: &mut CommonObjectData,
        _items: &[DrawItem<'_>],
    ) -> Result<usize, DetailsError> {
        Ok(0)
    }

    /// Records the draw calls for one contiguous run inside an open pass.
    ///
    /// Returns the number of draw calls issued.
    fn add_draw_cmds(
        &self,
        pass: &mut dyn RenderPass,
        cod: &CommonObjectData,
        items: &[DrawItem<'_>],
    ) -> Result<usize, DetailsError>;
}

/// Size-dependent state that can be rebuilt in place.
pub trait StructurallyReloadable {
    /// The surface the instance was last built for.
    fn surface(&self) -> SurfaceDetails;

    /// Returns `true` if the instance cannot serve `surface` without a rebuild.
    fn structural_change_needed(&self, surface: &SurfaceDetails) -> bool {
        self.surface().differs_structurally(surface)
    }

    /// Rebuilds pipelines and other size-dependent resources for `surface`.
    fn reload(&self, surface: &SurfaceDetails) -> Result<(), DetailsError>;
}

/// A loaded render-details instance.
pub trait RenderDetails: Drawable + StructurallyReloadable + fmt::Debug {
    /// The registered kind name.
    fn name(&self) -> &'static str;

    /// The registered description.
    fn description(&self) -> Description;

    /// A clear color the main pass must use instead of the drawer's.
    fn clear_color_override(&self) -> Option<[f32; 4]> {
        None
    }

    /// The color format the kind renders when drawing into a buffer.
    fn readback_format(&self) -> Option<TextureFormat> {
        None
    }

    /// Converts a rendered image into application values.
    ///
    /// `raw` holds `height` rows of `bytes_per_row` bytes, top row first. The
    /// result is bottom row first.
    fn post_process_image_buffer(
        &self,
        _cod: &CommonObjectData,
        _raw: &[u8],
        _width: u32,
        _height: u32,
        _bytes_per_row: u32,
    ) -> Result<Vec<f32>, DetailsError> {
        Err(DetailsError::ReadbackUnsupported { kind: self.name() })
    }

    /// Upcasts for downcasting to the concrete kind.
    fn into_any(self: Rc<Self>) -> Rc<dyn Any>;
}
