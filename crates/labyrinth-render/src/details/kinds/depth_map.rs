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

//! Baking a level's height field into a depth map.

use super::common::{
    cod_mismatch, downcast, parameters_mismatch, rgba32_bottom_up, uniform_only, KindSetup,
    ObjectKindBase,
};
use crate::details::{
    CommonObjectData, Description, DrawItem, Drawable, DrawingStyle, FeatureList, KindFunctions,
    DepthMapParameters, KindInfo, LeafCod, LoadContext, ObjectVariant, Parameters, RenderDetails,
    RenderDetailsLoader, RenderDetailsReference, StructurallyReloadable,
};
use crate::error::DetailsError;
use labyrinth_core::renderer::{CullMode, RenderPass, SurfaceDetails, TextureFormat};
use std::any::Any;
use std::rc::Rc;

/// Registration of the kind.
pub const INFO: KindInfo = KindInfo {
    name: "depthMap",
    description: Description::new(
        DrawingStyle::DepthMap,
        FeatureList::empty(),
    ),
    shaders: &["depth_map.wgsl"],
};

/// Renders normalised linear depth through an orthographic camera.
///
/// The stored value is 1 at the parameters' nearest depth and 0 at the
/// farthest. Reading it back yields world heights, bottom row first.
#[derive(Debug)]
pub struct DepthMap {
    base: ObjectKindBase,
}

impl DepthMap {
    fn new(
        info: &KindInfo,
        context: &LoadContext,
        surface: &SurfaceDetails,
    ) -> Result<Self, DetailsError> {
        let setup = KindSetup {
            cod_entries: uniform_only(),
            textured: false,
            base_variant: ObjectVariant::Geometry,
            cull_mode: CullMode::None,
            blend: None,
        };
        Ok(Self {
            base: ObjectKindBase::new(info, context, surface, setup)?,
        })
    }

    fn reference(
        self: &Rc<Self>,
        context: &LoadContext,
        surface: &SurfaceDetails,
        parameters: &DepthMapParameters,
    ) -> Result<RenderDetailsReference, DetailsError> {
        let cod = LeafCod::new(
            context,
            self.base.cod_layout(),
            &[],
            surface.pre_transform,
            *parameters,
        )?;
        Ok(RenderDetailsReference::new(
            Rc::clone(self) as Rc<dyn RenderDetails>,
            CommonObjectData::DepthMap(cod),
            self.base.create_fn(),
        ))
    }
}

fn load_new(
    info: &KindInfo,
    loader: &mut RenderDetailsLoader,
    surface: &SurfaceDetails,
    parameters: &Parameters,
) -> Result<RenderDetailsReference, DetailsError> {
    let Parameters::DepthMap(depth) = parameters else {
        return Err(parameters_mismatch("DepthMap", parameters));
    };
    let instance = Rc::new(DepthMap::new(info, loader.context(), surface)?);
    instance.reference(loader.context(), surface, depth)
}

fn load_existing(
    loader: &mut RenderDetailsLoader,
    existing: &Rc<dyn RenderDetails>,
    surface: &SurfaceDetails,
    parameters: &Parameters,
) -> Result<RenderDetailsReference, DetailsError> {
    let Parameters::DepthMap(depth) = parameters else {
        return Err(parameters_mismatch("DepthMap", parameters));
    };
    let instance = downcast::<DepthMap>(existing, INFO.name)?;
    if instance.structural_change_needed(surface) {
        instance.reload(surface)?;
    }
    instance.reference(loader.context(), surface, depth)
}

/// The factory functions of the kind.
pub fn functions() -> KindFunctions {
    KindFunctions {
        load_new,
        load_existing,
    }
}

impl Drawable for DepthMap {
    fn add_draw_cmds(
        &self,
        pass: &mut dyn RenderPass,
        cod: &CommonObjectData,
        items: &[DrawItem<'_>],
    ) -> Result<usize, DetailsError> {
        match cod {
            CommonObjectData::DepthMap(cod) => self.base.record_draws(pass, cod.bind_group(), items),
            other => Err(cod_mismatch(self.name(), other)),
        }
    }
}

impl StructurallyReloadable for DepthMap {
    fn surface(&self) -> SurfaceDetails {
        self.base.surface()
    }

    fn reload(&self, surface: &SurfaceDetails) -> Result<(), DetailsError> {
        self.base.reload(surface)
    }
}

impl RenderDetails for DepthMap {
    fn name(&self) -> &'static str {
        self.base.info().name
    }

    fn description(&self) -> Description {
        self.base.info().description
    }

    fn clear_color_override(&self) -> Option<[f32; 4]> {
        Some([0.0, 0.0, 0.0, 1.0])
    }

    fn readback_format(&self) -> Option<TextureFormat> {
        Some(TextureFormat::Rgba32Float)
    }

    fn post_process_image_buffer(
        &self,
        cod: &CommonObjectData,
        raw: &[u8],
        width: u32,
        height: u32,
        bytes_per_row: u32,
    ) -> Result<Vec<f32>, DetailsError> {
        let CommonObjectData::DepthMap(cod) = cod else {
            return Err(cod_mismatch(self.name(), cod));
        };
        let parameters = cod.parameters();
        let span = parameters.nearest_depth - parameters.farthest_depth;
        let texels = rgba32_bottom_up(raw, width, height, bytes_per_row)?;
        Ok(texels
            .iter()
            .map(|texel| parameters.farthest_depth + texel[0] * span)
            .collect())
    }

    fn into_any(self: Rc<Self>) -> Rc<dyn Any> {
        self
    }
}
