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

//! Baking a level's surface normals into a normal map.

use super::common::{
    cod_mismatch, downcast, parameters_mismatch, rgba32_bottom_up, uniform_only, KindSetup,
    ObjectKindBase,
};
use crate::details::{
    CommonObjectData, Description, DrawItem, Drawable, DrawingStyle, FeatureList, KindFunctions,
    KindInfo, LeafCod, LoadContext, NormalMapParameters, ObjectVariant, Parameters, RenderDetails,
    RenderDetailsLoader, RenderDetailsReference, StructurallyReloadable,
};
use crate::error::DetailsError;
use glam::Vec3;
use labyrinth_core::renderer::{CullMode, RenderPass, SurfaceDetails, TextureFormat};
use std::any::Any;
use std::rc::Rc;

/// Registration of the kind.
pub const INFO: KindInfo = KindInfo {
    name: "normalMap",
    description: Description::new(
        DrawingStyle::NormalMap,
        FeatureList::empty(),
    ),
    shaders: &["normal_map.wgsl"],
};

/// Renders world-space normals through an orthographic camera.
///
/// Reading the image back yields three floats per texel, bottom row first.
#[derive(Debug)]
pub struct NormalMap {
    base: ObjectKindBase,
}

impl NormalMap {
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
        parameters: &NormalMapParameters,
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
            CommonObjectData::NormalMap(cod),
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
    let Parameters::NormalMap(normal) = parameters else {
        return Err(parameters_mismatch("NormalMap", parameters));
    };
    let instance = Rc::new(NormalMap::new(info, loader.context(), surface)?);
    instance.reference(loader.context(), surface, normal)
}

fn load_existing(
    loader: &mut RenderDetailsLoader,
    existing: &Rc<dyn RenderDetails>,
    surface: &SurfaceDetails,
    parameters: &Parameters,
) -> Result<RenderDetailsReference, DetailsError> {
    let Parameters::NormalMap(normal) = parameters else {
        return Err(parameters_mismatch("NormalMap", parameters));
    };
    let instance = downcast::<NormalMap>(existing, INFO.name)?;
    if instance.structural_change_needed(surface) {
        instance.reload(surface)?;
    }
    instance.reference(loader.context(), surface, normal)
}

/// The factory functions of the kind.
pub fn functions() -> KindFunctions {
    KindFunctions {
        load_new,
        load_existing,
    }
}

impl Drawable for NormalMap {
    fn add_draw_cmds(
        &self,
        pass: &mut dyn RenderPass,
        cod: &CommonObjectData,
        items: &[DrawItem<'_>],
    ) -> Result<usize, DetailsError> {
        match cod {
            CommonObjectData::NormalMap(cod) => self.base.record_draws(pass, cod.bind_group(), items),
            other => Err(cod_mismatch(self.name(), other)),
        }
    }
}

impl StructurallyReloadable for NormalMap {
    fn surface(&self) -> SurfaceDetails {
        self.base.surface()
    }

    fn reload(&self, surface: &SurfaceDetails) -> Result<(), DetailsError> {
        self.base.reload(surface)
    }
}

impl RenderDetails for NormalMap {
    fn name(&self) -> &'static str {
        self.base.info().name
    }

    fn description(&self) -> Description {
        self.base.info().description
    }

    fn clear_color_override(&self) -> Option<[f32; 4]> {
        Some([0.5, 0.5, 1.0, 1.0])
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
        if !matches!(cod, CommonObjectData::NormalMap(_)) {
            return Err(cod_mismatch(self.name(), cod));
        }
        let texels = rgba32_bottom_up(raw, width, height, bytes_per_row)?;
        Ok(texels
            .iter()
            .flat_map(|texel| {
                (Vec3::new(texel[0], texel[1], texel[2]) * 2.0 - Vec3::ONE)
                    .normalize_or_zero()
                    .to_array()
            })
            .collect())
    }

    fn into_any(self: Rc<Self>) -> Rc<dyn Any> {
        self
    }
}
