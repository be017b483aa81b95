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

//! Objects lit only by point lights, each casting shadows in four directions.

use super::common::{
    cod_mismatch, downcast, parameters_mismatch, shadow_map_entries, shadow_sampling, KindSetup,
    ObjectKindBase,
};
use crate::details::{
    CommonObjectData, DarkObjectParameters, Description, DrawItem, Drawable, DrawingStyle,
    FeatureList, KindFunctions, KindInfo, LeafCod, LoadContext, ObjectVariant, Parameters,
    RenderDetails, RenderDetailsLoader, RenderDetailsReference, StructurallyReloadable,
};
use crate::error::DetailsError;
use labyrinth_core::renderer::{
    BlendMode, CullMode, RenderPass, SurfaceDetails, TextureViewDimension,
};
use std::any::Any;
use std::rc::Rc;

/// Registration of the kind.
pub const INFO: KindInfo = KindInfo {
    name: "darkObject",
    description: Description::new(
        DrawingStyle::Dark,
        FeatureList::COLOR
            .union(FeatureList::TEXTURE)
            .union(FeatureList::SHADOWS),
    ),
    shaders: &["dark_object.wgsl"],
};

/// Draws objects of dark levels.
///
/// Every light owns four consecutive layers of a shadow map array, one per
/// direction in [`LIGHT_DIRECTIONS`](crate::details::LIGHT_DIRECTIONS).
#[derive(Debug)]
pub struct DarkObject {
    base: ObjectKindBase,
}

impl DarkObject {
    fn new(
        info: &KindInfo,
        context: &LoadContext,
        surface: &SurfaceDetails,
    ) -> Result<Self, DetailsError> {
        let setup = KindSetup {
            cod_entries: shadow_sampling(TextureViewDimension::D2Array),
            textured: true,
            base_variant: ObjectVariant::Color,
            cull_mode: CullMode::Back,
            blend: Some(BlendMode::Alpha),
        };
        Ok(Self {
            base: ObjectKindBase::new(info, context, surface, setup)?,
        })
    }

    fn reference(
        self: &Rc<Self>,
        context: &LoadContext,
        surface: &SurfaceDetails,
        parameters: &DarkObjectParameters,
    ) -> Result<RenderDetailsReference, DetailsError> {
        let cod = LeafCod::new(
            context,
            self.base.cod_layout(),
            &shadow_map_entries(&parameters.shadow_maps),
            surface.pre_transform,
            parameters.clone(),
        )?;
        Ok(RenderDetailsReference::new(
            Rc::clone(self) as Rc<dyn RenderDetails>,
            CommonObjectData::DarkObject(cod),
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
    let Parameters::DarkObject(object) = parameters else {
        return Err(parameters_mismatch("DarkObject", parameters));
    };
    let instance = Rc::new(DarkObject::new(info, loader.context(), surface)?);
    instance.reference(loader.context(), surface, object)
}

fn load_existing(
    loader: &mut RenderDetailsLoader,
    existing: &Rc<dyn RenderDetails>,
    surface: &SurfaceDetails,
    parameters: &Parameters,
) -> Result<RenderDetailsReference, DetailsError> {
    let Parameters::DarkObject(object) = parameters else {
        return Err(parameters_mismatch("DarkObject", parameters));
    };
    let instance = downcast::<DarkObject>(existing, INFO.name)?;
    if instance.structural_change_needed(surface) {
        instance.reload(surface)?;
    }
    instance.reference(loader.context(), surface, object)
}

/// The factory functions of the kind.
pub fn functions() -> KindFunctions {
    KindFunctions {
        load_new,
        load_existing,
    }
}

impl Drawable for DarkObject {
    fn add_draw_cmds(
        &self,
        pass: &mut dyn RenderPass,
        cod: &CommonObjectData,
        items: &[DrawItem<'_>],
    ) -> Result<usize, DetailsError> {
        match cod {
            CommonObjectData::DarkObject(cod) => {
                self.base.record_draws(pass, cod.bind_group(), items)
            }
            other => Err(cod_mismatch(self.name(), other)),
        }
    }
}

impl StructurallyReloadable for DarkObject {
    fn surface(&self) -> SurfaceDetails {
        self.base.surface()
    }

    fn reload(&self, surface: &SurfaceDetails) -> Result<(), DetailsError> {
        self.base.reload(surface)
    }
}

impl RenderDetails for DarkObject {
    fn name(&self) -> &'static str {
        self.base.info().name
    }

    fn description(&self) -> Description {
        self.base.info().description
    }

    fn into_any(self: Rc<Self>) -> Rc<dyn Any> {
        self
    }
}
