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

//! Depth-only shadow map passes.

use super::common::{
    cod_mismatch, downcast, parameters_mismatch, uniform_only, KindSetup, ObjectKindBase,
};
use crate::details::{
    CommonObjectData, Description, DrawItem, Drawable, DrawingStyle, FeatureList, KindFunctions,
    KindInfo, LeafCod, LoadContext, ObjectVariant, Parameters, RenderDetails, RenderDetailsLoader,
    RenderDetailsReference, ShadowsParameters, StructurallyReloadable,
};
use crate::error::DetailsError;
use labyrinth_core::renderer::{CullMode, RenderPass, SurfaceDetails};
use std::any::Any;
use std::rc::Rc;

/// Registration of the kind.
///
/// Shadow passes draw back faces only and write no color.
pub const INFO: KindInfo = KindInfo {
    name: "shadows",
    description: Description::new(
        DrawingStyle::ShadowMap,
        FeatureList::empty(),
    ),
    shaders: &["shadows.wgsl"],
};

/// Renders scene depth from a light into a shadow map layer.
#[derive(Debug)]
pub struct Shadows {
    base: ObjectKindBase,
}

impl Shadows {
    fn new(
        info: &KindInfo,
        context: &LoadContext,
        surface: &SurfaceDetails,
    ) -> Result<Self, DetailsError> {
        let setup = KindSetup {
            cod_entries: uniform_only(),
            textured: false,
            base_variant: ObjectVariant::Geometry,
            cull_mode: CullMode::Front,
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
        parameters: &ShadowsParameters,
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
            CommonObjectData::Shadows(cod),
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
    let Parameters::Shadows(shadows) = parameters else {
        return Err(parameters_mismatch("Shadows", parameters));
    };
    let instance = Rc::new(Shadows::new(info, loader.context(), surface)?);
    instance.reference(loader.context(), surface, shadows)
}

fn load_existing(
    loader: &mut RenderDetailsLoader,
    existing: &Rc<dyn RenderDetails>,
    surface: &SurfaceDetails,
    parameters: &Parameters,
) -> Result<RenderDetailsReference, DetailsError> {
    let Parameters::Shadows(shadows) = parameters else {
        return Err(parameters_mismatch("Shadows", parameters));
    };
    let instance = downcast::<Shadows>(existing, INFO.name)?;
    if instance.structural_change_needed(surface) {
        instance.reload(surface)?;
    }
    instance.reference(loader.context(), surface, shadows)
}

/// The factory functions of the kind.
pub fn functions() -> KindFunctions {
    KindFunctions {
        load_new,
        load_existing,
    }
}

impl Drawable for Shadows {
    fn add_draw_cmds(
        &self,
        pass: &mut dyn RenderPass,
        cod: &CommonObjectData,
        items: &[DrawItem<'_>],
    ) -> Result<usize, DetailsError> {
        match cod {
            CommonObjectData::Shadows(cod) => self.base.record_draws(pass, cod.bind_group(), items),
            other => Err(cod_mismatch(self.name(), other)),
        }
    }
}

impl StructurallyReloadable for Shadows {
    fn surface(&self) -> SurfaceDetails {
        self.base.surface()
    }

    fn reload(&self, surface: &SurfaceDetails) -> Result<(), DetailsError> {
        self.base.reload(surface)
    }
}

impl RenderDetails for Shadows {
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
