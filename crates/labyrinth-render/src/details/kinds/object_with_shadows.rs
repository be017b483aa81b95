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

//! Lit objects sampling a shadow map rendered elsewhere.

use super::common::{
    cod_mismatch, downcast, parameters_mismatch, shadow_map_entries, shadow_sampling, KindSetup,
    ObjectKindBase,
};
use crate::details::{
    CommonObjectData, Description, DrawItem, Drawable, DrawingStyle, FeatureList, KindFunctions,
    KindInfo, LeafCod, LoadContext, ObjectVariant, ObjectWithShadowsParameters, Parameters,
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
    name: "objectWithShadows",
    description: Description::new(
        DrawingStyle::Standard,
        FeatureList::COLOR
            .union(FeatureList::TEXTURE)
            .union(FeatureList::SHADOWS),
    ),
    shaders: &["object_with_shadows.wgsl"],
};

/// Draws standard objects lit by one light, darkened where the light's
/// shadow map is closer than the fragment.
///
/// The shadow map and its light matrix arrive through the parameters, so the
/// kind can be chained behind any pass that renders one.
#[derive(Debug)]
pub struct ObjectWithShadows {
    base: ObjectKindBase,
}

impl ObjectWithShadows {
    fn new(
        info: &KindInfo,
        context: &LoadContext,
        surface: &SurfaceDetails,
    ) -> Result<Self, DetailsError> {
        let setup = KindSetup {
            cod_entries: shadow_sampling(TextureViewDimension::D2),
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
        parameters: &ObjectWithShadowsParameters,
    ) -> Result<RenderDetailsReference, DetailsError> {
        let cod = LeafCod::new(
            context,
            self.base.cod_layout(),
            &shadow_map_entries(&parameters.shadow_map),
            surface.pre_transform,
            *parameters,
        )?;
        Ok(RenderDetailsReference::new(
            Rc::clone(self) as Rc<dyn RenderDetails>,
            CommonObjectData::ObjectWithShadows(cod),
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
    let Parameters::ObjectWithShadows(object) = parameters else {
        return Err(parameters_mismatch("ObjectWithShadows", parameters));
    };
    let instance = Rc::new(ObjectWithShadows::new(info, loader.context(), surface)?);
    instance.reference(loader.context(), surface, object)
}

fn load_existing(
    loader: &mut RenderDetailsLoader,
    existing: &Rc<dyn RenderDetails>,
    surface: &SurfaceDetails,
    parameters: &Parameters,
) -> Result<RenderDetailsReference, DetailsError> {
    let Parameters::ObjectWithShadows(object) = parameters else {
        return Err(parameters_mismatch("ObjectWithShadows", parameters));
    };
    let instance = downcast::<ObjectWithShadows>(existing, INFO.name)?;
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

impl Drawable for ObjectWithShadows {
    fn add_draw_cmds(
        &self,
        pass: &mut dyn RenderPass,
        cod: &CommonObjectData,
        items: &[DrawItem<'_>],
    ) -> Result<usize, DetailsError> {
        match cod {
            CommonObjectData::ObjectWithShadows(cod) => {
                self.base.record_draws(pass, cod.bind_group(), items)
            }
            other => Err(cod_mismatch(self.name(), other)),
        }
    }
}

impl StructurallyReloadable for ObjectWithShadows {
    fn surface(&self) -> SurfaceDetails {
        self.base.surface()
    }

    fn reload(&self, surface: &SurfaceDetails) -> Result<(), DetailsError> {
        self.base.reload(surface)
    }
}

impl RenderDetails for ObjectWithShadows {
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
