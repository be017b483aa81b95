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

//! Lit, colored or textured objects without shadows.

use super::common::{
    cod_mismatch, downcast, parameters_mismatch, uniform_only, KindSetup, ObjectKindBase,
};
use crate::details::{
    CommonObjectData, Description, DrawItem, Drawable, DrawingStyle, FeatureList, KindFunctions,
    KindInfo, LeafCod, LoadContext, ObjectParameters, ObjectVariant, Parameters, RenderDetails,
    RenderDetailsLoader, RenderDetailsReference, StructurallyReloadable,
};
use crate::error::DetailsError;
use labyrinth_core::renderer::{BlendMode, CullMode, RenderPass, SurfaceDetails};
use std::any::Any;
use std::rc::Rc;

/// Registration of the kind.
pub const INFO: KindInfo = KindInfo {
    name: "objectNoShadows",
    description: Description::new(
        DrawingStyle::Standard,
        FeatureList::COLOR.union(FeatureList::TEXTURE),
    ),
    shaders: &["object.wgsl"],
};

/// Draws standard objects lit by one light, without shadow maps.
#[derive(Debug)]
pub struct ObjectNoShadows {
    base: ObjectKindBase,
}

impl ObjectNoShadows {
    fn new(
        info: &KindInfo,
        context: &LoadContext,
        surface: &SurfaceDetails,
    ) -> Result<Self, DetailsError> {
        let setup = KindSetup {
            cod_entries: uniform_only(),
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
        parameters: &ObjectParameters,
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
            CommonObjectData::Object(cod),
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
    let Parameters::Object(object) = parameters else {
        return Err(parameters_mismatch("Object", parameters));
    };
    let instance = Rc::new(ObjectNoShadows::new(info, loader.context(), surface)?);
    instance.reference(loader.context(), surface, object)
}

fn load_existing(
    loader: &mut RenderDetailsLoader,
    existing: &Rc<dyn RenderDetails>,
    surface: &SurfaceDetails,
    parameters: &Parameters,
) -> Result<RenderDetailsReference, DetailsError> {
    let Parameters::Object(object) = parameters else {
        return Err(parameters_mismatch("Object", parameters));
    };
    let instance = downcast::<ObjectNoShadows>(existing, INFO.name)?;
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

impl Drawable for ObjectNoShadows {
    fn add_draw_cmds(
        &self,
        pass: &mut dyn RenderPass,
        cod: &CommonObjectData,
        items: &[DrawItem<'_>],
    ) -> Result<usize, DetailsError> {
        match cod {
            CommonObjectData::Object(cod) => self.base.record_draws(pass, cod.bind_group(), items),
            other => Err(cod_mismatch(self.name(), other)),
        }
    }
}

impl StructurallyReloadable for ObjectNoShadows {
    fn surface(&self) -> SurfaceDetails {
        self.base.surface()
    }

    fn reload(&self, surface: &SurfaceDetails) -> Result<(), DetailsError> {
        self.base.reload(surface)
    }
}

impl RenderDetails for ObjectNoShadows {
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
