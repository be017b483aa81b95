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

//! Standard objects that render their own shadow map first.
//!
//! The kind owns no pipelines. It loads a `ShadowMap` kind and a standard
//! kind requiring shadows through the loader, renders the first into a shadow
//! map before the main pass and draws with the second.

use super::common::{cod_mismatch, downcast, parameters_mismatch};
use crate::details::cod::chained_shadows_parameters;
use crate::details::{
    CommonObjectData, CreateDrawObjectDataFn, Description, DrawItem, Drawable, DrawingStyle,
    DrawObjectData, FeatureList, KindFunctions, KindInfo, ModelMatrixBuffer, ObjectParameters,
    ObjectWithShadowsParameters, Parameters, Query, RenderDetails, RenderDetailsLoader,
    RenderDetailsReference, ShadowMapTargets, ShadowsChainingCod, StructurallyReloadable,
    MODEL_MATRIX_ID_SHADOWS,
};
use crate::drawer::TextureData;
use crate::error::DetailsError;
use labyrinth_core::renderer::{
    CommandEncoder, Operations, RenderPass, RenderPassDepthStencilAttachment, RenderPassDescriptor,
    RenderPassLayout, SurfaceDetails, TextureFormat,
};
use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

/// Registration of the kind.
pub const INFO: KindInfo = KindInfo {
    name: "shadowsChaining",
    description: Description::new(
        DrawingStyle::Standard,
        FeatureList::COLOR
            .union(FeatureList::TEXTURE)
            .union(FeatureList::SHADOWS)
            .union(FeatureList::CHAINING),
    ),
    shaders: &[],
};

const SHADOWS_QUERY: Query = Query::new(DrawingStyle::ShadowMap);

fn object_query() -> Query {
    Query::new(DrawingStyle::Standard)
        .require(FeatureList::SHADOWS)
        .prefer(FeatureList::COLOR | FeatureList::TEXTURE)
}

#[derive(Debug)]
struct Parts {
    surface: SurfaceDetails,
    shadow_surface: SurfaceDetails,
    object: Rc<dyn RenderDetails>,
    shadows: Rc<dyn RenderDetails>,
}

/// Chains a shadow map pass in front of shadow-receiving standard objects.
#[derive(Debug)]
pub struct ShadowsChaining {
    info: KindInfo,
    size_multiplier: f32,
    parts: RefCell<Parts>,
}

struct Loaded {
    shadow_surface: SurfaceDetails,
    targets: ShadowMapTargets,
    object: RenderDetailsReference,
    shadows: RenderDetailsReference,
}

fn shadow_surface(surface: &SurfaceDetails, multiplier: f32) -> SurfaceDetails {
    surface.scaled(
        multiplier,
        RenderPassLayout::depth_only(TextureFormat::Depth32Float),
    )
}

fn load_parts(
    loader: &mut RenderDetailsLoader,
    surface: &SurfaceDetails,
    parameters: &ObjectParameters,
) -> Result<Loaded, DetailsError> {
    let multiplier = loader.context().config.shadows_size_multiplier;
    let shadow_surface = shadow_surface(surface, multiplier);
    let targets = ShadowMapTargets::new(
        &loader.context().device,
        &shadow_surface,
        1,
        "shadowsChaining shadow map",
    )?;

    let shadows_parameters = chained_shadows_parameters(parameters, shadow_surface.aspect_ratio());
    let shadows = loader.load(
        &SHADOWS_QUERY,
        &shadow_surface,
        &Parameters::Shadows(shadows_parameters),
    )?;
    let object = loader.load(
        &object_query(),
        surface,
        &Parameters::ObjectWithShadows(ObjectWithShadowsParameters {
            object: *parameters,
            light_proj_view: shadows_parameters.proj_view(),
            shadow_map: targets.binding(),
        }),
    )?;
    log::debug!(
        "shadowsChaining: chained '{}' behind '{}' ({}x{} shadow map)",
        object.name(),
        shadows.name(),
        shadow_surface.width,
        shadow_surface.height
    );

    Ok(Loaded {
        shadow_surface,
        targets,
        object,
        shadows,
    })
}

impl ShadowsChaining {
    fn reference(
        self: &Rc<Self>,
        loaded: Loaded,
        parameters: &ObjectParameters,
    ) -> RenderDetailsReference {
        let create_object = Rc::clone(&loaded.object.create_draw_object_data);
        let create_shadows = Rc::clone(&loaded.shadows.create_draw_object_data);
        let create: CreateDrawObjectDataFn = Rc::new(
            move |texture: Option<&TextureData>, model_matrix: Rc<ModelMatrixBuffer>| {
                let main = create_object(texture, Rc::clone(&model_matrix))?;
                let shadow = create_shadows(None, model_matrix)?;
                Ok(DrawObjectData::compose(main, vec![shadow]))
            },
        );
        let cod =
            ShadowsChainingCod::new(loaded.object, loaded.shadows, loaded.targets, *parameters);
        RenderDetailsReference::new(
            Rc::clone(self) as Rc<dyn RenderDetails>,
            CommonObjectData::ShadowsChaining(cod),
            create,
        )
    }

    /// The surface the shadow map pass renders to.
    pub fn shadow_surface(&self) -> SurfaceDetails {
        self.parts.borrow().shadow_surface.clone()
    }
}

impl Parts {
    fn new(surface: &SurfaceDetails, loaded: &Loaded) -> Self {
        Self {
            surface: surface.clone(),
            shadow_surface: loaded.shadow_surface.clone(),
            object: Rc::clone(&loaded.object.render_details),
            shadows: Rc::clone(&loaded.shadows.render_details),
        }
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
    let loaded = load_parts(loader, surface, object)?;
    let instance = Rc::new(ShadowsChaining {
        info: *info,
        size_multiplier: loader.context().config.shadows_size_multiplier,
        parts: RefCell::new(Parts::new(surface, &loaded)),
    });
    Ok(instance.reference(loaded, object))
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
    let instance = downcast::<ShadowsChaining>(existing, INFO.name)?;
    let loaded = load_parts(loader, surface, object)?;
    *instance.parts.borrow_mut() = Parts::new(surface, &loaded);
    Ok(instance.reference(loaded, object))
}

/// The factory functions of the kind.
pub fn functions() -> KindFunctions {
    KindFunctions {
        load_new,
        load_existing,
    }
}

impl Drawable for ShadowsChaining {
    fn add_pre_render_pass_cmds(
        &self,
        encoder: &mut dyn CommandEncoder,
        cod: &mut CommonObjectData,
        items: &[DrawItem<'_>],
    ) -> Result<usize, DetailsError> {
        let CommonObjectData::ShadowsChaining(cod) = cod else {
            return Err(cod_mismatch(self.name(), cod));
        };
        if !cod.shadow_maps_need_render {
            return Ok(0);
        }
        let Some(view) = cod.targets.layer_view(0) else {
            return Ok(0);
        };
        let (width, height) = (cod.targets.surface().width, cod.targets.surface().height);
        let shadow_items: Vec<DrawItem<'_>> = items
            .iter()
            .map(|item| item.with_set(MODEL_MATRIX_ID_SHADOWS))
            .collect();
        {
            let mut pass = encoder.begin_render_pass(&RenderPassDescriptor {
                label: Some("shadowsChaining shadow map"),
                color_attachments: &[],
                depth_stencil_attachment: Some(RenderPassDepthStencilAttachment {
                    view,
                    depth_ops: Operations::clear(1.0),
                }),
            });
            pass.set_viewport(0.0, 0.0, width as f32, height as f32);
            let shadows_cod = cod.shadows.common_object_data.borrow();
            cod.shadows
                .render_details
                .add_draw_cmds(pass.as_mut(), &shadows_cod, &shadow_items)?;
        }
        cod.shadow_maps_need_render = false;
        log::trace!(
            "shadowsChaining: rendered shadow map for {} objects",
            shadow_items.len()
        );
        Ok(1)
    }

    fn add_draw_cmds(
        &self,
        pass: &mut dyn RenderPass,
        cod: &CommonObjectData,
        items: &[DrawItem<'_>],
    ) -> Result<usize, DetailsError> {
        let CommonObjectData::ShadowsChaining(cod) = cod else {
            return Err(cod_mismatch(self.name(), cod));
        };
        let object_cod = cod.object.common_object_data.borrow();
        cod.object
            .render_details
            .add_draw_cmds(pass, &object_cod, items)
    }
}

impl StructurallyReloadable for ShadowsChaining {
    fn surface(&self) -> SurfaceDetails {
        self.parts.borrow().surface.clone()
    }

    fn reload(&self, surface: &SurfaceDetails) -> Result<(), DetailsError> {
        let mut parts = self.parts.borrow_mut();
        let shadow_surface = shadow_surface(surface, self.size_multiplier);
        if parts.object.structural_change_needed(surface) {
            parts.object.reload(surface)?;
        }
        if parts.shadows.structural_change_needed(&shadow_surface) {
            parts.shadows.reload(&shadow_surface)?;
        }
        parts.surface = surface.clone();
        parts.shadow_surface = shadow_surface;
        Ok(())
    }
}

impl RenderDetails for ShadowsChaining {
    fn name(&self) -> &'static str {
        self.info.name
    }

    fn description(&self) -> Description {
        self.info.description
    }

    fn into_any(self: Rc<Self>) -> Rc<dyn Any> {
        self
    }
}
