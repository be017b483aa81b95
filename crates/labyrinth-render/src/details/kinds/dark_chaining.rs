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

//! Dark levels with point-light shadows.
//!
//! Every light renders four shadow maps, one per direction, into consecutive
//! layers of one array. Lights anchored to the hole render once. Lights
//! anchored to the ball render again after they moved.

use super::common::{cod_mismatch, downcast, parameters_mismatch};
use crate::details::cod::{dark_shadows_parameters, MAX_DARK_LIGHTS};
use crate::details::{
    CommonObjectData, CreateDrawObjectDataFn, DarkChainingCod, DarkObjectParameters,
    DarkParameters, Description, DrawItem, Drawable, DrawingStyle, DrawObjectData, FeatureList,
    KindFunctions, KindInfo, LightAnchor, ModelMatrixBuffer, Parameters, Query, RenderDetails,
    RenderDetailsLoader, RenderDetailsReference, ShadowMapTargets, ShadowsParameters,
    StructurallyReloadable, LIGHT_DIRECTIONS, MODEL_MATRIX_ID_SHADOWS,
};
use crate::drawer::TextureData;
use crate::error::DetailsError;
use glam::Mat4;
use labyrinth_core::renderer::{
    scale_dimension, CommandEncoder, Operations, RenderPass, RenderPassDepthStencilAttachment,
    RenderPassDescriptor, RenderPassLayout, SurfaceDetails, TextureFormat,
};
use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

/// Registration of the kind.
pub const INFO: KindInfo = KindInfo {
    name: "darkChaining",
    description: Description::new(
        DrawingStyle::Dark,
        FeatureList::COLOR
            .union(FeatureList::TEXTURE)
            .union(FeatureList::SHADOWS)
            .union(FeatureList::CHAINING),
    ),
    shaders: &[],
};

const SHADOWS_QUERY: Query = Query::new(DrawingStyle::ShadowMap);

fn object_query() -> Query {
    Query::new(DrawingStyle::Dark)
        .require(FeatureList::SHADOWS)
        .prefer(FeatureList::COLOR | FeatureList::TEXTURE)
}

/// The shadow map surface of a dark level.
///
/// Both sides derive from the surface width: `floor(w * m)` by `floor(w * m * m)`.
pub fn dark_shadow_surface(surface: &SurfaceDetails, multiplier: f32) -> SurfaceDetails {
    SurfaceDetails {
        width: scale_dimension(surface.width, multiplier),
        height: scale_dimension(surface.width, multiplier * multiplier),
        render_pass: RenderPassLayout::depth_only(TextureFormat::Depth32Float),
        pre_transform: Mat4::IDENTITY,
    }
}

#[derive(Debug)]
struct Parts {
    surface: SurfaceDetails,
    shadow_surface: SurfaceDetails,
    object: Rc<dyn RenderDetails>,
    shadows: Option<Rc<dyn RenderDetails>>,
}

/// Chains the shadow map passes of every light in front of dark objects.
#[derive(Debug)]
pub struct DarkChaining {
    info: KindInfo,
    size_multiplier: f32,
    parts: RefCell<Parts>,
}

struct Loaded {
    shadow_surface: SurfaceDetails,
    targets: ShadowMapTargets,
    object: RenderDetailsReference,
    shadows: Vec<RenderDetailsReference>,
}

impl Parts {
    fn new(surface: &SurfaceDetails, loaded: &Loaded) -> Self {
        Self {
            surface: surface.clone(),
            shadow_surface: loaded.shadow_surface.clone(),
            object: Rc::clone(&loaded.object.render_details),
            shadows: loaded
                .shadows
                .first()
                .map(|shadows| Rc::clone(&shadows.render_details)),
        }
    }
}

fn load_parts(
    loader: &mut RenderDetailsLoader,
    surface: &SurfaceDetails,
    parameters: &DarkParameters,
) -> Result<Loaded, DetailsError> {
    if parameters.lights.len() > MAX_DARK_LIGHTS {
        return Err(DetailsError::InvalidParameters {
            kind: INFO.name,
            reason: format!(
                "{} lights, at most {MAX_DARK_LIGHTS} are supported",
                parameters.lights.len()
            ),
        });
    }

    let multiplier = loader.context().config.dark_shadows_size_multiplier;
    let shadow_surface = dark_shadow_surface(surface, multiplier);
    // An array view needs more than one layer, even without lights.
    let layers = parameters.shadow_map_count().max(LIGHT_DIRECTIONS.len());
    let targets = ShadowMapTargets::new(
        &loader.context().device,
        &shadow_surface,
        layers as u32,
        "darkChaining shadow maps",
    )?;

    let shadows_parameters = dark_shadows_parameters(parameters, shadow_surface.aspect_ratio());
    let shadows = shadows_parameters
        .iter()
        .map(|shadows| {
            loader.load(
                &SHADOWS_QUERY,
                &shadow_surface,
                &Parameters::Shadows(*shadows),
            )
        })
        .collect::<Result<Vec<_>, _>>()?;
    let object = loader.load(
        &object_query(),
        surface,
        &Parameters::DarkObject(DarkObjectParameters {
            dark: parameters.clone(),
            light_proj_views: shadows_parameters
                .iter()
                .map(ShadowsParameters::proj_view)
                .collect(),
            shadow_maps: targets.binding(),
        }),
    )?;
    log::debug!(
        "darkChaining: chained '{}' behind {} shadow passes ({}x{}, {} layers)",
        object.name(),
        shadows.len(),
        shadow_surface.width,
        shadow_surface.height,
        layers
    );

    Ok(Loaded {
        shadow_surface,
        targets,
        object,
        shadows,
    })
}

impl DarkChaining {
    /// The surface every shadow map pass renders to.
    pub fn shadow_surface(&self) -> SurfaceDetails {
        self.parts.borrow().shadow_surface.clone()
    }

    fn reference(
        self: &Rc<Self>,
        loaded: Loaded,
        parameters: &DarkParameters,
    ) -> RenderDetailsReference {
        let create_object = Rc::clone(&loaded.object.create_draw_object_data);
        let create_shadows = loaded
            .shadows
            .first()
            .map(|shadows| Rc::clone(&shadows.create_draw_object_data));
        let create: CreateDrawObjectDataFn = Rc::new(
            move |texture: Option<&TextureData>, model_matrix: Rc<ModelMatrixBuffer>| {
                let main = create_object(texture, Rc::clone(&model_matrix))?;
                let shadows = match &create_shadows {
                    Some(create_shadows) => vec![create_shadows(None, model_matrix)?],
                    None => Vec::new(),
                };
                Ok(DrawObjectData::compose(main, shadows))
            },
        );
        let cod = DarkChainingCod::new(
            loaded.object,
            loaded.shadows,
            loaded.targets,
            parameters.clone(),
        );
        RenderDetailsReference::new(
            Rc::clone(self) as Rc<dyn RenderDetails>,
            CommonObjectData::DarkChaining(cod),
            create,
        )
    }
}

fn load_new(
    info: &KindInfo,
    loader: &mut RenderDetailsLoader,
    surface: &SurfaceDetails,
    parameters: &Parameters,
) -> Result<RenderDetailsReference, DetailsError> {
    let Parameters::Dark(dark) = parameters else {
        return Err(parameters_mismatch("Dark", parameters));
    };
    let loaded = load_parts(loader, surface, dark)?;
    let instance = Rc::new(DarkChaining {
        info: *info,
        size_multiplier: loader.context().config.dark_shadows_size_multiplier,
        parts: RefCell::new(Parts::new(surface, &loaded)),
    });
    Ok(instance.reference(loaded, dark))
}

fn load_existing(
    loader: &mut RenderDetailsLoader,
    existing: &Rc<dyn RenderDetails>,
    surface: &SurfaceDetails,
    parameters: &Parameters,
) -> Result<RenderDetailsReference, DetailsError> {
    let Parameters::Dark(dark) = parameters else {
        return Err(parameters_mismatch("Dark", parameters));
    };
    let instance = downcast::<DarkChaining>(existing, INFO.name)?;
    let loaded = load_parts(loader, surface, dark)?;
    *instance.parts.borrow_mut() = Parts::new(surface, &loaded);
    Ok(instance.reference(loaded, dark))
}

/// The factory functions of the kind.
pub fn functions() -> KindFunctions {
    KindFunctions {
        load_new,
        load_existing,
    }
}

impl Drawable for DarkChaining {
    fn add_pre_render_pass_cmds(
        &self,
        encoder: &mut dyn CommandEncoder,
        cod: &mut CommonObjectData,
        items: &[DrawItem<'_>],
    ) -> Result<usize, DetailsError> {
        let CommonObjectData::DarkChaining(cod) = cod else {
            return Err(cod_mismatch(self.name(), cod));
        };
        if !cod.shadow_maps_need_render {
            return Ok(0);
        }

        let (width, height) = (cod.targets.surface().width, cod.targets.surface().height);
        let shadow_items: Vec<DrawItem<'_>> = items
            .iter()
            .map(|item| item.with_set(MODEL_MATRIX_ID_SHADOWS))
            .collect();
        let mut passes = 0;
        for (light, source) in cod.parameters().lights.iter().enumerate() {
            let pending = match source.anchor {
                LightAnchor::Ball => cod.ball_shadow_maps_need_render,
                LightAnchor::Hole => cod.hole_shadow_maps_need_render,
            };
            if !pending {
                continue;
            }
            for direction in 0..LIGHT_DIRECTIONS.len() {
                let layer = light * LIGHT_DIRECTIONS.len() + direction;
                let (Some(view), Some(shadows)) =
                    (cod.targets.layer_view(layer), cod.shadows.get(layer))
                else {
                    log::warn!("darkChaining: no shadow map layer {layer}, skipping");
                    continue;
                };
                let mut pass = encoder.begin_render_pass(&RenderPassDescriptor {
                    label: Some("darkChaining shadow map"),
                    color_attachments: &[],
                    depth_stencil_attachment: Some(RenderPassDepthStencilAttachment {
                        view,
                        depth_ops: Operations::clear(1.0),
                    }),
                });
                pass.set_viewport(0.0, 0.0, width as f32, height as f32);
                let shadows_cod = shadows.common_object_data.borrow();
                shadows
                    .render_details
                    .add_draw_cmds(pass.as_mut(), &shadows_cod, &shadow_items)?;
                passes += 1;
            }
        }

        cod.ball_shadow_maps_need_render = false;
        cod.hole_shadow_maps_need_render = false;
        cod.shadow_maps_need_render = false;
        log::trace!("darkChaining: rendered {passes} shadow maps");
        Ok(passes)
    }

    fn add_draw_cmds(
        &self,
        pass: &mut dyn RenderPass,
        cod: &CommonObjectData,
        items: &[DrawItem<'_>],
    ) -> Result<usize, DetailsError> {
        let CommonObjectData::DarkChaining(cod) = cod else {
            return Err(cod_mismatch(self.name(), cod));
        };
        let object_cod = cod.object.common_object_data.borrow();
        cod.object
            .render_details
            .add_draw_cmds(pass, &object_cod, items)
    }
}

impl StructurallyReloadable for DarkChaining {
    fn surface(&self) -> SurfaceDetails {
        self.parts.borrow().surface.clone()
    }

    fn reload(&self, surface: &SurfaceDetails) -> Result<(), DetailsError> {
        let mut parts = self.parts.borrow_mut();
        let shadow_surface = dark_shadow_surface(surface, self.size_multiplier);
        if parts.object.structural_change_needed(surface) {
            parts.object.reload(surface)?;
        }
        if let Some(shadows) = &parts.shadows {
            if shadows.structural_change_needed(&shadow_surface) {
                shadows.reload(&shadow_surface)?;
            }
        }
        parts.surface = surface.clone();
        parts.shadow_surface = shadow_surface;
        Ok(())
    }
}

impl RenderDetails for DarkChaining {
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
