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

//! Typed parameters handed to a kind when it is loaded or updated.
//!
//! Each kind accepts a fixed set of [`Parameters`] variants and rejects the rest
//! with [`DetailsError::ParametersMismatch`](super::DetailsError::ParametersMismatch).
//! The variants are built from a few reusable value structs.

use glam::{Mat4, Vec3};
use labyrinth_core::renderer::{SamplerId, TextureViewId};

/// A camera position and orientation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewState {
    /// Where the camera is.
    pub view_point: Vec3,
    /// The point it looks at.
    pub look_at: Vec3,
    /// The up direction.
    pub up: Vec3,
}

impl ViewState {
    /// Creates a view.
    pub fn new(view_point: Vec3, look_at: Vec3, up: Vec3) -> Self {
        Self {
            view_point,
            look_at,
            up,
        }
    }

    /// The world-to-view matrix.
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.view_point, self.look_at, self.up)
    }
}

/// A perspective frustum.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerspectiveState {
    /// Vertical field of view in radians.
    pub view_angle: f32,
    /// Width over height.
    pub aspect_ratio: f32,
    /// Distance to the near plane.
    pub near_plane: f32,
    /// Distance to the far plane.
    pub far_plane: f32,
}

impl PerspectiveState {
    /// The projection matrix, with depth mapped to `[0, 1]`.
    pub fn matrix(&self) -> Mat4 {
        Mat4::perspective_rh(
            self.view_angle,
            self.aspect_ratio,
            self.near_plane,
            self.far_plane,
        )
    }
}

/// An orthographic box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrthoState {
    /// Left edge.
    pub minus_x: f32,
    /// Right edge.
    pub plus_x: f32,
    /// Bottom edge.
    pub minus_y: f32,
    /// Top edge.
    pub plus_y: f32,
    /// Distance to the near plane.
    pub near_plane: f32,
    /// Distance to the far plane.
    pub far_plane: f32,
}

impl OrthoState {
    /// A box of `width` by `height` centred on the view axis.
    pub fn centered(width: f32, height: f32, near_plane: f32, far_plane: f32) -> Self {
        Self {
            minus_x: -width / 2.0,
            plus_x: width / 2.0,
            minus_y: -height / 2.0,
            plus_y: height / 2.0,
            near_plane,
            far_plane,
        }
    }

    /// The projection matrix, with depth mapped to `[0, 1]`.
    pub fn matrix(&self) -> Mat4 {
        Mat4::orthographic_rh(
            self.minus_x,
            self.plus_x,
            self.minus_y,
            self.plus_y,
            self.near_plane,
            self.far_plane,
        )
    }
}

/// Either kind of projection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Projection {
    /// Perspective projection.
    Perspective(PerspectiveState),
    /// Orthographic projection.
    Ortho(OrthoState),
}

impl Projection {
    /// The projection matrix.
    pub fn matrix(&self) -> Mat4 {
        match self {
            Projection::Perspective(p) => p.matrix(),
            Projection::Ortho(o) => o.matrix(),
        }
    }

    /// Distance to the near plane.
    pub fn near_plane(&self) -> f32 {
        match self {
            Projection::Perspective(p) => p.near_plane,
            Projection::Ortho(o) => o.near_plane,
        }
    }

    /// Distance to the far plane.
    pub fn far_plane(&self) -> f32 {
        match self {
            Projection::Perspective(p) => p.far_plane,
            Projection::Ortho(o) => o.far_plane,
        }
    }
}

/// A directional light source located at a point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightState {
    /// The light position.
    pub position: Vec3,
    /// Where the light points.
    pub look_at: Vec3,
    /// The up direction of the light camera.
    pub up: Vec3,
}

impl LightState {
    /// The world-to-light-view matrix.
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.look_at, self.up)
    }
}

/// A shadow map texture and the comparison sampler reading it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShadowMapBinding {
    /// The depth view, a 2D array for dark kinds.
    pub view: TextureViewId,
    /// The comparison sampler.
    pub sampler: SamplerId,
}

/// Parameters for lit standard objects.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObjectParameters {
    /// The camera.
    pub view: ViewState,
    /// The camera projection.
    pub projection: Projection,
    /// The scene light.
    pub light: LightState,
}

/// Parameters for a shadow map pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadowsParameters {
    /// The light camera.
    pub light: LightState,
    /// Its frustum.
    pub perspective: PerspectiveState,
}

impl ShadowsParameters {
    /// Projection times light view.
    pub fn proj_view(&self) -> Mat4 {
        self.perspective.matrix() * self.light.view_matrix()
    }
}

/// Parameters for objects that sample an existing shadow map.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObjectWithShadowsParameters {
    /// The camera and light.
    pub object: ObjectParameters,
    /// The matrix the shadow map was rendered with.
    pub light_proj_view: Mat4,
    /// The shadow map.
    pub shadow_map: ShadowMapBinding,
}

/// What a dark-level light is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LightAnchor {
    /// Follows the ball. Its shadows are re-rendered when it moves.
    Ball,
    /// Sits over the hole. Its shadows are rendered once.
    Hole,
}

/// A point light of a dark level.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightSource {
    /// The light position.
    pub position: Vec3,
    /// What the light is attached to.
    pub anchor: LightAnchor,
    /// Set when the light moved since the previous update.
    pub moved: bool,
}

/// Directions a point light casts shadows in, one shadow map each.
pub const LIGHT_DIRECTIONS: [Vec3; 4] = [Vec3::Y, Vec3::NEG_X, Vec3::NEG_Y, Vec3::X];

/// Parameters for dark levels.
#[derive(Debug, Clone, PartialEq)]
pub struct DarkParameters {
    /// The camera.
    pub view: ViewState,
    /// The camera frustum.
    pub perspective: PerspectiveState,
    /// The point lights.
    pub lights: Vec<LightSource>,
    /// Near plane of the light cameras.
    pub light_near_plane: f32,
    /// Far plane of the light cameras.
    pub light_far_plane: f32,
}

impl DarkParameters {
    /// The number of shadow maps the lights need.
    pub fn shadow_map_count(&self) -> usize {
        self.lights.len() * LIGHT_DIRECTIONS.len()
    }

    /// The shadow pass parameters for one light and direction.
    ///
    /// `aspect_ratio` is the shadow map's width over height.
    pub fn shadows_parameters(
        &self,
        light: usize,
        direction: usize,
        aspect_ratio: f32,
    ) -> Option<ShadowsParameters> {
        let source = self.lights.get(light)?;
        let dir = LIGHT_DIRECTIONS.get(direction)?;
        Some(ShadowsParameters {
            light: LightState {
                position: source.position,
                look_at: source.position + *dir,
                up: Vec3::Z,
            },
            perspective: PerspectiveState {
                view_angle: std::f32::consts::FRAC_PI_2,
                aspect_ratio,
                near_plane: self.light_near_plane,
                far_plane: self.light_far_plane,
            },
        })
    }
}

/// Parameters for dark objects reading shadow maps rendered elsewhere.
#[derive(Debug, Clone, PartialEq)]
pub struct DarkObjectParameters {
    /// The camera and lights.
    pub dark: DarkParameters,
    /// One matrix per shadow map, light-major.
    pub light_proj_views: Vec<Mat4>,
    /// The shadow map array.
    pub shadow_maps: ShadowMapBinding,
}

/// Parameters for depth map baking.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepthMapParameters {
    /// The camera, usually looking straight down.
    pub view: ViewState,
    /// Width of the captured area at the level's depth.
    pub width_at_depth: f32,
    /// Height of the captured area at the level's depth.
    pub height_at_depth: f32,
    /// World z mapped to a stored value of 1.
    pub nearest_depth: f32,
    /// World z mapped to a stored value of 0.
    pub farthest_depth: f32,
    /// Near plane of the orthographic box.
    pub near_plane: f32,
    /// Far plane of the orthographic box.
    pub far_plane: f32,
}

impl DepthMapParameters {
    /// The orthographic box covering the captured area.
    pub fn ortho(&self) -> OrthoState {
        OrthoState::centered(
            self.width_at_depth,
            self.height_at_depth,
            self.near_plane,
            self.far_plane,
        )
    }
}

/// Parameters for normal map baking.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalMapParameters {
    /// The camera, usually looking straight down.
    pub view: ViewState,
    /// Width of the captured area.
    pub width_at_depth: f32,
    /// Height of the captured area.
    pub height_at_depth: f32,
    /// Near plane of the orthographic box.
    pub near_plane: f32,
    /// Far plane of the orthographic box.
    pub far_plane: f32,
}

impl NormalMapParameters {
    /// The orthographic box covering the captured area.
    pub fn ortho(&self) -> OrthoState {
        OrthoState::centered(
            self.width_at_depth,
            self.height_at_depth,
            self.near_plane,
            self.far_plane,
        )
    }
}

/// Every parameter set a kind can be loaded or updated with.
#[derive(Debug, Clone, PartialEq)]
pub enum Parameters {
    /// Standard objects, with or without chained shadows.
    Object(ObjectParameters),
    /// Standard objects sampling a given shadow map.
    ObjectWithShadows(ObjectWithShadowsParameters),
    /// A single shadow map pass.
    Shadows(ShadowsParameters),
    /// Dark levels, with chained shadows.
    Dark(DarkParameters),
    /// Dark objects sampling given shadow maps.
    DarkObject(DarkObjectParameters),
    /// Depth map baking.
    DepthMap(DepthMapParameters),
    /// Normal map baking.
    NormalMap(NormalMapParameters),
}

impl Parameters {
    /// The variant name, for error messages.
    pub fn variant_name(&self) -> &'static str {
        match self {
            Parameters::Object(_) => "Object",
            Parameters::ObjectWithShadows(_) => "ObjectWithShadows",
            Parameters::Shadows(_) => "Shadows",
            Parameters::Dark(_) => "Dark",
            Parameters::DarkObject(_) => "DarkObject",
            Parameters::DepthMap(_) => "DepthMap",
            Parameters::NormalMap(_) => "NormalMap",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use glam::Vec4;

    fn dark(lights: usize) -> DarkParameters {
        DarkParameters {
            view: ViewState::new(Vec3::new(0.0, 0.0, 2.0), Vec3::ZERO, Vec3::Y),
            perspective: PerspectiveState {
                view_angle: 0.8,
                aspect_ratio: 0.5,
                near_plane: 0.5,
                far_plane: 5.0,
            },
            lights: (0..lights)
                .map(|i| LightSource {
                    position: Vec3::new(i as f32, 0.0, 0.5),
                    anchor: LightAnchor::Ball,
                    moved: false,
                })
                .collect(),
            light_near_plane: 0.1,
            light_far_plane: 3.0,
        }
    }

    #[test]
    fn shadow_maps_cover_four_directions_per_light() {
        let parameters = dark(2);
        assert_eq!(parameters.shadow_map_count(), 8);
        assert!(parameters.shadows_parameters(1, 3, 4.0).is_some());
        assert!(parameters.shadows_parameters(2, 0, 4.0).is_none());
        assert!(parameters.shadows_parameters(0, 4, 4.0).is_none());
    }

    #[test]
    fn light_camera_looks_along_its_direction() {
        let parameters = dark(1);
        let shadows = parameters.shadows_parameters(0, 0, 1.0).unwrap();
        let ahead = shadows.light.position + Vec3::Y;
        let clip = shadows.proj_view() * Vec4::new(ahead.x, ahead.y, ahead.z, 1.0);
        assert_abs_diff_eq!(clip.x / clip.w, 0.0, epsilon = 1e-5);
        assert_abs_diff_eq!(clip.y / clip.w, 0.0, epsilon = 1e-5);
    }

    #[test]
    fn centered_ortho_is_symmetric() {
        let ortho = OrthoState::centered(4.0, 2.0, 0.1, 10.0);
        assert_abs_diff_eq!(ortho.minus_x, -2.0);
        assert_abs_diff_eq!(ortho.plus_y, 1.0);
    }
}
