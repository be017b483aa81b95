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

//! Shader sources of the built-in kinds.
//!
//! Kinds name their shaders when they register and resolve them through a
//! [`ShaderRequester`] at load time. [`EmbeddedShaders`] serves the WGSL
//! compiled into the crate.
//!
//! Every shader reads the camera block at group 0 and the model matrix at
//! group 1, binding 0. Color kinds expose `fs_color` and `fs_texture`; the
//! baking kinds expose `fs_main`.

use labyrinth_core::renderer::ShaderError;
use std::borrow::Cow;
use std::fmt;

/// Lit objects without shadows.
pub const OBJECT_WGSL: &str = include_str!("object.wgsl");

/// Depth-only shadow map pass.
pub const SHADOWS_WGSL: &str = include_str!("shadows.wgsl");

/// Lit objects sampling one shadow map.
pub const OBJECT_WITH_SHADOWS_WGSL: &str = include_str!("object_with_shadows.wgsl");

/// Point-lit objects sampling a shadow map array.
pub const DARK_OBJECT_WGSL: &str = include_str!("dark_object.wgsl");

/// Normalised linear depth for readback.
pub const DEPTH_MAP_WGSL: &str = include_str!("depth_map.wgsl");

/// Encoded surface normals for readback.
pub const NORMAL_MAP_WGSL: &str = include_str!("normal_map.wgsl");

/// Resolves shader file names to sources.
pub trait ShaderRequester: fmt::Debug {
    /// The source of the shader registered as `name`.
    fn shader_source(&self, name: &str) -> Result<Cow<'static, str>, ShaderError>;
}

/// Serves the shaders embedded in the crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbeddedShaders;

impl ShaderRequester for EmbeddedShaders {
    fn shader_source(&self, name: &str) -> Result<Cow<'static, str>, ShaderError> {
        let source = match name {
            "object.wgsl" => OBJECT_WGSL,
            "shadows.wgsl" => SHADOWS_WGSL,
            "object_with_shadows.wgsl" => OBJECT_WITH_SHADOWS_WGSL,
            "dark_object.wgsl" => DARK_OBJECT_WGSL,
            "depth_map.wgsl" => DEPTH_MAP_WGSL,
            "normal_map.wgsl" => NORMAL_MAP_WGSL,
            _ => {
                return Err(ShaderError::LoadError {
                    path: name.to_string(),
                    source_error: "no embedded shader has this name".to_string(),
                })
            }
        };
        Ok(Cow::Borrowed(source))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_shaders_have_both_fragment_variants() {
        for source in [OBJECT_WGSL, OBJECT_WITH_SHADOWS_WGSL, DARK_OBJECT_WGSL] {
            assert!(source.contains("fn vs_main"));
            assert!(source.contains("fn fs_color"));
            assert!(source.contains("fn fs_texture"));
        }
    }

    #[test]
    fn geometry_shaders_have_a_main_fragment() {
        for source in [SHADOWS_WGSL, DEPTH_MAP_WGSL, NORMAL_MAP_WGSL] {
            assert!(source.contains("@vertex"));
            assert!(source.contains("fn fs_main"));
        }
    }

    #[test]
    fn unknown_names_are_load_errors() {
        assert!(EmbeddedShaders.shader_source("object.wgsl").is_ok());
        assert!(matches!(
            EmbeddedShaders.shader_source("missing.wgsl"),
            Err(ShaderError::LoadError { .. })
        ));
    }
}
