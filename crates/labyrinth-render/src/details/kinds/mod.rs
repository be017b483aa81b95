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

//! The render-details kinds shipped with the crate.

mod common;
pub mod dark_chaining;
pub mod dark_object;
pub mod depth_map;
pub mod normal_map;
pub mod object_no_shadows;
pub mod object_with_shadows;
pub mod shadows;
pub mod shadows_chaining;

pub use self::dark_chaining::{dark_shadow_surface, DarkChaining};
pub use self::dark_object::DarkObject;
pub use self::depth_map::DepthMap;
pub use self::normal_map::NormalMap;
pub use self::object_no_shadows::ObjectNoShadows;
pub use self::object_with_shadows::ObjectWithShadows;
pub use self::shadows::Shadows;
pub use self::shadows_chaining::ShadowsChaining;

use super::Registry;

/// Registers every built-in kind.
///
/// Order matters: among kinds scoring the same for a query, the one
/// registered first wins.
pub fn register_builtin_kinds(registry: &mut Registry) {
    registry.register(object_no_shadows::INFO, object_no_shadows::functions);
    registry.register(shadows::INFO, shadows::functions);
    registry.register(object_with_shadows::INFO, object_with_shadows::functions);
    registry.register(shadows_chaining::INFO, shadows_chaining::functions);
    registry.register(dark_object::INFO, dark_object::functions);
    registry.register(dark_chaining::INFO, dark_chaining::functions);
    registry.register(depth_map::INFO, depth_map::functions);
    registry.register(normal_map::INFO, normal_map::functions);
    log::debug!("Registry: {} built-in kinds registered", registry.len());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::details::{DrawingStyle, FeatureList, Query};

    fn resolve(query: Query) -> &'static str {
        let registry = Registry::with_builtin_kinds();
        let (index, _) = registry.best_match(&query).unwrap();
        registry.info(index).unwrap().name
    }

    #[test]
    fn builtin_order() {
        let registry = Registry::with_builtin_kinds();
        let names: Vec<_> = (0..registry.len())
            .map(|i| registry.info(i).unwrap().name)
            .collect();
        assert_eq!(
            names,
            [
                "objectNoShadows",
                "shadows",
                "objectWithShadows",
                "shadowsChaining",
                "darkObject",
                "darkChaining",
                "depthMap",
                "normalMap",
            ]
        );
    }

    #[test]
    fn composite_parts_never_resolve_to_their_composite() {
        let object = Query::new(DrawingStyle::Standard)
            .require(FeatureList::SHADOWS)
            .prefer(FeatureList::COLOR | FeatureList::TEXTURE);
        assert_eq!(resolve(object), "objectWithShadows");
        let dark = Query::new(DrawingStyle::Dark)
            .require(FeatureList::SHADOWS)
            .prefer(FeatureList::COLOR | FeatureList::TEXTURE);
        assert_eq!(resolve(dark), "darkObject");
    }

    #[test]
    fn level_queries() {
        let chained = Query::new(DrawingStyle::Standard)
            .require(FeatureList::SHADOWS | FeatureList::CHAINING)
            .prefer(FeatureList::COLOR);
        assert_eq!(resolve(chained), "shadowsChaining");
        let plain = Query::new(DrawingStyle::Standard).prefer(FeatureList::COLOR);
        assert_eq!(resolve(plain), "objectNoShadows");
        assert_eq!(resolve(Query::new(DrawingStyle::ShadowMap)), "shadows");
        assert_eq!(resolve(Query::new(DrawingStyle::DepthMap)), "depthMap");
        assert_eq!(resolve(Query::new(DrawingStyle::NormalMap)), "normalMap");
    }

    #[test]
    fn every_kind_names_an_embedded_shader_or_none() {
        use crate::details::{EmbeddedShaders, ShaderRequester};
        let registry = Registry::with_builtin_kinds();
        for index in 0..registry.len() {
            for shader in registry.info(index).unwrap().shaders {
                assert!(EmbeddedShaders.shader_source(shader).is_ok(), "{shader}");
            }
        }
    }
}
