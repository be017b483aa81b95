mod common;

use common::*;
use labyrinth_render::details::{DrawingStyle, EmbeddedShaders, StructurallyReloadable};
use labyrinth_render::{DetailsError, Query, Registry, RenderDetailsConfig, RenderDetailsLoader};
use std::rc::Rc;

fn loader(capacity: usize) -> RenderDetailsLoader {
    let (_, device) = devices();
    RenderDetailsLoader::new(
        device,
        Rc::new(EmbeddedShaders),
        Rc::new(Registry::with_builtin_kinds()),
        RenderDetailsConfig {
            cache_capacity: capacity,
            ..RenderDetailsConfig::default()
        },
        2,
    )
}

fn index_of(loader: &RenderDetailsLoader, name: &str) -> usize {
    loader.registry().index_of(name).unwrap()
}

#[test]
fn same_surface_reuses_the_instance_with_fresh_batch_state() {
    let mut loader = loader(5);
    let surface = surface(64, 64);
    let first = loader.load(&object_query(), &surface, &object(5.0)).unwrap();
    let second = loader.load(&object_query(), &surface, &object(8.0)).unwrap();

    assert_eq!(first.name(), "objectNoShadows");
    assert!(Rc::ptr_eq(&first.render_details, &second.render_details));
    assert!(first.same_kind(&second));
    assert!(!first.same_batch(&second));
    assert_eq!(loader.recency().len(), 1);
}

#[test]
fn structural_change_builds_a_new_instance() {
    let mut loader = loader(5);
    let first = loader
        .load(&object_query(), &surface(64, 64), &object(5.0))
        .unwrap();
    let second = loader
        .load(&object_query(), &surface(128, 64), &object(5.0))
        .unwrap();

    assert!(!Rc::ptr_eq(&first.render_details, &second.render_details));
    let index = index_of(&loader, "objectNoShadows");
    let cached = loader.cached_instance(index).unwrap();
    assert!(Rc::ptr_eq(&cached, &second.render_details));
    assert_eq!(first.render_details.surface().width, 64);
    let rebuilt = second.render_details.surface();
    assert_eq!((rebuilt.width, rebuilt.height), (128, 64));
}

fn recency_names(loader: &RenderDetailsLoader) -> Vec<&'static str> {
    loader
        .recency()
        .iter()
        .map(|&index| loader.registry().info(index).unwrap().name)
        .collect()
}

#[test]
fn reused_kind_is_promoted_once_the_cache_is_half_full() {
    let mut loader = loader(5);
    let surface = surface(32, 32);
    loader.load(&object_query(), &surface, &object(5.0)).unwrap();
    loader
        .load(&Query::new(DrawingStyle::DepthMap), &surface, &depth_map(1.0, 0.0))
        .unwrap();
    loader
        .load(&Query::new(DrawingStyle::NormalMap), &surface, &normal_map())
        .unwrap();
    loader.load(&object_query(), &surface, &object(6.0)).unwrap();
    assert_eq!(
        recency_names(&loader),
        ["objectNoShadows", "normalMap", "depthMap"]
    );

    // The chained kind brings two parts of its own.
    loader.load(&chained_query(), &surface, &object(5.0)).unwrap();
    assert_eq!(
        recency_names(&loader),
        [
            "shadowsChaining",
            "objectWithShadows",
            "shadows",
            "objectNoShadows",
            "normalMap"
        ]
    );
    assert!(loader.is_cached(index_of(&loader, "objectNoShadows")));
    assert!(!loader.is_cached(index_of(&loader, "depthMap")));
}

#[test]
fn reused_kind_keeps_its_place_while_the_cache_is_sparse() {
    let mut loader = loader(5);
    let surface = surface(32, 32);
    loader.load(&object_query(), &surface, &object(5.0)).unwrap();
    loader
        .load(&Query::new(DrawingStyle::DepthMap), &surface, &depth_map(1.0, 0.0))
        .unwrap();
    loader.load(&object_query(), &surface, &object(6.0)).unwrap();
    assert_eq!(recency_names(&loader), ["depthMap", "objectNoShadows"]);
}

#[test]
fn cache_holds_at_most_capacity_kinds() {
    let mut loader = loader(2);
    let surface = surface(32, 32);
    let depth = loader
        .load(&Query::new(DrawingStyle::DepthMap), &surface, &depth_map(1.0, 0.0))
        .unwrap();
    loader
        .load(&Query::new(DrawingStyle::NormalMap), &surface, &normal_map())
        .unwrap();
    loader.load(&object_query(), &surface, &object(5.0)).unwrap();

    assert_eq!(loader.recency().len(), 2);
    assert!(!loader.is_cached(index_of(&loader, "depthMap")));
    assert!(loader.is_cached(index_of(&loader, "normalMap")));
    assert!(loader.is_cached(index_of(&loader, "objectNoShadows")));
    // Evicted instances stay alive for their holders.
    assert_eq!(depth.name(), "depthMap");
    assert!(depth.render_details.readback_format().is_some());
}

#[test]
fn composite_kind_loads_its_parts_through_the_cache() {
    let mut loader = loader(5);
    let surface = surface(64, 64);
    let chained = loader.load(&chained_query(), &surface, &object(5.0)).unwrap();

    assert_eq!(chained.name(), "shadowsChaining");
    for name in ["shadowsChaining", "shadows", "objectWithShadows"] {
        assert!(loader.is_cached(index_of(&loader, name)), "{name}");
    }
    assert!(!loader.is_cached(index_of(&loader, "objectNoShadows")));
}

#[test]
fn kinds_reject_foreign_parameters() {
    let mut loader = loader(5);
    let err = loader
        .load(&Query::new(DrawingStyle::DepthMap), &surface(16, 16), &object(5.0))
        .unwrap_err();
    assert!(matches!(
        err,
        DetailsError::ParametersMismatch {
            expected: "DepthMap",
            found: "Object"
        }
    ));
}

#[test]
fn updates_reach_the_batch_state() {
    let mut loader = loader(5);
    let reference = loader
        .load(&object_query(), &surface(64, 64), &object(5.0))
        .unwrap();
    let (_, before) = reference.proj_view_for_level();
    reference.update(&object(9.0)).unwrap();
    let (_, after) = reference.proj_view_for_level();
    assert_ne!(before, after);

    let err = reference.update(&normal_map()).unwrap_err();
    assert!(matches!(err, DetailsError::ParametersMismatch { .. }));
}

#[test]
fn dark_levels_reject_too_many_lights() {
    use labyrinth_render::details::{LightAnchor, MAX_DARK_LIGHTS};
    let mut loader = loader(5);
    let lights = vec![light(LightAnchor::Hole, false); MAX_DARK_LIGHTS + 1];
    let err = loader
        .load(&dark_query(), &surface(64, 64), &dark(lights))
        .unwrap_err();
    assert!(matches!(err, DetailsError::InvalidParameters { .. }));
}

#[test]
fn clear_drops_every_cached_instance() {
    let mut loader = loader(5);
    loader
        .load(&chained_query(), &surface(64, 64), &object(5.0))
        .unwrap();
    loader.clear();
    assert!(loader.recency().is_empty());
    assert!((0..loader.registry().len()).all(|index| !loader.is_cached(index)));
}
