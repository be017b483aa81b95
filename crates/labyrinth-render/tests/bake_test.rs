mod common;

use approx::assert_abs_diff_eq;
use common::*;
use labyrinth_core::renderer::{HeadlessDevice, RecordedCommand};
use labyrinth_render::details::DrawingStyle;
use labyrinth_render::{BakeObject, DetailsError, DrawerConfig, DrawerError, LevelDrawer, Query};
use std::sync::Arc;

fn drawer() -> (Arc<HeadlessDevice>, Vec<BakeObject>, LevelDrawer) {
    let (headless, device) = devices();
    let objects = vec![BakeObject {
        model: quad(&device),
        texture: None,
        model_matrices: vec![at_depth(0.0), at_depth(-0.5)],
    }];
    let drawer = LevelDrawer::new(device, surface(64, 64), DrawerConfig::default()).unwrap();
    (headless, objects, drawer)
}

fn bake_clear_colors(headless: &HeadlessDevice) -> Vec<Option<[f32; 4]>> {
    headless
        .submitted_commands()
        .iter()
        .flatten()
        .filter_map(|command| match command {
            RecordedCommand::BeginRenderPass {
                label: Some(label),
                clear_color,
                ..
            } if label == "LevelDrawer bake pass" => Some(*clear_color),
            _ => None,
        })
        .collect()
}

#[test]
fn depth_bake_maps_stored_values_onto_the_depth_range() {
    let (headless, objects, mut drawer) = drawer();
    let values = drawer
        .draw_to_buffer(
            &Query::new(DrawingStyle::DepthMap),
            &depth_map(1.0, 0.25),
            &objects,
            5,
            3,
        )
        .unwrap();

    // An untouched target stores 0, the farthest depth.
    assert_eq!(values.len(), 15);
    for value in values {
        assert_abs_diff_eq!(value, 0.25);
    }
    assert_eq!(bake_clear_colors(&headless), [Some([0.0, 0.0, 0.0, 1.0])]);

    let copies = headless
        .submitted_commands()
        .iter()
        .flatten()
        .filter(|command| matches!(command, RecordedCommand::CopyTextureToBuffer(_)))
        .count();
    assert_eq!(copies, 1);
}

#[test]
fn normal_bake_yields_unit_vectors() {
    let (headless, objects, mut drawer) = drawer();
    let values = drawer
        .draw_to_buffer(
            &Query::new(DrawingStyle::NormalMap),
            &normal_map(),
            &objects,
            4,
            4,
        )
        .unwrap();

    assert_eq!(values.len(), 4 * 4 * 3);
    for normal in values.chunks(3) {
        let length = normal.iter().map(|c| c * c).sum::<f32>().sqrt();
        assert_abs_diff_eq!(length, 1.0, epsilon = 1e-5);
    }
    assert_eq!(bake_clear_colors(&headless), [Some([0.5, 0.5, 1.0, 1.0])]);
}

#[test]
fn baking_needs_a_readback_kind() {
    let (_, objects, mut drawer) = drawer();
    let err = drawer
        .draw_to_buffer(&object_query(), &object(5.0), &objects, 8, 8)
        .unwrap_err();
    assert!(matches!(
        err,
        DrawerError::Details(DetailsError::ReadbackUnsupported {
            kind: "objectNoShadows"
        })
    ));
}

#[test]
fn baking_leaves_the_level_tables_alone() {
    let (_, objects, mut drawer) = drawer();
    drawer
        .draw_to_buffer(
            &Query::new(DrawingStyle::DepthMap),
            &depth_map(1.0, 0.0),
            &objects,
            2,
            2,
        )
        .unwrap();
    for bucket in labyrinth_render::Bucket::ALL {
        assert!(drawer.table(bucket).is_empty());
    }
    assert!(drawer
        .loader()
        .is_cached(drawer.loader().registry().index_of("depthMap").unwrap()));
}
