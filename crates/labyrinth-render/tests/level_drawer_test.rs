mod common;

use common::*;
use labyrinth_core::renderer::{GraphicsDevice, HeadlessDevice, RecordedCommand, ResourceKind};
use labyrinth_render::details::{LightAnchor, StructurallyReloadable};
use labyrinth_render::{Bucket, DrawerConfig, DrawerError, LevelDrawer, TextureData};
use std::rc::Rc;
use std::sync::Arc;

fn drawer() -> (Arc<HeadlessDevice>, Arc<dyn GraphicsDevice>, LevelDrawer) {
    let (headless, device) = devices();
    let drawer =
        LevelDrawer::new(device.clone(), surface(64, 64), DrawerConfig::default()).unwrap();
    (headless, device, drawer)
}

fn pass_labels(headless: &HeadlessDevice) -> Vec<String> {
    headless
        .submitted_commands()
        .iter()
        .flatten()
        .filter_map(|command| match command {
            RecordedCommand::BeginRenderPass { label, .. } => label.clone(),
            _ => None,
        })
        .collect()
}

#[test]
fn objects_need_render_details_first() {
    let (_, device, mut drawer) = drawer();
    let err = drawer
        .add_object(Bucket::Level, quad(&device), None)
        .unwrap_err();
    assert!(matches!(err, DrawerError::DefaultRenderDetailsNotSet));
    assert!(drawer.proj_view_for_level(Bucket::Level).is_err());
}

#[test]
fn placements_are_kept_in_depth_order() {
    let (_, device, mut drawer) = drawer();
    drawer
        .request_render_details(Bucket::Level, object_query(), object(5.0))
        .unwrap();
    let near = drawer.add_object(Bucket::Level, quad(&device), None).unwrap();
    let far = drawer.add_object(Bucket::Level, quad(&device), None).unwrap();
    drawer
        .add_model_matrix_for_object(Bucket::Level, near, at_depth(-1.0))
        .unwrap();
    drawer
        .add_model_matrix_for_object(Bucket::Level, far, at_depth(-4.0))
        .unwrap();
    let moved = drawer
        .add_model_matrix_for_object(Bucket::Level, far, at_depth(-6.0))
        .unwrap();
    drawer
        .update_model_matrix_for_object(Bucket::Level, far, moved, at_depth(-0.5))
        .unwrap();

    let order: Vec<_> = drawer
        .table(Bucket::Level)
        .z_values()
        .map(|key| (key.obj, key.z.unwrap()))
        .collect();
    assert_eq!(order, [(far, -4.0), (near, -1.0), (far, -0.5)]);
}

#[test]
fn moving_nearly_equal_depths_keeps_one_key_per_placement() {
    let (headless, device, mut drawer) = drawer();
    drawer
        .request_render_details(Bucket::Level, object_query(), object(5.0))
        .unwrap();
    let mut placed = Vec::new();
    for z in [1.4e-6, 0.7e-6, 0.0] {
        let obj = drawer.add_object(Bucket::Level, quad(&device), None).unwrap();
        let data = drawer
            .add_model_matrix_for_object(Bucket::Level, obj, at_depth(z))
            .unwrap();
        placed.push((obj, data));
    }
    for (&(obj, data), z) in placed.iter().zip([5.0, 6.0, 7.0]) {
        drawer
            .update_model_matrix_for_object(Bucket::Level, obj, data, at_depth(z))
            .unwrap();
    }

    let table = drawer.table(Bucket::Level);
    let order: Vec<_> = table
        .z_values()
        .map(|key| (key.obj, key.z.unwrap()))
        .collect();
    assert_eq!(
        order,
        [(placed[0].0, 5.0), (placed[1].0, 6.0), (placed[2].0, 7.0)]
    );
    for (&(obj, data), z) in placed.iter().zip([5.0, 6.0, 7.0]) {
        assert_eq!(table.z_value(obj, data).and_then(|key| key.z), Some(z));
    }

    let target = frame_target(&device, drawer.surface());
    headless.clear_submitted();
    assert_eq!(drawer.draw(&target).unwrap().draw_calls, 3);

    for &(obj, data) in &placed {
        drawer
            .remove_model_matrix_for_object(Bucket::Level, obj, data)
            .unwrap();
    }
    assert_eq!(drawer.table(Bucket::Level).z_value_count(), 0);
}

#[test]
fn runs_split_where_the_batch_changes() {
    let (headless, device, mut drawer) = drawer();
    drawer
        .request_render_details(Bucket::Level, object_query(), object(5.0))
        .unwrap();
    let global = drawer.add_object(Bucket::Level, quad(&device), None).unwrap();
    let special = drawer
        .add_object_with_render_details(
            Bucket::Level,
            object_query(),
            object(7.0),
            quad(&device),
            None,
        )
        .unwrap();
    for z in [-3.0, -1.0] {
        drawer
            .add_model_matrix_for_object(Bucket::Level, global, at_depth(z))
            .unwrap();
    }
    drawer
        .add_model_matrix_for_object(Bucket::Level, special, at_depth(-2.0))
        .unwrap();

    let target = frame_target(&device, drawer.surface());
    let stats = drawer.draw(&target).unwrap();
    assert_eq!(stats.runs, 3);
    assert_eq!(stats.draw_calls, 3);
    assert_eq!(stats.pre_passes, 0);

    // Once the override is drawn first, both global placements batch.
    let (data, _) = drawer
        .table(Bucket::Level)
        .object(special)
        .unwrap()
        .data_iter()
        .next()
        .unwrap();
    drawer
        .update_model_matrix_for_object(Bucket::Level, special, data, at_depth(-5.0))
        .unwrap();
    let stats = drawer.draw(&target).unwrap();
    assert_eq!(stats.runs, 2);
    assert_eq!(stats.draw_calls, 3);
    assert_eq!(headless.submitted_commands().len(), 2);
}

#[test]
fn buckets_draw_starter_level_finisher() {
    let (headless, device, mut drawer) = drawer();
    for (bucket, eye) in [(Bucket::Finisher, 3.0), (Bucket::Starter, 4.0), (Bucket::Level, 5.0)] {
        drawer
            .request_render_details(bucket, object_query(), object(eye))
            .unwrap();
        let obj = drawer.add_object(bucket, quad(&device), None).unwrap();
        drawer
            .add_model_matrix_for_object(bucket, obj, at_depth(-1.0))
            .unwrap();
    }
    let stats = drawer
        .draw(&frame_target(&device, drawer.surface()))
        .unwrap();
    assert_eq!(stats.runs, 3);
    assert_eq!(pass_labels(&headless), ["LevelDrawer main pass"]);
}

#[test]
fn transfer_moves_placements_between_objects_of_one_kind() {
    let (_, device, mut drawer) = drawer();
    drawer
        .request_render_details(Bucket::Level, object_query(), object(5.0))
        .unwrap();
    let texture = |rgba: [u8; 4]| Rc::new(TextureData::from_rgba8(&device, 1, 1, &rgba).unwrap());
    let red = drawer
        .add_object(Bucket::Level, quad(&device), Some(texture([255, 0, 0, 255])))
        .unwrap();
    let blue = drawer
        .add_object(Bucket::Level, quad(&device), Some(texture([0, 0, 255, 255])))
        .unwrap();
    let data = drawer
        .add_model_matrix_for_object(Bucket::Level, red, at_depth(-2.0))
        .unwrap();

    let moved = drawer
        .transfer_object(Bucket::Level, red, data, blue)
        .unwrap()
        .unwrap();
    let table = drawer.table(Bucket::Level);
    assert_eq!(table.object(red).unwrap().data_count(), 0);
    assert_eq!(table.object(blue).unwrap().data_count(), 1);
    assert!(table.object(blue).unwrap().data(moved).is_some());
    assert_eq!(table.z_value_count(), 1);
}

#[test]
fn transfer_needing_another_pipeline_is_refused() {
    let (_, device, mut drawer) = drawer();
    drawer
        .request_render_details(Bucket::Level, object_query(), object(5.0))
        .unwrap();
    let texture = Rc::new(TextureData::from_rgba8(&device, 1, 1, &[255, 0, 0, 255]).unwrap());
    let plain = drawer.add_object(Bucket::Level, quad(&device), None).unwrap();
    let textured = drawer
        .add_object(Bucket::Level, quad(&device), Some(texture))
        .unwrap();
    let data = drawer
        .add_model_matrix_for_object(Bucket::Level, plain, at_depth(-2.0))
        .unwrap();

    assert!(drawer
        .transfer_object(Bucket::Level, plain, data, textured)
        .unwrap()
        .is_none());
    assert_eq!(drawer.table(Bucket::Level).object(plain).unwrap().data_count(), 1);
}

#[test]
fn transfer_across_kinds_is_refused() {
    let (_, device, mut drawer) = drawer();
    drawer
        .request_render_details(Bucket::Level, object_query(), object(5.0))
        .unwrap();
    let plain = drawer.add_object(Bucket::Level, quad(&device), None).unwrap();
    let chained = drawer
        .add_object_with_render_details(
            Bucket::Level,
            chained_query(),
            object(5.0),
            quad(&device),
            None,
        )
        .unwrap();
    let data = drawer
        .add_model_matrix_for_object(Bucket::Level, plain, at_depth(-2.0))
        .unwrap();

    let moved = drawer
        .transfer_object(Bucket::Level, plain, data, chained)
        .unwrap();
    assert!(moved.is_none());
    assert!(drawer
        .table(Bucket::Level)
        .object(plain)
        .unwrap()
        .data(data)
        .is_some());
}

#[test]
fn chained_shadows_render_once_per_update() {
    let (headless, device, mut drawer) = drawer();
    drawer
        .request_render_details(Bucket::Level, chained_query(), object(5.0))
        .unwrap();
    let obj = drawer.add_object(Bucket::Level, quad(&device), None).unwrap();
    drawer
        .add_model_matrix_for_object(Bucket::Level, obj, at_depth(-1.0))
        .unwrap();
    let target = frame_target(&device, drawer.surface());

    assert_eq!(drawer.draw(&target).unwrap().pre_passes, 1);
    assert_eq!(drawer.draw(&target).unwrap().pre_passes, 0);
    drawer
        .update_parameters(Bucket::Level, object(6.0))
        .unwrap();
    assert_eq!(drawer.draw(&target).unwrap().pre_passes, 1);

    let labels = pass_labels(&headless);
    assert_eq!(labels[0], "shadowsChaining shadow map");
    assert_eq!(labels[1], "LevelDrawer main pass");
}

#[test]
fn dark_shadows_follow_the_ball() {
    let (_, device, mut drawer) = drawer();
    let lights = |moved| {
        vec![
            light(LightAnchor::Ball, moved),
            light(LightAnchor::Hole, false),
        ]
    };
    drawer
        .request_render_details(Bucket::Level, dark_query(), dark(lights(false)))
        .unwrap();
    let obj = drawer.add_object(Bucket::Level, quad(&device), None).unwrap();
    drawer
        .add_model_matrix_for_object(Bucket::Level, obj, at_depth(-1.0))
        .unwrap();
    let target = frame_target(&device, drawer.surface());

    // Every light renders all four directions the first time.
    assert_eq!(drawer.draw(&target).unwrap().pre_passes, 8);
    drawer
        .update_parameters(Bucket::Level, dark(lights(false)))
        .unwrap();
    assert_eq!(drawer.draw(&target).unwrap().pre_passes, 0);
    drawer
        .update_parameters(Bucket::Level, dark(lights(true)))
        .unwrap();
    assert_eq!(drawer.draw(&target).unwrap().pre_passes, 4);
}

#[test]
fn new_surface_keeps_references_valid() {
    let (_, device, mut drawer) = drawer();
    drawer
        .request_render_details(Bucket::Level, chained_query(), object(5.0))
        .unwrap();
    let obj = drawer.add_object(Bucket::Level, quad(&device), None).unwrap();
    let data = drawer
        .add_model_matrix_for_object(Bucket::Level, obj, at_depth(-1.0))
        .unwrap();

    drawer.set_surface(surface(128, 96)).unwrap();
    let reference = drawer.table(Bucket::Level).render_details().unwrap();
    assert_eq!(reference.render_details.surface().width, 128);
    assert!(drawer
        .table(Bucket::Level)
        .object(obj)
        .unwrap()
        .data(data)
        .is_some());

    let stats = drawer
        .draw(&frame_target(&device, drawer.surface()))
        .unwrap();
    assert_eq!(stats.draw_calls, 1);
    assert_eq!(stats.pre_passes, 1);
}

#[test]
fn removing_objects_frees_their_placements() {
    let (headless, device, mut drawer) = drawer();
    drawer
        .request_render_details(Bucket::Level, object_query(), object(5.0))
        .unwrap();
    let before = headless.live_count(ResourceKind::Buffer);
    let obj = drawer.add_object(Bucket::Level, quad(&device), None).unwrap();
    drawer
        .add_model_matrix_for_object(Bucket::Level, obj, at_depth(-1.0))
        .unwrap();
    assert!(headless.live_count(ResourceKind::Buffer) > before);

    drawer.remove_object(Bucket::Level, obj).unwrap();
    assert_eq!(headless.live_count(ResourceKind::Buffer), before);
    assert!(matches!(
        drawer.remove_object(Bucket::Level, obj),
        Err(DrawerError::InvalidDrawObjReference(_))
    ));

    drawer.clear_draw_object_table(Bucket::Level);
    assert!(drawer.table(Bucket::Level).render_details().is_none());
}
