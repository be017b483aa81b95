use criterion::{criterion_group, criterion_main, Criterion};
use glam::{Mat4, Vec3};
use labyrinth_core::renderer::{
    Extent3d, GraphicsDevice, HeadlessDevice, RenderPassLayout, SurfaceDetails, TextureDescriptor,
    TextureFormat, TextureUsage, TextureViewDescriptor,
};
use labyrinth_render::details::{
    DrawingStyle, FeatureList, LightState, ObjectParameters, PerspectiveState, Projection,
    ViewState,
};
use labyrinth_render::drawer::plan_runs;
use labyrinth_render::{
    Bucket, DrawObjReference, DrawerConfig, FrameTarget, LevelDrawer, ModelData, Parameters,
    Query,
};
use std::hint::black_box;
use std::rc::Rc;
use std::sync::Arc;

fn parameters(eye_z: f32) -> Parameters {
    Parameters::Object(ObjectParameters {
        view: ViewState::new(Vec3::new(0.0, 0.0, eye_z), Vec3::ZERO, Vec3::Y),
        projection: Projection::Perspective(PerspectiveState {
            view_angle: std::f32::consts::FRAC_PI_4,
            aspect_ratio: 1.0,
            near_plane: 0.1,
            far_plane: 100.0,
        }),
        light: LightState {
            position: Vec3::new(0.0, 1.0, 5.0),
            look_at: Vec3::ZERO,
            up: Vec3::Y,
        },
    })
}

fn populated_drawer(device: &Arc<dyn GraphicsDevice>, placements: usize) -> LevelDrawer {
    let surface = SurfaceDetails::new(
        256,
        256,
        RenderPassLayout::color_depth(TextureFormat::Bgra8UnormSrgb, TextureFormat::Depth32Float),
    );
    let query = Query::new(DrawingStyle::Standard).prefer(FeatureList::COLOR);
    let mut drawer = LevelDrawer::new(device.clone(), surface, DrawerConfig::default()).unwrap();
    drawer
        .request_render_details(Bucket::Level, query, parameters(5.0))
        .unwrap();
    let model = Rc::new(ModelData::quad(device, [1.0, 1.0, 1.0]).unwrap());
    let plain = drawer
        .add_object(Bucket::Level, Rc::clone(&model), None)
        .unwrap();
    // Every tenth placement draws with its own batch state.
    let special = drawer
        .add_object_with_render_details(Bucket::Level, query, parameters(6.0), model, None)
        .unwrap();
    for i in 0..placements {
        let obj = if i % 10 == 0 { special } else { plain };
        let z = -(i as f32) * 0.01;
        drawer
            .add_model_matrix_for_object(
                Bucket::Level,
                obj,
                Mat4::from_translation(Vec3::new(0.0, 0.0, z)),
            )
            .unwrap();
    }
    drawer
}

fn populated_obj(drawer: &LevelDrawer) -> DrawObjReference {
    drawer
        .table(Bucket::Level)
        .objects_with_global_render_details()
        .iter()
        .next()
        .copied()
        .unwrap()
}

fn frame_target(device: &Arc<dyn GraphicsDevice>) -> FrameTarget {
    let view = |format: TextureFormat| {
        let texture = device
            .create_texture(&TextureDescriptor {
                label: None,
                size: Extent3d::new_2d(256, 256),
                format,
                usage: TextureUsage::RENDER_ATTACHMENT,
                sample_count: 1,
            })
            .unwrap();
        device
            .create_texture_view(texture, &TextureViewDescriptor::default())
            .unwrap()
    };
    FrameTarget {
        color_view: view(TextureFormat::Bgra8UnormSrgb),
        resolve_target: None,
        depth_view: Some(view(TextureFormat::Depth32Float)),
    }
}

fn bench_draw_table(c: &mut Criterion) {
    let headless = Arc::new(HeadlessDevice::new());
    let device: Arc<dyn GraphicsDevice> = headless.clone();
    let mut drawer = populated_drawer(&device, 1_000);
    let target = frame_target(&device);

    let mut group = c.benchmark_group("Draw Table");

    group.bench_function("Move placement (1000 placements)", |b| {
        let mut populated = populated_drawer(&device, 1_000);
        let obj = populated_obj(&populated);
        let (data, _) = populated
            .table(Bucket::Level)
            .object(obj)
            .and_then(|object| object.data_iter().next())
            .unwrap();
        let mut step = 0u32;
        b.iter(|| {
            step = step.wrapping_add(1);
            let z = -((step % 1_000) as f32) * 0.01;
            populated
                .update_model_matrix_for_object(
                    Bucket::Level,
                    obj,
                    data,
                    Mat4::from_translation(Vec3::new(0.0, 0.0, z)),
                )
                .unwrap();
        });
    });

    group.bench_function("Insert placement", |b| {
        let mut populated = populated_drawer(&device, 0);
        let obj = populated_obj(&populated);
        b.iter(|| {
            let data = populated
                .add_model_matrix_for_object(Bucket::Level, obj, Mat4::IDENTITY)
                .unwrap();
            populated
                .remove_model_matrix_for_object(Bucket::Level, obj, data)
                .unwrap();
        });
    });

    group.bench_function("Plan runs (1000 placements)", |b| {
        b.iter(|| {
            let runs = plan_runs(drawer.table(Bucket::Level)).unwrap();
            black_box(runs.len());
        });
    });

    group.bench_function("Record frame (1000 placements)", |b| {
        b.iter(|| {
            black_box(drawer.draw(&target).unwrap());
            headless.clear_submitted();
        });
    });

    group.finish();
}

criterion_group!(benches, bench_draw_table);
criterion_main!(benches);
