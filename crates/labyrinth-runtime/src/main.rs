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

// Labyrinth runtime
// Drives a scripted level through the render-details core on a headless device.

use std::rc::Rc;
use std::sync::Arc;

use anyhow::{Context, Result};
use glam::{Mat4, Vec3};
use labyrinth_core::renderer::{
    Extent3d, GraphicsDevice, HeadlessDevice, RenderPassLayout, ResourceKind, SurfaceDetails,
    TextureDescriptor, TextureFormat, TextureUsage, TextureViewDescriptor,
};
use labyrinth_render::details::{
    DarkParameters, DepthMapParameters, LightAnchor, LightSource, LightState, ObjectParameters,
    PerspectiveState, Projection, ViewState,
};
use labyrinth_render::{
    BakeObject, Bucket, DrawObjDataReference, DrawObjReference, DrawerConfig, DrawingStyle,
    FeatureList, FrameTarget, LevelDrawer, ModelData, Parameters, Query, TextureData,
};

const FRAMES: usize = 8;
const RESIZE_AT: usize = 4;
const SWAP_CHAIN_FORMAT: TextureFormat = TextureFormat::Bgra8UnormSrgb;
const DEPTH_FORMAT: TextureFormat = TextureFormat::Depth32Float;

fn surface(width: u32, height: u32) -> SurfaceDetails {
    SurfaceDetails::new(
        width,
        height,
        RenderPassLayout::color_depth(SWAP_CHAIN_FORMAT, DEPTH_FORMAT),
    )
}

fn frame_target(device: &Arc<dyn GraphicsDevice>, surface: &SurfaceDetails) -> Result<FrameTarget> {
    let view = |format: TextureFormat, label: &'static str| -> Result<_> {
        let texture = device.create_texture(&TextureDescriptor {
            label: Some(label.into()),
            size: Extent3d::new_2d(surface.width, surface.height),
            format,
            usage: TextureUsage::RENDER_ATTACHMENT,
            sample_count: 1,
        })?;
        Ok(device.create_texture_view(texture, &TextureViewDescriptor::default())?)
    };
    Ok(FrameTarget {
        color_view: view(SWAP_CHAIN_FORMAT, "frame color")?,
        resolve_target: None,
        depth_view: Some(view(DEPTH_FORMAT, "frame depth")?),
    })
}

fn camera(surface: &SurfaceDetails, ball: Vec3) -> ObjectParameters {
    ObjectParameters {
        view: ViewState::new(Vec3::new(0.0, -2.0, 6.0), Vec3::ZERO, Vec3::Y),
        projection: Projection::Perspective(PerspectiveState {
            view_angle: std::f32::consts::FRAC_PI_4,
            aspect_ratio: surface.aspect_ratio(),
            near_plane: 0.1,
            far_plane: 50.0,
        }),
        light: LightState {
            position: ball + Vec3::new(0.0, 0.0, 4.0),
            look_at: ball,
            up: Vec3::Y,
        },
    }
}

fn dark_level(surface: &SurfaceDetails, ball: Vec3, moved: bool) -> DarkParameters {
    DarkParameters {
        view: ViewState::new(Vec3::new(0.0, -2.0, 6.0), Vec3::ZERO, Vec3::Y),
        perspective: PerspectiveState {
            view_angle: std::f32::consts::FRAC_PI_4,
            aspect_ratio: surface.aspect_ratio(),
            near_plane: 0.1,
            far_plane: 50.0,
        },
        lights: vec![
            LightSource {
                position: ball + Vec3::new(0.0, 0.0, 0.3),
                anchor: LightAnchor::Ball,
                moved,
            },
            LightSource {
                position: Vec3::new(1.5, 1.5, 0.3),
                anchor: LightAnchor::Hole,
                moved: false,
            },
        ],
        light_near_plane: 0.05,
        light_far_plane: 10.0,
    }
}

fn ball_position(frame: usize) -> Vec3 {
    let t = frame as f32 * 0.25;
    Vec3::new(t.cos(), t.sin(), 0.2)
}

struct Level {
    ball: DrawObjReference,
    ball_placement: DrawObjDataReference,
    floor: Rc<ModelData>,
    wall: Rc<ModelData>,
}

fn build_level(drawer: &mut LevelDrawer, device: &Arc<dyn GraphicsDevice>) -> Result<Level> {
    let floor = Rc::new(ModelData::quad(device, [0.4, 0.35, 0.3])?);
    let wall = Rc::new(ModelData::quad(device, [0.6, 0.6, 0.65])?);
    let ball_model = Rc::new(ModelData::quad(device, [0.9, 0.1, 0.1])?);
    let checker = Rc::new(TextureData::from_rgba8(
        device,
        2,
        2,
        &[
            255, 255, 255, 255, 40, 40, 40, 255, //
            40, 40, 40, 255, 255, 255, 255, 255,
        ],
    )?);

    let floor_obj = drawer.add_object(Bucket::Level, Rc::clone(&floor), Some(checker))?;
    drawer.add_model_matrix_for_object(
        Bucket::Level,
        floor_obj,
        Mat4::from_scale(Vec3::new(4.0, 4.0, 1.0)),
    )?;
    let wall_obj = drawer.add_object(Bucket::Level, Rc::clone(&wall), None)?;
    for x in [-2.0, -1.0, 0.0, 1.0, 2.0] {
        drawer.add_model_matrix_for_object(
            Bucket::Level,
            wall_obj,
            Mat4::from_translation(Vec3::new(x, 2.0, 0.5)),
        )?;
    }
    let ball = drawer.add_object(Bucket::Level, ball_model, None)?;
    let ball_placement = drawer.add_model_matrix_for_object(
        Bucket::Level,
        ball,
        Mat4::from_translation(ball_position(0)),
    )?;

    let backdrop = drawer.add_object(Bucket::Starter, Rc::clone(&floor), None)?;
    drawer.add_model_matrix_for_object(
        Bucket::Starter,
        backdrop,
        Mat4::from_translation(Vec3::new(0.0, 0.0, -10.0)) * Mat4::from_scale(Vec3::splat(30.0)),
    )?;

    Ok(Level {
        ball,
        ball_placement,
        floor,
        wall,
    })
}

fn run_frames(
    drawer: &mut LevelDrawer,
    device: &Arc<dyn GraphicsDevice>,
    level: &Level,
    update: impl Fn(usize, &SurfaceDetails) -> Parameters,
) -> Result<()> {
    let mut target = frame_target(device, drawer.surface())?;
    for frame in 0..FRAMES {
        if frame == RESIZE_AT {
            drawer.set_surface(surface(1280, 720))?;
            target = frame_target(device, drawer.surface())?;
        }
        let ball = ball_position(frame);
        drawer.update_model_matrix_for_object(
            Bucket::Level,
            level.ball,
            level.ball_placement,
            Mat4::from_translation(ball),
        )?;
        let parameters = update(frame, drawer.surface());
        drawer.update_parameters(Bucket::Level, parameters)?;

        let stats = drawer.draw(&target)?;
        log::info!(
            "frame {frame}: {} runs, {} draw calls, {} shadow passes",
            stats.runs,
            stats.draw_calls,
            stats.pre_passes
        );
    }
    Ok(())
}

fn main() -> Result<()> {
    use env_logger::{Builder, Env};

    Builder::from_env(Env::default().default_filter_or("info")).init();

    let config = match std::env::args().nth(1) {
        Some(path) => DrawerConfig::from_file(&path)
            .with_context(|| format!("failed to load drawer config from {path}"))?,
        None => DrawerConfig::default(),
    };
    let headless = Arc::new(HeadlessDevice::new());
    let device: Arc<dyn GraphicsDevice> = headless.clone();
    let mut drawer = LevelDrawer::new(device.clone(), surface(800, 600), config)?;

    // Lit level with chained shadows.
    let lit = Query::new(DrawingStyle::Standard)
        .require(FeatureList::SHADOWS | FeatureList::CHAINING)
        .prefer(FeatureList::COLOR | FeatureList::TEXTURE);
    let plain = Query::new(DrawingStyle::Standard).prefer(FeatureList::COLOR);
    let start = camera(drawer.surface(), ball_position(0));
    drawer.request_render_details(Bucket::Level, lit, Parameters::Object(start))?;
    drawer.request_render_details(Bucket::Starter, plain, Parameters::Object(start))?;
    let level = build_level(&mut drawer, &device)?;
    run_frames(&mut drawer, &device, &level, |frame, surface| {
        Parameters::Object(camera(surface, ball_position(frame)))
    })?;

    // Dark level over the same geometry.
    let dark = Query::new(DrawingStyle::Dark)
        .require(FeatureList::SHADOWS | FeatureList::CHAINING)
        .prefer(FeatureList::COLOR | FeatureList::TEXTURE);
    drawer.clear_draw_object_table(Bucket::Level);
    drawer.clear_draw_object_table(Bucket::Starter);
    drawer.set_surface(surface(800, 600))?;
    let first = dark_level(drawer.surface(), ball_position(0), false);
    drawer.request_render_details(Bucket::Level, dark, Parameters::Dark(first))?;
    drawer.request_render_details(Bucket::Starter, plain, Parameters::Object(start))?;
    let level = build_level(&mut drawer, &device)?;
    run_frames(&mut drawer, &device, &level, |frame, surface| {
        Parameters::Dark(dark_level(surface, ball_position(frame), frame % 2 == 0))
    })?;

    // Depth map of the maze walls, as the physics side would bake it.
    let depth = drawer.draw_to_buffer(
        &Query::new(DrawingStyle::DepthMap),
        &Parameters::DepthMap(DepthMapParameters {
            view: ViewState::new(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO, Vec3::Y),
            width_at_depth: 4.0,
            height_at_depth: 4.0,
            nearest_depth: 1.0,
            farthest_depth: 0.0,
            near_plane: 0.1,
            far_plane: 10.0,
        }),
        &[
            BakeObject {
                model: Rc::clone(&level.floor),
                texture: None,
                model_matrices: vec![Mat4::from_scale(Vec3::new(4.0, 4.0, 1.0))],
            },
            BakeObject {
                model: Rc::clone(&level.wall),
                texture: None,
                model_matrices: vec![Mat4::from_translation(Vec3::new(0.0, 2.0, 0.5))],
            },
        ],
        64,
        64,
    )?;
    let (min, max) = depth
        .iter()
        .fold((f32::MAX, f32::MIN), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    log::info!("depth bake: {} values in [{min}, {max}]", depth.len());

    log::info!(
        "done: {} command buffers submitted, {} live buffers, {} cached kinds",
        headless.submitted_commands().len(),
        headless.live_count(ResourceKind::Buffer),
        drawer.loader().recency().len()
    );
    Ok(())
}
