#![allow(dead_code)]

use glam::{Mat4, Vec3};
use labyrinth_core::renderer::{
    Extent3d, GraphicsDevice, HeadlessDevice, RenderPassLayout, SurfaceDetails, TextureDescriptor,
    TextureFormat, TextureUsage, TextureViewDescriptor,
};
use labyrinth_render::details::{
    DarkParameters, DepthMapParameters, DrawingStyle, FeatureList, LightAnchor, LightSource,
    LightState, NormalMapParameters, ObjectParameters, PerspectiveState, Projection, Query,
    ViewState,
};
use labyrinth_render::{FrameTarget, ModelData, Parameters};
use std::rc::Rc;
use std::sync::Arc;

pub fn devices() -> (Arc<HeadlessDevice>, Arc<dyn GraphicsDevice>) {
    let headless = Arc::new(HeadlessDevice::new());
    let device: Arc<dyn GraphicsDevice> = headless.clone();
    (headless, device)
}

pub fn surface(width: u32, height: u32) -> SurfaceDetails {
    SurfaceDetails::new(
        width,
        height,
        RenderPassLayout::color_depth(TextureFormat::Bgra8UnormSrgb, TextureFormat::Depth32Float),
    )
}

pub fn frame_target(device: &Arc<dyn GraphicsDevice>, surface: &SurfaceDetails) -> FrameTarget {
    let view = |format: TextureFormat| {
        let texture = device
            .create_texture(&TextureDescriptor {
                label: None,
                size: Extent3d::new_2d(surface.width, surface.height),
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

pub fn quad(device: &Arc<dyn GraphicsDevice>) -> Rc<ModelData> {
    Rc::new(ModelData::quad(device, [0.2, 0.6, 0.9]).unwrap())
}

pub fn at_depth(z: f32) -> Mat4 {
    Mat4::from_translation(Vec3::new(0.0, 0.0, z))
}

pub fn object_query() -> Query {
    Query::new(DrawingStyle::Standard).prefer(FeatureList::COLOR | FeatureList::TEXTURE)
}

pub fn chained_query() -> Query {
    Query::new(DrawingStyle::Standard)
        .require(FeatureList::SHADOWS | FeatureList::CHAINING)
        .prefer(FeatureList::COLOR | FeatureList::TEXTURE)
}

pub fn dark_query() -> Query {
    Query::new(DrawingStyle::Dark)
        .require(FeatureList::SHADOWS | FeatureList::CHAINING)
        .prefer(FeatureList::COLOR | FeatureList::TEXTURE)
}

pub fn object_parameters(eye_z: f32) -> ObjectParameters {
    ObjectParameters {
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
    }
}

pub fn object(eye_z: f32) -> Parameters {
    Parameters::Object(object_parameters(eye_z))
}

pub fn light(anchor: LightAnchor, moved: bool) -> LightSource {
    LightSource {
        position: Vec3::new(0.0, 0.0, 0.5),
        anchor,
        moved,
    }
}

pub fn dark(lights: Vec<LightSource>) -> Parameters {
    Parameters::Dark(DarkParameters {
        view: ViewState::new(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO, Vec3::Y),
        perspective: PerspectiveState {
            view_angle: std::f32::consts::FRAC_PI_4,
            aspect_ratio: 1.0,
            near_plane: 0.1,
            far_plane: 100.0,
        },
        lights,
        light_near_plane: 0.01,
        light_far_plane: 10.0,
    })
}

pub fn depth_map(nearest: f32, farthest: f32) -> Parameters {
    Parameters::DepthMap(DepthMapParameters {
        view: ViewState::new(Vec3::new(0.0, 0.0, 2.0), Vec3::ZERO, Vec3::Y),
        width_at_depth: 2.0,
        height_at_depth: 2.0,
        nearest_depth: nearest,
        farthest_depth: farthest,
        near_plane: 0.1,
        far_plane: 4.0,
    })
}

pub fn normal_map() -> Parameters {
    Parameters::NormalMap(NormalMapParameters {
        view: ViewState::new(Vec3::new(0.0, 0.0, 2.0), Vec3::ZERO, Vec3::Y),
        width_at_depth: 2.0,
        height_at_depth: 2.0,
        near_plane: 0.1,
        far_plane: 4.0,
    })
}
