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

//! The description of the surface a pipeline renders into.
//!
//! A cached pipeline stays valid only while the surface keeps the same size and
//! an attachment layout compatible with the one the pipeline was built for.

use super::texture::TextureFormat;
use glam::Mat4;

/// The attachment layout of a render pass.
///
/// Two layouts are compatible when a pipeline built for one can be used inside
/// the other: same color attachment count and formats, same depth format and
/// same sample count.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RenderPassLayout {
    /// The formats of the color attachments, in attachment order.
    pub color_formats: Vec<TextureFormat>,
    /// The depth attachment format, if the pass has one.
    pub depth_format: Option<TextureFormat>,
    /// The multisample count.
    pub sample_count: u32,
}

impl RenderPassLayout {
    /// One color attachment plus a depth attachment, without multisampling.
    pub fn color_depth(color: TextureFormat, depth: TextureFormat) -> Self {
        Self {
            color_formats: vec![color],
            depth_format: Some(depth),
            sample_count: 1,
        }
    }

    /// A depth-only pass, as used for shadow maps.
    pub fn depth_only(depth: TextureFormat) -> Self {
        Self {
            color_formats: Vec::new(),
            depth_format: Some(depth),
            sample_count: 1,
        }
    }

    /// Returns `true` if a pipeline built for `self` can run inside `other`.
    pub fn is_compatible(&self, other: &RenderPassLayout) -> bool {
        self.color_formats == other.color_formats
            && self.depth_format == other.depth_format
            && self.sample_count == other.sample_count
    }
}

/// The size and layout of a render target, plus the pre-rotation the
/// presentation engine expects.
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceDetails {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// The layout of the pass that draws into the surface.
    pub render_pass: RenderPassLayout,
    /// Applied after the projection matrix, e.g. for a rotated display.
    pub pre_transform: Mat4,
}

impl SurfaceDetails {
    /// Creates surface details with an identity pre-transform.
    pub fn new(width: u32, height: u32, render_pass: RenderPassLayout) -> Self {
        Self {
            width,
            height,
            render_pass,
            pre_transform: Mat4::IDENTITY,
        }
    }

    /// Derives the details of an auxiliary surface.
    ///
    /// Each dimension is `floor(dimension * multiplier)`, clamped to at least one
    /// pixel. The pre-transform is not carried over: auxiliary targets are
    /// never presented.
    pub fn scaled(&self, multiplier: f32, render_pass: RenderPassLayout) -> Self {
        Self {
            width: scale_dimension(self.width, multiplier),
            height: scale_dimension(self.height, multiplier),
            render_pass,
            pre_transform: Mat4::IDENTITY,
        }
    }

    /// The width divided by the height.
    pub fn aspect_ratio(&self) -> f32 {
        self.width as f32 / self.height.max(1) as f32
    }

    /// Returns `true` if something built for `self` must be rebuilt to serve `other`.
    pub fn differs_structurally(&self, other: &SurfaceDetails) -> bool {
        self.width != other.width
            || self.height != other.height
            || !self.render_pass.is_compatible(&other.render_pass)
    }
}

/// `floor(dimension * multiplier)`, never below one.
pub fn scale_dimension(dimension: u32, multiplier: f32) -> u32 {
    ((dimension as f32 * multiplier).floor() as u32).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> RenderPassLayout {
        RenderPassLayout::color_depth(TextureFormat::Bgra8UnormSrgb, TextureFormat::Depth32Float)
    }

    #[test]
    fn identical_layouts_are_compatible() {
        assert!(layout().is_compatible(&layout()));
    }

    #[test]
    fn format_or_attachment_count_change_breaks_compatibility() {
        let mut other = layout();
        other.color_formats[0] = TextureFormat::Rgba8Unorm;
        assert!(!layout().is_compatible(&other));

        let mut extra = layout();
        extra.color_formats.push(TextureFormat::Rgba8Unorm);
        assert!(!layout().is_compatible(&extra));

        assert!(!layout().is_compatible(&RenderPassLayout::depth_only(TextureFormat::Depth32Float)));
    }

    #[test]
    fn scaled_surface_floors_each_dimension() {
        let surface = SurfaceDetails::new(1081, 1921, layout());
        let shadows = surface.scaled(0.5, RenderPassLayout::depth_only(TextureFormat::Depth32Float));
        assert_eq!((shadows.width, shadows.height), (540, 960));
        assert_eq!(scale_dimension(3, 0.25), 1);
    }

    #[test]
    fn resize_is_a_structural_difference() {
        let surface = SurfaceDetails::new(800, 600, layout());
        assert!(!surface.differs_structurally(&surface.clone()));
        assert!(surface.differs_structurally(&SurfaceDetails::new(801, 600, layout())));
    }
}
