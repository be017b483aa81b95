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

//! What a load hands back: an instance, its batch state and a data factory.

use super::{
    CommonObjectData, DrawObjectData, ModelMatrixBuffer, Parameters, RenderDetails, Updatable,
};
use crate::drawer::TextureData;
use crate::error::DetailsError;
use glam::Mat4;
use labyrinth_core::renderer::GraphicsDevice;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

/// Builds the draw object data of one placement for a loaded instance.
pub type CreateDrawObjectDataFn =
    Rc<dyn Fn(Option<&TextureData>, Rc<ModelMatrixBuffer>) -> Result<DrawObjectData, DetailsError>>;

/// A loaded instance together with the common object data of one batch.
///
/// Cloning shares both. Two references batch together only when they share
/// the instance and the common object data.
#[derive(Clone)]
pub struct RenderDetailsReference {
    /// The shared instance.
    pub render_details: Rc<dyn RenderDetails>,
    /// The batch state.
    pub common_object_data: Rc<RefCell<CommonObjectData>>,
    /// Builds draw object data compatible with `render_details`.
    pub create_draw_object_data: CreateDrawObjectDataFn,
}

impl fmt::Debug for RenderDetailsReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderDetailsReference")
            .field("render_details", &self.render_details.name())
            .field(
                "common_object_data",
                &self
                    .common_object_data
                    .try_borrow()
                    .map(|cod| cod.variant_name())
                    .unwrap_or("<borrowed>"),
            )
            .finish_non_exhaustive()
    }
}

impl RenderDetailsReference {
    /// Bundles a reference.
    pub fn new(
        render_details: Rc<dyn RenderDetails>,
        common_object_data: CommonObjectData,
        create_draw_object_data: CreateDrawObjectDataFn,
    ) -> Self {
        Self {
            render_details,
            common_object_data: Rc::new(RefCell::new(common_object_data)),
            create_draw_object_data,
        }
    }

    /// The kind name of the instance.
    pub fn name(&self) -> &'static str {
        self.render_details.name()
    }

    /// Returns `true` if both references were produced by the same kind.
    pub fn same_kind(&self, other: &RenderDetailsReference) -> bool {
        self.name() == other.name()
    }

    /// Returns `true` if both references draw with the same instance and batch state.
    pub fn same_batch(&self, other: &RenderDetailsReference) -> bool {
        Rc::ptr_eq(&self.render_details, &other.render_details)
            && Rc::ptr_eq(&self.common_object_data, &other.common_object_data)
    }

    /// Builds draw object data around an existing matrix buffer.
    pub fn draw_object_data_for(
        &self,
        texture: Option<&TextureData>,
        model_matrix: Rc<ModelMatrixBuffer>,
    ) -> Result<DrawObjectData, DetailsError> {
        (self.create_draw_object_data)(texture, model_matrix)
    }

    /// Builds draw object data with a new matrix buffer holding `model_matrix`.
    pub fn new_draw_object_data(
        &self,
        device: &Arc<dyn GraphicsDevice>,
        texture: Option<&TextureData>,
        model_matrix: Mat4,
    ) -> Result<DrawObjectData, DetailsError> {
        let buffer = ModelMatrixBuffer::new(device, model_matrix)?;
        self.draw_object_data_for(texture, buffer)
    }

    /// `(projection, view)` as level code sees them.
    pub fn proj_view_for_level(&self) -> (Mat4, Mat4) {
        self.common_object_data.borrow().proj_view_for_level()
    }

    /// Updates the batch state.
    pub fn update(&self, parameters: &Parameters) -> Result<(), DetailsError> {
        self.common_object_data.borrow_mut().update(parameters)
    }

    /// Checks `parameters` against the batch state without applying them.
    pub fn check(&self, parameters: &Parameters) -> Result<(), DetailsError> {
        self.common_object_data.borrow().check(parameters)
    }
}
