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

//! Scoped ownership of device handles.
//!
//! An [`Owned`] handle destroys its resource when dropped. Sharing one resource
//! between several owners is done with `Rc<Owned<T>>`, so the resource lives
//! exactly as long as its last user.

use crate::renderer::api::*;
use crate::renderer::error::ResourceError;
use crate::renderer::traits::GraphicsDevice;
use std::fmt::Debug;
use std::sync::Arc;

/// An opaque device handle that knows how to release itself.
pub trait GpuHandle: Copy + Debug + Eq {
    /// A short name used in log messages.
    const KIND: &'static str;

    /// Releases the resource on `device`.
    fn destroy(self, device: &dyn GraphicsDevice) -> Result<(), ResourceError>;
}

macro_rules! gpu_handle {
    ($($ty:ty => $kind:literal, $destroy:ident;)*) => {
        $(
            impl GpuHandle for $ty {
                const KIND: &'static str = $kind;

                fn destroy(self, device: &dyn GraphicsDevice) -> Result<(), ResourceError> {
                    device.$destroy(self)
                }
            }
        )*
    };
}

gpu_handle! {
    BufferId => "buffer", destroy_buffer;
    TextureId => "texture", destroy_texture;
    TextureViewId => "texture view", destroy_texture_view;
    SamplerId => "sampler", destroy_sampler;
    ShaderModuleId => "shader module", destroy_shader_module;
    BindGroupLayoutId => "bind group layout", destroy_bind_group_layout;
    BindGroupId => "bind group", destroy_bind_group;
    PipelineLayoutId => "pipeline layout", destroy_pipeline_layout;
    RenderPipelineId => "render pipeline", destroy_render_pipeline;
    DescriptorPoolId => "descriptor pool", destroy_descriptor_pool;
}

/// A device handle destroyed on drop.
#[derive(Debug)]
pub struct Owned<T: GpuHandle> {
    handle: T,
    device: Arc<dyn GraphicsDevice>,
}

impl<T: GpuHandle> Owned<T> {
    /// Takes ownership of `handle`, which must have been created on `device`.
    pub fn new(device: Arc<dyn GraphicsDevice>, handle: T) -> Self {
        Self { handle, device }
    }

    /// The raw handle, for use in descriptors and commands.
    pub fn handle(&self) -> T {
        self.handle
    }

    /// The device the handle belongs to.
    pub fn device(&self) -> &Arc<dyn GraphicsDevice> {
        &self.device
    }
}

impl<T: GpuHandle> Drop for Owned<T> {
    fn drop(&mut self) {
        if let Err(e) = self.handle.destroy(self.device.as_ref()) {
            log::warn!(
                "Owned: failed to destroy {} {:?}: {}",
                T::KIND,
                self.handle,
                e
            );
        }
    }
}
