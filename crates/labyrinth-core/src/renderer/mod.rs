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

//! The renderer contracts: handles, descriptors, device traits and helpers.

pub mod api;
pub mod error;
pub mod headless;
pub mod resource;
pub mod traits;
pub mod uniform_ring_buffer;

pub use self::api::*;
pub use self::error::{PipelineError, RenderError, ResourceError, ShaderError};
pub use self::headless::{HeadlessDevice, RecordedCommand, ResourceKind};
pub use self::resource::{GpuHandle, Owned};
pub use self::traits::{CommandEncoder, GraphicsDevice, RenderPass};
pub use self::uniform_ring_buffer::UniformRingBuffer;
