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

//! Plain data types describing GPU resources and how they are used.

pub mod bind_group;
pub mod buffer;
pub mod command;
pub mod pipeline;
pub mod shader;
pub mod surface;
pub mod texture;

pub use self::bind_group::*;
pub use self::buffer::*;
pub use self::command::*;
pub use self::pipeline::*;
pub use self::shader::*;
pub use self::surface::*;
pub use self::texture::*;

/// The maximum number of frames the CPU may record ahead of the GPU.
///
/// Per-frame resources such as uniform ring buffers allocate this many slots
/// unless configured otherwise.
pub const MAX_FRAMES_IN_FLIGHT: usize = 2;
