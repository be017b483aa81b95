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

//! The labyrinth render-details core.
//!
//! Level code asks for a rendering effect with a [`Query`]; the
//! [`RenderDetailsLoader`] resolves it against the kinds in a [`Registry`],
//! reusing a cached instance when the surface still fits and evicting the least
//! recently used kinds beyond a small bound. Objects live in per-bucket
//! [`DrawObjectTable`]s ordered by depth, and the [`LevelDrawer`] records them
//! in contiguous runs that share one render-details instance.

#![warn(missing_docs)]

pub mod config;
pub mod details;
pub mod drawer;
pub mod error;

pub use config::{DrawerConfig, RenderDetailsConfig};
pub use details::{
    register_builtin_kinds, CommonObjectData, Description, DrawingStyle, EmbeddedShaders,
    FeatureList, Parameters, Query, Registry, RenderDetails, RenderDetailsLoader,
    RenderDetailsReference, ShaderRequester, Updatable,
};
pub use drawer::{
    BakeObject, Bucket, DrawObjDataReference, DrawObjReference, DrawObjectTable, DrawStats,
    FrameTarget, LevelDrawer, ModelData, TextureData, Vertex,
};
pub use error::{DetailsError, DrawerError};
