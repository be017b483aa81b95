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

//! Draw object tables and the drawer that records them.

mod batch;
mod level_drawer;
mod model;
mod table;

pub use self::batch::{group_by_batch, plan_runs, Run};
pub use self::level_drawer::{
    padded_bytes_per_row, BakeObject, Bucket, DrawStats, FrameTarget, LevelDrawer, BAKE_FORMAT,
};
pub use self::model::{ModelData, TextureData, Vertex};
pub use self::table::{
    depth_of_origin, DrawObjDataReference, DrawObjReference, DrawObject, DrawObjectTable,
    OverrideRequest, ZValueReference, Z_EPSILON,
};
