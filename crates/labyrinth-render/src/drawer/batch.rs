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

//! Cutting a table's depth order into runs that share render details.
//!
//! A run ends wherever the next placement draws with another instance or
//! another common object data. Runs are never merged across a cut, so the
//! depth order of the table is the draw order.

use super::DrawObjectTable;
use crate::details::{DrawItem, RenderDetailsReference};
use crate::error::DrawerError;

/// Contiguous placements drawn with one reference.
#[derive(Debug)]
pub struct Run<'a> {
    /// The render details and batch state of the run.
    pub reference: &'a RenderDetailsReference,
    /// The placements, in depth order.
    pub items: Vec<DrawItem<'a>>,
}

/// Splits `table` into runs, in depth order.
///
/// # Errors
///
/// [`DrawerError::InvalidDrawObjReference`] or
/// [`DrawerError::InvalidDrawObjDataReference`] if the depth order names a
/// placement the table no longer holds, and
/// [`DrawerError::DefaultRenderDetailsNotSet`] if an object without an
/// override is placed in a table without render details.
pub fn plan_runs(table: &DrawObjectTable) -> Result<Vec<Run<'_>>, DrawerError> {
    let mut runs: Vec<Run<'_>> = Vec::new();
    for key in table.z_values() {
        let Some(data) = key.data else {
            continue;
        };
        let object = table
            .object(key.obj)
            .ok_or(DrawerError::InvalidDrawObjReference(key.obj))?;
        let object_data = object
            .data(data)
            .ok_or(DrawerError::InvalidDrawObjDataReference { obj: key.obj, data })?;
        let reference = table
            .resolved_render_details(key.obj)
            .ok_or(DrawerError::DefaultRenderDetailsNotSet)?;
        let texture = object.texture().map(|texture| texture.as_ref());
        let item = DrawItem::new(object.model(), texture, object_data);

        match runs.last_mut() {
            Some(run) if run.reference.same_batch(reference) => run.items.push(item),
            _ => runs.push(Run {
                reference,
                items: vec![item],
            }),
        }
    }
    Ok(runs)
}

/// Merges runs by reference, keeping first-use order.
///
/// Auxiliary passes see every placement drawn with a reference, not just one
/// run of them.
pub fn group_by_batch<'a>(runs: &[Run<'a>]) -> Vec<Run<'a>> {
    let mut groups: Vec<Run<'a>> = Vec::new();
    for run in runs {
        match groups
            .iter_mut()
            .find(|group| group.reference.same_batch(run.reference))
        {
            Some(group) => group.items.extend_from_slice(&run.items),
            None => groups.push(Run {
                reference: run.reference,
                items: run.items.clone(),
            }),
        }
    }
    groups
}
