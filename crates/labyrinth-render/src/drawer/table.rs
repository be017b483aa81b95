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

//! The objects of one bucket and their depth order.
//!
//! A [`DrawObjectTable`] hands out opaque references that are never reused.
//! Every placement of every object has exactly one [`ZValueReference`] in the
//! table's ordered set, keyed by the depth of the placement's origin.

use super::{ModelData, TextureData};
use crate::details::{DrawObjectData, Parameters, Query, RenderDetailsReference};
use crate::error::DrawerError;
use glam::{Mat4, Vec4};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

/// Width of the depth buckets keys are ordered by.
pub const Z_EPSILON: f32 = 1e-6;

/// An object in a [`DrawObjectTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DrawObjReference(u64);

impl DrawObjReference {
    /// The raw value.
    pub fn value(self) -> u64 {
        self.0
    }
}

/// A placement of an object in a [`DrawObjectTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DrawObjDataReference(u64);

impl DrawObjDataReference {
    /// The raw value.
    pub fn value(self) -> u64 {
        self.0
    }
}

/// The sort key of one placement.
///
/// Orders by depth bucket ([`Z_EPSILON`] wide, unknown depths first), then by
/// object, then by placement. Depths in one bucket differ by less than
/// [`Z_EPSILON`].
#[derive(Debug, Clone, Copy)]
pub struct ZValueReference {
    /// The depth of the placement's origin, if it could be computed.
    pub z: Option<f32>,
    /// The object.
    pub obj: DrawObjReference,
    /// The placement.
    pub data: Option<DrawObjDataReference>,
}

impl ZValueReference {
    /// The key of `data` placed with `model_matrix`.
    pub fn new(obj: DrawObjReference, data: DrawObjDataReference, model_matrix: Mat4) -> Self {
        Self {
            z: depth_of_origin(model_matrix),
            obj,
            data: Some(data),
        }
    }
}

/// `z / w` of the origin transformed by `model_matrix`.
pub fn depth_of_origin(model_matrix: Mat4) -> Option<f32> {
    let origin = model_matrix * Vec4::W;
    let z = origin.z / origin.w;
    z.is_finite().then_some(z)
}

fn depth_bucket(z: f32) -> i64 {
    // Saturating cast; `z` is finite.
    (f64::from(z) / f64::from(Z_EPSILON)).floor() as i64
}

impl Ord for ZValueReference {
    fn cmp(&self, other: &Self) -> Ordering {
        self.z
            .map(depth_bucket)
            .cmp(&other.z.map(depth_bucket))
            .then_with(|| self.obj.cmp(&other.obj))
            .then_with(|| self.data.cmp(&other.data))
    }
}

impl PartialOrd for ZValueReference {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for ZValueReference {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ZValueReference {}

/// What an object was loaded with when it overrides the table's render details.
#[derive(Debug, Clone)]
pub struct OverrideRequest {
    /// The query the override was resolved from.
    pub query: Query,
    /// The parameters it was loaded with.
    pub parameters: Parameters,
}

/// One placed entity: geometry, texture and its placements.
#[derive(Debug)]
pub struct DrawObject {
    model: Rc<ModelData>,
    texture: Option<Rc<TextureData>>,
    render_details: Option<RenderDetailsReference>,
    request: Option<OverrideRequest>,
    data: BTreeMap<DrawObjDataReference, DrawObjectData>,
}

impl DrawObject {
    /// The geometry.
    pub fn model(&self) -> &Rc<ModelData> {
        &self.model
    }

    /// The texture, if any.
    pub fn texture(&self) -> Option<&Rc<TextureData>> {
        self.texture.as_ref()
    }

    /// The object's own render details, if it overrides the table's.
    pub fn render_details(&self) -> Option<&RenderDetailsReference> {
        self.render_details.as_ref()
    }

    /// Returns `true` if the object carries its own render details.
    pub fn has_override(&self) -> bool {
        self.render_details.is_some()
    }

    /// How the override was loaded, when the table knows.
    pub fn override_request(&self) -> Option<&OverrideRequest> {
        self.request.as_ref()
    }

    /// The placement under `data`.
    pub fn data(&self, data: DrawObjDataReference) -> Option<&DrawObjectData> {
        self.data.get(&data)
    }

    /// Every placement, by reference.
    pub fn data_iter(&self) -> impl Iterator<Item = (DrawObjDataReference, &DrawObjectData)> {
        self.data.iter().map(|(reference, data)| (*reference, data))
    }

    /// The number of placements.
    pub fn data_count(&self) -> usize {
        self.data.len()
    }
}

/// The objects of one bucket.
#[derive(Debug, Default)]
pub struct DrawObjectTable {
    render_details: Option<RenderDetailsReference>,
    objects: BTreeMap<DrawObjReference, DrawObject>,
    z_values: BTreeSet<ZValueReference>,
    keys: BTreeMap<(DrawObjReference, DrawObjDataReference), ZValueReference>,
    with_global: BTreeSet<DrawObjReference>,
    with_override: BTreeSet<DrawObjReference>,
    next_obj: u64,
    next_data: u64,
}

impl DrawObjectTable {
    /// An empty table without render details.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the render details objects without an override draw with.
    pub fn set_render_details(&mut self, reference: RenderDetailsReference) {
        log::debug!("DrawObjectTable: default render details set to '{}'", reference.name());
        self.render_details = Some(reference);
    }

    /// The render details objects without an override draw with.
    pub fn render_details(&self) -> Option<&RenderDetailsReference> {
        self.render_details.as_ref()
    }

    /// Adds an object drawn with the table's render details.
    ///
    /// # Errors
    ///
    /// [`DrawerError::DefaultRenderDetailsNotSet`] if no render details were set.
    pub fn add_object(
        &mut self,
        model: Rc<ModelData>,
        texture: Option<Rc<TextureData>>,
    ) -> Result<DrawObjReference, DrawerError> {
        if self.render_details.is_none() {
            return Err(DrawerError::DefaultRenderDetailsNotSet);
        }
        let reference = self.insert_object(DrawObject {
            model,
            texture,
            render_details: None,
            request: None,
            data: BTreeMap::new(),
        });
        self.with_global.insert(reference);
        Ok(reference)
    }

    /// Adds an object drawn with its own render details.
    pub fn add_object_with_render_details(
        &mut self,
        render_details: RenderDetailsReference,
        request: Option<OverrideRequest>,
        model: Rc<ModelData>,
        texture: Option<Rc<TextureData>>,
    ) -> DrawObjReference {
        let reference = self.insert_object(DrawObject {
            model,
            texture,
            render_details: Some(render_details),
            request,
            data: BTreeMap::new(),
        });
        self.with_override.insert(reference);
        reference
    }

    fn insert_object(&mut self, object: DrawObject) -> DrawObjReference {
        self.next_obj += 1;
        let reference = DrawObjReference(self.next_obj);
        self.objects.insert(reference, object);
        reference
    }

    /// Removes an object and all its placements.
    pub fn remove_object(&mut self, obj: DrawObjReference) -> Result<(), DrawerError> {
        let object = self
            .objects
            .remove(&obj)
            .ok_or(DrawerError::InvalidDrawObjReference(obj))?;
        self.with_global.remove(&obj);
        self.with_override.remove(&obj);
        for data in object.data.keys() {
            self.forget_key(obj, *data)?;
        }
        Ok(())
    }

    /// The object under `obj`.
    pub fn object(&self, obj: DrawObjReference) -> Option<&DrawObject> {
        self.objects.get(&obj)
    }

    /// The number of objects.
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// Returns `true` if the table holds no objects.
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Objects drawn with the table's render details.
    pub fn objects_with_global_render_details(&self) -> &BTreeSet<DrawObjReference> {
        &self.with_global
    }

    /// Objects carrying their own render details.
    pub fn objects_with_override(&self) -> &BTreeSet<DrawObjReference> {
        &self.with_override
    }

    /// The render details `obj` draws with.
    pub fn resolved_render_details(
        &self,
        obj: DrawObjReference,
    ) -> Option<&RenderDetailsReference> {
        let object = self.objects.get(&obj)?;
        object
            .render_details
            .as_ref()
            .or(self.render_details.as_ref())
    }

    /// Every placement in ascending depth.
    pub fn z_values(&self) -> impl Iterator<Item = &ZValueReference> {
        self.z_values.iter()
    }

    /// The number of placements across all objects.
    pub fn z_value_count(&self) -> usize {
        self.z_values.len()
    }

    fn key(
        obj: DrawObjReference,
        data: DrawObjDataReference,
        object_data: &DrawObjectData,
    ) -> ZValueReference {
        ZValueReference::new(obj, data, object_data.model_matrix().matrix())
    }

    /// The depth key of a placement, as stored.
    pub fn z_value(
        &self,
        obj: DrawObjReference,
        data: DrawObjDataReference,
    ) -> Option<&ZValueReference> {
        self.keys.get(&(obj, data))
    }

    fn track_key(&mut self, key: ZValueReference) -> Result<(), DrawerError> {
        let Some(data) = key.data else {
            return Ok(());
        };
        let obj = key.obj;
        if self.keys.contains_key(&(obj, data)) || !self.z_values.insert(key) {
            return Err(DrawerError::DuplicateZValueReference { obj, data });
        }
        self.keys.insert((obj, data), key);
        Ok(())
    }

    fn forget_key(
        &mut self,
        obj: DrawObjReference,
        data: DrawObjDataReference,
    ) -> Result<ZValueReference, DrawerError> {
        let key = self
            .keys
            .remove(&(obj, data))
            .ok_or(DrawerError::MissingZValueReference { obj, data })?;
        if !self.z_values.remove(&key) {
            return Err(DrawerError::MissingZValueReference { obj, data });
        }
        Ok(key)
    }

    /// Adds a placement to `obj`.
    ///
    /// # Errors
    ///
    /// - [`DrawerError::InvalidDrawObjReference`] if `obj` does not exist.
    /// - [`DrawerError::DuplicateZValueReference`] if the key is already present.
    pub fn add_draw_obj_data(
        &mut self,
        obj: DrawObjReference,
        object_data: DrawObjectData,
    ) -> Result<DrawObjDataReference, DrawerError> {
        if !self.objects.contains_key(&obj) {
            return Err(DrawerError::InvalidDrawObjReference(obj));
        }
        self.next_data += 1;
        let data = DrawObjDataReference(self.next_data);
        self.insert_data(obj, data, object_data)?;
        Ok(data)
    }

    fn insert_data(
        &mut self,
        obj: DrawObjReference,
        data: DrawObjDataReference,
        object_data: DrawObjectData,
    ) -> Result<(), DrawerError> {
        if !self.objects.contains_key(&obj) {
            return Err(DrawerError::InvalidDrawObjReference(obj));
        }
        self.track_key(Self::key(obj, data, &object_data))?;
        if let Some(object) = self.objects.get_mut(&obj) {
            object.data.insert(data, object_data);
        }
        Ok(())
    }

    /// Moves a placement and re-keys it.
    pub fn update_object_data(
        &mut self,
        obj: DrawObjReference,
        data: DrawObjDataReference,
        model_matrix: Mat4,
    ) -> Result<(), DrawerError> {
        let object = self
            .objects
            .get(&obj)
            .ok_or(DrawerError::InvalidDrawObjReference(obj))?;
        let object_data = object
            .data
            .get(&data)
            .ok_or(DrawerError::InvalidDrawObjDataReference { obj, data })?;
        object_data.update(model_matrix)?;
        self.forget_key(obj, data)?;
        self.track_key(ZValueReference::new(obj, data, model_matrix))
    }

    /// Removes a placement and returns it.
    pub fn remove_object_data(
        &mut self,
        obj: DrawObjReference,
        data: DrawObjDataReference,
    ) -> Result<DrawObjectData, DrawerError> {
        let object = self
            .objects
            .get_mut(&obj)
            .ok_or(DrawerError::InvalidDrawObjReference(obj))?;
        let object_data = object
            .data
            .remove(&data)
            .ok_or(DrawerError::InvalidDrawObjDataReference { obj, data })?;
        self.forget_key(obj, data)?;
        Ok(object_data)
    }

    /// Moves a placement from `from` to `to`, repointing it at `to`'s texture.
    ///
    /// Returns the placement's new reference, or `None` if both objects do
    /// not draw with the same kind or the placement cannot take the new
    /// texture in place. On `None` both objects are unchanged.
    pub fn transfer_object(
        &mut self,
        from: DrawObjReference,
        data: DrawObjDataReference,
        to: DrawObjReference,
    ) -> Result<Option<DrawObjDataReference>, DrawerError> {
        let source = self
            .resolved_render_details(from)
            .ok_or(DrawerError::InvalidDrawObjReference(from))?;
        let target = self
            .resolved_render_details(to)
            .ok_or(DrawerError::InvalidDrawObjReference(to))?;
        if !source.same_kind(target) {
            log::debug!(
                "DrawObjectTable: cannot transfer from '{}' to '{}'",
                source.name(),
                target.name()
            );
            return Ok(None);
        }

        let target_texture = self.objects.get(&to).and_then(|object| object.texture.clone());
        let object_data = self
            .objects
            .get(&from)
            .and_then(|object| object.data.get(&data))
            .ok_or(DrawerError::InvalidDrawObjDataReference { obj: from, data })?;
        if !object_data.update_texture_data(target_texture.as_deref())? {
            return Ok(None);
        }

        let object_data = self.remove_object_data(from, data)?;
        self.next_data += 1;
        let moved = DrawObjDataReference(self.next_data);
        self.insert_data(to, moved, object_data)?;
        Ok(Some(moved))
    }

    /// Replaces the render details of an object that overrides them.
    pub fn replace_override(
        &mut self,
        obj: DrawObjReference,
        render_details: RenderDetailsReference,
    ) -> Result<(), DrawerError> {
        let object = self
            .objects
            .get_mut(&obj)
            .ok_or(DrawerError::InvalidDrawObjReference(obj))?;
        object.render_details = Some(render_details);
        Ok(())
    }

    /// Rebuilds every placement against the render details its object now
    /// draws with, keeping references and matrix buffers.
    pub fn rebuild_draw_object_data(&mut self) -> Result<usize, DrawerError> {
        let mut rebuilt = 0;
        for object in self.objects.values_mut() {
            let Some(reference) = object.render_details.as_ref().or(self.render_details.as_ref())
            else {
                continue;
            };
            for object_data in object.data.values_mut() {
                *object_data = reference.draw_object_data_for(
                    object.texture.as_deref(),
                    Rc::clone(object_data.model_matrix()),
                )?;
                rebuilt += 1;
            }
        }
        log::debug!("DrawObjectTable: rebuilt {rebuilt} draw object data");
        Ok(rebuilt)
    }

    /// Drops every object and the table's render details.
    pub fn clear(&mut self) {
        self.render_details = None;
        self.objects.clear();
        self.z_values.clear();
        self.keys.clear();
        self.with_global.clear();
        self.with_override.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn key(z: f32, obj: u64, data: u64) -> ZValueReference {
        ZValueReference {
            z: Some(z),
            obj: DrawObjReference(obj),
            data: Some(DrawObjDataReference(data)),
        }
    }

    #[test]
    fn depths_within_one_bucket_fall_back_to_references() {
        assert!(key(0.500_000_2, 2, 1) > key(0.500_000_4, 1, 1));
        assert!(key(0.5, 1, 2) > key(0.5, 1, 1));
        assert!(key(0.4, 9, 9) < key(0.5, 1, 1));
    }

    #[test]
    fn nearby_depths_order_transitively() {
        let a = key(1.4e-6, 1, 1);
        let b = key(0.7e-6, 2, 2);
        let c = key(0.0, 3, 3);
        let mut sorted = [a, b, c];
        sorted.sort();
        assert!(sorted[0] <= sorted[1] && sorted[1] <= sorted[2]);
        assert!(sorted[0] <= sorted[2]);
        assert_eq!(sorted.map(|k| k.obj.value()), [2, 3, 1]);
    }

    #[test]
    fn unknown_depth_sorts_first() {
        let unknown = ZValueReference {
            z: None,
            obj: DrawObjReference(5),
            data: None,
        };
        assert!(unknown < key(-100.0, 1, 1));
    }

    #[test]
    fn depth_is_the_translated_origin() {
        let m = Mat4::from_translation(Vec3::new(1.0, 2.0, -0.25));
        assert_eq!(depth_of_origin(m), Some(-0.25));
        assert_eq!(depth_of_origin(Mat4::ZERO), None);
    }

    #[test]
    fn empty_table_rejects_unknown_objects() {
        let mut table = DrawObjectTable::new();
        assert!(table.is_empty());
        assert!(table.render_details().is_none());
        assert!(matches!(
            table.remove_object(DrawObjReference(1)),
            Err(DrawerError::InvalidDrawObjReference(_))
        ));
    }
}
