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

//! The append-only table of render-details kinds.

use super::{
    Description, Parameters, Query, RenderDetails, RenderDetailsLoader, RenderDetailsReference,
};
use crate::error::DetailsError;
use labyrinth_core::renderer::SurfaceDetails;
use std::cell::OnceCell;
use std::fmt;
use std::rc::Rc;

/// Builds a new instance of a kind, with its first common object data.
pub type LoadNewFn = fn(
    &KindInfo,
    &mut RenderDetailsLoader,
    &SurfaceDetails,
    &Parameters,
) -> Result<RenderDetailsReference, DetailsError>;

/// Reuses a cached instance of a kind, with a fresh common object data.
pub type LoadExistingFn = fn(
    &mut RenderDetailsLoader,
    &Rc<dyn RenderDetails>,
    &SurfaceDetails,
    &Parameters,
) -> Result<RenderDetailsReference, DetailsError>;

/// The factory functions of a kind.
#[derive(Debug, Clone, Copy)]
pub struct KindFunctions {
    /// Creates an instance.
    pub load_new: LoadNewFn,
    /// Reuses an instance.
    pub load_existing: LoadExistingFn,
}

/// What a kind declares when it registers.
#[derive(Debug, Clone, Copy)]
pub struct KindInfo {
    /// A unique name. Instances report it through [`RenderDetails::name`].
    pub name: &'static str,
    /// The capabilities queries are matched against.
    pub description: Description,
    /// Shader file names, resolved through the loader's shader requester.
    pub shaders: &'static [&'static str],
}

struct Entry {
    info: KindInfo,
    provider: fn() -> KindFunctions,
    functions: OnceCell<KindFunctions>,
}

impl fmt::Debug for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entry")
            .field("info", &self.info)
            .field("resolved", &self.functions.get().is_some())
            .finish()
    }
}

/// Registered kinds, in registration order.
///
/// Populated once at startup, typically through
/// [`register_builtin_kinds`](super::register_builtin_kinds), then shared
/// read-only with the loader.
#[derive(Debug, Default)]
pub struct Registry {
    entries: Vec<Entry>,
}

impl Registry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the built-in kinds.
    pub fn with_builtin_kinds() -> Self {
        let mut registry = Self::new();
        super::register_builtin_kinds(&mut registry);
        registry
    }

    /// Appends a kind and returns its index.
    ///
    /// `provider` is called at most once, the first time the kind is loaded.
    pub fn register(&mut self, info: KindInfo, provider: fn() -> KindFunctions) -> usize {
        if self.index_of(info.name).is_some() {
            log::warn!(
                "Registry: kind '{}' is registered more than once, lookups by name see the first",
                info.name
            );
        }
        let index = self.entries.len();
        log::debug!(
            "Registry: registered '{}' ({}) at index {index}",
            info.name,
            info.description
        );
        self.entries.push(Entry {
            info,
            provider,
            functions: OnceCell::new(),
        });
        index
    }

    /// The number of registered kinds.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// What the kind at `index` declared.
    pub fn info(&self, index: usize) -> Option<&KindInfo> {
        self.entries.get(index).map(|entry| &entry.info)
    }

    /// The index of the first kind registered under `name`.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|entry| entry.info.name == name)
    }

    /// The best-scoring kind for `query` and its score.
    ///
    /// Kinds scoring zero never match. Among equal scores the earliest
    /// registration wins.
    pub fn best_match(&self, query: &Query) -> Option<(usize, u32)> {
        let mut best: Option<(usize, u32)> = None;
        for (index, entry) in self.entries.iter().enumerate() {
            let score = entry.info.description.match_potential(query);
            if score > best.map_or(0, |(_, s)| s) {
                best = Some((index, score));
            }
        }
        best
    }

    /// The factory functions of the kind at `index`, resolving them on first use.
    pub fn functions(&self, index: usize) -> Option<KindFunctions> {
        let entry = self.entries.get(index)?;
        Some(*entry.functions.get_or_init(|| {
            log::trace!("Registry: resolving functions of '{}'", entry.info.name);
            (entry.provider)()
        }))
    }

    /// Returns `true` once the functions of the kind at `index` were resolved.
    pub fn functions_resolved(&self, index: usize) -> bool {
        self.entries
            .get(index)
            .is_some_and(|entry| entry.functions.get().is_some())
    }
}
