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

//! Query resolution and the bounded instance cache.
//!
//! Each registered kind has one cache slot holding its single live instance.
//! A recency list, most recently used first, bounds how many slots stay
//! filled: pushing past [`RenderDetailsConfig::cache_capacity`] evicts the
//! tail. Eviction only drops the loader's handle; the instance is destroyed
//! once every reference handed out for it is gone.

use super::{
    KindFunctions, KindInfo, Parameters, Query, Registry, RenderDetails, RenderDetailsReference,
    ShaderRequester,
};
use crate::config::RenderDetailsConfig;
use crate::error::DetailsError;
use labyrinth_core::renderer::{GraphicsDevice, SurfaceDetails};
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

/// What kinds need to build their resources.
#[derive(Clone)]
pub struct LoadContext {
    /// The device resources are created on.
    pub device: Arc<dyn GraphicsDevice>,
    /// Resolves shader names.
    pub shaders: Rc<dyn ShaderRequester>,
    /// Pool sizes and shadow map multipliers.
    pub config: RenderDetailsConfig,
    /// Uniform slots per common object data.
    pub frames_in_flight: usize,
}

impl fmt::Debug for LoadContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadContext")
            .field("device", &self.device)
            .field("config", &self.config)
            .field("frames_in_flight", &self.frames_in_flight)
            .finish_non_exhaustive()
    }
}

/// Resolves queries to render-details instances, reusing cached ones.
#[derive(Debug)]
pub struct RenderDetailsLoader {
    context: LoadContext,
    registry: Rc<Registry>,
    cache: Vec<Option<Rc<dyn RenderDetails>>>,
    recency: VecDeque<usize>,
    loading: Vec<usize>,
}

impl RenderDetailsLoader {
    /// Creates a loader over `registry`.
    pub fn new(
        device: Arc<dyn GraphicsDevice>,
        shaders: Rc<dyn ShaderRequester>,
        registry: Rc<Registry>,
        config: RenderDetailsConfig,
        frames_in_flight: usize,
    ) -> Self {
        let cache = vec![None; registry.len()];
        log::debug!(
            "RenderDetailsLoader: {} kinds, cache capacity {}",
            registry.len(),
            config.cache_capacity
        );
        Self {
            context: LoadContext {
                device,
                shaders,
                config,
                frames_in_flight: frames_in_flight.max(1),
            },
            registry,
            cache,
            recency: VecDeque::new(),
            loading: Vec::new(),
        }
    }

    /// Resolves `query` and returns a reference for `surface` and `parameters`.
    ///
    /// The cached instance of the best kind is reused unless the surface
    /// changed structurally, in which case it is evicted and a new one built.
    ///
    /// # Errors
    ///
    /// - [`DetailsError::RenderDetailsNotRegistered`] if no kind matches.
    /// - [`DetailsError::CyclicComposition`] if a composite kind resolves one
    ///   of its parts to a kind that is still loading.
    /// - Whatever the kind's factory returns.
    pub fn load(
        &mut self,
        query: &Query,
        surface: &SurfaceDetails,
        parameters: &Parameters,
    ) -> Result<RenderDetailsReference, DetailsError> {
        let registry = Rc::clone(&self.registry);
        let not_registered = || DetailsError::RenderDetailsNotRegistered { query: *query };
        let (index, score) = registry.best_match(query).ok_or_else(not_registered)?;
        let info = registry.info(index).ok_or_else(not_registered)?;
        let functions = registry.functions(index).ok_or_else(not_registered)?;
        log::trace!(
            "RenderDetailsLoader: {query} resolved to '{}' (score {score})",
            info.name
        );

        if self.loading.contains(&index) {
            log::error!(
                "RenderDetailsLoader: '{}' is already loading, refusing to recurse",
                info.name
            );
            return Err(DetailsError::CyclicComposition { kind: info.name });
        }

        self.loading.push(index);
        let result = self.load_entry(index, info, functions, surface, parameters);
        self.loading.retain(|&loading| loading != index);
        result
    }

    fn load_entry(
        &mut self,
        index: usize,
        info: &KindInfo,
        functions: KindFunctions,
        surface: &SurfaceDetails,
        parameters: &Parameters,
    ) -> Result<RenderDetailsReference, DetailsError> {
        if let Some(existing) = self.cache.get(index).cloned().flatten() {
            match self.recency.iter().position(|&i| i == index) {
                Some(position) if existing.structural_change_needed(surface) => {
                    log::info!(
                        "RenderDetailsLoader: '{}' was built for another surface, rebuilding for {}x{}",
                        info.name,
                        surface.width,
                        surface.height
                    );
                    self.recency.remove(position);
                    self.evict_slot(index);
                }
                Some(position) => {
                    if self.recency.len() * 2 > self.capacity() && position != 0 {
                        self.recency.remove(position);
                        self.recency.push_front(index);
                    }
                    return (functions.load_existing)(self, &existing, surface, parameters);
                }
                None => {
                    log::warn!(
                        "RenderDetailsLoader: '{}' is cached but untracked, tracking it again",
                        info.name
                    );
                    self.recency.push_front(index);
                    self.truncate();
                    return (functions.load_existing)(self, &existing, surface, parameters);
                }
            }
        }

        let reference = (functions.load_new)(info, self, surface, parameters)?;
        log::debug!(
            "RenderDetailsLoader: built '{}' for {}x{}",
            info.name,
            surface.width,
            surface.height
        );
        if let Some(slot) = self.cache.get_mut(index) {
            *slot = Some(Rc::clone(&reference.render_details));
        }
        self.recency.retain(|&i| i != index);
        self.recency.push_front(index);
        self.truncate();
        Ok(reference)
    }

    fn truncate(&mut self) {
        while self.recency.len() > self.capacity() {
            if let Some(index) = self.recency.pop_back() {
                self.evict_slot(index);
            }
        }
    }

    fn evict_slot(&mut self, index: usize) {
        if let Some(instance) = self.cache.get_mut(index).and_then(Option::take) {
            log::info!(
                "RenderDetailsLoader: evicted '{}' ({} other holders)",
                instance.name(),
                Rc::strong_count(&instance) - 1
            );
        }
    }

    /// Drops the cached instance of the kind at `index`.
    pub fn evict(&mut self, index: usize) {
        self.recency.retain(|&i| i != index);
        self.evict_slot(index);
    }

    /// Drops every cached instance.
    pub fn clear(&mut self) {
        while let Some(index) = self.recency.pop_front() {
            self.evict_slot(index);
        }
        for index in 0..self.cache.len() {
            self.evict_slot(index);
        }
    }

    /// The cached instance of the kind at `index`.
    pub fn cached_instance(&self, index: usize) -> Option<Rc<dyn RenderDetails>> {
        self.cache.get(index).cloned().flatten()
    }

    /// Returns `true` if the kind at `index` has a cached instance.
    pub fn is_cached(&self, index: usize) -> bool {
        self.cache.get(index).is_some_and(Option::is_some)
    }

    /// Kind indices by recency, most recently used first.
    pub fn recency(&self) -> &VecDeque<usize> {
        &self.recency
    }

    /// How many kinds keep a cached instance.
    pub fn capacity(&self) -> usize {
        self.context.config.cache_capacity.max(1)
    }

    /// The registry queries are resolved against.
    pub fn registry(&self) -> &Rc<Registry> {
        &self.registry
    }

    /// What kinds need to build their resources.
    pub fn context(&self) -> &LoadContext {
        &self.context
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::details::{
        Description, DrawingStyle, EmbeddedShaders, FeatureList, KindInfo,
    };
    use labyrinth_core::renderer::{HeadlessDevice, RenderPassLayout, TextureFormat};

    const SELF_QUERY: Query = Query::new(DrawingStyle::Dark);

    fn recursing_new(
        _: &KindInfo,
        loader: &mut RenderDetailsLoader,
        surface: &SurfaceDetails,
        parameters: &Parameters,
    ) -> Result<RenderDetailsReference, DetailsError> {
        loader.load(&SELF_QUERY, surface, parameters)
    }

    fn never_existing(
        _: &mut RenderDetailsLoader,
        _: &Rc<dyn RenderDetails>,
        _: &SurfaceDetails,
        _: &Parameters,
    ) -> Result<RenderDetailsReference, DetailsError> {
        Err(DetailsError::KindMismatch { expected: "recursive" })
    }

    fn recursive_functions() -> KindFunctions {
        KindFunctions {
            load_new: recursing_new,
            load_existing: never_existing,
        }
    }

    fn loader(registry: Registry) -> RenderDetailsLoader {
        RenderDetailsLoader::new(
            Arc::new(HeadlessDevice::new()),
            Rc::new(EmbeddedShaders),
            Rc::new(registry),
            RenderDetailsConfig::default(),
            2,
        )
    }

    fn surface() -> SurfaceDetails {
        SurfaceDetails::new(
            64,
            64,
            RenderPassLayout::color_depth(TextureFormat::Bgra8UnormSrgb, TextureFormat::Depth32Float),
        )
    }

    fn parameters() -> Parameters {
        use crate::details::{LightState, ObjectParameters, PerspectiveState, Projection, ViewState};
        use glam::Vec3;
        Parameters::Object(ObjectParameters {
            view: ViewState::new(Vec3::Z, Vec3::ZERO, Vec3::Y),
            projection: Projection::Perspective(PerspectiveState {
                view_angle: 1.0,
                aspect_ratio: 1.0,
                near_plane: 0.1,
                far_plane: 10.0,
            }),
            light: LightState {
                position: Vec3::Z,
                look_at: Vec3::ZERO,
                up: Vec3::Y,
            },
        })
    }

    #[test]
    fn unregistered_query_is_an_error() {
        let mut loader = loader(Registry::new());
        let err = loader
            .load(&Query::new(DrawingStyle::Standard), &surface(), &parameters())
            .unwrap_err();
        assert!(matches!(err, DetailsError::RenderDetailsNotRegistered { .. }));
        assert!(loader.recency().is_empty());
    }

    #[test]
    fn self_resolving_composite_is_rejected() {
        let mut registry = Registry::new();
        registry.register(
            KindInfo {
                name: "recursive",
                description: Description::new(DrawingStyle::Dark, FeatureList::CHAINING),
                shaders: &[],
            },
            recursive_functions,
        );
        let mut loader = loader(registry);
        let err = loader.load(&SELF_QUERY, &surface(), &parameters()).unwrap_err();
        assert!(matches!(err, DetailsError::CyclicComposition { kind: "recursive" }));
        assert!(!loader.is_cached(0));
    }
}
