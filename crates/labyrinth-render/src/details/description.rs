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

//! Capability descriptions of render-details kinds and the queries that select them.

use bitflags::bitflags;
use std::fmt;

/// The broad rendering technique a kind implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DrawingStyle {
    /// Lit, colored or textured objects.
    Standard,
    /// Depth from a light's point of view.
    ShadowMap,
    /// Objects lit only by nearby point lights.
    Dark,
    /// Linear depth for CPU readback.
    DepthMap,
    /// Surface normals for CPU readback.
    NormalMap,
}

bitflags! {
    /// Boolean features a kind supports.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct FeatureList: u32 {
        /// Per-vertex color.
        const COLOR = 1 << 0;
        /// Sampled textures.
        const TEXTURE = 1 << 1;
        /// Receives shadows.
        const SHADOWS = 1 << 2;
        /// Renders its own auxiliary passes by composing other kinds.
        const CHAINING = 1 << 3;
    }
}

const FEATURE_BITS: u32 = u32::BITS;

/// What a registered kind can do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Description {
    /// The drawing style.
    pub style: DrawingStyle,
    /// The supported features.
    pub features: FeatureList,
}

impl Description {
    /// Creates a description.
    pub const fn new(style: DrawingStyle, features: FeatureList) -> Self {
        Self { style, features }
    }

    /// Scores how well this description serves `query`.
    ///
    /// Returns 0 on a style mismatch or when a required feature is missing.
    /// Otherwise every wanted (required or optional) feature the description
    /// has outweighs any number of unwanted extra features, and among equal
    /// matches fewer extras scores higher. An exact match scores highest.
    pub fn match_potential(&self, query: &Query) -> u32 {
        if self.style != query.style || !self.features.contains(query.required) {
            return 0;
        }
        let wanted = query.required | query.optional;
        let matched = (self.features & wanted).bits().count_ones();
        let extra = (self.features - wanted).bits().count_ones();
        1 + matched * (FEATURE_BITS + 1) + (FEATURE_BITS - extra)
    }
}

impl fmt::Display for Description {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}{:?}", self.style, self.features)
    }
}

/// A request for a rendering effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Query {
    /// The style the caller wants.
    pub style: DrawingStyle,
    /// Features the chosen kind must have.
    pub required: FeatureList,
    /// Features the caller would like, in no particular order.
    pub optional: FeatureList,
}

impl Query {
    /// A query for `style` with no feature constraints.
    pub const fn new(style: DrawingStyle) -> Self {
        Self {
            style,
            required: FeatureList::empty(),
            optional: FeatureList::empty(),
        }
    }

    /// Adds required features.
    pub fn require(mut self, features: FeatureList) -> Self {
        self.required |= features;
        self
    }

    /// Adds optional features.
    pub fn prefer(mut self, features: FeatureList) -> Self {
        self.optional |= features;
        self
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?} required={:?} optional={:?}",
            self.style, self.required, self.optional
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [FeatureList; 4] = [
        FeatureList::COLOR,
        FeatureList::TEXTURE,
        FeatureList::SHADOWS,
        FeatureList::CHAINING,
    ];

    fn subsets() -> impl Iterator<Item = FeatureList> {
        (0u32..16).map(FeatureList::from_bits_truncate)
    }

    #[test]
    fn style_mismatch_scores_zero() {
        let description = Description::new(DrawingStyle::Dark, FeatureList::COLOR);
        let query = Query::new(DrawingStyle::Standard).prefer(FeatureList::COLOR);
        assert_eq!(description.match_potential(&query), 0);
    }

    #[test]
    fn missing_required_feature_scores_zero() {
        let description = Description::new(DrawingStyle::Standard, FeatureList::COLOR);
        let query = Query::new(DrawingStyle::Standard).require(FeatureList::TEXTURE);
        assert_eq!(description.match_potential(&query), 0);
    }

    #[test]
    fn adding_a_wanted_optional_feature_never_lowers_the_score() {
        for features in subsets() {
            for required in subsets() {
                for optional in subsets() {
                    let query = Query::new(DrawingStyle::Standard)
                        .require(required)
                        .prefer(optional);
                    let base = Description::new(DrawingStyle::Standard, features);
                    let score = base.match_potential(&query);
                    assert_eq!(score == 0, !features.contains(required));

                    for f in ALL.iter().filter(|f| optional.contains(**f)) {
                        let richer = Description::new(DrawingStyle::Standard, features | *f);
                        assert!(
                            richer.match_potential(&query) >= score,
                            "{features:?} + {f:?} for {query}"
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn exact_match_beats_supersets() {
        let query = Query::new(DrawingStyle::Standard)
            .require(FeatureList::COLOR)
            .prefer(FeatureList::TEXTURE);
        let exact = Description::new(DrawingStyle::Standard, FeatureList::COLOR | FeatureList::TEXTURE);
        let chaining = Description::new(DrawingStyle::Standard, FeatureList::all());
        assert!(exact.match_potential(&query) > chaining.match_potential(&query));
        assert!(chaining.match_potential(&query) > 0);
    }
}
