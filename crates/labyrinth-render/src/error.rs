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

//! Error types of the render-details core.
//!
//! Every variant is fatal for the operation that raised it: they describe
//! programming or configuration mistakes, or a device that refused to create a
//! resource. Descriptor-pool exhaustion never surfaces here because pools grow
//! on demand.

use crate::details::Query;
use crate::drawer::{DrawObjDataReference, DrawObjReference};
use labyrinth_core::renderer::{RenderError, ResourceError};
use thiserror::Error;

/// Errors raised while resolving, loading or using render details.
#[derive(Debug, Error)]
pub enum DetailsError {
    /// No registered kind scores above zero for the query.
    #[error("no registered render details match query {query}")]
    RenderDetailsNotRegistered {
        /// The query that could not be served.
        query: Query,
    },

    /// A kind or common object data received a parameters variant it does not accept.
    #[error("expected {expected} parameters, got {found}")]
    ParametersMismatch {
        /// The variant the receiver accepts.
        expected: &'static str,
        /// The variant it was given.
        found: &'static str,
    },

    /// A kind was asked to draw with common object data built by another kind.
    #[error("render details '{kind}' cannot use {found} common object data")]
    CommonObjectDataMismatch {
        /// The kind that was drawing.
        kind: &'static str,
        /// The variant it was given.
        found: &'static str,
    },

    /// The parameters have the right variant but unusable contents.
    #[error("invalid parameters for '{kind}': {reason}")]
    InvalidParameters {
        /// The kind or data that rejected them.
        kind: &'static str,
        /// Why.
        reason: String,
    },

    /// A cached instance was handed to the functions of a different kind.
    #[error("cached render details are not a '{expected}' instance")]
    KindMismatch {
        /// The kind whose functions were called.
        expected: &'static str,
    },

    /// A composite kind resolved one of its parts to a kind that is already loading.
    #[error("render details '{kind}' resolves to itself while loading")]
    CyclicComposition {
        /// The kind reached twice.
        kind: &'static str,
    },

    /// A draw object data has no descriptor set under the id a pass asked for.
    #[error("render details '{kind}' needs descriptor set {id}, which the draw object data lacks")]
    MissingDescriptorSet {
        /// The drawing kind.
        kind: &'static str,
        /// The requested set id.
        id: u32,
    },

    /// The kind cannot render into a CPU-readable buffer.
    #[error("render details '{kind}' does not support rendering to a buffer")]
    ReadbackUnsupported {
        /// The kind.
        kind: &'static str,
    },

    /// The device failed to create or update a resource.
    #[error(transparent)]
    Resource(#[from] ResourceError),
}

/// Errors raised by draw-object tables and the level drawer.
#[derive(Debug, Error)]
pub enum DrawerError {
    /// An object without its own render details was added before the table's
    /// default render details were requested.
    #[error("the table's default render details have not been requested")]
    DefaultRenderDetailsNotSet,

    /// The draw object does not exist in the table.
    #[error("invalid draw object reference {0:?}")]
    InvalidDrawObjReference(DrawObjReference),

    /// The draw object exists but does not hold the draw object data.
    #[error("invalid draw object data reference {data:?} for {obj:?}")]
    InvalidDrawObjDataReference {
        /// The owning object.
        obj: DrawObjReference,
        /// The missing data.
        data: DrawObjDataReference,
    },

    /// A z-value reference for the pair was already present.
    #[error("duplicate z-value reference for {obj:?}/{data:?}")]
    DuplicateZValueReference {
        /// The object.
        obj: DrawObjReference,
        /// The data.
        data: DrawObjDataReference,
    },

    /// The depth order lost track of a live placement.
    #[error("missing z-value reference for {obj:?}/{data:?}")]
    MissingZValueReference {
        /// The object.
        obj: DrawObjReference,
        /// The data.
        data: DrawObjDataReference,
    },

    /// Loading or using render details failed.
    #[error(transparent)]
    Details(#[from] DetailsError),

    /// The device failed to create or update a resource.
    #[error(transparent)]
    Resource(#[from] ResourceError),

    /// Submitting recorded commands failed.
    #[error(transparent)]
    Render(#[from] RenderError),

    /// The drawer configuration is invalid or could not be read.
    #[error("invalid drawer configuration: {0}")]
    Config(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::details::DrawingStyle;
    use std::error::Error;

    #[test]
    fn unregistered_query_names_the_query() {
        let err = DetailsError::RenderDetailsNotRegistered {
            query: Query::new(DrawingStyle::DepthMap),
        };
        assert!(err.to_string().contains("DepthMap"));
    }

    #[test]
    fn resource_errors_stay_transparent_through_both_layers() {
        let err: DrawerError = DetailsError::from(ResourceError::OutOfBounds).into();
        assert_eq!(err.to_string(), "Resource access out of bounds.");
        assert!(err.source().is_none());
    }
}
