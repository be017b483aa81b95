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

use crate::error::DrawerError;
use labyrinth_core::renderer::MAX_FRAMES_IN_FLIGHT;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Tuning of the render-details loader and the kinds it builds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderDetailsConfig {
    /// How many kinds keep a live cached instance.
    pub cache_capacity: usize,
    /// Descriptor sets per device pool.
    pub descriptor_pool_size: u32,
    /// Shadow map size relative to the surface, for standard levels.
    pub shadows_size_multiplier: f32,
    /// Shadow map size relative to the surface width, for dark levels.
    pub dark_shadows_size_multiplier: f32,
}

impl Default for RenderDetailsConfig {
    fn default() -> Self {
        Self {
            cache_capacity: 5,
            descriptor_pool_size: 32,
            shadows_size_multiplier: 0.5,
            dark_shadows_size_multiplier: 0.25,
        }
    }
}

/// Configuration of a [`LevelDrawer`](crate::LevelDrawer).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DrawerConfig {
    /// Loader and kind tuning.
    pub render_details: RenderDetailsConfig,
    /// The color the main pass clears to.
    pub clear_color: [f32; 4],
    /// Uniform slots per common object data. Values below one are treated as one.
    pub frames_in_flight: usize,
}

impl Default for DrawerConfig {
    fn default() -> Self {
        Self {
            render_details: RenderDetailsConfig::default(),
            clear_color: [0.0, 0.0, 0.0, 1.0],
            frames_in_flight: MAX_FRAMES_IN_FLIGHT,
        }
    }
}

impl DrawerConfig {
    /// Load the configuration from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, DrawerError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| DrawerError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load the configuration from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, DrawerError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| DrawerError::Config(format!("{}: {e}", path.display())))?;
        Self::from_json(&content)
    }

    /// Save the configuration to a JSON file.
    pub fn to_file(&self, path: impl AsRef<Path>) -> Result<(), DrawerError> {
        let json =
            serde_json::to_string_pretty(self).map_err(|e| DrawerError::Config(e.to_string()))?;
        std::fs::write(path.as_ref(), json)
            .map_err(|e| DrawerError::Config(format!("{}: {e}", path.as_ref().display())))
    }

    /// Rejects settings the loader cannot work with.
    pub fn validate(&self) -> Result<(), DrawerError> {
        let details = &self.render_details;
        if details.cache_capacity == 0 {
            return Err(DrawerError::Config(
                "cache_capacity must be at least 1".to_string(),
            ));
        }
        if details.descriptor_pool_size == 0 {
            return Err(DrawerError::Config(
                "descriptor_pool_size must be at least 1".to_string(),
            ));
        }
        for (name, value) in [
            ("shadows_size_multiplier", details.shadows_size_multiplier),
            (
                "dark_shadows_size_multiplier",
                details.dark_shadows_size_multiplier,
            ),
        ] {
            if !(value > 0.0 && value <= 1.0) {
                return Err(DrawerError::Config(format!(
                    "{name} must be in (0, 1], got {value}"
                )));
            }
        }
        Ok(())
    }

    /// The number of uniform slots, never below one.
    pub fn frames_in_flight(&self) -> usize {
        self.frames_in_flight.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let config = DrawerConfig::from_json(r#"{ "render_details": { "cache_capacity": 3 } }"#)
            .unwrap();
        assert_eq!(config.render_details.cache_capacity, 3);
        assert_eq!(config.render_details.descriptor_pool_size, 32);
        assert_eq!(config.frames_in_flight, MAX_FRAMES_IN_FLIGHT);
        assert_eq!(config.clear_color, [0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let err = DrawerConfig::from_json(r#"{ "render_details": { "cache_capacity": 0 } }"#)
            .unwrap_err();
        assert!(matches!(err, DrawerError::Config(_)));
    }

    #[test]
    fn multipliers_outside_unit_interval_are_rejected() {
        let mut config = DrawerConfig::default();
        config.render_details.shadows_size_multiplier = 1.5;
        assert!(config.validate().is_err());
        config.render_details.shadows_size_multiplier = 0.0;
        assert!(config.validate().is_err());
        config.render_details.shadows_size_multiplier = 1.0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn frames_in_flight_is_clamped() {
        let config = DrawerConfig {
            frames_in_flight: 0,
            ..DrawerConfig::default()
        };
        assert_eq!(config.frames_in_flight(), 1);
    }

    #[test]
    fn file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("drawer.json");
        let mut config = DrawerConfig::default();
        config.clear_color = [0.2, 0.3, 0.4, 1.0];
        config.render_details.cache_capacity = 7;
        config.to_file(&path).unwrap();
        assert_eq!(DrawerConfig::from_file(&path).unwrap(), config);
    }

    #[test]
    fn unreadable_file_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = DrawerConfig::from_file(dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, DrawerError::Config(_)));
    }
}
