//! Runtime engine options.
//!
//! Timings and tunables for the animation and streaming behavior,
//! loadable from TOML so hosts can tweak them without a rebuild. Every
//! field has a default matching the shipped experience.

use serde::{Deserialize, Serialize};

use crate::error::SphairaError;

/// Tunable engine parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineOptions {
    /// Sphere cross-fade duration in milliseconds.
    pub fade_ms: u64,
    /// Scene-entry orientation flight duration in milliseconds.
    pub entry_flight_ms: u64,
    /// Entry flight duration when animation is disabled.
    pub entry_flight_fast_ms: u64,
    /// Camera recenter (jump-to-annotation) duration in milliseconds.
    pub recenter_ms: u64,
    /// Delay between the thumbnail fade finishing and the tile grid
    /// being requested, in milliseconds.
    pub tile_delay_ms: u64,
    /// Bisection steps for the visibility boundary search.
    pub bisection_steps: u32,
    /// Interocular distance for stereo mode, in world units.
    pub eye_separation: f32,
    /// Degrees of manual rotation per dragged pixel, scaled by the
    /// current field of view over the viewport height.
    pub drag_sensitivity: f32,
    /// Whether the scene-entry flight animation plays at full length.
    pub enable_animation: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            fade_ms: 1000,
            entry_flight_ms: 1300,
            entry_flight_fast_ms: 100,
            recenter_ms: 600,
            tile_delay_ms: 1000,
            bisection_steps: crate::annotation::BISECTION_STEPS,
            eye_separation: crate::camera::DEFAULT_EYE_SEPARATION,
            drag_sensitivity: 1.0,
            enable_animation: true,
        }
    }
}

impl EngineOptions {
    /// Parse options from a TOML string. Missing fields take defaults.
    pub fn from_toml(text: &str) -> Result<Self, SphairaError> {
        toml::from_str(text).map_err(|e| SphairaError::OptionsParse(e.to_string()))
    }

    /// Serialize the options to TOML.
    pub fn to_toml(&self) -> Result<String, SphairaError> {
        toml::to_string_pretty(self).map_err(|e| SphairaError::OptionsParse(e.to_string()))
    }

    /// Effective entry flight duration.
    pub const fn entry_flight_duration_ms(&self) -> u64 {
        if self.enable_animation {
            self.entry_flight_ms
        } else {
            self.entry_flight_fast_ms
        }
    }
}
