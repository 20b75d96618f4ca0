// src/terrain/noise/noise_parameters.rs
use serde::{Deserialize, Serialize};

use crate::utils::ConfigError;

pub const MAX_OCTAVES: u32 = 16;

// --- Main Parameter Struct ---
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseParameters {
    pub scale: f64,
    pub octaves: u32,
    pub lacunarity: f64,
    pub gain: f64,
    pub height_weight: f64,
    pub moisture_weight: f64,
    pub temperature_weight: f64,
}

impl Default for NoiseParameters {
    fn default() -> Self {
        Self {
            scale: 0.02,
            octaves: 4,
            lacunarity: 2.0,
            gain: 0.5,
            height_weight: 1.0,
            moisture_weight: 1.0,
            temperature_weight: 1.0,
        }
    }
}

impl NoiseParameters {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.octaves == 0 || self.octaves > MAX_OCTAVES {
            return Err(ConfigError::InvalidOctaves { got: self.octaves, max: MAX_OCTAVES });
        }
        for (name, value) in [
            ("scale", self.scale),
            ("lacunarity", self.lacunarity),
            ("gain", self.gain),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::NonPositive { name, value });
            }
        }
        for (name, value) in [
            ("height_weight", self.height_weight),
            ("moisture_weight", self.moisture_weight),
            ("temperature_weight", self.temperature_weight),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidWeight { name, value });
            }
        }
        Ok(())
    }

    /// Returns the merged parameters without touching `self`; callers validate
    /// before swapping them in.
    pub fn merged(&self, patch: &NoiseParametersPatch) -> Self {
        Self {
            scale: patch.scale.unwrap_or(self.scale),
            octaves: patch.octaves.unwrap_or(self.octaves),
            lacunarity: patch.lacunarity.unwrap_or(self.lacunarity),
            gain: patch.gain.unwrap_or(self.gain),
            height_weight: patch.height_weight.unwrap_or(self.height_weight),
            moisture_weight: patch.moisture_weight.unwrap_or(self.moisture_weight),
            temperature_weight: patch.temperature_weight.unwrap_or(self.temperature_weight),
        }
    }
}

/// Partial update for `set_noise_config`; `None` keeps the current value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseParametersPatch {
    pub scale: Option<f64>,
    pub octaves: Option<u32>,
    pub lacunarity: Option<f64>,
    pub gain: Option<f64>,
    pub height_weight: Option<f64>,
    pub moisture_weight: Option<f64>,
    pub temperature_weight: Option<f64>,
}
