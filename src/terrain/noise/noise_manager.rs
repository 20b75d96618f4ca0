// src/terrain/noise/noise_manager.rs
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use noise::{NoiseFn, ScalePoint};

use super::noise_parameters::NoiseParameters;
use super::noise_utils::{FractalNoise, RidgeNoise};

pub type SharedNoiseFn = Arc<dyn NoiseFn<f64, 2> + Send + Sync>;

/// The five noise fields sampled per tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NoiseLayer {
    Height,
    Moisture,
    Temperature,
    Ridge,
    Feature,
}

impl NoiseLayer {
    pub const ALL: [NoiseLayer; 5] = [
        NoiseLayer::Height,
        NoiseLayer::Moisture,
        NoiseLayer::Temperature,
        NoiseLayer::Ridge,
        NoiseLayer::Feature,
    ];

    // Seed offset from the world seed
    pub fn seed_offset(self) -> i64 {
        match self {
            NoiseLayer::Height => 0,
            NoiseLayer::Moisture => 1000,
            NoiseLayer::Temperature => 2000,
            NoiseLayer::Ridge => 3000,
            NoiseLayer::Feature => 4000,
        }
    }

    // Frequency multiplier on top of the base scale
    pub fn frequency(self) -> f64 {
        match self {
            NoiseLayer::Height => 1.0,
            NoiseLayer::Moisture => 1.3,
            NoiseLayer::Temperature => 0.8,
            NoiseLayer::Ridge => 0.5,
            NoiseLayer::Feature => 4.0,
        }
    }
}

/// Builds and holds the per-layer noise functions for one (seed, parameters) pair.
/// Cheap to construct, so each worker job builds its own.
#[derive(Clone)]
pub struct NoiseManager {
    seed: i64,
    params: NoiseParameters,
    functions: HashMap<NoiseLayer, SharedNoiseFn>,
}

impl NoiseManager {
    pub fn new(seed: i64, params: &NoiseParameters) -> Self {
        let functions = NoiseLayer::ALL
            .into_iter()
            .map(|layer| (layer, Self::create_layer(layer, seed, params)))
            .collect();
        Self { seed, params: *params, functions }
    }

    fn create_layer(layer: NoiseLayer, seed: i64, params: &NoiseParameters) -> SharedNoiseFn {
        let layer_seed = seed.wrapping_add(layer.seed_offset());
        let frequency = params.scale * layer.frequency();

        match layer {
            NoiseLayer::Ridge => {
                Arc::new(ScalePoint::new(RidgeNoise { seed: layer_seed }).set_scale(frequency))
            }
            _ => {
                let octaves = match layer {
                    NoiseLayer::Height => params.octaves,
                    NoiseLayer::Feature => 2,
                    // moisture and temperature run one octave below the height field
                    _ => params.octaves.saturating_sub(1),
                };
                let fractal = FractalNoise {
                    seed: layer_seed,
                    octaves,
                    lacunarity: params.lacunarity,
                    gain: params.gain,
                };
                Arc::new(ScalePoint::new(fractal).set_scale(frequency))
            }
        }
    }

    pub fn seed(&self) -> i64 {
        self.seed
    }

    pub fn parameters(&self) -> &NoiseParameters {
        &self.params
    }

    pub fn get_noise_function(&self, layer: NoiseLayer) -> Option<SharedNoiseFn> {
        self.functions.get(&layer).cloned()
    }

    // Raw layer value at a world tile coordinate
    pub fn sample(&self, layer: NoiseLayer, world_x: f64, world_y: f64) -> f64 {
        self.functions
            .get(&layer)
            .map_or(0.0, |f| f.get([world_x, world_y]))
    }
}

impl fmt::Debug for NoiseManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NoiseManager")
            .field("seed", &self.seed)
            .field("params", &self.params)
            .field("layers", &self.functions.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_layer_is_registered() {
        let manager = NoiseManager::new(42, &NoiseParameters::default());
        for layer in NoiseLayer::ALL {
            assert!(manager.get_noise_function(layer).is_some(), "missing {layer:?}");
        }
    }

    #[test]
    fn layers_are_decorrelated() {
        let manager = NoiseManager::new(42, &NoiseParameters::default());
        let h = manager.sample(NoiseLayer::Height, 10.0, 20.0);
        let m = manager.sample(NoiseLayer::Moisture, 10.0, 20.0);
        let t = manager.sample(NoiseLayer::Temperature, 10.0, 20.0);
        assert!(h != m || m != t);
    }

    #[test]
    fn single_octave_config_flattens_secondary_fields() {
        let params = NoiseParameters { octaves: 1, ..Default::default() };
        let manager = NoiseManager::new(7, &params);
        assert_eq!(manager.sample(NoiseLayer::Moisture, 3.0, 4.0), 0.0);
        assert_eq!(manager.sample(NoiseLayer::Temperature, 3.0, 4.0), 0.0);
    }
}
