use serde::{Deserialize, Serialize};

use crate::terrain::noise::{NoiseParameters, NoiseParametersPatch};
use crate::utils::ConfigError;

pub const MAX_CHUNK_SIZE: u32 = 256;
pub const MAX_TILE_SIZE: u32 = 1024;

pub const DEFAULT_CHUNK_SIZE: u32 = 16;
pub const DEFAULT_TILE_SIZE: u32 = 32;
pub const DEFAULT_SEED: &str = "default";

/// Numeric seed for a seed string: 31-multiplier hash over UTF-16 units,
/// wrapped to 32 bits, absolute value.
pub fn hash_seed(seed: &str) -> i64 {
    let h = seed
        .encode_utf16()
        .fold(0i32, |h, unit| h.wrapping_mul(31).wrapping_add(i32::from(unit)));
    i64::from(h).abs()
}

// World generation configuration. Immutable once handed to a ChunkManager,
// except through set_seed / set_noise_config which also wipe all cached state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "WorldConfigRaw")]
pub struct WorldConfig {
    chunk_size: u32,
    tile_size: u32,
    seed: String,
    #[serde(skip_serializing)]
    numeric_seed: i64,
    noise: NoiseParameters,
}

// Wire form. The numeric seed is always derived, never trusted from input.
#[derive(Deserialize)]
struct WorldConfigRaw {
    chunk_size: u32,
    tile_size: u32,
    seed: String,
    #[serde(default)]
    noise: NoiseParameters,
}

impl TryFrom<WorldConfigRaw> for WorldConfig {
    type Error = ConfigError;

    fn try_from(raw: WorldConfigRaw) -> Result<Self, Self::Error> {
        WorldConfig::new(raw.chunk_size, raw.tile_size, &raw.seed, raw.noise)
    }
}

impl Default for WorldConfig {
    fn default() -> Self {
        WorldConfig {
            chunk_size: DEFAULT_CHUNK_SIZE,
            tile_size: DEFAULT_TILE_SIZE,
            seed: DEFAULT_SEED.to_string(),
            numeric_seed: hash_seed(DEFAULT_SEED),
            noise: NoiseParameters::default(),
        }
    }
}

impl WorldConfig {
    pub fn new(
        chunk_size: u32,
        tile_size: u32,
        seed: &str,
        noise: NoiseParameters,
    ) -> Result<Self, ConfigError> {
        let config = WorldConfig {
            chunk_size,
            tile_size,
            seed: seed.to_string(),
            numeric_seed: hash_seed(seed),
            noise,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_size == 0 || self.chunk_size > MAX_CHUNK_SIZE {
            return Err(ConfigError::InvalidChunkSize { got: self.chunk_size, max: MAX_CHUNK_SIZE });
        }
        if self.tile_size == 0 || self.tile_size > MAX_TILE_SIZE {
            return Err(ConfigError::InvalidTileSize { got: self.tile_size, max: MAX_TILE_SIZE });
        }
        self.noise.validate()
    }

    // Tiles per chunk side
    pub fn chunk_size(&self) -> u32 {
        self.chunk_size
    }

    // Pixel size of a tile
    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }

    pub fn seed(&self) -> &str {
        &self.seed
    }

    pub fn numeric_seed(&self) -> i64 {
        self.numeric_seed
    }

    pub fn noise(&self) -> &NoiseParameters {
        &self.noise
    }

    // World pixels covered by one chunk side
    pub fn chunk_world_size(&self) -> f64 {
        f64::from(self.chunk_size) * f64::from(self.tile_size)
    }

    pub(crate) fn set_seed(&mut self, seed: &str) {
        self.seed = seed.to_string();
        self.numeric_seed = hash_seed(seed);
    }

    // Validates the merged parameters first; on error nothing changes.
    pub(crate) fn apply_noise_patch(&mut self, patch: &NoiseParametersPatch) -> Result<(), ConfigError> {
        let merged = self.noise.merged(patch);
        merged.validate()?;
        self.noise = merged;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_hash_matches_java_string_hash() {
        // "abc".hashCode() == 96354
        assert_eq!(hash_seed("abc"), 96354);
        assert_eq!(hash_seed(""), 0);
        assert_eq!(hash_seed("test-seed"), hash_seed("test-seed"));
        assert_ne!(hash_seed("test-seed"), hash_seed("other"));
    }

    #[test]
    fn seed_hash_is_never_negative() {
        for s in ["polygenelubricants", "zzzzzzzzzzzz", "a much longer seed string with spaces"] {
            assert!(hash_seed(s) >= 0);
        }
    }

    #[test]
    fn rejects_zero_chunk_size() {
        let err = WorldConfig::new(0, 32, "x", NoiseParameters::default()).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidChunkSize { got: 0, .. }));
    }

    #[test]
    fn rejects_oversized_tiles() {
        let err = WorldConfig::new(16, MAX_TILE_SIZE + 1, "x", NoiseParameters::default()).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidTileSize { .. }));
    }

    #[test]
    fn invalid_patch_leaves_config_untouched() {
        let mut config = WorldConfig::default();
        let before = config.clone();
        let patch = NoiseParametersPatch { octaves: Some(0), ..Default::default() };
        assert!(config.apply_noise_patch(&patch).is_err());
        assert_eq!(config, before);
    }

    #[test]
    fn set_seed_rehashes() {
        let mut config = WorldConfig::default();
        config.set_seed("other");
        assert_eq!(config.seed(), "other");
        assert_eq!(config.numeric_seed(), hash_seed("other"));
    }

    #[test]
    fn deserialized_config_keeps_its_numeric_seed() {
        let config = WorldConfig::new(16, 32, "test-seed", NoiseParameters::default()).unwrap();
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("numeric_seed"));

        let back: WorldConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.numeric_seed(), hash_seed("test-seed"));
        assert_eq!(back, config);

        let other: WorldConfig = serde_json::from_str(&json.replace("test-seed", "totally-different")).unwrap();
        assert_ne!(other.numeric_seed(), config.numeric_seed());
    }

    #[test]
    fn deserializing_rejects_invalid_sizes() {
        let json = r#"{ "chunk_size": 0, "tile_size": 32, "seed": "x" }"#;
        assert!(serde_json::from_str::<WorldConfig>(json).is_err());

        let json = r#"{ "chunk_size": 16, "tile_size": 32, "seed": "x", "noise": { "octaves": 0 } }"#;
        assert!(serde_json::from_str::<WorldConfig>(json).is_err());
    }
}
