use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::terrain::chunk_manager::ChunkManager;
use crate::terrain::noise::NoiseParameters;
use crate::terrain::render::ChunkRenderer;
use crate::terrain::terrain_config::{WorldConfig, DEFAULT_CHUNK_SIZE, DEFAULT_SEED, DEFAULT_TILE_SIZE};
use crate::threading::{TaskRunner, WorkerPool, WorkerSettings};
use crate::utils::ConfigError;

pub const DEFAULT_CHUNK_CACHE_SIZE: usize = 400;

fn default_seed() -> String {
    DEFAULT_SEED.to_string()
}

fn default_chunk_size() -> u32 {
    DEFAULT_CHUNK_SIZE
}

fn default_tile_size() -> u32 {
    DEFAULT_TILE_SIZE
}

fn default_chunk_cache_size() -> usize {
    DEFAULT_CHUNK_CACHE_SIZE
}

// [world]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldSettings {
    #[serde(default = "default_seed")]
    pub seed: String,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: u32,
    #[serde(default = "default_tile_size")]
    pub tile_size: u32,
}

impl Default for WorldSettings {
    fn default() -> Self {
        WorldSettings {
            seed: default_seed(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            tile_size: DEFAULT_TILE_SIZE,
        }
    }
}

// [cache]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheSettings {
    /// 0 = unbounded
    #[serde(default = "default_chunk_cache_size")]
    pub chunk_cache_size: usize,
}

impl Default for CacheSettings {
    fn default() -> Self {
        CacheSettings { chunk_cache_size: DEFAULT_CHUNK_CACHE_SIZE }
    }
}

/// Everything the settings file can carry. Missing sections take defaults.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GameSettings {
    #[serde(default)]
    pub world: WorldSettings,
    #[serde(default)]
    pub noise: NoiseParameters,
    #[serde(default)]
    pub workers: WorkerSettings,
    #[serde(default)]
    pub cache: CacheSettings,
}

impl GameSettings {
    pub fn world_config(&self) -> Result<WorldConfig, ConfigError> {
        WorldConfig::new(self.world.chunk_size, self.world.tile_size, &self.world.seed, self.noise)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.world_config().map(|_| ())
    }

    /// Builds a manager backed by a fresh worker pool sized from `[workers]`.
    pub fn build_chunk_manager(
        &self,
        renderer: Option<Arc<dyn ChunkRenderer>>,
    ) -> Result<ChunkManager, ConfigError> {
        let config = self.world_config()?;
        let pool: Arc<dyn TaskRunner> = Arc::new(WorkerPool::new(&self.workers)?);
        Ok(ChunkManager::new(config, Some(pool), renderer, self.cache.chunk_cache_size))
    }
}

fn is_json(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

/// Loads, holds and saves `GameSettings`. TOML by default, JSON for `.json` paths.
#[derive(Debug, Default)]
pub struct ConfigurationManager {
    current_config: GameSettings,
    config_path: Option<PathBuf>,
}

impl ConfigurationManager {
    pub fn with_config(config: GameSettings, config_path: Option<PathBuf>) -> Self {
        ConfigurationManager { current_config: config, config_path }
    }

    pub fn parse(contents: &str, json: bool) -> Result<GameSettings, ConfigError> {
        let settings: GameSettings = if json {
            serde_json::from_str(contents)?
        } else {
            toml::from_str(contents)?
        };
        settings.validate()?;
        Ok(settings)
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        info!(path = %path.display(), "loading settings");
        let contents = fs::read_to_string(path)?;
        let config = Self::parse(&contents, is_json(path)).inspect_err(|error| {
            warn!(path = %path.display(), %error, "rejected settings file");
        })?;

        Ok(ConfigurationManager { current_config: config, config_path: Some(path.to_path_buf()) })
    }

    // Falls back to defaults when the file is missing or broken.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        match Self::load_from_file(path) {
            Ok(manager) => manager,
            Err(error) => {
                warn!(path = %path.display(), %error, "using default settings");
                ConfigurationManager { current_config: GameSettings::default(), config_path: Some(path.to_path_buf()) }
            }
        }
    }

    pub fn save_to_file(&self) -> Result<(), ConfigError> {
        let path = self.config_path.as_ref().ok_or(ConfigError::NoPath)?;
        let contents = if is_json(path) {
            serde_json::to_string_pretty(&self.current_config)?
        } else {
            toml::to_string_pretty(&self.current_config)?
        };
        fs::write(path, contents)?;
        info!(path = %path.display(), "saved settings");
        Ok(())
    }

    pub fn set_config_path<P: AsRef<Path>>(&mut self, path: P) {
        self.config_path = Some(path.as_ref().to_path_buf());
    }

    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    /// Replaces the settings if they validate.
    pub fn update_config(&mut self, updates: GameSettings) -> Result<(), ConfigError> {
        updates.validate()?;
        self.current_config = updates;
        Ok(())
    }

    pub fn get_config(&self) -> &GameSettings {
        &self.current_config
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.current_config.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_sections_take_defaults() {
        let settings = ConfigurationManager::parse("[world]\nseed = \"abc\"\n", false).unwrap();
        assert_eq!(settings.world.seed, "abc");
        assert_eq!(settings.world.chunk_size, DEFAULT_CHUNK_SIZE);
        assert_eq!(settings.noise, NoiseParameters::default());
        assert_eq!(settings.cache.chunk_cache_size, DEFAULT_CHUNK_CACHE_SIZE);
        assert_eq!(settings.workers.job_timeout_ms, 5000);
        assert_eq!(settings.world_config().unwrap().numeric_seed(), 96354);
    }

    #[test]
    fn bad_values_are_rejected_at_load() {
        let err = ConfigurationManager::parse("[world]\nchunk_size = 0\n", false).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidChunkSize { .. }));

        let err = ConfigurationManager::parse("[noise]\noctaves = 0\n", false).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidOctaves { .. }));

        let err = ConfigurationManager::parse("not = [valid", false).unwrap_err();
        assert!(matches!(err, ConfigError::Toml(_)));
    }

    #[test]
    fn json_is_accepted() {
        let json = r#"{ "world": { "seed": "test-seed", "chunk_size": 16 }, "noise": { "scale": 0.015 } }"#;
        let settings = ConfigurationManager::parse(json, true).unwrap();
        assert_eq!(settings.noise.scale, 0.015);
        assert_eq!(settings.noise.octaves, NoiseParameters::default().octaves);
    }

    #[test]
    fn toml_round_trip_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("world.toml");

        let mut settings = GameSettings::default();
        settings.world.seed = "saved".to_string();
        settings.cache.chunk_cache_size = 64;
        let manager = ConfigurationManager::with_config(settings.clone(), Some(path.clone()));
        manager.save_to_file().unwrap();

        let loaded = ConfigurationManager::load_from_file(&path).unwrap();
        assert_eq!(loaded.get_config(), &settings);
        assert_eq!(loaded.config_path(), Some(path.as_path()));
    }

    #[test]
    fn json_path_saves_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("world.json");
        let manager = ConfigurationManager::with_config(GameSettings::default(), Some(path.clone()));
        manager.save_to_file().unwrap();
        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.trim_start().starts_with('{'));
        assert!(ConfigurationManager::load_from_file(&path).is_ok());
    }

    #[test]
    fn save_without_path_fails() {
        let manager = ConfigurationManager::default();
        assert!(matches!(manager.save_to_file(), Err(ConfigError::NoPath)));
    }

    #[test]
    fn missing_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ConfigurationManager::load_or_default(dir.path().join("absent.toml"));
        assert_eq!(manager.get_config(), &GameSettings::default());
    }

    #[test]
    fn update_rejects_invalid_settings() {
        let mut manager = ConfigurationManager::default();
        let mut bad = GameSettings::default();
        bad.world.tile_size = 0;
        assert!(manager.update_config(bad).is_err());
        assert_eq!(manager.get_config(), &GameSettings::default());
    }

    #[test]
    fn settings_build_a_threaded_manager() {
        let mut settings = GameSettings::default();
        settings.workers.max_threads = 1;
        let manager = settings.build_chunk_manager(None).unwrap();
        assert_eq!(manager.runner_stats().map(|s| s.max_workers), Some(1));
        let handle = manager.generate_async(0, 0);
        assert!(manager.wait_for(&handle).is_complete());
    }
}
