use std::io;
use thiserror::Error;

/// Configuration problems are caught when the config is built or changed,
/// never halfway through generating a chunk.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("chunk size must be between 1 and {max}, got {got}")]
    InvalidChunkSize { got: u32, max: u32 },

    #[error("tile size must be between 1 and {max}, got {got}")]
    InvalidTileSize { got: u32, max: u32 },

    #[error("octave count must be between 1 and {max}, got {got}")]
    InvalidOctaves { got: u32, max: u32 },

    #[error("noise parameter `{name}` must be finite and positive, got {value}")]
    NonPositive { name: &'static str, value: f64 },

    #[error("noise weight `{name}` must be finite and non-negative, got {value}")]
    InvalidWeight { name: &'static str, value: f64 },

    #[error("failed to read settings file: {0}")]
    Io(#[from] io::Error),

    #[error("failed to parse TOML settings: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("failed to write TOML settings: {0}")]
    TomlWrite(#[from] toml::ser::Error),

    #[error("failed to parse JSON settings: {0}")]
    Json(#[from] serde_json::Error),

    #[error("cannot save settings: no file path set")]
    NoPath,

    #[error(transparent)]
    Pool(#[from] PoolError),
}

/// Outcome of a generation job that did not produce a usable result.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskError {
    #[error("job queue is full")]
    QueueFull,

    #[error("job exceeded its timeout")]
    Timeout,

    #[error("task runner has been terminated")]
    Terminated,

    #[error("worker panicked: {0}")]
    Panicked(String),

    #[error("worker dropped the job without replying")]
    Aborted,

    #[error("worker returned a malformed result: {0}")]
    InvalidResult(String),
}

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("failed to build worker pool: {0}")]
    Build(#[from] rayon::ThreadPoolBuildError),

    #[error("global worker pool already initialized")]
    AlreadyInitialized,
}
