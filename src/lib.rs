//! Procedural tile world: deterministic noise terrain split into cached
//! chunks, generated off-thread with a synchronous fallback, plus collision
//! queries against terrain and placed obstacles.

pub mod config;
pub mod physics;
pub mod terrain;
pub mod threading;
pub mod utils;

pub use config::{ConfigurationManager, GameSettings};
pub use physics::{CollisionHit, CollisionResult, NearbyObstacle};
pub use terrain::noise::{NoiseParameters, NoiseParametersPatch};
pub use terrain::{
    ChunkManager, ChunkKey, ChunkState, GenerationHandle, Obstacle, ObstacleId, TileType, WorldConfig, WorldRect,
};
pub use threading::{TaskRunner, WorkerPool, WorkerSettings};
pub use utils::{ConfigError, PoolError, TaskError};
