pub mod biome_manager;
pub mod chunk;
pub mod chunk_manager;
pub mod decoration;
pub mod noise;
pub mod render;
pub mod terrain_config;
pub mod tile;

// Re-export main types for easier access
pub use biome_manager::{classify_tile, synthesize_chunk};
pub use chunk::{BiomeData, Chunk, ChunkKey, ChunkState};
pub use chunk_manager::{ChunkManager, GenerationHandle, WorldRect};
pub use decoration::{decorate_chunk, Obstacle, ObstacleId, ObstacleKind, TreeSpecies};
pub use render::{ArtifactHandle, ChunkRenderer, RenderInput};
pub use terrain_config::{hash_seed, WorldConfig};
pub use tile::TileType;
