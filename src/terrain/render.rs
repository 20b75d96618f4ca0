use std::fmt;

use serde::{Deserialize, Serialize};

use crate::terrain::chunk::{BiomeData, ChunkKey};
use crate::terrain::decoration::Obstacle;
use crate::terrain::tile::TileType;

/// Opaque handle to whatever a renderer produced for a chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArtifactHandle(pub u64);

impl fmt::Display for ArtifactHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "artifact#{}", self.0)
    }
}

/// Everything a renderer gets to see of a finished chunk.
#[derive(Debug, Clone, Copy)]
pub struct RenderInput<'a> {
    pub key: ChunkKey,
    pub chunk_size: u32,
    pub tile_size: u32,
    pub tiles: &'a [TileType],
    pub biome: &'a BiomeData,
    pub obstacles: &'a [Obstacle],
}

// Consumer of completed chunk data. The manager only cares whether a handle
// came back and hands it back on eviction.
pub trait ChunkRenderer: Send + Sync {
    fn render(&self, input: &RenderInput<'_>) -> Option<ArtifactHandle>;

    fn release(&self, artifact: ArtifactHandle);
}
