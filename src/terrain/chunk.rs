use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::terrain::decoration::Obstacle;
use crate::terrain::render::ArtifactHandle;
use crate::terrain::tile::TileType;

// Unique identifier for a chunk based on its position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChunkKey {
    pub cx: i32,
    pub cy: i32,
}

impl ChunkKey {
    pub fn new(cx: i32, cy: i32) -> Self {
        ChunkKey { cx, cy }
    }

    /// max(|dx|, |dy|)
    pub fn chebyshev_distance(&self, other: ChunkKey) -> u32 {
        let dx = (i64::from(self.cx) - i64::from(other.cx)).unsigned_abs();
        let dy = (i64::from(self.cy) - i64::from(other.cy)).unsigned_abs();
        dx.max(dy).min(u64::from(u32::MAX)) as u32
    }

    pub fn offset(&self, dx: i32, dy: i32) -> ChunkKey {
        ChunkKey::new(self.cx.wrapping_add(dx), self.cy.wrapping_add(dy))
    }
}

impl fmt::Display for ChunkKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.cx, self.cy)
    }
}

/// Per-tile scalar fields, row-major like the tile grid.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BiomeData {
    pub height: Vec<f32>,
    pub moisture: Vec<f32>,
    pub temperature: Vec<f32>,
}

impl BiomeData {
    pub fn zeroed(len: usize) -> Self {
        BiomeData {
            height: vec![0.0; len],
            moisture: vec![0.0; len],
            temperature: vec![0.0; len],
        }
    }

    pub fn with_capacity(len: usize) -> Self {
        BiomeData {
            height: Vec::with_capacity(len),
            moisture: Vec::with_capacity(len),
            temperature: Vec::with_capacity(len),
        }
    }

    pub fn len(&self) -> usize {
        self.height.len()
    }

    pub fn is_empty(&self) -> bool {
        self.height.is_empty()
    }

    // All three fields share one length
    pub fn is_consistent(&self, expected: usize) -> bool {
        self.height.len() == expected
            && self.moisture.len() == expected
            && self.temperature.len() == expected
    }
}

// absent -> Placeholder -> Generating -> Complete; Complete -> absent on eviction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChunkState {
    Placeholder,
    Generating,
    Complete,
}

/// A cached chunk. Terrain data never changes once the chunk is complete;
/// a new generation always produces a new `Chunk`.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub key: ChunkKey,
    pub state: ChunkState,
    pub chunk_size: u32,
    pub tiles: Vec<TileType>,
    pub biome: BiomeData,
    pub obstacles: Arc<Vec<Obstacle>>,
    pub generated_at: Option<DateTime<Utc>>,
    pub sequence: u64,
    pub artifact: Option<ArtifactHandle>,
}

impl Chunk {
    // Default grass grid with zeroed fields, shown until generation lands
    pub fn placeholder(key: ChunkKey, chunk_size: u32, state: ChunkState) -> Self {
        let len = (chunk_size as usize) * (chunk_size as usize);
        Chunk {
            key,
            state,
            chunk_size,
            tiles: vec![TileType::default(); len],
            biome: BiomeData::zeroed(len),
            obstacles: Arc::new(Vec::new()),
            generated_at: None,
            sequence: 0,
            artifact: None,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.state == ChunkState::Complete
    }

    pub fn index(&self, tx: u32, ty: u32) -> usize {
        (ty as usize) * (self.chunk_size as usize) + tx as usize
    }

    pub fn tile(&self, tx: u32, ty: u32) -> TileType {
        if tx >= self.chunk_size || ty >= self.chunk_size {
            return TileType::default();
        }
        self.tiles.get(self.index(tx, ty)).copied().unwrap_or_default()
    }
}
