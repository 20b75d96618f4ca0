// Decoration pass: places trees, buildings and ruins on a finished tile grid.
//
// The RNG is rebuilt from (seed, cx, cy) on every call, so the result depends
// only on the chunk, never on the order chunks were generated in.

use std::fmt;

use glam::DVec2;
use serde::{Deserialize, Serialize};

use crate::terrain::chunk::{BiomeData, ChunkKey};
use crate::terrain::tile::TileType;

const CHUNK_SEED_X: i64 = 131;
const CHUNK_SEED_Y: i64 = 197;

const FOREST_TREE_CHANCE: f64 = 0.3;
const PINE_CUTOFF: f64 = 0.1;
const BIRCH_CUTOFF: f64 = 0.2;
const GRASS_TREE_CHANCE: f64 = 0.05;
const GRASS_TREE_MIN_MOISTURE: f64 = 0.5;
const BUILDING_CHANCE: f64 = 0.15;
const RUIN_CHANCE: f64 = 0.1;

const TREE_RADIUS_FACTOR: f64 = 0.4;

/// mulberry32 over a 32-bit state.
#[derive(Debug, Clone)]
pub struct ChunkRng {
    state: u32,
}

impl ChunkRng {
    pub fn new(seed: u32) -> Self {
        ChunkRng { state: seed }
    }

    pub fn for_chunk(base_seed: i64, key: ChunkKey) -> Self {
        let seed = base_seed
            .wrapping_add(i64::from(key.cx).wrapping_mul(CHUNK_SEED_X))
            .wrapping_add(i64::from(key.cy).wrapping_mul(CHUNK_SEED_Y));
        // truncation keeps the low 32 bits
        ChunkRng::new(seed as u32)
    }

    pub fn next_u32(&mut self) -> u32 {
        self.state = self.state.wrapping_add(0x6D2B_79F5);
        let mut t = self.state;
        t = (t ^ (t >> 15)).wrapping_mul(t | 1);
        t ^= t.wrapping_add((t ^ (t >> 7)).wrapping_mul(t | 61));
        t ^ (t >> 14)
    }

    /// Next draw in `[0, 1)`.
    pub fn next_f64(&mut self) -> f64 {
        f64::from(self.next_u32()) / 4_294_967_296.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TreeSpecies {
    Pine,
    Birch,
    Oak,
}

impl TreeSpecies {
    // (canopy, height) in tiles at age factor 1
    fn base_size(self) -> (f64, f64) {
        match self {
            TreeSpecies::Pine => (0.8, 1.6),
            TreeSpecies::Birch => (0.9, 1.4),
            TreeSpecies::Oak => (1.2, 1.3),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObstacleKind {
    Tree(TreeSpecies),
    Building,
    Ruin,
}

impl ObstacleKind {
    pub fn category(&self) -> &'static str {
        match self {
            ObstacleKind::Tree(_) => "tree",
            ObstacleKind::Building => "building",
            ObstacleKind::Ruin => "ruin",
        }
    }
}

/// Chunk key plus local tile coordinate; stable across regenerations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObstacleId {
    pub chunk: ChunkKey,
    pub tx: u32,
    pub ty: u32,
}

impl fmt::Display for ObstacleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{},{}", self.chunk, self.tx, self.ty)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Obstacle {
    pub id: ObstacleId,
    pub kind: ObstacleKind,
    /// World-space centre, in pixels.
    pub position: DVec2,
    pub width: f64,
    pub height: f64,
    pub collision_radius: f64,
}

impl Obstacle {
    // Only trees block movement; buildings and ruins are scenery.
    pub fn is_collidable(&self) -> bool {
        matches!(self.kind, ObstacleKind::Tree(_))
    }

    pub fn category(&self) -> &'static str {
        self.kind.category()
    }
}

fn tile_centre(key: ChunkKey, chunk_size: u32, tile_size: u32, tx: u32, ty: u32) -> DVec2 {
    let size = i64::from(chunk_size);
    let wx = i64::from(key.cx) * size + i64::from(tx);
    let wy = i64::from(key.cy) * size + i64::from(ty);
    let ts = f64::from(tile_size);
    DVec2::new((wx as f64 + 0.5) * ts, (wy as f64 + 0.5) * ts)
}

fn make_tree(id: ObstacleId, species: TreeSpecies, position: DVec2, tile_size: f64, age_roll: f64) -> Obstacle {
    let age = 0.6 + 0.8 * age_roll;
    let (base_canopy, base_height) = species.base_size();
    let canopy = tile_size * base_canopy * age;
    let height = tile_size * base_height * age;
    Obstacle {
        id,
        kind: ObstacleKind::Tree(species),
        position,
        width: canopy,
        height,
        collision_radius: TREE_RADIUS_FACTOR * canopy.max(height),
    }
}

fn make_structure(id: ObstacleId, kind: ObstacleKind, position: DVec2, tile_size: f64) -> Obstacle {
    let (width, height) = match kind {
        ObstacleKind::Building => (2.0 * tile_size, 1.5 * tile_size),
        _ => (1.5 * tile_size, tile_size),
    };
    Obstacle { id, kind, position, width, height, collision_radius: 0.0 }
}

/// Walks the grid row-major and returns every decoration for the chunk,
/// collidable or not.
pub fn decorate_chunk(
    key: ChunkKey,
    chunk_size: u32,
    tile_size: u32,
    base_seed: i64,
    tiles: &[TileType],
    biome: &BiomeData,
) -> Vec<Obstacle> {
    let mut rng = ChunkRng::for_chunk(base_seed, key);
    let ts = f64::from(tile_size);
    let mut obstacles = Vec::new();

    for ty in 0..chunk_size {
        for tx in 0..chunk_size {
            let idx = (ty as usize) * (chunk_size as usize) + tx as usize;
            let Some(&tile) = tiles.get(idx) else { continue };
            let id = ObstacleId { chunk: key, tx, ty };

            match tile {
                TileType::Forest => {
                    let roll = rng.next_f64();
                    if roll < FOREST_TREE_CHANCE {
                        let species = if roll < PINE_CUTOFF {
                            TreeSpecies::Pine
                        } else if roll < BIRCH_CUTOFF {
                            TreeSpecies::Birch
                        } else {
                            TreeSpecies::Oak
                        };
                        let position = tile_centre(key, chunk_size, tile_size, tx, ty);
                        obstacles.push(make_tree(id, species, position, ts, rng.next_f64()));
                    }
                }
                TileType::Grass => {
                    let roll = rng.next_f64();
                    let moisture = biome.moisture.get(idx).copied().unwrap_or(0.0) as f64;
                    if moisture > GRASS_TREE_MIN_MOISTURE && roll < GRASS_TREE_CHANCE {
                        let position = tile_centre(key, chunk_size, tile_size, tx, ty);
                        obstacles.push(make_tree(id, TreeSpecies::Oak, position, ts, rng.next_f64()));
                    }
                }
                TileType::Building => {
                    if rng.next_f64() < BUILDING_CHANCE {
                        let position = tile_centre(key, chunk_size, tile_size, tx, ty);
                        obstacles.push(make_structure(id, ObstacleKind::Building, position, ts));
                    }
                }
                TileType::Ruin => {
                    if rng.next_f64() < RUIN_CHANCE {
                        let position = tile_centre(key, chunk_size, tile_size, tx, ty);
                        obstacles.push(make_structure(id, ObstacleKind::Ruin, position, ts));
                    }
                }
                _ => {}
            }
        }
    }

    obstacles
}
