use glam::DVec2;
use serde::{Deserialize, Serialize};

use crate::terrain::decoration::Obstacle;
use crate::terrain::tile::TileType;

/// How a tile type behaves for movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TerrainClass {
    Walkable,
    Blocking,
    Water,
}

impl TerrainClass {
    pub fn of(tile: TileType) -> TerrainClass {
        match tile {
            TileType::Forest
            | TileType::Mountain
            | TileType::SnowMountain
            | TileType::Building
            | TileType::Ruin => TerrainClass::Blocking,
            TileType::DeepOcean | TileType::Ocean => TerrainClass::Water,
            _ => TerrainClass::Walkable,
        }
    }

    /// Radius of the circle around a tile centre, as a fraction of tile size.
    pub fn radius_factor(self) -> Option<f64> {
        match self {
            TerrainClass::Blocking => Some(0.4),
            TerrainClass::Water => Some(0.3),
            TerrainClass::Walkable => None,
        }
    }
}

/// A terrain tile that stopped a probe.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TileHit {
    pub tile: TileType,
    pub class: TerrainClass,
    /// World tile coordinates.
    pub tx: i64,
    pub ty: i64,
    pub center: DVec2,
    pub radius: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CollisionHit {
    Obstacle(Obstacle),
    Tile(TileHit),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollisionResult {
    pub collided: bool,
    pub hit: Option<CollisionHit>,
    /// minimum separation minus actual distance
    pub penetration: f64,
    /// Unit vector from the hit towards the probe, zero when the centres coincide.
    pub direction: DVec2,
}

impl CollisionResult {
    pub fn none() -> Self {
        CollisionResult { collided: false, hit: None, penetration: 0.0, direction: DVec2::ZERO }
    }

    pub(crate) fn contact(hit: CollisionHit, center: DVec2, probe: DVec2, min_distance: f64) -> Self {
        let delta = probe - center;
        CollisionResult {
            collided: true,
            hit: Some(hit),
            penetration: min_distance - delta.length(),
            direction: delta.normalize_or_zero(),
        }
    }

    pub fn obstacle(&self) -> Option<&Obstacle> {
        match &self.hit {
            Some(CollisionHit::Obstacle(o)) => Some(o),
            _ => None,
        }
    }

    pub fn tile(&self) -> Option<&TileHit> {
        match &self.hit {
            Some(CollisionHit::Tile(t)) => Some(t),
            _ => None,
        }
    }
}

impl Default for CollisionResult {
    fn default() -> Self {
        CollisionResult::none()
    }
}

/// An obstacle annotated with its distance from a query point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NearbyObstacle {
    pub obstacle: Obstacle,
    pub distance: f64,
}
