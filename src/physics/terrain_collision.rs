use glam::DVec2;

use crate::physics::collision::{CollisionHit, CollisionResult, TerrainClass, TileHit};
use crate::terrain::tile::TileType;

/// World tile containing a world-space point.
pub fn world_tile_of(point: DVec2, tile_size: u32) -> (i64, i64) {
    let ts = f64::from(tile_size);
    ((point.x / ts).floor() as i64, (point.y / ts).floor() as i64)
}

pub fn tile_center(tx: i64, ty: i64, tile_size: u32) -> DVec2 {
    let ts = f64::from(tile_size);
    DVec2::new((tx as f64 + 0.5) * ts, (ty as f64 + 0.5) * ts)
}

/// Checks the 3x3 tiles around the point's tile and returns the first blocking
/// or water tile whose circle overlaps the probe. `tile_at` resolves world tile
/// coordinates; tiles it cannot resolve yet should come back walkable.
pub fn check_terrain<F>(point: DVec2, radius: f64, tile_size: u32, mut tile_at: F) -> Option<CollisionResult>
where
    F: FnMut(i64, i64) -> TileType,
{
    let (ctx, cty) = world_tile_of(point, tile_size);
    let ts = f64::from(tile_size);

    for dy in -1..=1 {
        for dx in -1..=1 {
            let (tx, ty) = (ctx + dx, cty + dy);
            let tile = tile_at(tx, ty);
            let class = TerrainClass::of(tile);
            let Some(factor) = class.radius_factor() else { continue };

            let center = tile_center(tx, ty, tile_size);
            let tile_radius = factor * ts;
            let min_distance = radius + tile_radius;
            if center.distance(point) < min_distance {
                let hit = TileHit { tile, class, tx, ty, center, radius: tile_radius };
                return Some(CollisionResult::contact(CollisionHit::Tile(hit), center, point, min_distance));
            }
        }
    }
    None
}
