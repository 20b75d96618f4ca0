use std::collections::HashMap;
use std::sync::Arc;

use glam::DVec2;

use crate::physics::collision::{CollisionHit, CollisionResult, NearbyObstacle};
use crate::terrain::chunk::ChunkKey;
use crate::terrain::decoration::{Obstacle, ObstacleId};

/// Collidable obstacles bucketed per chunk. An entry exists exactly while its
/// chunk is cached as complete.
#[derive(Debug, Default)]
pub struct CollisionRegistry {
    entries: HashMap<ChunkKey, Arc<Vec<Obstacle>>>,
}

impl CollisionRegistry {
    pub fn new() -> Self {
        CollisionRegistry::default()
    }

    /// Indexes the collidable subset of a chunk's decorations, replacing any
    /// previous entry for the key.
    pub fn insert(&mut self, key: ChunkKey, obstacles: &[Obstacle]) {
        let collidable: Vec<Obstacle> = obstacles.iter().filter(|o| o.is_collidable()).cloned().collect();
        self.entries.insert(key, Arc::new(collidable));
    }

    pub fn remove(&mut self, key: ChunkKey) -> bool {
        self.entries.remove(&key).is_some()
    }

    pub fn contains(&self, key: ChunkKey) -> bool {
        self.entries.contains_key(&key)
    }

    pub fn get(&self, key: ChunkKey) -> Option<&[Obstacle]> {
        self.entries.get(&key).map(|v| v.as_slice())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn retain<F: FnMut(ChunkKey) -> bool>(&mut self, mut keep: F) {
        self.entries.retain(|key, _| keep(*key));
    }

    /// First obstacle in the 3x3 chunk block around `center` that overlaps
    /// the probe circle. Scan order is row by row, not nearest first.
    pub fn query(
        &self,
        center: ChunkKey,
        point: DVec2,
        radius: f64,
        ignore: Option<ObstacleId>,
    ) -> Option<CollisionResult> {
        for dy in -1..=1 {
            for dx in -1..=1 {
                let Some(obstacles) = self.entries.get(&center.offset(dx, dy)) else { continue };
                for obstacle in obstacles.iter() {
                    if Some(obstacle.id) == ignore {
                        continue;
                    }
                    let min_distance = radius + obstacle.collision_radius;
                    if obstacle.position.distance(point) < min_distance {
                        return Some(CollisionResult::contact(
                            CollisionHit::Obstacle(obstacle.clone()),
                            obstacle.position,
                            point,
                            min_distance,
                        ));
                    }
                }
            }
        }
        None
    }

    /// Every registered obstacle within `radius` of the point, nearest first.
    pub fn nearby(&self, point: DVec2, radius: f64) -> Vec<NearbyObstacle> {
        let mut found: Vec<NearbyObstacle> = self
            .entries
            .values()
            .flat_map(|obstacles| obstacles.iter())
            .filter_map(|obstacle| {
                let distance = obstacle.position.distance(point);
                (distance <= radius).then(|| NearbyObstacle { obstacle: obstacle.clone(), distance })
            })
            .collect();
        found.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        found
    }
}
