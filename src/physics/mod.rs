pub mod collision;
pub mod collision_registry;
pub mod terrain_collision;

pub use collision::{CollisionHit, CollisionResult, NearbyObstacle, TerrainClass, TileHit};
pub use collision_registry::CollisionRegistry;
pub use terrain_collision::check_terrain;
