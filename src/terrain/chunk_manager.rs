use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use glam::DVec2;
use lru::LruCache;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::physics::{check_terrain, CollisionRegistry, CollisionResult, NearbyObstacle};
use crate::terrain::biome_manager::synthesize_chunk;
use crate::terrain::chunk::{Chunk, ChunkKey, ChunkState};
use crate::terrain::decoration::{decorate_chunk, ObstacleId};
use crate::terrain::noise::NoiseParametersPatch;
use crate::terrain::render::{ArtifactHandle, ChunkRenderer, RenderInput};
use crate::terrain::terrain_config::WorldConfig;
use crate::terrain::tile::TileType;
use crate::threading::task_runner::{JobOutcome, JobPayload, JobResult, JobTicket, RunnerStats, TaskRunner};
use crate::utils::ConfigError;

/// Axis-aligned world-space rectangle, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WorldRect {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl WorldRect {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        WorldRect { min_x, min_y, max_x, max_y }
    }
}

#[derive(Debug, Clone)]
enum Resolution {
    Ready(Arc<Chunk>),
    // Reconfiguration or an explicit clear dropped the request
    Superseded,
}

/// Completion signal for one chunk generation. Cloning shares the signal; it
/// is resolved once by whoever finishes the job and read by every clone.
#[derive(Debug, Clone)]
pub struct GenerationHandle {
    key: ChunkKey,
    inner: Arc<(Mutex<Option<Resolution>>, Condvar)>,
}

impl GenerationHandle {
    fn pending(key: ChunkKey) -> Self {
        GenerationHandle { key, inner: Arc::new((Mutex::new(None), Condvar::new())) }
    }

    fn ready(key: ChunkKey, chunk: Arc<Chunk>) -> Self {
        let handle = GenerationHandle::pending(key);
        handle.resolve(Resolution::Ready(chunk));
        handle
    }

    fn resolve(&self, resolution: Resolution) {
        let (slot, cvar) = &*self.inner;
        let mut slot = slot.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_none() {
            *slot = Some(resolution);
            cvar.notify_all();
        }
    }

    fn resolution(&self) -> Option<Resolution> {
        self.inner.0.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn wait_resolution(&self) -> Resolution {
        let (slot, cvar) = &*self.inner;
        let mut slot = slot.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            if let Some(resolution) = slot.as_ref() {
                return resolution.clone();
            }
            slot = cvar.wait(slot).unwrap_or_else(PoisonError::into_inner);
        }
    }

    pub fn key(&self) -> ChunkKey {
        self.key
    }

    pub fn is_resolved(&self) -> bool {
        self.resolution().is_some()
    }

    /// The finished chunk, if generation has landed.
    pub fn try_get(&self) -> Option<Arc<Chunk>> {
        match self.resolution() {
            Some(Resolution::Ready(chunk)) => Some(chunk),
            _ => None,
        }
    }

    pub fn same_as(&self, other: &GenerationHandle) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

struct InFlight {
    handle: GenerationHandle,
    // None once someone has taken the ticket to finish the job
    ticket: Option<JobTicket>,
    payload: JobPayload,
}

struct ManagerState {
    config: WorldConfig,
    chunks: LruCache<ChunkKey, Arc<Chunk>>,
    in_flight: HashMap<ChunkKey, InFlight>,
    collisions: CollisionRegistry,
    sequence: u64,
    disposed: bool,
}

impl ManagerState {
    // Inserts a chunk, handling LRU displacement: a displaced chunk loses its
    // artifact and its collision entry together.
    fn push_chunk(&mut self, key: ChunkKey, chunk: Arc<Chunk>, released: &mut Vec<ArtifactHandle>) {
        if let Some((old_key, old)) = self.chunks.push(key, chunk) {
            released.extend(old.artifact);
            if old_key != key {
                self.collisions.remove(old_key);
                debug!(chunk = %old_key, "evicted chunk at cache capacity");
            }
        }
    }

    fn payload(&self, key: ChunkKey) -> JobPayload {
        JobPayload {
            cx: key.cx,
            cy: key.cy,
            chunk_size: self.config.chunk_size(),
            tile_size: self.config.tile_size(),
            numeric_seed: self.config.numeric_seed(),
            noise: *self.config.noise(),
        }
    }

    fn clear_all(&mut self, released: &mut Vec<ArtifactHandle>) {
        while let Some((_, chunk)) = self.chunks.pop_lru() {
            released.extend(chunk.artifact);
        }
        for (_, flight) in self.in_flight.drain() {
            flight.handle.resolve(Resolution::Superseded);
        }
        self.collisions.clear();
    }
}

/// Owns the chunk table, the in-flight generation table and the collision
/// registry. All three are mutated only under one lock; workers see nothing
/// but an immutable payload.
pub struct ChunkManager {
    state: Mutex<ManagerState>,
    runner: Option<Arc<dyn TaskRunner>>,
    renderer: Option<Arc<dyn ChunkRenderer>>,
}

impl ChunkManager {
    /// `cache_size` caps the chunk table (0 = unbounded).
    pub fn new(
        config: WorldConfig,
        runner: Option<Arc<dyn TaskRunner>>,
        renderer: Option<Arc<dyn ChunkRenderer>>,
        cache_size: usize,
    ) -> Self {
        let chunks = match NonZeroUsize::new(cache_size) {
            Some(cap) => LruCache::new(cap),
            None => LruCache::unbounded(),
        };
        info!(
            seed = config.seed(),
            chunk_size = config.chunk_size(),
            tile_size = config.tile_size(),
            cache_size,
            threaded = runner.is_some(),
            "created chunk manager"
        );

        ChunkManager {
            state: Mutex::new(ManagerState {
                config,
                chunks,
                in_flight: HashMap::new(),
                collisions: CollisionRegistry::new(),
                sequence: 0,
                disposed: false,
            }),
            runner,
            renderer,
        }
    }

    /// Generation always runs on the calling thread.
    pub fn synchronous(config: WorldConfig) -> Self {
        ChunkManager::new(config, None, None, 0)
    }

    fn lock(&self) -> MutexGuard<'_, ManagerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn release_artifacts(&self, released: Vec<ArtifactHandle>) {
        if let Some(renderer) = &self.renderer {
            for artifact in released {
                renderer.release(artifact);
            }
        }
    }

    pub fn config(&self) -> WorldConfig {
        self.lock().config.clone()
    }

    fn chunk_key_at(config: &WorldConfig, x: f64, y: f64) -> ChunkKey {
        let size = config.chunk_world_size();
        ChunkKey::new((x / size).floor() as i32, (y / size).floor() as i32)
    }

    // ---------------------------------------------------------------------
    // Chunk access
    // ---------------------------------------------------------------------

    /// Returns the chunk if it is complete, otherwise a placeholder while
    /// generation runs. Never blocks on a worker.
    pub fn get_chunk(&self, cx: i32, cy: i32) -> Arc<Chunk> {
        self.update();
        self.request_chunk(ChunkKey::new(cx, cy))
    }

    fn request_chunk(&self, key: ChunkKey) -> Arc<Chunk> {
        let chunk_size = {
            let mut guard = self.lock();
            let state = &mut *guard;
            if let Some(chunk) = state.chunks.get(&key) {
                if chunk.is_complete() || state.in_flight.contains_key(&key) {
                    return Arc::clone(chunk);
                }
            }
            let chunk_size = state.config.chunk_size();
            if !state.chunks.contains(&key) {
                let mut released = Vec::new();
                let placeholder = Arc::new(Chunk::placeholder(key, chunk_size, ChunkState::Placeholder));
                state.push_chunk(key, placeholder, &mut released);
                drop(guard);
                self.release_artifacts(released);
            }
            chunk_size
        };

        let handle = self.start_generation(key);
        if let Some(chunk) = handle.try_get() {
            return chunk;
        }
        self.lock()
            .chunks
            .peek(&key)
            .cloned()
            .unwrap_or_else(|| Arc::new(Chunk::placeholder(key, chunk_size, ChunkState::Generating)))
    }

    /// Starts (or joins) generation for a chunk. Concurrent calls for the same
    /// key share one handle and one job.
    pub fn generate_async(&self, cx: i32, cy: i32) -> GenerationHandle {
        self.update();
        self.start_generation(ChunkKey::new(cx, cy))
    }

    fn start_generation(&self, key: ChunkKey) -> GenerationHandle {
        let mut released = Vec::new();
        let (handle, payload, synchronous) = {
            let mut guard = self.lock();
            let state = &mut *guard;

            if let Some(flight) = state.in_flight.get(&key) {
                return flight.handle.clone();
            }
            if let Some(chunk) = state.chunks.get(&key) {
                if chunk.is_complete() {
                    return GenerationHandle::ready(key, Arc::clone(chunk));
                }
            }

            let payload = state.payload(key);
            let generating = Arc::new(Chunk::placeholder(key, payload.chunk_size, ChunkState::Generating));
            state.push_chunk(key, generating, &mut released);

            let handle = GenerationHandle::pending(key);
            let runner = if state.disposed { None } else { self.runner.as_ref() };
            let ticket = runner.map(|r| r.enqueue(payload.clone()));
            let synchronous = ticket.is_none();
            state.in_flight.insert(key, InFlight { handle: handle.clone(), ticket, payload: payload.clone() });
            (handle, payload, synchronous)
        };
        self.release_artifacts(released);

        if synchronous {
            debug!(chunk = %key, "no task runner, generating on the calling thread");
            let result = synthesize_chunk(&payload);
            let chunk = self.finish_chunk(&payload, result);
            self.install(key, &handle, chunk);
        }
        handle
    }

    /// Blocks until the handle resolves. A request dropped by a
    /// reconfiguration is restarted under the current configuration.
    pub fn wait_for(&self, handle: &GenerationHandle) -> Arc<Chunk> {
        let mut handle = handle.clone();
        loop {
            match handle.resolution() {
                Some(Resolution::Ready(chunk)) => return chunk,
                Some(Resolution::Superseded) => {
                    handle = self.start_generation(handle.key());
                    continue;
                }
                None => {}
            }

            let job = {
                let mut state = self.lock();
                match state.in_flight.get_mut(&handle.key()) {
                    Some(flight) if flight.handle.same_as(&handle) => {
                        flight.ticket.take().map(|t| (t, flight.payload.clone()))
                    }
                    _ => None,
                }
            };

            match job {
                Some((ticket, payload)) => {
                    let outcome = ticket.wait();
                    self.complete(&handle, &payload, outcome);
                }
                // Another thread holds the ticket, or the entry is already gone
                // and the handle resolved.
                None => {
                    handle.wait_resolution();
                }
            }
        }
    }

    /// Collects finished jobs without blocking. Returns how many chunks were
    /// completed (by a worker or by fallback).
    pub fn update(&self) -> usize {
        let finished: Vec<(GenerationHandle, JobPayload, JobOutcome)> = {
            let mut state = self.lock();
            state
                .in_flight
                .values_mut()
                .filter_map(|flight| {
                    let outcome = flight.ticket.as_ref()?.try_outcome()?;
                    flight.ticket = None;
                    Some((flight.handle.clone(), flight.payload.clone(), outcome))
                })
                .collect()
        };

        let count = finished.len();
        for (handle, payload, outcome) in finished {
            self.complete(&handle, &payload, outcome);
        }
        count
    }

    // Worker success is committed as-is; any failure falls back to synthesis
    // here so the caller always ends up with a real chunk.
    fn complete(&self, handle: &GenerationHandle, payload: &JobPayload, outcome: JobOutcome) {
        let key = handle.key();
        let checked = outcome.and_then(|result| result.validate(payload.chunk_size).map(|_| result));
        let result = match checked {
            Ok(result) => {
                debug!(chunk = %key, "worker result received");
                result
            }
            Err(error) => {
                warn!(chunk = %key, %error, "generation job failed, falling back to synchronous synthesis");
                synthesize_chunk(payload)
            }
        };
        let chunk = self.finish_chunk(payload, result);
        self.install(key, handle, chunk);
    }

    // Decoration and rendering, done outside the lock.
    fn finish_chunk(&self, payload: &JobPayload, result: JobResult) -> Chunk {
        let key = payload.key();
        let tiles = result.tile_types();
        let obstacles = decorate_chunk(
            key,
            payload.chunk_size,
            payload.tile_size,
            payload.numeric_seed,
            &tiles,
            &result.biome,
        );
        let artifact = self.renderer.as_ref().and_then(|renderer| {
            renderer.render(&RenderInput {
                key,
                chunk_size: payload.chunk_size,
                tile_size: payload.tile_size,
                tiles: &tiles,
                biome: &result.biome,
                obstacles: &obstacles,
            })
        });

        Chunk {
            key,
            state: ChunkState::Complete,
            chunk_size: payload.chunk_size,
            tiles,
            biome: result.biome,
            obstacles: Arc::new(obstacles),
            generated_at: Some(Utc::now()),
            sequence: 0,
            artifact,
        }
    }

    // Commits a finished chunk if its request is still the live one. A stale
    // result (cleared or reconfigured meanwhile) is dropped, never cached.
    fn install(&self, key: ChunkKey, handle: &GenerationHandle, mut chunk: Chunk) -> Option<Arc<Chunk>> {
        let mut released = Vec::new();
        let installed = {
            let mut guard = self.lock();
            let state = &mut *guard;
            let live = state.in_flight.get(&key).is_some_and(|f| f.handle.same_as(handle));
            if live {
                state.in_flight.remove(&key);
                state.sequence += 1;
                chunk.sequence = state.sequence;
                state.collisions.insert(key, &chunk.obstacles);
                let chunk = Arc::new(chunk);
                state.push_chunk(key, Arc::clone(&chunk), &mut released);
                handle.resolve(Resolution::Ready(Arc::clone(&chunk)));
                Some(chunk)
            } else {
                debug!(chunk = %key, "discarding stale generation result");
                released.extend(chunk.artifact.take());
                None
            }
        };
        self.release_artifacts(released);
        installed
    }

    /// Every chunk overlapping the rectangle, row by row. Partially covered
    /// chunks are included.
    pub fn get_chunks_in_rect(&self, rect: WorldRect) -> Vec<Arc<Chunk>> {
        self.update();
        let (min, max) = {
            let state = self.lock();
            (
                Self::chunk_key_at(&state.config, rect.min_x, rect.min_y),
                Self::chunk_key_at(&state.config, rect.max_x, rect.max_y),
            )
        };

        let mut chunks = Vec::new();
        for cy in min.cy..=max.cy {
            for cx in min.cx..=max.cx {
                chunks.push(self.request_chunk(ChunkKey::new(cx, cy)));
            }
        }
        chunks
    }

    /// Tile type at a world pixel position. Ungenerated ground reads as grass
    /// and starts generating.
    pub fn get_tile_at_world(&self, x: f64, y: f64) -> TileType {
        self.update();
        let tile_size = f64::from(self.lock().config.tile_size());
        self.tile_at_world_tile((x / tile_size).floor() as i64, (y / tile_size).floor() as i64)
    }

    fn tile_at_world_tile(&self, wtx: i64, wty: i64) -> TileType {
        let chunk_size = i64::from(self.lock().config.chunk_size());
        // saturate like chunk_key_at so both lookups agree far out
        let chunk_index = |t: i64| t.div_euclid(chunk_size).clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32;
        let key = ChunkKey::new(chunk_index(wtx), chunk_index(wty));
        let chunk = self.request_chunk(key);
        if !chunk.is_complete() {
            return TileType::default();
        }
        chunk.tile(wtx.rem_euclid(chunk_size) as u32, wty.rem_euclid(chunk_size) as u32)
    }

    // ---------------------------------------------------------------------
    // Collision
    // ---------------------------------------------------------------------

    /// Obstacles first, then terrain; the first hit wins.
    pub fn check_collision(&self, x: f64, y: f64, radius: f64, ignore_id: Option<ObstacleId>) -> CollisionResult {
        self.update();
        let point = DVec2::new(x, y);
        let (center, tile_size) = {
            let state = self.lock();
            (Self::chunk_key_at(&state.config, x, y), state.config.tile_size())
        };
        self.request_chunk(center);

        if let Some(hit) = self.lock().collisions.query(center, point, radius, ignore_id) {
            return hit;
        }

        check_terrain(point, radius, tile_size, |tx, ty| self.tile_at_world_tile(tx, ty))
            .unwrap_or_else(CollisionResult::none)
    }

    /// Every registered obstacle within `radius`, nearest first, across all
    /// cached chunks.
    pub fn get_nearby_obstacles(&self, x: f64, y: f64, radius: f64) -> Vec<NearbyObstacle> {
        self.update();
        let state = self.lock();
        if state.collisions.is_empty() {
            return Vec::new();
        }
        state.collisions.nearby(DVec2::new(x, y), radius)
    }

    // ---------------------------------------------------------------------
    // Eviction and reconfiguration
    // ---------------------------------------------------------------------

    /// Evicts every chunk farther than `radius` (Chebyshev) from the centre.
    /// Returns the number of chunks removed.
    pub fn unload_far_chunks(&self, center_cx: i32, center_cy: i32, radius: u32) -> usize {
        self.update();
        let center = ChunkKey::new(center_cx, center_cy);
        let mut released = Vec::new();
        let evicted = {
            let mut guard = self.lock();
            let state = &mut *guard;
            let far: Vec<ChunkKey> = state
                .chunks
                .iter()
                .map(|(key, _)| *key)
                .filter(|key| key.chebyshev_distance(center) > radius)
                .collect();
            for key in &far {
                if let Some(chunk) = state.chunks.pop(key) {
                    released.extend(chunk.artifact);
                }
            }
            state.collisions.retain(|key| key.chebyshev_distance(center) <= radius);
            far.len()
        };
        self.release_artifacts(released);
        debug!(center = %center, radius, evicted, "unloaded far chunks");
        evicted
    }

    /// Drops one chunk from the cache, the in-flight table and the collision
    /// registry. Returns whether anything was there.
    pub fn clear_chunk(&self, cx: i32, cy: i32) -> bool {
        let key = ChunkKey::new(cx, cy);
        let mut released = Vec::new();
        let found = {
            let mut guard = self.lock();
            let state = &mut *guard;
            let cached = state.chunks.pop(&key).map(|chunk| released.extend(chunk.artifact)).is_some();
            let flight = state.in_flight.remove(&key).map(|f| f.handle.resolve(Resolution::Superseded)).is_some();
            let collision = state.collisions.remove(key);
            cached || flight || collision
        };
        self.release_artifacts(released);
        found
    }

    /// Replaces the seed and wipes every cached and in-flight chunk.
    pub fn set_seed(&self, seed: &str) {
        let mut released = Vec::new();
        {
            let mut state = self.lock();
            state.config.set_seed(seed);
            state.clear_all(&mut released);
            info!(seed, numeric_seed = state.config.numeric_seed(), "seed changed, chunk cache cleared");
        }
        self.release_artifacts(released);
    }

    /// Merges a partial noise configuration. An invalid result is rejected and
    /// the cache is left alone; otherwise everything is wiped.
    pub fn set_noise_config(&self, patch: &NoiseParametersPatch) -> Result<(), ConfigError> {
        let mut released = Vec::new();
        {
            let mut state = self.lock();
            if let Err(error) = state.config.apply_noise_patch(patch) {
                warn!(%error, "rejected noise configuration");
                return Err(error);
            }
            state.clear_all(&mut released);
            info!(noise = ?state.config.noise(), "noise configuration changed, chunk cache cleared");
        }
        self.release_artifacts(released);
        Ok(())
    }

    /// Stops the task runner and drops all state. The manager stays usable,
    /// generating synchronously from here on.
    pub fn dispose(&self) {
        if let Some(runner) = &self.runner {
            runner.terminate();
        }
        let mut released = Vec::new();
        {
            let mut state = self.lock();
            state.disposed = true;
            state.clear_all(&mut released);
        }
        self.release_artifacts(released);
        info!("chunk manager disposed");
    }

    // ---------------------------------------------------------------------
    // Introspection
    // ---------------------------------------------------------------------

    pub fn chunk_state(&self, cx: i32, cy: i32) -> Option<ChunkState> {
        self.lock().chunks.peek(&ChunkKey::new(cx, cy)).map(|c| c.state)
    }

    pub fn cached_chunk_count(&self) -> usize {
        self.lock().chunks.len()
    }

    pub fn in_flight_count(&self) -> usize {
        self.lock().in_flight.len()
    }

    pub fn collision_entry_count(&self) -> usize {
        self.lock().collisions.len()
    }

    pub fn has_collision_entry(&self, cx: i32, cy: i32) -> bool {
        self.lock().collisions.contains(ChunkKey::new(cx, cy))
    }

    pub fn cached_chunk_keys(&self) -> Vec<ChunkKey> {
        let mut keys: Vec<ChunkKey> = self.lock().chunks.iter().map(|(key, _)| *key).collect();
        keys.sort();
        keys
    }

    pub fn runner_stats(&self) -> Option<RunnerStats> {
        self.runner.as_ref().map(|r| r.stats())
    }
}
