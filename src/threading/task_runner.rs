use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, TryRecvError};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::terrain::chunk::{BiomeData, ChunkKey};
use crate::terrain::noise::NoiseParameters;
use crate::terrain::tile::TileType;
use crate::utils::{PoolError, TaskError};

/// Immutable description of one chunk generation job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobPayload {
    pub cx: i32,
    pub cy: i32,
    pub chunk_size: u32,
    pub tile_size: u32,
    pub numeric_seed: i64,
    pub noise: NoiseParameters,
}

impl JobPayload {
    pub fn key(&self) -> ChunkKey {
        ChunkKey::new(self.cx, self.cy)
    }
}

/// Raw synthesis output: tile ordinals plus the three scalar fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobResult {
    pub tiles: Vec<u8>,
    pub biome: BiomeData,
}

impl JobResult {
    // Worker output is untrusted until the sizes and ordinals check out
    pub fn validate(&self, chunk_size: u32) -> Result<(), TaskError> {
        let expected = (chunk_size as usize) * (chunk_size as usize);
        if self.tiles.len() != expected {
            return Err(TaskError::InvalidResult(format!(
                "expected {} tiles, got {}",
                expected,
                self.tiles.len()
            )));
        }
        if !self.biome.is_consistent(expected) {
            return Err(TaskError::InvalidResult("biome field length mismatch".to_string()));
        }
        if let Some(bad) = self.tiles.iter().find(|t| TileType::from_u8(**t).is_none()) {
            return Err(TaskError::InvalidResult(format!("unknown tile ordinal {}", bad)));
        }
        Ok(())
    }

    pub fn tile_types(&self) -> Vec<TileType> {
        self.tiles
            .iter()
            .map(|t| TileType::from_u8(*t).unwrap_or_default())
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RunnerStats {
    pub max_workers: usize,
    pub idle_workers: usize,
    pub queued_jobs: usize,
    pub active_jobs: usize,
}

pub type JobOutcome = Result<JobResult, TaskError>;

/// Receiving end of one enqueued job. Resolves exactly once: to the worker's
/// reply, to `Timeout` once the deadline passes, or to `Aborted` if the worker
/// side went away without answering.
#[derive(Debug)]
pub struct JobTicket {
    id: Uuid,
    key: ChunkKey,
    receiver: Receiver<JobOutcome>,
    deadline: Instant,
}

impl JobTicket {
    pub fn new(id: Uuid, key: ChunkKey, receiver: Receiver<JobOutcome>, timeout: Duration) -> Self {
        JobTicket { id, key, receiver, deadline: Instant::now() + timeout }
    }

    // A ticket that is already resolved with an error (queue full, terminated, ...)
    pub fn rejected(key: ChunkKey, error: TaskError) -> Self {
        let (tx, rx) = channel();
        let _ = tx.send(Err(error));
        JobTicket { id: Uuid::new_v4(), key, receiver: rx, deadline: Instant::now() }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn key(&self) -> ChunkKey {
        self.key
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Non-blocking check.
    pub fn try_outcome(&self) -> Option<JobOutcome> {
        match self.receiver.try_recv() {
            Ok(outcome) => Some(outcome),
            Err(TryRecvError::Disconnected) => Some(Err(TaskError::Aborted)),
            Err(TryRecvError::Empty) if Instant::now() >= self.deadline => Some(Err(TaskError::Timeout)),
            Err(TryRecvError::Empty) => None,
        }
    }

    /// Blocks until the worker replies or the deadline passes.
    pub fn wait(self) -> JobOutcome {
        let remaining = self.deadline.saturating_duration_since(Instant::now());
        match self.receiver.recv_timeout(remaining) {
            Ok(outcome) => outcome,
            Err(RecvTimeoutError::Timeout) => Err(TaskError::Timeout),
            Err(RecvTimeoutError::Disconnected) => Err(TaskError::Aborted),
        }
    }
}

/// Off-thread executor for generation jobs. Implementations never touch
/// coordinator state: they get a payload and hand back a result or an error.
pub trait TaskRunner: Send + Sync {
    fn enqueue(&self, payload: JobPayload) -> JobTicket;

    fn resize(&self, workers: usize) -> Result<(), PoolError>;

    fn stats(&self) -> RunnerStats;

    fn terminate(&self);
}
