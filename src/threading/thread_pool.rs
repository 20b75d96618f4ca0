use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::channel;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use once_cell::sync::OnceCell;
use rayon::ThreadPoolBuilder;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::terrain::biome_manager::synthesize_chunk;
use crate::threading::task_runner::{JobPayload, JobResult, JobTicket, RunnerStats, TaskRunner};
use crate::utils::{PoolError, TaskError};

pub const DEFAULT_JOB_TIMEOUT_MS: u64 = 5000;
pub const DEFAULT_MAX_QUEUED_JOBS: usize = 256;

/// Work executed for each job. Defaults to full chunk synthesis.
pub type JobFn = Arc<dyn Fn(&JobPayload) -> JobResult + Send + Sync>;

fn default_threads() -> usize {
    std::cmp::max(1, num_cpus::get().saturating_sub(1))
}

fn default_job_timeout_ms() -> u64 {
    DEFAULT_JOB_TIMEOUT_MS
}

fn default_max_queued_jobs() -> usize {
    DEFAULT_MAX_QUEUED_JOBS
}

/// `[workers]` section of the settings file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerSettings {
    /// 0 picks one less than the core count.
    #[serde(default = "default_threads")]
    pub max_threads: usize,
    #[serde(default = "default_job_timeout_ms")]
    pub job_timeout_ms: u64,
    #[serde(default = "default_max_queued_jobs")]
    pub max_queued_jobs: usize,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        WorkerSettings {
            max_threads: default_threads(),
            job_timeout_ms: DEFAULT_JOB_TIMEOUT_MS,
            max_queued_jobs: DEFAULT_MAX_QUEUED_JOBS,
        }
    }
}

impl WorkerSettings {
    pub fn thread_count(&self) -> usize {
        if self.max_threads > 0 { self.max_threads } else { default_threads() }
    }

    pub fn job_timeout(&self) -> Duration {
        Duration::from_millis(self.job_timeout_ms)
    }
}

#[derive(Debug, Default)]
struct JobCounters {
    queued: AtomicUsize,
    active: AtomicUsize,
}

fn build_pool(num_threads: usize) -> Result<rayon::ThreadPool, PoolError> {
    let pool = ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .thread_name(|i| format!("tileworld-worker-{}", i))
        .build()?;
    Ok(pool)
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Task runner backed by a rayon thread pool.
pub struct WorkerPool {
    pool: RwLock<Arc<rayon::ThreadPool>>,
    num_threads: AtomicUsize,
    counters: Arc<JobCounters>,
    terminated: Arc<AtomicBool>,
    job_timeout: Duration,
    max_queued_jobs: usize,
    job: JobFn,
}

impl WorkerPool {
    pub fn new(settings: &WorkerSettings) -> Result<Self, PoolError> {
        Self::with_job(settings, Arc::new(synthesize_chunk))
    }

    // Same pool, different work. Tests use this to inject slow or panicking jobs.
    pub fn with_job(settings: &WorkerSettings, job: JobFn) -> Result<Self, PoolError> {
        let num_threads = settings.thread_count();
        let pool = build_pool(num_threads)?;
        info!(
            threads = num_threads,
            timeout_ms = settings.job_timeout_ms,
            max_queued = settings.max_queued_jobs,
            "created worker pool"
        );

        Ok(WorkerPool {
            pool: RwLock::new(Arc::new(pool)),
            num_threads: AtomicUsize::new(num_threads),
            counters: Arc::new(JobCounters::default()),
            terminated: Arc::new(AtomicBool::new(false)),
            job_timeout: settings.job_timeout(),
            max_queued_jobs: settings.max_queued_jobs,
            job,
        })
    }

    pub fn num_threads(&self) -> usize {
        self.num_threads.load(Ordering::SeqCst)
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::SeqCst)
    }

    fn current_pool(&self) -> Arc<rayon::ThreadPool> {
        Arc::clone(&self.pool.read().unwrap_or_else(PoisonError::into_inner))
    }
}

impl TaskRunner for WorkerPool {
    fn enqueue(&self, payload: JobPayload) -> JobTicket {
        let key = payload.key();
        if self.is_terminated() {
            return JobTicket::rejected(key, TaskError::Terminated);
        }
        if self.counters.queued.load(Ordering::SeqCst) >= self.max_queued_jobs {
            warn!(chunk = %key, "worker queue full, rejecting job");
            return JobTicket::rejected(key, TaskError::QueueFull);
        }

        let id = Uuid::new_v4();
        let (tx, rx) = channel();
        let counters = Arc::clone(&self.counters);
        let terminated = Arc::clone(&self.terminated);
        let job = Arc::clone(&self.job);

        counters.queued.fetch_add(1, Ordering::SeqCst);
        debug!(job = %id, chunk = %key, "dispatching generation job");

        self.current_pool().spawn(move || {
            counters.queued.fetch_sub(1, Ordering::SeqCst);
            if terminated.load(Ordering::SeqCst) {
                let _ = tx.send(Err(TaskError::Terminated));
                return;
            }

            counters.active.fetch_add(1, Ordering::SeqCst);
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| job(&payload)))
                .map_err(|p| TaskError::Panicked(panic_message(p)));
            counters.active.fetch_sub(1, Ordering::SeqCst);

            debug!(job = %id, ok = outcome.is_ok(), "generation job finished");
            // the ticket may already be gone after a timeout
            let _ = tx.send(outcome);
        });

        JobTicket::new(id, key, rx, self.job_timeout)
    }

    fn resize(&self, workers: usize) -> Result<(), PoolError> {
        let num_threads = if workers > 0 { workers } else { default_threads() };
        let pool = build_pool(num_threads)?;
        // The old pool finishes what it already has and shuts down once the
        // last Arc to it goes away.
        *self.pool.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(pool);
        self.num_threads.store(num_threads, Ordering::SeqCst);
        info!(threads = num_threads, "resized worker pool");
        Ok(())
    }

    fn stats(&self) -> RunnerStats {
        let max_workers = self.num_threads();
        let active_jobs = self.counters.active.load(Ordering::SeqCst);
        RunnerStats {
            max_workers,
            idle_workers: max_workers.saturating_sub(active_jobs),
            queued_jobs: self.counters.queued.load(Ordering::SeqCst),
            active_jobs,
        }
    }

    fn terminate(&self) {
        if !self.terminated.swap(true, Ordering::SeqCst) {
            info!("worker pool terminated");
        }
    }
}

// Process-wide pool for embedders that do not want to manage one.
static GLOBAL_WORKER_POOL: OnceCell<Arc<WorkerPool>> = OnceCell::new();

pub fn initialize_global_pool(settings: &WorkerSettings) -> Result<Arc<WorkerPool>, PoolError> {
    let pool = Arc::new(WorkerPool::new(settings)?);
    GLOBAL_WORKER_POOL
        .set(Arc::clone(&pool))
        .map_err(|_| PoolError::AlreadyInitialized)?;
    Ok(pool)
}

// Lazily creates the global pool with default settings. The first caller
// decides the size.
pub fn global_worker_pool() -> Result<Arc<WorkerPool>, PoolError> {
    GLOBAL_WORKER_POOL
        .get_or_try_init(|| WorkerPool::new(&WorkerSettings::default()).map(Arc::new))
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terrain::noise::NoiseParameters;
    use std::thread;

    fn payload(cx: i32, cy: i32) -> JobPayload {
        JobPayload {
            cx,
            cy,
            chunk_size: 8,
            tile_size: 16,
            numeric_seed: 7,
            noise: NoiseParameters::default(),
        }
    }

    fn settings(threads: usize) -> WorkerSettings {
        WorkerSettings { max_threads: threads, job_timeout_ms: 5000, max_queued_jobs: 64 }
    }

    #[test]
    fn runs_synthesis_off_thread() {
        let pool = WorkerPool::new(&settings(2)).unwrap();
        let ticket = pool.enqueue(payload(1, 2));
        assert_eq!(ticket.key().cx, 1);
        let result = ticket.wait().unwrap();
        assert_eq!(result, synthesize_chunk(&payload(1, 2)));
    }

    #[test]
    fn panicking_job_is_reported() {
        let job: JobFn = Arc::new(|_: &JobPayload| -> JobResult { panic!("boom") });
        let pool = WorkerPool::with_job(&settings(1), job).unwrap();
        match pool.enqueue(payload(0, 0)).wait() {
            Err(TaskError::Panicked(msg)) => assert!(msg.contains("boom")),
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn slow_job_times_out() {
        let job: JobFn = Arc::new(|p: &JobPayload| {
            thread::sleep(Duration::from_millis(300));
            synthesize_chunk(p)
        });
        let s = WorkerSettings { max_threads: 1, job_timeout_ms: 20, max_queued_jobs: 8 };
        let pool = WorkerPool::with_job(&s, job).unwrap();
        assert_eq!(pool.enqueue(payload(0, 0)).wait(), Err(TaskError::Timeout));
    }

    #[test]
    fn full_queue_rejects_immediately() {
        let job: JobFn = Arc::new(|p: &JobPayload| {
            thread::sleep(Duration::from_millis(200));
            synthesize_chunk(p)
        });
        let s = WorkerSettings { max_threads: 1, job_timeout_ms: 5000, max_queued_jobs: 0 };
        let pool = WorkerPool::with_job(&s, job).unwrap();
        let ticket = pool.enqueue(payload(0, 0));
        assert_eq!(ticket.try_outcome(), Some(Err(TaskError::QueueFull)));
    }

    #[test]
    fn terminated_pool_refuses_work() {
        let pool = WorkerPool::new(&settings(1)).unwrap();
        pool.terminate();
        assert!(pool.is_terminated());
        assert_eq!(pool.enqueue(payload(0, 0)).wait(), Err(TaskError::Terminated));
    }

    #[test]
    fn resize_updates_stats() {
        let pool = WorkerPool::new(&settings(1)).unwrap();
        assert_eq!(pool.stats().max_workers, 1);
        pool.resize(3).unwrap();
        let stats = pool.stats();
        assert_eq!(stats.max_workers, 3);
        assert_eq!(stats.active_jobs, 0);
        assert_eq!(stats.idle_workers, 3);
        // work still flows after the swap
        assert!(pool.enqueue(payload(4, 4)).wait().is_ok());
    }

    #[test]
    fn global_pool_is_shared() {
        let a = global_worker_pool().unwrap();
        let b = global_worker_pool().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(matches!(
            initialize_global_pool(&WorkerSettings::default()),
            Err(PoolError::AlreadyInitialized)
        ));
    }

    #[test]
    fn zero_threads_means_default() {
        let s = WorkerSettings { max_threads: 0, ..Default::default() };
        assert!(s.thread_count() >= 1);
    }
}
