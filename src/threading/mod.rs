pub mod task_runner;
pub mod thread_pool;

pub use task_runner::{JobOutcome, JobPayload, JobResult, JobTicket, RunnerStats, TaskRunner};
pub use thread_pool::{global_worker_pool, initialize_global_pool, JobFn, WorkerPool, WorkerSettings};
