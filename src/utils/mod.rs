pub mod error;
pub mod logging;

pub use error::{ConfigError, PoolError, TaskError};
pub use logging::init_logging;
