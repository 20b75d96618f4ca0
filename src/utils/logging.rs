use tracing::Level;

// Install a fmt subscriber at the given level. A second call finds the global
// subscriber already set and does nothing.
pub fn init_logging(level: Level) {
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(true)
        .try_init();
}
