pub mod config;
pub mod models;
pub mod pipeline;
pub mod pipeline_config;
pub mod trends;

use tracing_subscriber::EnvFilter;

/// Install the global fmt subscriber. Logs go to stderr so stdout stays
/// free for JSON output. Safe to call more than once.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .with_writer(std::io::stderr)
        .try_init();
}
