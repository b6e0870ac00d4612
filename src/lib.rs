pub mod config;
pub mod models;
pub mod triage;

use tracing_subscriber::EnvFilter;

pub use models::{PatientRecord, TriageResult};
pub use triage::{TriageError, TriageOrchestrator};

/// Install the global tracing subscriber. Logs go to stderr so stdout stays
/// free for results. Safe to call more than once; later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .with_writer(std::io::stderr)
        .try_init();

    tracing::debug!("{} v{} tracing initialised", config::APP_NAME, config::APP_VERSION);
}
