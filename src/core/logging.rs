use std::sync::OnceLock;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::core::config::AppPaths;

pub const LOG_FILE_PREFIX: &str = "ragswitch.log";
const LOG_ENV_VAR: &str = "RAGSWITCH_LOG";
const DEFAULT_DIRECTIVE: &str = "info,sqlx=warn";

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Installs stdout and daily-rolling file output under `paths.log_dir`.
pub fn init(paths: &AppPaths) {
    let _ = std::fs::create_dir_all(&paths.log_dir);

    let file_appender = tracing_appender::rolling::daily(&paths.log_dir, LOG_FILE_PREFIX);
    let (writer, guard) = tracing_appender::non_blocking(file_appender);
    let _ = LOG_GUARD.set(guard);

    let filter = env_filter(
        std::env::var(LOG_ENV_VAR)
            .ok()
            .or_else(|| std::env::var("RUST_LOG").ok())
            .as_deref(),
    );

    // Tests and embedders may already own the global subscriber.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer),
        )
        .try_init();
}

/// Parses `directive`, falling back to the default when it is absent or invalid.
fn env_filter(directive: Option<&str>) -> EnvFilter {
    directive
        .filter(|raw| !raw.trim().is_empty())
        .and_then(|raw| EnvFilter::try_new(raw).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_DIRECTIVE))
}
