//! Logging setup.
//!
//! Logs go to stderr; when a log directory is configured, a daily rolling
//! file receives a copy as well.
//!
//! Log level can be controlled via the `CLIPSCORE_LOG` environment variable:
//! - `CLIPSCORE_LOG=debug` for per-pair scores and timings
//! - `CLIPSCORE_LOG=info` for standard output (default)
//! - `CLIPSCORE_LOG=warn` for warnings and errors only

use anyhow::Result;
use std::path::PathBuf;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the logging system.
pub fn init(log_dir: Option<PathBuf>) -> Result<()> {
    let env_filter =
        EnvFilter::try_from_env("CLIPSCORE_LOG").unwrap_or_else(|_| EnvFilter::new("info"));

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(&dir)?;
            let file_appender = tracing_appender::rolling::daily(&dir, "clipscore.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

            // Store the guard in a static to prevent it from being dropped
            // This is safe because we only call init() once at startup
            static GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> =
                std::sync::OnceLock::new();
            let _ = GUARD.set(guard);

            tracing_subscriber::registry()
                .with(env_filter)
                .with(stderr_layer)
                .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
                .init();

            tracing::info!(dir = ?dir, "Logging initialized with file copy");
        }
        None => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(stderr_layer)
                .init();
        }
    }

    Ok(())
}
