//! Tracing subscriber setup.
//!
//! The full-screen view owns the terminal, so its logs go to a daily file
//! under the kgx home directory. Every other command logs to stderr.

use std::env;
use std::io;

use kgx_core::config::{LoggingConfig, paths};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::EnvFilter;

/// Env var that overrides `[logging] filter`.
pub const LOG_ENV: &str = "KGX_LOG";

const LOG_FILE_PREFIX: &str = "kgx.log";

/// Installs the global subscriber. Keep the returned guard alive until exit
/// so buffered file output is flushed.
pub fn init(config: &LoggingConfig, tui: bool) -> Option<WorkerGuard> {
    let filter = match env::var(LOG_ENV) {
        Ok(value) if !value.trim().is_empty() => EnvFilter::new(value),
        _ => EnvFilter::new(&config.filter),
    };

    if tui {
        if !config.file {
            return None;
        }
        let Ok(appender) = RollingFileAppender::builder()
            .rotation(Rotation::DAILY)
            .filename_prefix(LOG_FILE_PREFIX)
            .build(paths::logs_dir())
        else {
            return None;
        };
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let installed = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(writer)
            .with_ansi(false)
            .try_init();
        return installed.is_ok().then_some(guard);
    }

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
    None
}
