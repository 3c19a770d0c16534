use std::path::PathBuf;
use std::sync::OnceLock;

use lucid_core::LogSettings;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const LOG_FILE_NAME: &str = "lucid.log";
const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    pub dir: PathBuf,
    pub file_name: String,
    pub level: String,
    pub stdout: bool,
}

/// `dir` comes from [`crate::paths::LucidPaths::log_dir`].
pub fn log_config(dir: PathBuf, log: &LogSettings) -> LogConfig {
    let level = log
        .level
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(DEFAULT_LOG_LEVEL)
        .to_string();
    LogConfig {
        dir,
        file_name: LOG_FILE_NAME.to_string(),
        level,
        stdout: log.stdout.unwrap_or(false),
    }
}

/// Installs the file subscriber once per process. `RUST_LOG` wins over the
/// configured level.
pub fn init_tracing(config: &LogConfig) {
    static TRACE_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

    if let Err(error) = std::fs::create_dir_all(&config.dir) {
        eprintln!(
            "warning: failed to create log directory {}: {error}",
            config.dir.display()
        );
        return;
    }
    let appender = tracing_appender::rolling::never(&config.dir, &config.file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(appender);
    let _ = TRACE_GUARD.set(guard);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config.level.clone()));
    let file_layer = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_writer(non_blocking);

    let init_result = if config.stdout {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(file_layer)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(file_layer)
            .try_init()
    };
    if let Err(error) = init_result {
        eprintln!(
            "warning: failed to initialize tracing subscriber for {}: {error}",
            config.dir.join(&config.file_name).display()
        );
    }
}
