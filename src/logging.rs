use std::fs;
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry,
};

use crate::error::{SatchelError, SatchelResult};

/// Logging configuration for SATCHEL
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub log_dir: PathBuf,
    pub enable_file_logging: bool,
    /// Console output corrupts the alternate screen, so the TUI turns this off
    pub enable_console: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_dir: PathBuf::from("logs"),
            enable_file_logging: true,
            enable_console: true,
        }
    }
}

impl LoggingConfig {
    pub fn for_tui(state_dir: &std::path::Path) -> Self {
        Self {
            log_dir: state_dir.join("logs"),
            enable_console: false,
            ..Self::default()
        }
    }

    pub fn for_cli(state_dir: &std::path::Path) -> Self {
        Self {
            log_dir: state_dir.join("logs"),
            ..Self::default()
        }
    }
}

/// Initialize the logging system. The returned guard must stay alive for the
/// duration of the program or buffered file logs are dropped.
pub fn init_logging(config: &LoggingConfig) -> SatchelResult<Option<WorkerGuard>> {
    if config.enable_file_logging {
        fs::create_dir_all(&config.log_dir)
            .map_err(|e| SatchelError::storage(config.log_dir.to_string_lossy(), e))?;
    }

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "satchel={level},satchel_tui={level},reqwest=warn,hyper=warn",
            level = config.level
        ))
    });

    let registry = Registry::default().with(env_filter);

    let mut guard = None;
    let file_layer = if config.enable_file_logging {
        let file_appender = rolling::daily(&config.log_dir, "satchel.log");
        let (file_writer, file_guard) = non_blocking(file_appender);
        guard = Some(file_guard);
        Some(
            fmt::layer()
                .with_writer(file_writer)
                .with_ansi(false)
                .boxed(),
        )
    } else {
        None
    };

    let console_layer = if config.enable_console {
        Some(fmt::layer().with_target(false).boxed())
    } else {
        None
    };

    registry.with(file_layer).with(console_layer).init();

    Ok(guard)
}
