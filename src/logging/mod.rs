use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, Layer, fmt, prelude::*};

use crate::config::LogFormat;

const LOG_FILE_PREFIX: &str = "glued.log";

pub struct LoggingConfig {
    pub level: Level,
    pub file_output: bool,
    pub console_output: bool,
    pub log_dir: Option<PathBuf>,
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            file_output: true,
            console_output: true,
            log_dir: None,
            json_format: false,
        }
    }
}

impl LoggingConfig {
    /// Console and rotated file logging for the daemon
    pub fn daemon(level: Level, format: LogFormat) -> Self {
        Self {
            level,
            json_format: format == LogFormat::Json,
            ..Self::default()
        }
    }

    /// Console-only logging for one-shot CLI commands
    pub fn console(level: Level) -> Self {
        Self {
            level,
            file_output: false,
            ..Self::default()
        }
    }
}

/// Only the crate's own events pass; `RUST_LOG` overrides when set.
fn build_filter(level: Level) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("glued={}", level.as_str().to_lowercase())))
}

/// Install the global subscriber.
///
/// Returns the file writer's guard (keep it alive for the life of the
/// process) and the directory logs are written to.
pub fn initialize_logging(config: LoggingConfig) -> Result<(Option<WorkerGuard>, Option<PathBuf>)> {
    let mut layers = Vec::new();
    let mut guard = None;

    if config.console_output {
        let console_layer = if config.json_format {
            fmt::layer()
                .json()
                .with_target(true)
                .with_thread_names(true)
                .with_file(true)
                .with_line_number(true)
                .boxed()
        } else {
            fmt::layer()
                .with_target(false)
                .with_thread_names(false)
                .boxed()
        };
        layers.push(console_layer);
    }

    let log_dir = if config.file_output {
        let dir = match config.log_dir.clone() {
            Some(dir) => dir,
            None => get_default_log_dir()?,
        };
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create log directory: {}", dir.display()))?;

        let file_appender = tracing_appender::rolling::daily(&dir, LOG_FILE_PREFIX);
        let (non_blocking, worker_guard) = tracing_appender::non_blocking(file_appender);
        guard = Some(worker_guard);

        let file_layer = if config.json_format {
            fmt::layer()
                .json()
                .with_target(true)
                .with_thread_names(true)
                .with_file(true)
                .with_line_number(true)
                .with_writer(non_blocking)
                .boxed()
        } else {
            fmt::layer()
                .with_ansi(false)
                .with_target(true)
                .with_thread_names(true)
                .with_file(true)
                .with_line_number(true)
                .with_writer(non_blocking)
                .boxed()
        };
        layers.push(file_layer);

        Some(dir)
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(build_filter(config.level))
        .with(layers)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok((guard, log_dir))
}

pub fn get_default_log_dir() -> Result<PathBuf> {
    let home_dir = dirs::home_dir().context("Failed to get home directory")?;
    Ok(home_dir.join(".local/share/glued/logs"))
}

/// Remove rotated log files older than `keep_days`. Returns how many were removed.
pub fn cleanup_old_logs(log_dir: &Path, keep_days: u64) -> Result<usize> {
    if !log_dir.exists() {
        return Ok(0);
    }

    let cutoff_time = SystemTime::now() - Duration::from_secs(60 * 60 * 24 * keep_days);
    let mut cleaned_count = 0;

    for entry in std::fs::read_dir(log_dir)? {
        let entry = entry?;
        let path = entry.path();

        let is_log = path.is_file()
            && path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with(LOG_FILE_PREFIX));
        if !is_log {
            continue;
        }

        let Ok(modified) = entry.metadata().and_then(|m| m.modified()) else {
            continue;
        };
        if modified >= cutoff_time {
            continue;
        }

        match std::fs::remove_file(&path) {
            Ok(()) => {
                cleaned_count += 1;
                tracing::debug!("Removed old log file: {}", path.display());
            }
            Err(e) => tracing::warn!("Failed to remove old log file {}: {}", path.display(), e),
        }
    }

    if cleaned_count > 0 {
        tracing::info!(
            "Cleaned up {} old log files from {}",
            cleaned_count,
            log_dir.display()
        );
    }

    Ok(cleaned_count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_console_config_disables_file_output() {
        let config = LoggingConfig::console(Level::DEBUG);
        assert_eq!(config.level, Level::DEBUG);
        assert!(config.console_output);
        assert!(!config.file_output);
    }

    #[test]
    fn test_daemon_config_follows_log_format() {
        let text = LoggingConfig::daemon(Level::INFO, LogFormat::Text);
        assert!(text.file_output);
        assert!(!text.json_format);

        let json = LoggingConfig::daemon(Level::WARN, LogFormat::Json);
        assert_eq!(json.level, Level::WARN);
        assert!(json.json_format);
        assert!(json.console_output);
    }

    #[test]
    fn test_cleanup_missing_dir_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent");
        assert_eq!(cleanup_old_logs(&missing, 7).unwrap(), 0);
    }

    #[test]
    fn test_cleanup_keeps_recent_and_foreign_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("glued.log.2026-10-14"), "recent").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "not a log").unwrap();

        assert_eq!(cleanup_old_logs(dir.path(), 7).unwrap(), 0);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 2);
    }

    #[test]
    fn test_default_log_dir_location() {
        if let Ok(dir) = get_default_log_dir() {
            assert!(dir.ends_with(".local/share/glued/logs"));
        }
    }
}
