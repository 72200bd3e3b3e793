//! Console + rotating file logging
//!
//! `RUST_LOG` overrides the configured filter for both outputs.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt::{self, time::ChronoUtc},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

/// Prefix of every log file this service writes
pub const LOG_FILE_PREFIX: &str = "analytics_feeder";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub log_dir: String,
    /// Filter directive, e.g. "info,analytics_feeder=debug"
    pub level_filter: String,
    pub rotation: LogRotation,
    pub console_timestamps: bool,
    /// Structured JSON lines in the file output
    pub file_json_format: bool,
    /// Log files older than this are removed at startup (0 keeps everything)
    pub retention_days: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    Daily,
    Hourly,
    Never,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_dir: "logs".to_string(),
            level_filter: "info,analytics_feeder=info".to_string(),
            rotation: LogRotation::Daily,
            console_timestamps: true,
            file_json_format: true,
            retention_days: 7,
        }
    }
}

fn filter_for(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level_filter))
}

/// Install console and file layers.
///
/// The returned guard flushes the background file writer when dropped, so keep
/// it alive for the lifetime of the process.
pub fn init_dual_logging(config: &LoggingConfig) -> Result<WorkerGuard, Box<dyn std::error::Error + Send + Sync>> {
    std::fs::create_dir_all(&config.log_dir)?;

    let file_name = format!("{}.log", LOG_FILE_PREFIX);
    let file_appender = match config.rotation {
        LogRotation::Daily => tracing_appender::rolling::daily(&config.log_dir, file_name),
        LogRotation::Hourly => tracing_appender::rolling::hourly(&config.log_dir, file_name),
        LogRotation::Never => tracing_appender::rolling::never(&config.log_dir, file_name),
    };
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let console_timer = if config.console_timestamps {
        ChronoUtc::new("%Y-%m-%d %H:%M:%S%.3f UTC".to_string())
    } else {
        ChronoUtc::new(String::new())
    };
    let console_layer = fmt::layer()
        .with_writer(std::io::stdout)
        .with_ansi(true)
        .with_target(true)
        .with_timer(console_timer)
        .with_filter(filter_for(config));

    let file_layer = if config.file_json_format {
        fmt::layer()
            .json()
            .with_writer(file_writer)
            .with_ansi(false)
            .with_thread_names(true)
            .with_timer(ChronoUtc::new("%Y-%m-%dT%H:%M:%S%.3fZ".to_string()))
            .with_filter(filter_for(config))
            .boxed()
    } else {
        fmt::layer()
            .with_writer(file_writer)
            .with_ansi(false)
            .with_thread_names(true)
            .with_timer(ChronoUtc::new("%Y-%m-%d %H:%M:%S%.3f UTC".to_string()))
            .with_filter(filter_for(config))
            .boxed()
    };

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .try_init()?;

    tracing::info!(
        log_dir = %config.log_dir,
        rotation = ?config.rotation,
        json_format = config.file_json_format,
        "📁 Logging to console and {}/{}.*", config.log_dir, LOG_FILE_PREFIX
    );

    Ok(guard)
}

/// Console-only logging for tools and tests
pub fn init_simple_logging(level_filter: &str) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level_filter)))
        .try_init()?;
    tracing::info!("🖥️ Console logging initialized");
    Ok(())
}

fn is_service_log(path: &Path) -> bool {
    path.is_file()
        && path
            .file_name()
            .and_then(|name| name.to_str())
            .map(|name| name.starts_with(LOG_FILE_PREFIX) && name.contains(".log"))
            .unwrap_or(false)
}

/// Service log files in `log_dir`, sorted by name
pub fn list_log_files(log_dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(log_dir)
        .map(|entries| entries.flatten().map(|e| e.path()).filter(|p| is_service_log(p)).collect())
        .unwrap_or_default();
    files.sort();
    files
}

/// Remove service log files last modified more than `keep_days` ago
pub fn cleanup_old_logs(log_dir: &Path, keep_days: u32) -> Result<usize, std::io::Error> {
    if keep_days == 0 || !log_dir.exists() {
        return Ok(0);
    }
    let max_age = Duration::from_secs(u64::from(keep_days) * 24 * 3600);
    let now = SystemTime::now();
    let mut removed = 0;

    for path in list_log_files(log_dir) {
        let modified = path.metadata()?.modified()?;
        let age = now.duration_since(modified).unwrap_or_default();
        if age > max_age {
            std::fs::remove_file(&path)?;
            removed += 1;
            tracing::debug!("🗑️ Removed old log file: {:?}", path);
        }
    }

    if removed > 0 {
        tracing::info!("🧹 Cleaned up {} log files older than {} days", removed, keep_days);
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_logging_config_default() {
        let config = LoggingConfig::default();
        assert_eq!(config.log_dir, "logs");
        assert_eq!(config.rotation, LogRotation::Daily);
        assert!(config.level_filter.contains("analytics_feeder"));
        assert_eq!(config.retention_days, 7);
    }

    #[test]
    fn test_rotation_from_toml() {
        let config: LoggingConfig = toml::from_str("rotation = \"hourly\"\nfile_json_format = false").unwrap();
        assert_eq!(config.rotation, LogRotation::Hourly);
        assert!(!config.file_json_format);
        assert_eq!(config.log_dir, "logs");
    }

    #[test]
    fn test_dual_logging_writes_to_log_dir() {
        let temp_dir = TempDir::new().unwrap();
        let log_dir = temp_dir.path().join("nested");
        let config = LoggingConfig {
            log_dir: log_dir.to_string_lossy().to_string(),
            rotation: LogRotation::Never,
            ..Default::default()
        };

        // Another test may already own the global subscriber
        if let Ok(guard) = init_dual_logging(&config) {
            tracing::info!("logging test line");
            drop(guard);
            assert_eq!(list_log_files(&log_dir).len(), 1);
        }
        assert!(log_dir.is_dir());
    }

    #[test]
    fn test_list_log_files_filters_foreign_files() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path();
        std::fs::write(dir.join("analytics_feeder.log.2025-01-02"), "b").unwrap();
        std::fs::write(dir.join("analytics_feeder.log.2025-01-01"), "a").unwrap();
        std::fs::write(dir.join("other.log"), "x").unwrap();

        let files = list_log_files(dir);
        assert_eq!(files.len(), 2);
        assert!(files[0].to_string_lossy().ends_with("2025-01-01"));
    }

    #[test]
    fn test_cleanup_keeps_fresh_files() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path();
        std::fs::write(dir.join("analytics_feeder.log.today"), "fresh").unwrap();

        assert_eq!(cleanup_old_logs(dir, 7).unwrap(), 0);
        assert_eq!(cleanup_old_logs(dir, 0).unwrap(), 0);
        assert_eq!(list_log_files(dir).len(), 1);
        assert_eq!(cleanup_old_logs(&dir.join("missing"), 7).unwrap(), 0);
    }
}
