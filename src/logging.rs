use std::{
    fs,
    path::{Path, PathBuf},
    time::{Duration, SystemTime},
};

use anyhow::{Context, Result, anyhow};
use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling::{self, RollingFileAppender},
};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, Layer, filter::LevelFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt,
};

use crate::config::{LoggingConfig, LoggingRotation};

const LOG_FILE_PREFIX: &str = "lexscore.log";

/// Keeps the non-blocking log writer alive. Dropping it flushes and stops
/// the background worker, so hold it for the life of the process.
pub struct LoggingGuard {
    _worker_guard: WorkerGuard,
}

/// Installs the global subscriber: a JSON rolling file layer filtered by
/// `logging.filter`, plus a plain stderr layer for WARN and above when
/// enabled. Expired log files are swept before the first line is written.
pub fn init_tracing(logging_config: &LoggingConfig) -> Result<LoggingGuard> {
    if logging_config.filter.trim().is_empty() {
        return Err(anyhow!("logging.filter cannot be empty"));
    }
    if logging_config.dir.as_os_str().is_empty() {
        return Err(anyhow!("logging.dir cannot be empty"));
    }
    let env_filter = build_env_filter(&logging_config.filter)?;

    let log_dir = resolve_log_dir(&logging_config.dir)?;
    fs::create_dir_all(&log_dir)
        .with_context(|| format!("failed to create logging directory {}", log_dir.display()))?;

    let (swept, sweep_warnings) = sweep_expired_logs(
        &log_dir,
        LOG_FILE_PREFIX,
        logging_config.retention_days,
        SystemTime::now(),
    );

    let appender = match logging_config.rotation {
        LoggingRotation::Daily => rolling::daily(&log_dir, LOG_FILE_PREFIX),
        LoggingRotation::Hourly => rolling::hourly(&log_dir, LOG_FILE_PREFIX),
    };
    let (writer, worker_guard) = tracing_appender::non_blocking(appender);

    let file_layer = fmt::layer()
        .json()
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .with_target(true)
        .with_current_span(true)
        .with_span_list(true)
        .with_ansi(false)
        .with_writer(writer)
        .with_filter(env_filter);
    let stderr_layer = logging_config.stderr_warn_enabled.then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_filter(LevelFilter::WARN)
    });

    tracing_subscriber::registry()
        .with(ErrorLayer::default())
        .with(file_layer)
        .with(stderr_layer)
        .try_init()
        .context("failed to initialize tracing subscriber")?;

    tracing::info!(
        target: "logging",
        dir = %log_dir.display(),
        filter = %logging_config.filter,
        rotation = ?logging_config.rotation,
        retention_days = logging_config.retention_days,
        swept_log_files = swept,
        "logging_initialized"
    );
    for warning in sweep_warnings {
        tracing::warn!(target: "logging", warning = %warning, "log_sweep_warning");
    }

    Ok(LoggingGuard {
        _worker_guard: worker_guard,
    })
}

fn build_env_filter(filter: &str) -> Result<EnvFilter> {
    EnvFilter::try_new(filter)
        .with_context(|| format!("failed to parse logging.filter '{}'", filter))
}

fn resolve_log_dir(dir: &Path) -> Result<PathBuf> {
    if dir.is_absolute() {
        return Ok(dir.to_path_buf());
    }
    Ok(std::env::current_dir()
        .context("failed to resolve logging.dir against the working directory")?
        .join(dir))
}

/// Deletes rotated log files older than the retention window. Only files
/// whose name starts with `prefix` are candidates. Runs before the
/// subscriber exists, so problems are returned for the caller to log, and a
/// sweep failure never blocks startup.
fn sweep_expired_logs(
    log_dir: &Path,
    prefix: &str,
    retention_days: usize,
    now: SystemTime,
) -> (usize, Vec<String>) {
    let retention = Duration::from_secs(retention_days.saturating_mul(24 * 60 * 60) as u64);
    let cutoff = now.checked_sub(retention).unwrap_or(SystemTime::UNIX_EPOCH);

    let mut removed = 0usize;
    let mut warnings = Vec::new();
    let entries = match fs::read_dir(log_dir) {
        Ok(entries) => entries,
        Err(err) => {
            warnings.push(format!(
                "failed to scan logging directory {}: {err}",
                log_dir.display()
            ));
            return (removed, warnings);
        }
    };

    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warnings.push(format!("failed to read a logging directory entry: {err}"));
                continue;
            }
        };
        if !entry.file_name().to_string_lossy().starts_with(prefix) {
            continue;
        }

        match log_file_mtime(&entry) {
            Ok(Some(modified)) if modified <= cutoff => {
                match fs::remove_file(entry.path()) {
                    Ok(()) => removed += 1,
                    Err(err) => warnings.push(format!(
                        "failed to remove expired log file {}: {err}",
                        entry.path().display()
                    )),
                }
            }
            Ok(_) => {}
            Err(warning) => warnings.push(warning),
        }
    }

    (removed, warnings)
}

/// Modification time of a candidate file, `None` for non-files.
fn log_file_mtime(entry: &fs::DirEntry) -> Result<Option<SystemTime>, String> {
    let metadata = entry
        .metadata()
        .map_err(|err| format!("failed to stat {}: {err}", entry.path().display()))?;
    if !metadata.is_file() {
        return Ok(None);
    }
    metadata
        .modified()
        .map(Some)
        .map_err(|err| format!("failed to read mtime for {}: {err}", entry.path().display()))
}
