//! Logging configuration

use std::path::{Path, PathBuf};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    filter::LevelFilter,
    fmt,
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

use crate::errors::DeployError;

/// Log level configuration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn to_filter_string(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            _ => Err(format!("Invalid log level: {}", s)),
        }
    }
}

/// Logging options
#[derive(Debug, Clone)]
pub struct LogOptions {
    /// Log level
    pub log_level: LogLevel,

    /// Write logs to stdout
    pub stdout: bool,

    /// Directory for the run log and error log
    pub log_dir: PathBuf,

    /// Enable JSON format for the file logs
    pub json_format: bool,
}

impl Default for LogOptions {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            stdout: true,
            log_dir: PathBuf::from("logs"),
            json_format: false,
        }
    }
}

/// Where this run's logs end up. Dropping it flushes the file writers.
pub struct LogFiles {
    run_log: PathBuf,
    error_log: PathBuf,
    _guards: Vec<WorkerGuard>,
}

impl LogFiles {
    pub fn run_log(&self) -> &Path {
        &self.run_log
    }

    pub fn error_log(&self) -> &Path {
        &self.error_log
    }
}

/// File names for one run, stamped so repeated runs never clobber each other
pub fn log_file_names(stamp: &str) -> (String, String) {
    (
        format!("ipam_deploy_{}.log", stamp),
        format!("ipam_deploy_{}.error.log", stamp),
    )
}

/// Initialize logging: stdout plus a full run log and an error-only log
pub fn init_logging(options: LogOptions) -> Result<LogFiles, DeployError> {
    std::fs::create_dir_all(&options.log_dir)?;

    let stamp = chrono::Local::now().format("%Y%m%d%H%M%S").to_string();
    let (run_name, error_name) = log_file_names(&stamp);

    let (run_writer, run_guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::never(&options.log_dir, &run_name));
    let (error_writer, error_guard) = tracing_appender::non_blocking(
        tracing_appender::rolling::never(&options.log_dir, &error_name),
    );

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(options.log_level.to_filter_string()));

    let stdout_layer = options.stdout.then(|| fmt::layer().with_target(false));

    let run_layer = if options.json_format {
        fmt::layer().json().with_writer(run_writer).boxed()
    } else {
        fmt::layer().with_ansi(false).with_writer(run_writer).boxed()
    };

    let error_layer = fmt::layer()
        .with_ansi(false)
        .with_writer(error_writer)
        .with_filter(LevelFilter::ERROR);

    tracing_subscriber::registry()
        .with(filter)
        .with(stdout_layer)
        .with(run_layer)
        .with(error_layer)
        .try_init()
        .map_err(|e| DeployError::ConfigError(e.to_string()))?;

    Ok(LogFiles {
        run_log: options.log_dir.join(run_name),
        error_log: options.log_dir.join(error_name),
        _guards: vec![run_guard, error_guard],
    })
}
