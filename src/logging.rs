//! Logging configuration for the driver.
//!
//! The driver logs through `tracing`. Applications that install their own
//! subscriber need nothing from this module. Otherwise a `tracing-subscriber`
//! with stderr or file output can be installed here.
//!
//! ## Configuration priority
//!
//! 1. `LogConfig::level` / `LogConfig::file` (or `DATA_API_LOG_LEVEL` /
//!    `DATA_API_LOG_FILE` when driven from the environment)
//! 2. `RUST_LOG` environment variable
//! 3. Default: `warn`

use std::fs::OpenOptions;
use std::io;
use std::sync::{Mutex, OnceLock};
use tracing_subscriber::{
    fmt::{self, time::SystemTime, writer::BoxMakeWriter},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

pub const LOG_LEVEL_ENV: &str = "DATA_API_LOG_LEVEL";
pub const LOG_FILE_ENV: &str = "DATA_API_LOG_FILE";

static LOGGING_INITIALIZED: OnceLock<()> = OnceLock::new();

#[derive(Debug, Clone, Default)]
pub struct LogConfig {
    /// Log level: "OFF", "ERROR", "WARN", "INFO", "DEBUG", "TRACE".
    pub level: Option<String>,
    /// Log file path. If unset, logs go to stderr.
    pub file: Option<String>,
}

impl LogConfig {
    pub fn from_env() -> Self {
        Self {
            level: std::env::var(LOG_LEVEL_ENV).ok().filter(|v| !v.is_empty()),
            file: std::env::var(LOG_FILE_ENV).ok().filter(|v| !v.is_empty()),
        }
    }

    /// True when the caller asked for driver-managed logging.
    pub fn is_configured(&self) -> bool {
        self.level.is_some() || self.file.is_some()
    }

    fn is_off(&self) -> bool {
        self.level
            .as_deref()
            .is_some_and(|level| level.eq_ignore_ascii_case("off"))
    }

    /// Output target: the log file (appended, no colors) or stderr.
    fn writer(&self) -> io::Result<(BoxMakeWriter, bool)> {
        match self.file {
            Some(ref path) => {
                let file = OpenOptions::new().create(true).append(true).open(path)?;
                Ok((BoxMakeWriter::new(Mutex::new(file)), false))
            }
            None => Ok((BoxMakeWriter::new(io::stderr), true)),
        }
    }

    fn filter(&self) -> EnvFilter {
        match self.level {
            Some(ref level) => EnvFilter::new(format!("data_api={}", level.to_lowercase())),
            None => EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("data_api=warn")),
        }
    }
}

/// Install the subscriber described by `DATA_API_LOG_LEVEL` / `DATA_API_LOG_FILE`.
///
/// Does nothing when neither variable is set, so applications keep control
/// of their own subscriber.
pub fn init_from_env() {
    let config = LogConfig::from_env();
    if config.is_configured() {
        init_logging(&config);
    }
}

/// Initialize the tracing subscriber.
///
/// Uses `OnceLock` to ensure this runs at most once per process; later
/// calls are no-ops. A subscriber installed by the application wins.
pub fn init_logging(config: &LogConfig) {
    LOGGING_INITIALIZED.get_or_init(|| {
        if config.is_off() {
            return;
        }

        let (writer, ansi) = match config.writer() {
            Ok(w) => w,
            Err(e) => {
                eprintln!("data-api: failed to open log file: {}", e);
                return;
            }
        };

        tracing_subscriber::registry()
            .with(config.filter())
            .with(
                fmt::layer()
                    .with_writer(writer)
                    .with_ansi(ansi)
                    .with_timer(SystemTime),
            )
            .try_init()
            .ok();
    });
}
