//! Log levels and the runtime-adjustable tracing subscriber.
//!
//! `main` installs one fmt subscriber on stderr behind a reload layer; the
//! resulting [`LogHandle`] is owned by the invocation so the lifecycle can
//! change the level after the config file is read.

use std::fmt;

use tracing::level_filters::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt as tracing_fmt, reload, Registry};

/// Log level accepted by `--logLevel` and `stowage.logLevel`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Parse a level name; `fatal` and `panic` map to [`LogLevel::Error`].
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "trace" => Some(Self::Trace),
            "debug" => Some(Self::Debug),
            "info" => Some(Self::Info),
            "warn" | "warning" => Some(Self::Warn),
            "error" | "fatal" | "panic" => Some(Self::Error),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }

    pub fn filter(self) -> LevelFilter {
        match self {
            Self::Error => LevelFilter::ERROR,
            Self::Warn => LevelFilter::WARN,
            Self::Info => LevelFilter::INFO,
            Self::Debug => LevelFilter::DEBUG,
            Self::Trace => LevelFilter::TRACE,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Handle to the active logger's level.
pub struct LogHandle {
    reload: Option<reload::Handle<LevelFilter, Registry>>,
    level: LogLevel,
}

impl LogHandle {
    /// Install the process-wide subscriber at `level`.
    ///
    /// If a subscriber is already installed the handle is detached and level
    /// changes only update the recorded value.
    pub fn init(level: LogLevel) -> Self {
        let (filter, handle) = reload::Layer::new(level.filter());
        let installed = tracing_subscriber::registry()
            .with(filter)
            .with(tracing_fmt::layer().with_writer(std::io::stderr))
            .try_init()
            .is_ok();
        Self {
            reload: installed.then_some(handle),
            level,
        }
    }

    /// Handle not connected to any subscriber.
    pub fn detached(level: LogLevel) -> Self {
        Self {
            reload: None,
            level,
        }
    }

    pub fn level(&self) -> LogLevel {
        self.level
    }

    pub fn set_level(&mut self, level: LogLevel) {
        self.level = level;
        if let Some(handle) = &self.reload {
            if let Err(err) = handle.reload(level.filter()) {
                tracing::warn!(%err, "failed to update log level");
            }
        }
    }
}

impl fmt::Debug for LogHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogHandle")
            .field("level", &self.level)
            .field("attached", &self.reload.is_some())
            .finish()
    }
}
