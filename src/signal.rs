//! Non-local exits.
//!
//! Lifecycle steps and command actions return [`Flow`]; an `Err` unwinds
//! through every caller untouched until the runner maps it to an exit code.

use std::fmt;

use crate::error::{CliError, ConfigError};

/// Closed set of early-exit markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlSignal {
    /// Help text was printed for the resolved command.
    HelpRequested,
    /// A command without its own action printed its usage.
    SubcommandHandled,
    /// A user-facing error was already rendered.
    ReportedError,
    /// Exit with an explicit process code.
    ExitWithCode(i32),
}

impl ControlSignal {
    pub fn exit_code(self) -> i32 {
        match self {
            Self::HelpRequested | Self::SubcommandHandled => 0,
            Self::ReportedError => 1,
            Self::ExitWithCode(code) => code,
        }
    }
}

/// Anything that stops an invocation before its action completes normally.
#[derive(Debug)]
pub enum Abort {
    Signal(ControlSignal),
    /// Unrecoverable configuration corruption; bypasses signal handling.
    Fatal(ConfigError),
    /// A defect, never a user-correctable condition.
    Fault(CliError),
}

impl fmt::Display for Abort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Signal(signal) => write!(f, "signal: {signal:?}"),
            Self::Fatal(e) => write!(f, "fatal: {e}"),
            Self::Fault(e) => write!(f, "fault: {e}"),
        }
    }
}

impl From<ControlSignal> for Abort {
    fn from(signal: ControlSignal) -> Self {
        Self::Signal(signal)
    }
}

impl From<CliError> for Abort {
    fn from(e: CliError) -> Self {
        Self::Fault(e)
    }
}

impl From<std::io::Error> for Abort {
    fn from(e: std::io::Error) -> Self {
        Self::Fault(CliError::from(e))
    }
}

/// Result type of lifecycle steps and command actions.
pub type Flow<T = ()> = Result<T, Abort>;
