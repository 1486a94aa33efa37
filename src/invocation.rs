//! Per-process invocation state threaded through the lifecycle and actions.

use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::fmt::Display;
use std::io::{self, IsTerminal, Write};

use crate::cli::ParsedFlags;
use crate::client::{ErrorStream, StorageClient};
use crate::config::ConfigStore;
use crate::lifecycle::Step;
use crate::logging::{LogHandle, LogLevel};
use crate::permission::CommandIdentity;
use crate::presenter;
use crate::signal::{Abort, ControlSignal};

/// Request-scoped values visible to nested operations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    pub log_level: Option<LogLevel>,
    /// Storage operations are queued and their failures streamed asynchronously.
    pub run_async: bool,
}

/// Where environment variables are read from and published to.
#[derive(Debug, Clone)]
pub enum EnvSource {
    Process,
    Fixed(BTreeMap<String, String>),
}

impl EnvSource {
    pub fn get(&self, name: &str) -> Option<String> {
        match self {
            Self::Process => std::env::var(name).ok(),
            Self::Fixed(vars) => vars.get(name).cloned(),
        }
    }

    pub fn set(&mut self, name: &str, value: &str) {
        match self {
            Self::Process => std::env::set_var(name, value),
            Self::Fixed(vars) => {
                vars.insert(name.to_string(), value.to_string());
            }
        }
    }
}

/// Output sinks plus the stderr terminal capability.
pub struct Streams {
    pub stdout: Box<dyn Write>,
    pub stderr: Box<dyn Write>,
    pub stderr_is_terminal: bool,
}

impl Streams {
    pub fn process() -> Self {
        Self {
            stdout: Box::new(io::stdout()),
            stderr: Box::new(io::stderr()),
            stderr_is_terminal: color_enabled(
                io::stderr().is_terminal(),
                std::env::var_os("NO_COLOR").as_deref(),
            ),
        }
    }
}

/// A terminal gets styled output unless `NO_COLOR` is set to a non-empty value.
fn color_enabled(is_terminal: bool, no_color: Option<&OsStr>) -> bool {
    is_terminal && no_color.map_or(true, OsStr::is_empty)
}

/// Mutable state for one run, owned by the runner.
pub struct Invocation {
    /// Arguments after the program name; kept for re-parsing flags.
    pub args: Vec<String>,
    pub command: CommandIdentity,
    pub flags: ParsedFlags,
    pub config: ConfigStore,
    pub logger: LogHandle,
    pub context: RequestContext,
    pub env: EnvSource,
    pub stdout: Box<dyn Write>,
    pub stderr: Box<dyn Write>,
    pub stderr_is_terminal: bool,
    pub client: Option<Box<dyn StorageClient>>,
    pub errors: Option<ErrorStream>,
    /// Lifecycle steps in the order they ran.
    pub trace: Vec<Step>,
}

impl Invocation {
    pub fn new(args: Vec<String>, env: EnvSource, streams: Streams, logger: LogHandle) -> Self {
        let mut config = ConfigStore::with_defaults();
        config.apply_env_tier(|name| env.get(name));
        Self {
            args,
            command: CommandIdentity::from_path(&[]),
            flags: ParsedFlags::default(),
            config,
            logger,
            context: RequestContext::default(),
            env,
            stdout: streams.stdout,
            stderr: streams.stderr,
            stderr_is_terminal: streams.stderr_is_terminal,
            client: None,
            errors: None,
            trace: Vec::new(),
        }
    }

    /// Render `err` on stderr and return the signal that unwinds without
    /// further reporting.
    pub fn report(&mut self, err: &dyn Display) -> Abort {
        if let Err(io_err) = presenter::render(err, self.stderr_is_terminal, &mut self.stderr) {
            tracing::warn!(%io_err, "failed to write error report");
        }
        Abort::Signal(ControlSignal::ReportedError)
    }

    /// Print `text` on stdout, ensuring a trailing newline.
    pub fn print(&mut self, text: &str) -> io::Result<()> {
        self.stdout.write_all(text.as_bytes())?;
        if !text.ends_with('\n') {
            self.stdout.write_all(b"\n")?;
        }
        Ok(())
    }

    pub fn flush(&mut self) {
        if let Err(err) = self.stdout.flush() {
            tracing::debug!(%err, "failed to flush stdout");
        }
        if let Err(err) = self.stderr.flush() {
            tracing::debug!(%err, "failed to flush stderr");
        }
    }
}
