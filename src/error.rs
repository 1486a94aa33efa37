//! Error types for command resolution, lifecycle steps, and the storage client.

use std::fmt;

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// Errors when reading, validating, or merging a configuration file.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Toml(toml::de::Error),
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "io: {e}"),
            Self::Toml(e) => write!(f, "toml: {e}"),
            Self::Invalid(msg) => write!(f, "invalid config: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(e: toml::de::Error) -> Self {
        Self::Toml(e)
    }
}

// ---------------------------------------------------------------------------
// FlagError / RegistryError
// ---------------------------------------------------------------------------

/// Malformed command-line input for the resolved command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlagError {
    /// The argument parser rejected the flags of `command`.
    Parse { command: String, message: String },
    /// A flag parsed but carries a value the command cannot use.
    Invalid { flag: String, message: String },
}

impl fmt::Display for FlagError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse { command, message } => write!(f, "{command}: {message}"),
            Self::Invalid { flag, message } => write!(f, "invalid --{flag}: {message}"),
        }
    }
}

impl std::error::Error for FlagError {}

/// Errors raised while building the command tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// A sibling with the same name (or alias) is already registered.
    DuplicateCommand(String),
    /// The parent node id does not belong to this tree.
    UnknownParent(usize),
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateCommand(path) => write!(f, "command `{path}` is already registered"),
            Self::UnknownParent(id) => write!(f, "unknown parent command #{id}"),
        }
    }
}

impl std::error::Error for RegistryError {}

// ---------------------------------------------------------------------------
// PermissionError
// ---------------------------------------------------------------------------

/// The resolved command requires a privilege the invocation lacks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionError {
    /// Past-tense operation name, e.g. `started` or `installed`.
    pub operation: String,
}

impl fmt::Display for PermissionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stowage can only be {} by root", self.operation)
    }
}

impl std::error::Error for PermissionError {}

// ---------------------------------------------------------------------------
// ClientError / ActivationError
// ---------------------------------------------------------------------------

/// Errors from the remote storage client.
#[derive(Debug)]
pub enum ClientError {
    /// Network / reqwest-level error.
    Http(reqwest::Error),
    /// Non-2xx status from the storage service.
    Status(u16, String),
    /// The operation could not be issued or its reply was unusable.
    Request(String),
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http(e) => write!(f, "http: {e}"),
            Self::Status(code, body) => write!(f, "status {code}: {body}"),
            Self::Request(msg) => write!(f, "request: {msg}"),
        }
    }
}

impl std::error::Error for ClientError {}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        Self::Http(e)
    }
}

/// Errors while activating the remote storage client.
#[derive(Debug)]
pub enum ActivationError {
    /// `client.host` is missing or not a usable endpoint.
    InvalidHost(String),
    /// The async runtime backing the client could not start.
    Runtime(std::io::Error),
    /// The client could not be constructed.
    Client(ClientError),
}

impl fmt::Display for ActivationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidHost(msg) => write!(f, "invalid client host: {msg}"),
            Self::Runtime(e) => write!(f, "runtime: {e}"),
            Self::Client(e) => write!(f, "client: {e}"),
        }
    }
}

impl std::error::Error for ActivationError {}

impl From<ClientError> for ActivationError {
    fn from(e: ClientError) -> Self {
        Self::Client(e)
    }
}

// ---------------------------------------------------------------------------
// CliError
// ---------------------------------------------------------------------------

/// Top-level error type for the dispatcher.
#[derive(Debug)]
pub enum CliError {
    Flag(FlagError),
    Io(std::io::Error),
    /// Internal invariant broken; indicates a defect rather than bad input.
    Defect(String),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Flag(e) => write!(f, "flags: {e}"),
            Self::Io(e) => write!(f, "io: {e}"),
            Self::Defect(msg) => write!(f, "internal error: {msg}"),
        }
    }
}

impl std::error::Error for CliError {}

impl From<FlagError> for CliError {
    fn from(e: FlagError) -> Self {
        Self::Flag(e)
    }
}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}
