//! Privilege policy for sensitive commands.

use std::fmt;

use crate::error::PermissionError;

/// Space-separated command path below the root, e.g. `service start`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CommandIdentity(String);

impl CommandIdentity {
    pub fn from_path(names: &[&str]) -> Self {
        Self(names.join(" "))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Dotted form used as the storage operation name (`volume.ls`).
    pub fn operation_name(&self) -> String {
        self.0.replace(' ', ".")
    }
}

impl fmt::Display for CommandIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Past-tense operation name for commands that may need elevated privilege.
pub fn sensitive_operation(identity: &CommandIdentity) -> Option<&'static str> {
    match identity.as_str() {
        "install" => Some("installed"),
        "uninstall" => Some("uninstalled"),
        "service start" => Some("started"),
        "service stop" => Some("stopped"),
        "service restart" => Some("restarted"),
        _ => None,
    }
}

/// Decides whether a resolved command may run.
pub trait PermissionGate {
    fn check(&self, identity: &CommandIdentity) -> Option<PermissionError>;
}

/// Allows every command.
#[derive(Debug, Clone, Copy, Default)]
pub struct PermissiveGate;

impl PermissionGate for PermissiveGate {
    fn check(&self, _identity: &CommandIdentity) -> Option<PermissionError> {
        None
    }
}

/// Requires elevated privilege for sensitive commands.
#[derive(Debug, Clone, Copy)]
pub struct ElevatedGate {
    pub elevated: bool,
}

impl PermissionGate for ElevatedGate {
    fn check(&self, identity: &CommandIdentity) -> Option<PermissionError> {
        if self.elevated {
            return None;
        }
        sensitive_operation(identity).map(|operation| PermissionError {
            operation: operation.to_string(),
        })
    }
}
