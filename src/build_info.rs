//! Version and build metadata baked in by `build.rs`.

use std::fmt;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BuildInfo {
    pub name: &'static str,
    pub version: &'static str,
    pub commit: &'static str,
    pub built: &'static str,
}

/// Metadata of the running binary.
pub const CURRENT: BuildInfo = BuildInfo {
    name: env!("CARGO_PKG_NAME"),
    version: env!("CARGO_PKG_VERSION"),
    commit: env!("STOWAGE_BUILD_GIT_HASH"),
    built: env!("STOWAGE_BUILD_TIMESTAMP"),
};

impl fmt::Display for BuildInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}\ncommit: {}\nbuilt: {}",
            self.name, self.version, self.commit, self.built
        )
    }
}
