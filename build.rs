//! Embeds the commit and build time that `stowage version` reports.
//!
//! Each value can be pinned through the environment variable of the same
//! name; otherwise it is read from git/date, falling back to "unknown".

use std::env;
use std::fs;
use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};

const COMMIT_VAR: &str = "STOWAGE_BUILD_GIT_HASH";
const BUILT_VAR: &str = "STOWAGE_BUILD_TIMESTAMP";

fn main() {
    watch_git_head();
    export(COMMIT_VAR, detect_commit);
    export(BUILT_VAR, detect_build_time);
}

fn export(var: &str, detect: fn() -> String) {
    println!("cargo:rerun-if-env-changed={var}");
    let value = env::var(var).unwrap_or_else(|_| detect());
    println!("cargo:rustc-env={var}={value}");
}

/// Rebuild when HEAD moves, including commits on the checked-out branch.
fn watch_git_head() {
    println!("cargo:rerun-if-changed=.git/HEAD");
    let branch = fs::read_to_string(".git/HEAD")
        .ok()
        .and_then(|head| head.trim().strip_prefix("ref: ").map(str::to_string));
    if let Some(branch) = branch {
        println!("cargo:rerun-if-changed=.git/{branch}");
    }
}

fn detect_commit() -> String {
    stdout_of("git", &["rev-parse", "--short=12", "HEAD"]).unwrap_or_else(|| "unknown".into())
}

fn detect_build_time() -> String {
    stdout_of("date", &["-u", "+%Y-%m-%dT%H:%M:%SZ"]).unwrap_or_else(|| {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |elapsed| elapsed.as_secs());
        format!("unix:{secs}")
    })
}

fn stdout_of(program: &str, args: &[&str]) -> Option<String> {
    let output = Command::new(program).args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let text = String::from_utf8(output.stdout).ok()?;
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}
