//! CLI entry point for stowage.

use stowage::cli::commands::build_tree;
use stowage::invocation::{EnvSource, Invocation, Streams};
use stowage::lifecycle::Collaborators;
use stowage::logging::{LogHandle, LogLevel};
use stowage::runner::Runner;

fn main() {
    let logger = LogHandle::init(LogLevel::Warn);

    let tree = match build_tree() {
        Ok(tree) => tree,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    };

    let args: Vec<String> = std::env::args_os()
        .skip(1)
        .map(|arg| arg.to_string_lossy().into_owned())
        .collect();
    let inv = Invocation::new(args, EnvSource::Process, Streams::process(), logger);
    let code = Runner::new(tree, Collaborators::default()).run(inv);
    std::process::exit(code);
}
