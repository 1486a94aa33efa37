//! Command tree, flag parsing, and the built-in command set.

mod clap_backend;
mod flags;
mod tree;

pub mod commands;
pub mod output;

pub use flags::{FlagKind, FlagSpec, FlagValue, ParsedFlags};
pub use tree::{Action, CommandNode, CommandRegistry, CommandSpec, CommandTree, NodeId, Resolution};
