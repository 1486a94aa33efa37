//! Top-level runner: resolve, run the lifecycle and the action, map the
//! outcome to a process exit code.

use std::io::Write;
use std::panic::{self, AssertUnwindSafe};

use crate::cli::CommandRegistry;
use crate::invocation::Invocation;
use crate::lifecycle::{Collaborators, Lifecycle};
use crate::signal::{Abort, ControlSignal, Flow};

pub struct Runner<R> {
    registry: R,
    hooks: Collaborators,
}

impl<R: CommandRegistry> Runner<R> {
    pub fn new(registry: R, hooks: Collaborators) -> Self {
        Self { registry, hooks }
    }

    /// Run one invocation and return its exit code.
    ///
    /// The storage client is dropped and its error stream drained on every
    /// path, including a panic, which is then resumed.
    pub fn run(&self, mut inv: Invocation) -> i32 {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.execute(&mut inv)));
        match outcome {
            Ok(flow) => {
                let code = exit_code(&mut inv, flow);
                finish(&mut inv);
                code
            }
            Err(payload) => {
                tracing::error!(command = %inv.command, "command panicked");
                finish(&mut inv);
                panic::resume_unwind(payload)
            }
        }
    }

    fn execute(&self, inv: &mut Invocation) -> Flow {
        let resolution = match self.registry.resolve(&inv.args) {
            Ok(resolution) => resolution,
            Err(err) => return Err(inv.report(&err)),
        };
        let node = resolution.node;
        inv.command = self.registry.identity(node);
        inv.flags = resolution.flags;
        inv.flags.apply_to(&mut inv.config);
        tracing::debug!(command = %inv.command, args = ?resolution.args, "resolved command");

        let spec = &self.registry.node(node).spec;
        let lifecycle = Lifecycle::new(&self.registry, &self.hooks);
        if spec.needs_pipeline {
            lifecycle.run(inv, node)?;
        } else {
            lifecycle.help_short_circuit(inv, node)?;
        }
        match spec.action {
            Some(action) => action(inv, &resolution.args),
            None => {
                inv.print(&self.registry.render_usage(node))?;
                Err(ControlSignal::SubcommandHandled.into())
            }
        }
    }
}

fn exit_code(inv: &mut Invocation, flow: Flow) -> i32 {
    match flow {
        Ok(()) => 0,
        Err(Abort::Signal(signal)) => {
            if let ControlSignal::ExitWithCode(code) = signal {
                tracing::debug!(code, command = %inv.command, "exiting with explicit code");
            }
            signal.exit_code()
        }
        Err(Abort::Fatal(err)) => {
            if writeln!(inv.stderr, "fatal: {err}").is_err() {
                tracing::error!(%err, "fatal configuration error");
            }
            1
        }
        Err(Abort::Fault(err)) => {
            tracing::error!(%err, command = %inv.command, "unhandled fault");
            1
        }
    }
}

fn finish(inv: &mut Invocation) {
    inv.client = None;
    if let Some(errors) = inv.errors.take() {
        let drained = errors.drain();
        if !drained.is_empty() {
            tracing::warn!(count = drained.len(), "asynchronous storage operations failed");
        }
    }
    inv.flush();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{CommandSpec, CommandTree, FlagSpec};
    use crate::error::{CliError, ConfigError};
    use crate::logging::{LogHandle, LogLevel};
    use crate::testsupport::{capture_streams, fixed_env, CaptureBuffer};

    fn invocation(args: &[&str]) -> (Invocation, CaptureBuffer, CaptureBuffer) {
        let (streams, out, err) = capture_streams(false);
        let inv = Invocation::new(
            args.iter().map(|s| s.to_string()).collect(),
            fixed_env(&[("STOWAGE_CONFIG_FILE", "/nonexistent/stowage.toml")]),
            streams,
            LogHandle::detached(LogLevel::Warn),
        );
        (inv, out, err)
    }

    fn ok(_: &mut Invocation, _: &[String]) -> Flow {
        Ok(())
    }

    fn exit_seven(_: &mut Invocation, _: &[String]) -> Flow {
        Err(ControlSignal::ExitWithCode(7).into())
    }

    fn fault(_: &mut Invocation, _: &[String]) -> Flow {
        Err(CliError::Defect("broken".into()).into())
    }

    fn corrupt(_: &mut Invocation, _: &[String]) -> Flow {
        Err(Abort::Fatal(ConfigError::Invalid("bad table".into())))
    }

    fn echo(inv: &mut Invocation, args: &[String]) -> Flow {
        inv.print(&args.join(","))?;
        Ok(())
    }

    fn runner() -> Runner<CommandTree> {
        let mut tree = CommandTree::new(
            CommandSpec::new("stowage", "root")
                .flag(FlagSpec::bool("help", "Help").short('h').persistent().ambient())
                .flag(FlagSpec::string("config", "Config").persistent().ambient()),
        );
        let root = tree.root();
        for (name, action) in [
            ("ok", ok as crate::cli::Action),
            ("seven", exit_seven),
            ("fault", fault),
            ("corrupt", corrupt),
            ("echo", echo),
        ] {
            tree.register(root, CommandSpec::new(name, "test").action(action))
                .expect("register");
        }
        let group = tree
            .register(root, CommandSpec::new("group", "A group"))
            .expect("group");
        tree.register(group, CommandSpec::new("leaf", "Leaf").action(ok))
            .expect("leaf");
        tree.register(
            root,
            CommandSpec::new("bare", "Runs without setup")
                .action(echo)
                .without_pipeline(),
        )
        .expect("bare");
        Runner::new(tree, Collaborators::default())
    }

    #[test]
    fn outcomes_map_to_exit_codes() {
        let runner = runner();
        assert_eq!(runner.run(invocation(&["ok"]).0), 0);
        assert_eq!(runner.run(invocation(&["seven"]).0), 7);
        assert_eq!(runner.run(invocation(&["fault"]).0), 1);
        assert_eq!(runner.run(invocation(&["ok", "--help"]).0), 0);
    }

    #[test]
    fn fatal_errors_print_without_the_report() {
        let (inv, _out, err) = invocation(&["corrupt"]);
        assert_eq!(runner().run(inv), 1);
        assert_eq!(err.text(), "fatal: invalid config: bad table\n");
    }

    #[test]
    fn flag_errors_are_reported_once() {
        let (inv, _out, err) = invocation(&["ok", "--bogus"]);
        assert_eq!(runner().run(inv), 1);
        let text = err.text();
        assert_eq!(text.matches("Oops, an error occurred!").count(), 1);
        assert!(text.contains("stowage ok:"), "got: {text}");
    }

    #[test]
    fn nodes_without_actions_print_usage() {
        let (inv, out, err) = invocation(&["group"]);
        assert_eq!(runner().run(inv), 0);
        assert!(out.text().contains("Available Commands:"));
        assert!(out.text().contains("leaf"));
        assert!(err.text().is_empty());
    }

    #[test]
    fn residual_arguments_reach_the_action() {
        let (inv, out, _err) = invocation(&["echo", "a", "b"]);
        assert_eq!(runner().run(inv), 0);
        assert_eq!(out.text(), "a,b\n");
    }

    #[test]
    fn help_applies_to_commands_without_the_pipeline() {
        let (inv, out, _err) = invocation(&["bare", "--help"]);
        assert_eq!(runner().run(inv), 0);
        assert!(out.text().contains("Runs without setup"), "got: {}", out.text());

        let (inv, out, _err) = invocation(&["bare", "x"]);
        assert_eq!(runner().run(inv), 0);
        assert_eq!(out.text(), "x\n");
    }
}
