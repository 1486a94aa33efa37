//! Pre-execution lifecycle pipeline.
//!
//! Runs once per invocation, before the resolved command's action, in a fixed
//! order. A step either returns `Ok(())` and the next one runs, or returns an
//! [`Abort`] and nothing after it runs.

use std::fs;
use std::path::PathBuf;

use crate::cli::{CommandRegistry, NodeId};
use crate::client::{ClientActivator, HttpActivator};
use crate::config::{
    ConfigValidator, TomlValidator, CONFIG_FILE_ENV, DEFAULT_CONFIG_FILE, KEY_CLIENT_HOST,
    KEY_CLIENT_SERVICE, KEY_HOST, KEY_LOG_LEVEL, KEY_PATH_CACHE, KEY_SERVICE,
};
use crate::error::{CliError, ConfigError};
use crate::invocation::Invocation;
use crate::logging::LogLevel;
use crate::permission::{PermissionGate, PermissiveGate};
use crate::signal::{Abort, ControlSignal, Flow};

/// Pipeline steps in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    LoadConfig,
    ApplyLogLevel,
    ApplyOverrides,
    HelpShortCircuit,
    CheckPermissions,
    ActivateClient,
}

/// External collaborators consulted by the pipeline.
pub struct Collaborators {
    pub validator: Box<dyn ConfigValidator>,
    pub gate: Box<dyn PermissionGate>,
    pub activator: Box<dyn ClientActivator>,
}

impl Default for Collaborators {
    fn default() -> Self {
        Self {
            validator: Box::new(TomlValidator),
            gate: Box::new(PermissiveGate),
            activator: Box::new(HttpActivator),
        }
    }
}

pub struct Lifecycle<'a> {
    registry: &'a dyn CommandRegistry,
    hooks: &'a Collaborators,
}

impl<'a> Lifecycle<'a> {
    pub fn new(registry: &'a dyn CommandRegistry, hooks: &'a Collaborators) -> Self {
        Self { registry, hooks }
    }

    pub fn run(&self, inv: &mut Invocation, node: NodeId) -> Flow {
        self.load_config(inv)?;
        self.apply_log_level(inv);
        self.apply_overrides(inv);
        self.help_short_circuit(inv, node)?;
        self.check_permissions(inv, node)?;
        if self.registry.node(node).spec.needs_client {
            self.activate_client(inv, node)?;
        }
        Ok(())
    }

    /// Step 1: merge the config file, if one exists, into the file tier.
    fn load_config(&self, inv: &mut Invocation) -> Flow {
        inv.trace.push(Step::LoadConfig);
        let path = config_file_path(inv);
        if !path.is_file() {
            tracing::debug!(path = %path.display(), "no config file; skipping load");
            return Ok(());
        }

        let text = fs::read_to_string(&path).map_err(|e| Abort::Fatal(ConfigError::Io(e)))?;
        let table = self
            .hooks
            .validator
            .validate(&path, &text)
            .map_err(Abort::Fatal)?;
        let merged = inv.config.merge_file_table(&table).map_err(Abort::Fatal)?;
        let env = &inv.env;
        inv.config.apply_env_tier(|name| env.get(name));
        let path_text = path.display().to_string();
        inv.env.set(CONFIG_FILE_ENV, &path_text);
        tracing::debug!(path = %path_text, keys = merged, "loaded config file");

        // Re-parse so explicit flags land in the flag tier again and keep
        // winning over freshly merged file values.
        let resolution = self
            .registry
            .resolve(&inv.args)
            .map_err(|e| Abort::Fault(CliError::from(e)))?;
        inv.flags = resolution.flags;
        inv.flags.apply_to(&mut inv.config);
        Ok(())
    }

    /// Step 2: apply `stowage.logLevel`; unknown names are ignored.
    fn apply_log_level(&self, inv: &mut Invocation) {
        inv.trace.push(Step::ApplyLogLevel);
        let raw = inv.config.get_string(KEY_LOG_LEVEL);
        let Some(level) = LogLevel::parse(&raw) else {
            return;
        };
        tracing::debug!(%level, "updating log level");
        inv.logger.set_level(level);
        inv.config.set(KEY_LOG_LEVEL, level.as_str());
        inv.context.log_level = Some(level);
        tracing::info!(%level, "updated log level");
    }

    /// Step 3: settings the CLI forces on itself.
    fn apply_overrides(&self, inv: &mut Invocation) {
        inv.trace.push(Step::ApplyOverrides);
        inv.config.set(KEY_PATH_CACHE, false);
        let host = inv.config.get_string(KEY_HOST);
        if !host.is_empty() {
            inv.config.set(KEY_CLIENT_HOST, host);
        }
        let service = inv.config.get_string(KEY_SERVICE);
        if !service.is_empty() {
            inv.config.set(KEY_CLIENT_SERVICE, service);
        }
    }

    /// Step 4: `--help` / `--verbose` print help and stop. Also applied on
    /// its own to commands that skip the pipeline.
    pub fn help_short_circuit(&self, inv: &mut Invocation, node: NodeId) -> Flow {
        inv.trace.push(Step::HelpShortCircuit);
        if inv.flags.get_bool("help") || inv.flags.get_bool("verbose") {
            inv.print(&self.registry.render_help(node))?;
            return Err(ControlSignal::HelpRequested.into());
        }
        Ok(())
    }

    /// Step 5: consult the permission gate.
    fn check_permissions(&self, inv: &mut Invocation, node: NodeId) -> Flow {
        inv.trace.push(Step::CheckPermissions);
        let identity = self.registry.identity(node);
        match self.hooks.gate.check(&identity) {
            None => Ok(()),
            Some(err) => {
                tracing::debug!(command = %identity, %err, "permission denied");
                Err(self.report_with_help(inv, node, &err))
            }
        }
    }

    /// Step 6: activate the storage client for commands that need it.
    fn activate_client(&self, inv: &mut Invocation, node: NodeId) -> Flow {
        inv.trace.push(Step::ActivateClient);
        if inv.flags.get_bool("async") {
            inv.context.run_async = true;
        }
        tracing::debug!(command = %inv.command, "activating storage client");

        let activation = match self.hooks.activator.activate(&inv.config, &inv.context) {
            Ok(activation) => activation,
            Err(err) => return Err(self.report_with_help(inv, node, &err)),
        };
        inv.config = activation.config;
        inv.context = activation.context;
        let errors = inv.errors.insert(activation.errors);

        tracing::debug!(command = %inv.command, "creating storage client");
        match self.hooks.activator.connect(&inv.config, &inv.context, errors) {
            Ok(client) => {
                inv.client = Some(client);
                Ok(())
            }
            Err(err) => Err(self.report_with_help(inv, node, &err)),
        }
    }

    fn report_with_help(
        &self,
        inv: &mut Invocation,
        node: NodeId,
        err: &dyn std::fmt::Display,
    ) -> Abort {
        let abort = inv.report(err);
        let help = self.registry.render_help(node);
        if let Err(io_err) = inv.print(&format!("\n{help}")) {
            return io_err.into();
        }
        abort
    }
}

/// `--config`, then `STOWAGE_CONFIG_FILE`, then the default location.
fn config_file_path(inv: &Invocation) -> PathBuf {
    if inv.flags.is_set("config") {
        if let Some(path) = inv.flags.get_str("config") {
            return PathBuf::from(path);
        }
    }
    if let Some(path) = inv.env.get(CONFIG_FILE_ENV).filter(|p| !p.is_empty()) {
        return PathBuf::from(path);
    }
    PathBuf::from(inv.flags.get_str("config").unwrap_or(DEFAULT_CONFIG_FILE))
}
