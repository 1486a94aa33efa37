//! The built-in command tree.

use crate::config::{
    DEFAULT_CONFIG_FILE, KEY_HOST, KEY_LOG_LEVEL, KEY_OUTPUT_FORMAT, KEY_OUTPUT_TEMPLATE,
    KEY_OUTPUT_TEMPLATE_TABS, KEY_SERVICE,
};
use crate::error::RegistryError;

use super::{CommandRegistry, CommandSpec, CommandTree, FlagSpec, NodeId};

pub mod host;
pub mod storage;

const ABOUT: &str = "stowage:\n  Storage introspection and management for hosts and cloud platforms.";

fn global_flags() -> [FlagSpec; 14] {
    [
        FlagSpec::bool("help", "Help about the current command")
            .short('h')
            .persistent()
            .ambient(),
        FlagSpec::bool("verbose", "Print verbose help information")
            .short('v')
            .persistent()
            .ambient(),
        FlagSpec::string("config", "The path to a custom stowage configuration file")
            .short('c')
            .default(DEFAULT_CONFIG_FILE)
            .persistent()
            .ambient(),
        FlagSpec::string("logLevel", "The log level (error, warn, info, debug)")
            .short('l')
            .persistent()
            .config(KEY_LOG_LEVEL)
            .ambient(),
        FlagSpec::string("host", "The storage service endpoint")
            .persistent()
            .config(KEY_HOST)
            .ambient(),
        FlagSpec::string("service", "The storage service name")
            .persistent()
            .config(KEY_SERVICE)
            .ambient(),
        FlagSpec::string("format", "The output format (tmpl, json, jsonp)")
            .short('f')
            .default("tmpl")
            .persistent()
            .config(KEY_OUTPUT_FORMAT)
            .ambient(),
        FlagSpec::string("template", "A template used to format each output row")
            .persistent()
            .config(KEY_OUTPUT_TEMPLATE)
            .ambient(),
        FlagSpec::bool("templateTabs", "Align table output in columns")
            .default("true")
            .persistent()
            .config(KEY_OUTPUT_TEMPLATE_TABS)
            .ambient(),
        FlagSpec::bool("quiet", "Suppress table headers")
            .short('q')
            .persistent()
            .ambient(),
        FlagSpec::bool("dryRun", "Show what would be done without doing it")
            .short('n')
            .persistent()
            .ambient(),
        FlagSpec::bool("continueOnError", "Keep going when an operation on one id fails")
            .persistent()
            .ambient(),
        FlagSpec::bool("idempotent", "Make mutations succeed when already applied")
            .short('i')
            .persistent(),
        FlagSpec::bool("async", "Queue storage operations and report failures later")
            .persistent()
            .ambient(),
    ]
}

/// Build the full command tree.
pub fn build_tree() -> Result<CommandTree, RegistryError> {
    let mut tree = CommandTree::new(CommandSpec::new("stowage", ABOUT).flags(global_flags()));
    let root = tree.root();

    tree.register(
        root,
        CommandSpec::new("env", "Print the effective configuration").action(host::env),
    )?;
    tree.register(
        root,
        CommandSpec::new("version", "Print the version")
            .action(host::version)
            .without_pipeline(),
    )?;
    tree.register(
        root,
        CommandSpec::new("install", "Install stowage as a system service").action(host::install),
    )?;
    tree.register(
        root,
        CommandSpec::new("uninstall", "Uninstall stowage").action(host::uninstall),
    )?;

    register_service(&mut tree, root)?;
    register_module(&mut tree, root)?;
    register_adapter(&mut tree, root)?;
    register_volume(&mut tree, root)?;
    register_snapshot(&mut tree, root)?;
    register_device(&mut tree, root)?;
    Ok(tree)
}

fn register_service(tree: &mut CommandTree, root: NodeId) -> Result<(), RegistryError> {
    let service = tree.register(root, CommandSpec::new("service", "The service controller"))?;
    tree.register(
        service,
        CommandSpec::new("start", "Start the service")
            .flag(FlagSpec::bool("fg", "Run the service in the foreground"))
            .action(storage::call_once)
            .client(),
    )?;
    tree.register(
        service,
        CommandSpec::new("stop", "Stop the service")
            .action(storage::call_once)
            .client(),
    )?;
    tree.register(
        service,
        CommandSpec::new("restart", "Restart the service")
            .flag(FlagSpec::bool("fg", "Run the service in the foreground"))
            .action(storage::call_once)
            .client(),
    )?;
    tree.register(
        service,
        CommandSpec::new("status", "Print the service status").action(host::status),
    )?;
    tree.register(
        service,
        CommandSpec::new("initsys", "Print the detected init system type").action(host::initsys),
    )?;
    Ok(())
}

fn register_module(tree: &mut CommandTree, root: NodeId) -> Result<(), RegistryError> {
    let module = tree.register(root, CommandSpec::new("module", "The module manager"))?;
    tree.register(
        module,
        CommandSpec::new("types", "List the available module types")
            .action(storage::call_once)
            .client(),
    )?;
    let instance = tree.register(
        module,
        CommandSpec::new("instance", "The module instance manager").alias("instances"),
    )?;
    tree.register(
        instance,
        CommandSpec::new("ls", "List the running module instances")
            .alias("list")
            .action(storage::call_once)
            .client(),
    )?;
    tree.register(
        instance,
        CommandSpec::new("create", "Create a new module instance")
            .alias("new")
            .flags([
                FlagSpec::string("type", "The module type name"),
                FlagSpec::string("name", "The module instance name"),
                FlagSpec::string("address", "The module instance address"),
                FlagSpec::list("options", "A module configuration option (key=value)"),
                FlagSpec::bool("start", "Start the instance once created"),
            ])
            .action(storage::call_once)
            .client(),
    )?;
    tree.register(
        instance,
        CommandSpec::new("start", "Start one or more module instances")
            .action(storage::call_each)
            .client(),
    )?;
    Ok(())
}

fn register_adapter(tree: &mut CommandTree, root: NodeId) -> Result<(), RegistryError> {
    let adapter = tree.register(
        root,
        CommandSpec::new("adapter", "The storage adapter manager").alias("adapters"),
    )?;
    tree.register(
        adapter,
        CommandSpec::new("types", "List the available adapter types")
            .action(storage::call_once)
            .client(),
    )?;
    tree.register(
        adapter,
        CommandSpec::new("instances", "List the configured adapter instances")
            .action(storage::call_once)
            .client(),
    )?;
    Ok(())
}

fn register_volume(tree: &mut CommandTree, root: NodeId) -> Result<(), RegistryError> {
    let volume = tree.register(
        root,
        CommandSpec::new("volume", "The volume manager").alias("volumes"),
    )?;
    tree.register(
        volume,
        CommandSpec::new("ls", "List volumes")
            .alias("list")
            .flags([
                FlagSpec::bool("attached", "Only volumes attached to this instance"),
                FlagSpec::bool("available", "Only volumes available for attachment"),
                FlagSpec::bool("path", "Include the local mount path of each volume"),
            ])
            .action(storage::call_once)
            .client(),
    )?;
    tree.register(
        volume,
        CommandSpec::new("new", "Create a new volume")
            .alias("create")
            .flags([
                FlagSpec::int("size", "The volume size in GiB"),
                FlagSpec::int("iops", "The volume IOPS"),
                FlagSpec::string("type", "The volume type"),
                FlagSpec::string("availabilityZone", "The availability zone"),
                FlagSpec::string("snapshotID", "Create the volume from a snapshot"),
                FlagSpec::bool("encrypted", "Encrypt the volume"),
                FlagSpec::string("encryptionKey", "The encryption key"),
            ])
            .action(storage::call_each)
            .client(),
    )?;
    tree.register(
        volume,
        CommandSpec::new("rm", "Remove one or more volumes")
            .alias("remove")
            .flag(FlagSpec::bool("force", "Remove even when attached"))
            .action(storage::call_each)
            .client(),
    )?;
    tree.register(
        volume,
        CommandSpec::new("attach", "Attach one or more volumes")
            .flags([
                FlagSpec::bool("force", "Detach from other instances first"),
                FlagSpec::string("encryptionKey", "The encryption key"),
            ])
            .action(storage::call_each)
            .client(),
    )?;
    tree.register(
        volume,
        CommandSpec::new("detach", "Detach one or more volumes")
            .flag(FlagSpec::bool("force", "Detach even when in use"))
            .action(storage::call_each)
            .client(),
    )?;
    tree.register(
        volume,
        CommandSpec::new("mount", "Mount one or more volumes")
            .flags([
                FlagSpec::string("fsType", "The file system type"),
                FlagSpec::bool("overwriteFs", "Format even if a file system exists"),
                FlagSpec::string("mountOptions", "Mount options"),
                FlagSpec::string("mountLabel", "The SELinux label"),
            ])
            .action(storage::call_each)
            .client(),
    )?;
    tree.register(
        volume,
        CommandSpec::new("unmount", "Unmount one or more volumes")
            .alias("umount")
            .action(storage::call_each)
            .client(),
    )?;
    tree.register(
        volume,
        CommandSpec::new("path", "Print the mount path of one or more volumes")
            .action(storage::call_each)
            .client(),
    )?;
    Ok(())
}

fn register_snapshot(tree: &mut CommandTree, root: NodeId) -> Result<(), RegistryError> {
    let snapshot = tree.register(
        root,
        CommandSpec::new("snapshot", "The snapshot manager").alias("snapshots"),
    )?;
    tree.register(
        snapshot,
        CommandSpec::new("ls", "List snapshots")
            .alias("list")
            .action(storage::call_once)
            .client(),
    )?;
    tree.register(
        snapshot,
        CommandSpec::new("new", "Snapshot one or more volumes")
            .alias("create")
            .flags([
                FlagSpec::string("name", "The snapshot name"),
                FlagSpec::string("description", "The snapshot description"),
            ])
            .action(storage::call_each)
            .client(),
    )?;
    tree.register(
        snapshot,
        CommandSpec::new("rm", "Remove one or more snapshots")
            .alias("remove")
            .action(storage::call_each)
            .client(),
    )?;
    tree.register(
        snapshot,
        CommandSpec::new("copy", "Copy one or more snapshots")
            .alias("cp")
            .flags([
                FlagSpec::string("destinationName", "The name of the copied snapshot"),
                FlagSpec::string("destinationRegion", "The region to copy to"),
            ])
            .action(storage::call_each)
            .client(),
    )?;
    Ok(())
}

fn register_device(tree: &mut CommandTree, root: NodeId) -> Result<(), RegistryError> {
    let device = tree.register(
        root,
        CommandSpec::new("device", "The device manager").alias("devices"),
    )?;
    tree.register(
        device,
        CommandSpec::new("ls", "List local devices")
            .alias("list")
            .action(storage::call_once)
            .client(),
    )?;
    tree.register(
        device,
        CommandSpec::new("mount", "Mount one or more devices")
            .flags([
                FlagSpec::string("mountPoint", "The mount point"),
                FlagSpec::string("mountOptions", "Mount options"),
                FlagSpec::string("mountLabel", "The SELinux label"),
            ])
            .action(storage::call_each)
            .client(),
    )?;
    tree.register(
        device,
        CommandSpec::new("unmount", "Unmount one or more devices")
            .alias("umount")
            .action(storage::call_each)
            .client(),
    )?;
    tree.register(
        device,
        CommandSpec::new("format", "Format one or more devices")
            .flags([
                FlagSpec::string("fsType", "The file system type"),
                FlagSpec::bool("overwriteFs", "Format even if a file system exists"),
            ])
            .action(storage::call_each)
            .client(),
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn tree_builds_without_clashes() {
        let tree = build_tree().expect("tree");
        let (node, consumed) = tree.match_command(&args(&["volume", "ls"]));
        assert_eq!(consumed, 2);
        assert_eq!(tree.identity(node).as_str(), "volume ls");
        assert!(tree.node(node).spec.needs_client);
    }

    #[test]
    fn aliases_reach_the_canonical_nodes() {
        let tree = build_tree().expect("tree");
        let (canonical, _) = tree.match_command(&args(&["snapshot", "rm"]));
        let (aliased, _) = tree.match_command(&args(&["snapshots", "remove"]));
        assert_eq!(canonical, aliased);
    }

    #[test]
    fn host_commands_do_not_need_the_client() {
        let tree = build_tree().expect("tree");
        for path in [&["env"][..], &["service", "status"][..], &["install"][..]] {
            let (node, _) = tree.match_command(&args(path));
            assert!(!tree.node(node).spec.needs_client, "{path:?}");
            assert!(tree.node(node).spec.needs_pipeline, "{path:?}");
        }
        let (version, _) = tree.match_command(&args(&["version"]));
        assert!(!tree.node(version).spec.needs_pipeline);
    }

    #[test]
    fn global_flags_parse_on_every_leaf() {
        let tree = build_tree().expect("tree");
        let resolution = tree
            .resolve(&args(&[
                "device", "format", "xvdb", "-f", "jsonp", "-q", "-n", "-i", "--fsType", "ext4",
            ]))
            .expect("resolve");
        assert_eq!(resolution.args, args(&["xvdb"]));
        assert_eq!(resolution.flags.get_str("format"), Some("jsonp"));
        assert!(resolution.flags.get_bool("dryRun"));
        let params = resolution.flags.params();
        assert_eq!(params.len(), 2, "{params:?}");
        assert!(params.contains_key("idempotent"));
        assert!(params.contains_key("fsType"));
    }

    #[test]
    fn every_command_renders_help() {
        let tree = build_tree().expect("tree");
        let (volume, _) = tree.match_command(&args(&["volume"]));
        let help = tree.render_help(volume);
        assert!(help.contains("Available Commands:"));
        assert!(help.contains("attach"));
        assert!(help.contains("--format"));
    }
}
