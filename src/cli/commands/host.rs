//! Actions that run on the local host without the storage service.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use crate::build_info;
use crate::cli::output::{self, Format, OutputOptions};
use crate::config::{KEY_PID_FILE, KEY_UNIT_FILE};
use crate::error::CliError;
use crate::invocation::Invocation;
use crate::signal::{ControlSignal, Flow};

/// Exit code of `service status` when the service is not running.
pub const NOT_RUNNING_EXIT_CODE: i32 = 3;

const FALLBACK_EXE: &str = "/usr/bin/stowage";

/// `stowage env`: every known key with its effective value, sorted.
pub fn env(inv: &mut Invocation, _args: &[String]) -> Flow {
    let text = inv
        .config
        .effective()
        .into_iter()
        .map(|(key, (value, _))| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("\n");
    inv.print(&text)?;
    Ok(())
}

/// `stowage version`: a text block, or an object for `--format json|jsonp`.
pub fn version(inv: &mut Invocation, _args: &[String]) -> Flow {
    let options = match OutputOptions::from_invocation(inv) {
        Ok(options) => options,
        Err(err) => return Err(inv.report(&err)),
    };
    if options.format == Format::Tmpl {
        inv.print(&build_info::CURRENT.to_string())?;
        return Ok(());
    }
    let value = serde_json::to_value(build_info::CURRENT)
        .map_err(|e| CliError::Defect(format!("build info: {e}")))?;
    output::emit(inv, &value)
}

pub fn install(inv: &mut Invocation, _args: &[String]) -> Flow {
    let path = inv.config.get_string(KEY_UNIT_FILE);
    let exe = std::env::current_exe()
        .ok()
        .and_then(|p| p.to_str().map(str::to_string))
        .unwrap_or_else(|| FALLBACK_EXE.to_string());
    let unit = unit_file_text(&exe);

    if inv.flags.get_bool("dryRun") {
        inv.print(&format!("dry run: would write {path}\n\n{unit}"))?;
        return Ok(());
    }
    let target = Path::new(&path);
    let written = target
        .parent()
        .map_or(Ok(()), fs::create_dir_all)
        .and_then(|()| fs::write(target, &unit));
    if let Err(err) = written {
        let message = format!("failed to write {path}: {err}");
        return Err(inv.report(&message));
    }
    tracing::info!(%path, "installed service unit");
    inv.print(&format!("installed {path}"))?;
    Ok(())
}

pub fn uninstall(inv: &mut Invocation, _args: &[String]) -> Flow {
    let path = inv.config.get_string(KEY_UNIT_FILE);
    if inv.flags.get_bool("dryRun") {
        inv.print(&format!("dry run: would remove {path}"))?;
        return Ok(());
    }
    match fs::remove_file(&path) {
        Ok(()) => {
            inv.print(&format!("uninstalled {path}"))?;
            Ok(())
        }
        Err(err) if err.kind() == ErrorKind::NotFound && inv.flags.get_bool("idempotent") => {
            inv.print(&format!("{path} is not installed"))?;
            Ok(())
        }
        Err(err) => {
            let message = format!("failed to remove {path}: {err}");
            Err(inv.report(&message))
        }
    }
}

/// `service status`: exit 0 when a pid file names a process, else 3.
pub fn status(inv: &mut Invocation, _args: &[String]) -> Flow {
    let path = inv.config.get_string(KEY_PID_FILE);
    match read_pid(Path::new(&path)) {
        Some(pid) => {
            inv.print(&format!("stowage is running at pid {pid}"))?;
            Ok(())
        }
        None => {
            inv.print("stowage is stopped")?;
            Err(ControlSignal::ExitWithCode(NOT_RUNNING_EXIT_CODE).into())
        }
    }
}

pub fn initsys(inv: &mut Invocation, _args: &[String]) -> Flow {
    inv.print(detect_init_system(Path::new("/")))?;
    Ok(())
}

fn read_pid(path: &Path) -> Option<u32> {
    fs::read_to_string(path).ok()?.trim().parse().ok()
}

/// `systemd` when `{root}/run/systemd/system` exists, else `sysvinit`.
fn detect_init_system(root: &Path) -> &'static str {
    if root.join("run/systemd/system").is_dir() {
        "systemd"
    } else {
        "sysvinit"
    }
}

fn unit_file_text(exe: &str) -> String {
    format!(
        "[Unit]\n\
         Description=stowage\n\
         Wants=network-online.target\n\
         After=network-online.target\n\
         \n\
         [Service]\n\
         Type=forking\n\
         ExecStart={exe} service start\n\
         ExecReload=/bin/kill -HUP $MAINPID\n\
         KillMode=process\n\
         \n\
         [Install]\n\
         WantedBy=multi-user.target\n"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{CommandRegistry, CommandTree};
    use crate::config::Tier;
    use crate::logging::{LogHandle, LogLevel};
    use crate::signal::Abort;
    use crate::testsupport::{capture_streams, fixed_env, CaptureBuffer, TestTempDir};

    fn invocation(argv: &[&str]) -> (Invocation, CaptureBuffer, CaptureBuffer) {
        let tree: CommandTree = crate::cli::commands::build_tree().expect("tree");
        let argv: Vec<String> = argv.iter().map(|s| s.to_string()).collect();
        let resolution = tree.resolve(&argv).expect("resolve");
        let (streams, out, err) = capture_streams(false);
        let mut inv = Invocation::new(
            argv,
            fixed_env(&[]),
            streams,
            LogHandle::detached(LogLevel::Warn),
        );
        inv.command = tree.identity(resolution.node);
        inv.flags = resolution.flags;
        inv.flags.apply_to(&mut inv.config);
        (inv, out, err)
    }

    #[test]
    fn env_prints_sorted_effective_values() {
        let (mut inv, out, _err) = invocation(&["env", "-l", "debug"]);
        env(&mut inv, &[]).expect("env");
        let text = out.text();
        let keys: Vec<&str> = text.lines().filter_map(|l| l.split('=').next()).collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
        assert!(text.contains("stowage.logLevel=debug\n"));
        assert!(text.contains("client.timeout=60s\n"));
    }

    #[test]
    fn version_prints_text_or_json() {
        let (mut inv, out, _err) = invocation(&["version"]);
        version(&mut inv, &[]).expect("version");
        assert_eq!(out.text(), format!("{}\n", build_info::CURRENT));

        let (mut inv, out, _err) = invocation(&["version", "--format", "json"]);
        version(&mut inv, &[]).expect("version json");
        let parsed: serde_json::Value = serde_json::from_str(&out.text()).expect("json");
        assert_eq!(parsed["name"], "stowage");
        assert_eq!(parsed["commit"], build_info::CURRENT.commit);
    }

    #[test]
    fn status_exits_3_without_pid_file() {
        let dir = TestTempDir::new("status");
        let (mut inv, out, _err) = invocation(&["service", "status"]);
        let missing = dir.child("stowage.pid");
        inv.config
            .set_at(Tier::File, KEY_PID_FILE, missing.to_string_lossy().into_owned());
        let abort = status(&mut inv, &[]).unwrap_err();
        assert!(matches!(
            abort,
            Abort::Signal(ControlSignal::ExitWithCode(NOT_RUNNING_EXIT_CODE))
        ));
        assert_eq!(out.text(), "stowage is stopped\n");

        let pid = dir.write_text("stowage.pid", "4242\n");
        inv.config
            .set_at(Tier::File, KEY_PID_FILE, pid.to_string_lossy().into_owned());
        status(&mut inv, &[]).expect("running");
        assert!(out.text().ends_with("stowage is running at pid 4242\n"));
    }

    #[test]
    fn install_and_uninstall_manage_the_unit_file() {
        let dir = TestTempDir::new("install");
        let unit = dir.child("systemd/stowage.service");
        let unit_text = unit.to_string_lossy().into_owned();

        let (mut inv, out, _err) = invocation(&["install", "--dryRun"]);
        inv.config.set_at(Tier::File, KEY_UNIT_FILE, unit_text.clone());
        install(&mut inv, &[]).expect("dry run");
        assert!(!unit.exists());
        assert!(out.text().starts_with(&format!("dry run: would write {unit_text}")));

        let (mut inv, out, _err) = invocation(&["install"]);
        inv.config.set_at(Tier::File, KEY_UNIT_FILE, unit_text.clone());
        install(&mut inv, &[]).expect("install");
        let written = fs::read_to_string(&unit).expect("unit file");
        assert!(written.contains(" service start\n"));
        assert_eq!(out.text(), format!("installed {unit_text}\n"));

        let (mut inv, _out, _err) = invocation(&["uninstall"]);
        inv.config.set_at(Tier::File, KEY_UNIT_FILE, unit_text.clone());
        uninstall(&mut inv, &[]).expect("uninstall");
        assert!(!unit.exists());

        let (mut inv, _out, err) = invocation(&["uninstall"]);
        inv.config.set_at(Tier::File, KEY_UNIT_FILE, unit_text.clone());
        assert!(uninstall(&mut inv, &[]).is_err());
        assert!(err.text().contains("failed to remove"));

        let (mut inv, out, _err) = invocation(&["uninstall", "--idempotent"]);
        inv.config.set_at(Tier::File, KEY_UNIT_FILE, unit_text.clone());
        uninstall(&mut inv, &[]).expect("idempotent uninstall");
        assert_eq!(out.text(), format!("{unit_text} is not installed\n"));
    }

    #[test]
    fn init_system_detection() {
        let dir = TestTempDir::new("initsys");
        assert_eq!(detect_init_system(dir.path()), "sysvinit");
        fs::create_dir_all(dir.child("run/systemd/system")).expect("mkdir");
        assert_eq!(detect_init_system(dir.path()), "systemd");
    }

    #[test]
    fn pid_file_must_hold_a_number() {
        let dir = TestTempDir::new("pid");
        let garbage = dir.write_text("stowage.pid", "not-a-pid");
        assert_eq!(read_pid(&garbage), None);
    }
}
