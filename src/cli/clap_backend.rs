//! clap-backed flag parsing and help rendering for [`super::CommandTree`].
//!
//! Each resolution builds a fresh `clap::Command` for the resolved node only.
//! Subcommand names are listed in the help trailer rather than registered with
//! clap, so positional arguments after the boundary are never re-matched.

use clap::parser::ValueSource;
use clap::{Arg, ArgAction, ArgMatches, Command};

use crate::error::FlagError;

use super::flags::{FlagKind, FlagSpec, FlagValue, ParsedFlags};
use super::tree::CommandSpec;

const ARGS_ID: &str = "__args";

pub(super) fn build_command(
    spec: &CommandSpec,
    path: &str,
    flags: &[&FlagSpec],
    children: &[(&str, &str)],
) -> Command {
    let mut cmd = Command::new(spec.name)
        .about(spec.about)
        .bin_name(path.to_string())
        .no_binary_name(true)
        .disable_help_flag(true)
        .disable_version_flag(true)
        .disable_help_subcommand(true)
        .arg(
            Arg::new(ARGS_ID)
                .value_name("ARGS")
                .num_args(1..)
                .action(ArgAction::Append),
        );

    if !children.is_empty() {
        let width = children.iter().map(|(name, _)| name.len()).max().unwrap_or(0);
        let mut listing = String::from("Available Commands:\n");
        for (name, about) in children {
            listing.push_str(&format!("  {name:<width$}  {about}\n"));
        }
        listing.push_str(&format!(
            "\nUse \"{path} [command] --help\" for more information about a command."
        ));
        cmd = cmd
            .override_usage(format!("{path} [command]\n       {path} [flags] [ARGS]..."))
            .after_help(listing);
    }

    for flag in flags {
        cmd = cmd.arg(build_arg(flag));
    }
    cmd
}

fn build_arg(flag: &FlagSpec) -> Arg {
    let mut arg = Arg::new(flag.long).long(flag.long).help(flag.help);
    if let Some(short) = flag.short {
        arg = arg.short(short);
    }
    arg = match flag.kind {
        // `--flag` alone means true; `--flag=false` is accepted for
        // default-true flags such as `--templateTabs`.
        FlagKind::Bool => arg
            .num_args(0..=1)
            .require_equals(true)
            .default_missing_value("true")
            .default_value(flag.default.unwrap_or("false"))
            .value_parser(clap::value_parser!(bool))
            .action(ArgAction::Set),
        FlagKind::String => arg.action(ArgAction::Set),
        FlagKind::Int => arg
            .value_parser(clap::value_parser!(i64))
            .action(ArgAction::Set),
        FlagKind::List => arg.action(ArgAction::Append),
    };
    if flag.kind != FlagKind::Bool {
        if let Some(default) = flag.default {
            arg = arg.default_value(default);
        }
    }
    arg
}

pub(super) fn parse(
    cmd: Command,
    flags: &[&FlagSpec],
    argv: &[String],
) -> Result<(ParsedFlags, Vec<String>), FlagError> {
    let command = cmd.get_bin_name().unwrap_or(cmd.get_name()).to_string();
    let matches = cmd
        .try_get_matches_from(argv)
        .map_err(|err| FlagError::Parse {
            command,
            message: clap_error_message(&err),
        })?;

    let mut parsed = ParsedFlags::default();
    for flag in flags {
        if let Some(value) = flag_value(&matches, flag) {
            let explicit = matches.value_source(flag.long) == Some(ValueSource::CommandLine);
            parsed.insert(flag, value, explicit);
        }
    }
    let args = matches
        .get_many::<String>(ARGS_ID)
        .map(|values| values.cloned().collect())
        .unwrap_or_default();
    Ok((parsed, args))
}

fn flag_value(matches: &ArgMatches, flag: &FlagSpec) -> Option<FlagValue> {
    match flag.kind {
        FlagKind::Bool => matches.get_one::<bool>(flag.long).copied().map(FlagValue::Bool),
        FlagKind::String => matches
            .get_one::<String>(flag.long)
            .cloned()
            .map(FlagValue::String),
        FlagKind::Int => matches.get_one::<i64>(flag.long).copied().map(FlagValue::Int),
        FlagKind::List => Some(FlagValue::List(
            matches
                .get_many::<String>(flag.long)
                .map(|values| values.cloned().collect())
                .unwrap_or_default(),
        )),
    }
}

/// First line of clap's report without the `error:` label.
fn clap_error_message(err: &clap::Error) -> String {
    let rendered = err.render().to_string();
    let first = rendered.lines().next().unwrap_or_default();
    first.strip_prefix("error: ").unwrap_or(first).trim().to_string()
}

pub(super) fn render_help(mut cmd: Command) -> String {
    cmd.render_help().to_string()
}

pub(super) fn render_usage(mut cmd: Command) -> String {
    let mut text = cmd.render_usage().to_string();
    if let Some(trailer) = cmd.get_after_help() {
        text.push_str("\n\n");
        text.push_str(&trailer.to_string());
    }
    text.push('\n');
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn flags() -> Vec<FlagSpec> {
        vec![
            FlagSpec::string("format", "Output format").short('f').default("tmpl"),
            FlagSpec::bool("templateTabs", "Tabs").default("true"),
            FlagSpec::bool("quiet", "Quiet").short('q'),
            FlagSpec::int("size", "Size"),
            FlagSpec::list("option", "Options"),
        ]
    }

    fn run(list: &[&str]) -> Result<(ParsedFlags, Vec<String>), FlagError> {
        let specs = flags();
        let refs: Vec<&FlagSpec> = specs.iter().collect();
        let spec = CommandSpec::new("ls", "List volumes");
        parse(
            build_command(&spec, "stowage volume ls", &refs, &[]),
            &refs,
            &argv(list),
        )
    }

    #[test]
    fn defaults_are_present_but_not_explicit() {
        let (flags, args) = run(&[]).expect("parse");
        assert_eq!(flags.get_str("format"), Some("tmpl"));
        assert!(!flags.is_set("format"));
        assert!(flags.get_bool("templateTabs"));
        assert!(!flags.get_bool("quiet"));
        assert_eq!(flags.get_int("size"), None);
        assert!(args.is_empty());
    }

    #[test]
    fn explicit_values_and_positionals_interleave() {
        let (flags, args) = run(&[
            "vol-1",
            "--format=json",
            "-q",
            "vol-2",
            "--size",
            "20",
            "--option",
            "a",
            "--option",
            "b",
            "--templateTabs=false",
        ])
        .expect("parse");
        assert_eq!(flags.get_str("format"), Some("json"));
        assert!(flags.is_set("format"));
        assert!(flags.get_bool("quiet"));
        assert!(!flags.get_bool("templateTabs"));
        assert_eq!(flags.get_int("size"), Some(20));
        assert_eq!(flags.get_list("option"), ["a".to_string(), "b".to_string()]);
        assert_eq!(args, argv(&["vol-1", "vol-2"]));
    }

    #[test]
    fn unknown_flags_and_bad_values_are_parse_errors() {
        let err = run(&["--bogus"]).unwrap_err();
        let FlagError::Parse { command, message } = err else {
            panic!("expected parse error");
        };
        assert_eq!(command, "stowage volume ls");
        assert!(message.contains("--bogus"), "got: {message}");

        assert!(matches!(run(&["--size", "big"]), Err(FlagError::Parse { .. })));
    }

    #[test]
    fn help_lists_flags_and_children() {
        let specs = flags();
        let refs: Vec<&FlagSpec> = specs.iter().collect();
        let spec = CommandSpec::new("volume", "Manage volumes");
        let help = render_help(build_command(
            &spec,
            "stowage volume",
            &refs,
            &[("ls", "List volumes"), ("rm", "Remove volumes")],
        ));
        assert!(help.contains("Manage volumes"));
        assert!(help.contains("--format"));
        assert!(help.contains("Available Commands:"));
        assert!(help.contains("ls  List volumes"));
        assert!(help.contains("stowage volume [command]"));
    }
}
