//! Terminal error report.
//!
//! Both variants print the same text; the terminal variant only adds style
//! escapes around parts of it. Output depends solely on the message and the
//! capability flag; `NO_COLOR` is folded into that flag by the caller.

use std::fmt::Display;
use std::io::{self, Write};

use crossterm::style::{force_color_output, Attribute, Color, Stylize};

pub const PROJECT_URL: &str = "https://github.com/stowage-project/stowage";

const INDENT: &str = "  ";

/// Write the error report for `err` to `out`.
pub fn render(err: &dyn Display, is_terminal: bool, out: &mut dyn Write) -> io::Result<()> {
    let message = err.to_string();
    if is_terminal {
        render_colorized(&message, out)
    } else {
        render_plain(&message, out)
    }
}

fn render_plain(message: &str, out: &mut dyn Write) -> io::Result<()> {
    writeln!(out, "Oops, an error occurred!")?;
    writeln!(out)?;
    for line in message.lines() {
        writeln!(out, "{INDENT}{line}")?;
    }
    writeln!(out)?;
    writeln!(out, "To correct the error please review:")?;
    writeln!(out)?;
    writeln!(out, "{INDENT}- Debug output by using the flag \"-l debug\"")?;
    writeln!(out, "{INDENT}- The stowage website at {PROJECT_URL}")?;
    writeln!(out, "{INDENT}- The online help below")?;
    out.flush()
}

fn render_colorized(message: &str, out: &mut dyn Write) -> io::Result<()> {
    // crossterm otherwise consults NO_COLOR on its own.
    force_color_output(true);
    writeln!(
        out,
        "Oops, an {} occurred!",
        "error".with(Color::White).on(Color::DarkRed).attribute(Attribute::Bold)
    )?;
    writeln!(out)?;
    for line in message.lines() {
        writeln!(out, "{INDENT}{}", line.with(Color::Yellow))?;
    }
    writeln!(out)?;
    writeln!(
        out,
        "To correct the {} please review:",
        "error".with(Color::White).on(Color::DarkRed).attribute(Attribute::Bold)
    )?;
    writeln!(out)?;
    writeln!(
        out,
        "{INDENT}- Debug output by using the flag \"{}\"",
        "-l debug".with(Color::Blue).attribute(Attribute::Bold)
    )?;
    writeln!(
        out,
        "{INDENT}- The stowage website at {}",
        PROJECT_URL.with(Color::Blue).attribute(Attribute::Underlined)
    )?;
    writeln!(out, "{INDENT}- The online help below")?;
    out.flush()
}

#[cfg(test)]
mod tests {
    use super::*;

    const GOLDEN_PLAIN: &str = "\
Oops, an error occurred!

  stowage can only be started by root

To correct the error please review:

  - Debug output by using the flag \"-l debug\"
  - The stowage website at https://github.com/stowage-project/stowage
  - The online help below
";

    fn rendered(message: &str, is_terminal: bool) -> String {
        let mut buf = Vec::new();
        render(&message, is_terminal, &mut buf).expect("render");
        String::from_utf8(buf).expect("utf8")
    }

    /// Remove CSI escape sequences (`ESC [ ... final-byte`).
    fn strip_ansi(text: &str) -> String {
        let mut out = String::new();
        let mut chars = text.chars().peekable();
        while let Some(c) = chars.next() {
            if c == '\x1b' && chars.peek() == Some(&'[') {
                chars.next();
                for next in chars.by_ref() {
                    if next.is_ascii_alphabetic() {
                        break;
                    }
                }
                continue;
            }
            out.push(c);
        }
        out
    }

    #[test]
    fn plain_output_matches_golden_text() {
        let first = rendered("stowage can only be started by root", false);
        assert_eq!(first, GOLDEN_PLAIN);
        assert_eq!(first, rendered("stowage can only be started by root", false));
        assert!(!first.contains('\x1b'));
    }

    #[test]
    fn terminal_output_only_adds_escapes() {
        let colored = rendered("stowage can only be started by root", true);
        assert!(colored.contains('\x1b'));
        assert_eq!(strip_ansi(&colored), GOLDEN_PLAIN);
        assert_eq!(colored, rendered("stowage can only be started by root", true));
    }

    #[test]
    fn terminal_output_ignores_crossterm_color_state() {
        let message = "stowage can only be started by root";
        let before = rendered(message, true);
        force_color_output(false);
        let after = rendered(message, true);
        assert_eq!(before, after);
        assert!(after.contains("\x1b[38;5;11m"), "got: {after:?}");
    }

    #[test]
    fn multiline_messages_are_indented_per_line() {
        let text = rendered("first line\nsecond line", false);
        assert!(text.contains("\n  first line\n  second line\n"));
    }
}
