//! Rendering of storage replies for `--format`, `--template`, `--quiet`.

use serde_json::{Map, Value};

use crate::config::{KEY_OUTPUT_FORMAT, KEY_OUTPUT_TEMPLATE, KEY_OUTPUT_TEMPLATE_TABS};
use crate::error::FlagError;
use crate::invocation::Invocation;
use crate::signal::Flow;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Table, or a per-row `{{.field}}` template.
    Tmpl,
    Json,
    /// Indented JSON.
    JsonPretty,
}

impl Format {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "tmpl" => Some(Self::Tmpl),
            "json" => Some(Self::Json),
            "jsonp" => Some(Self::JsonPretty),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputOptions {
    pub format: Format,
    pub template: Option<String>,
    /// Pad table columns to a common width instead of a single tab.
    pub aligned: bool,
    pub quiet: bool,
}

impl OutputOptions {
    /// Read output settings from the invocation's effective config and flags.
    pub fn from_invocation(inv: &Invocation) -> Result<Self, FlagError> {
        let raw = inv.config.get_string(KEY_OUTPUT_FORMAT);
        let format = Format::parse(&raw).ok_or_else(|| FlagError::Invalid {
            flag: "format".into(),
            message: format!("`{raw}` is not one of tmpl, json, jsonp"),
        })?;
        let template = inv.config.get_string(KEY_OUTPUT_TEMPLATE);
        Ok(Self {
            format,
            template: (!template.is_empty()).then_some(template),
            aligned: inv.config.get_bool(KEY_OUTPUT_TEMPLATE_TABS),
            quiet: inv.flags.get_bool("quiet"),
        })
    }
}

/// Print `value` on stdout in the requested format.
pub fn emit(inv: &mut Invocation, value: &Value) -> Flow {
    let options = match OutputOptions::from_invocation(inv) {
        Ok(options) => options,
        Err(err) => return Err(inv.report(&err)),
    };
    let text = render(value, &options);
    if !text.is_empty() {
        inv.print(&text)?;
    }
    Ok(())
}

pub fn render(value: &Value, options: &OutputOptions) -> String {
    match options.format {
        Format::Json => value.to_string(),
        Format::JsonPretty => {
            serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
        }
        Format::Tmpl => match &options.template {
            Some(template) => rows(value)
                .iter()
                .map(|row| fill_template(template, row))
                .collect::<Vec<_>>()
                .join("\n"),
            None => render_table(value, options),
        },
    }
}

/// Objects become rows; anything else renders as a single `value` column.
fn rows(value: &Value) -> Vec<Map<String, Value>> {
    let items: Vec<&Value> = match value {
        Value::Null => Vec::new(),
        Value::Array(items) => items.iter().collect(),
        other => vec![other],
    };
    items
        .into_iter()
        .map(|item| match item {
            Value::Object(map) => map.clone(),
            scalar => {
                let mut map = Map::new();
                map.insert("value".to_string(), scalar.clone());
                map
            }
        })
        .collect()
}

fn render_table(value: &Value, options: &OutputOptions) -> String {
    let rows = rows(value);
    let mut columns: Vec<String> = Vec::new();
    for row in &rows {
        for key in row.keys() {
            if !columns.contains(key) {
                columns.push(key.clone());
            }
        }
    }
    if columns.is_empty() {
        return String::new();
    }

    let mut lines: Vec<Vec<String>> = Vec::with_capacity(rows.len() + 1);
    if !options.quiet {
        lines.push(columns.iter().map(|c| c.to_uppercase()).collect());
    }
    for row in &rows {
        lines.push(
            columns
                .iter()
                .map(|c| row.get(c).map(cell).unwrap_or_default())
                .collect(),
        );
    }

    if !options.aligned {
        return lines
            .iter()
            .map(|line| line.join("\t"))
            .collect::<Vec<_>>()
            .join("\n");
    }
    let widths: Vec<usize> = (0..columns.len())
        .map(|i| lines.iter().map(|line| line[i].chars().count()).max().unwrap_or(0))
        .collect();
    lines
        .iter()
        .map(|line| {
            let padded: Vec<String> = line
                .iter()
                .zip(&widths)
                .map(|(text, width)| format!("{text:<width$}"))
                .collect();
            padded.join("  ").trim_end().to_string()
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Replace every `{{.field}}` with the row's value; unknown fields are empty.
fn fill_template(template: &str, row: &Map<String, Value>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            out.push_str(&rest[start..]);
            return out;
        };
        let field = after[..end].trim().trim_start_matches('.');
        if let Some(value) = row.get(field) {
            out.push_str(&cell(value));
        }
        rest = &after[end + 2..];
    }
    out.push_str(rest);
    out
}
