//! File tier: structural validation and merging of TOML config files.

use std::path::Path;

use crate::error::ConfigError;

use super::{ConfigStore, ConfigValue, Tier};

/// Validates a config file before any of it reaches the store.
pub trait ConfigValidator {
    /// Check `text` read from `path` and return the parsed table.
    fn validate(&self, path: &Path, text: &str) -> Result<toml::Table, ConfigError>;
}

/// Default validator: the file must be TOML whose top level holds only
/// tables, and every leaf must be a scalar or an array of scalars.
#[derive(Debug, Clone, Copy, Default)]
pub struct TomlValidator;

impl ConfigValidator for TomlValidator {
    fn validate(&self, path: &Path, text: &str) -> Result<toml::Table, ConfigError> {
        let table: toml::Table = toml::from_str(text)?;
        for (key, value) in &table {
            if !value.is_table() {
                return Err(ConfigError::Invalid(format!(
                    "{}: top-level key `{key}` must be a table such as `[{key}]`",
                    path.display()
                )));
            }
        }
        // Flattening performs the leaf checks; discard the output here.
        flatten_table(&table)?;
        Ok(table)
    }
}

/// Flatten nested tables into dotted keys.
pub fn flatten_table(table: &toml::Table) -> Result<Vec<(String, ConfigValue)>, ConfigError> {
    let mut out = Vec::new();
    flatten_into("", table, &mut out)?;
    Ok(out)
}

fn flatten_into(
    prefix: &str,
    table: &toml::Table,
    out: &mut Vec<(String, ConfigValue)>,
) -> Result<(), ConfigError> {
    for (key, value) in table {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match value {
            toml::Value::Table(inner) => flatten_into(&path, inner, out)?,
            toml::Value::Array(items) => {
                let mut parts = Vec::with_capacity(items.len());
                for item in items {
                    parts.push(scalar_text(&path, item)?);
                }
                out.push((path, ConfigValue::String(parts.join(","))));
            }
            toml::Value::String(s) => out.push((path, ConfigValue::String(s.clone()))),
            toml::Value::Integer(i) => out.push((path, ConfigValue::Int(*i))),
            toml::Value::Boolean(b) => out.push((path, ConfigValue::Bool(*b))),
            toml::Value::Float(_) | toml::Value::Datetime(_) => {
                out.push((path, ConfigValue::String(value.to_string())))
            }
        }
    }
    Ok(())
}

fn scalar_text(path: &str, value: &toml::Value) -> Result<String, ConfigError> {
    match value {
        toml::Value::String(s) => Ok(s.clone()),
        toml::Value::Table(_) | toml::Value::Array(_) => Err(ConfigError::Invalid(format!(
            "`{path}` may only contain scalar values"
        ))),
        other => Ok(other.to_string()),
    }
}

impl ConfigStore {
    /// Replace the file tier with the contents of `table`.
    pub fn merge_file_table(&mut self, table: &toml::Table) -> Result<usize, ConfigError> {
        let entries = flatten_table(table)?;
        self.clear_tier(Tier::File);
        let count = entries.len();
        for (key, value) in entries {
            self.set_at(Tier::File, &key, value);
        }
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{KEY_CLIENT_HOST, KEY_LOG_LEVEL};

    fn validate(text: &str) -> Result<toml::Table, ConfigError> {
        TomlValidator.validate(Path::new("stowage.toml"), text)
    }

    #[test]
    fn nested_tables_flatten_to_dotted_keys() {
        let table = validate(
            r#"
[stowage]
logLevel = "info"

[stowage.volume.pathCache]
enabled = true

[client]
host = "http://storage:7979"
retries = 3
"#,
        )
        .expect("valid config");
        let mut store = ConfigStore::with_defaults();
        let merged = store.merge_file_table(&table).expect("merge");
        assert_eq!(merged, 4);
        assert_eq!(store.get_string(KEY_LOG_LEVEL), "info");
        assert_eq!(store.get_string(KEY_CLIENT_HOST), "http://storage:7979");
        assert_eq!(store.get_int("client.retries"), Some(3));
        assert_eq!(store.source_of(KEY_LOG_LEVEL), Some(Tier::File));
    }

    #[test]
    fn top_level_scalars_are_rejected() {
        let err = validate("logLevel = \"debug\"").unwrap_err();
        assert!(
            err.to_string().contains("top-level key `logLevel` must be a table"),
            "got: {err}"
        );
    }

    #[test]
    fn malformed_toml_is_rejected() {
        let err = validate("[stowage\nlogLevel = 1").unwrap_err();
        assert!(err.to_string().starts_with("toml:"), "got: {err}");
    }

    #[test]
    fn arrays_of_scalars_join_and_nested_arrays_fail() {
        let table = validate("[module]\nnames = [\"a\", \"b\"]").expect("valid");
        let flat = flatten_table(&table).expect("flatten");
        assert_eq!(
            flat,
            vec![("module.names".to_string(), ConfigValue::from("a,b"))]
        );

        let err = validate("[module]\nnames = [[\"a\"]]").unwrap_err();
        assert!(err.to_string().contains("scalar values"), "got: {err}");
    }

    #[test]
    fn merging_replaces_previous_file_values() {
        let mut store = ConfigStore::new();
        store
            .merge_file_table(&validate("[a]\nb = 1\nc = 2").expect("valid"))
            .expect("merge");
        store
            .merge_file_table(&validate("[a]\nb = 5").expect("valid"))
            .expect("merge");
        assert_eq!(store.get_int("a.b"), Some(5));
        assert_eq!(store.get("a.c"), None);
    }
}
