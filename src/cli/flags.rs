//! Flag declarations and parsed flag values.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::config::{ConfigStore, ConfigValue, Tier};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagKind {
    Bool,
    String,
    Int,
    /// Repeatable string flag.
    List,
}

/// Declaration of one flag on a command node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlagSpec {
    pub long: &'static str,
    pub short: Option<char>,
    pub kind: FlagKind,
    pub default: Option<&'static str>,
    pub help: &'static str,
    /// Visible to every descendant of the declaring node.
    pub persistent: bool,
    /// Config key the flag writes into the flag tier when given explicitly.
    pub config_key: Option<&'static str>,
    /// Controls the CLI itself and is never forwarded to the storage service.
    pub ambient: bool,
}

impl FlagSpec {
    const fn new(long: &'static str, kind: FlagKind, help: &'static str) -> Self {
        Self {
            long,
            short: None,
            kind,
            default: None,
            help,
            persistent: false,
            config_key: None,
            ambient: false,
        }
    }

    pub const fn bool(long: &'static str, help: &'static str) -> Self {
        Self::new(long, FlagKind::Bool, help)
    }

    pub const fn string(long: &'static str, help: &'static str) -> Self {
        Self::new(long, FlagKind::String, help)
    }

    pub const fn int(long: &'static str, help: &'static str) -> Self {
        Self::new(long, FlagKind::Int, help)
    }

    pub const fn list(long: &'static str, help: &'static str) -> Self {
        Self::new(long, FlagKind::List, help)
    }

    pub const fn short(mut self, short: char) -> Self {
        self.short = Some(short);
        self
    }

    pub const fn default(mut self, value: &'static str) -> Self {
        self.default = Some(value);
        self
    }

    pub const fn persistent(mut self) -> Self {
        self.persistent = true;
        self
    }

    pub const fn config(mut self, key: &'static str) -> Self {
        self.config_key = Some(key);
        self
    }

    pub const fn ambient(mut self) -> Self {
        self.ambient = true;
        self
    }
}

/// One parsed flag value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlagValue {
    Bool(bool),
    String(String),
    Int(i64),
    List(Vec<String>),
}

impl FlagValue {
    fn to_config(&self) -> ConfigValue {
        match self {
            Self::Bool(b) => ConfigValue::Bool(*b),
            Self::String(s) => ConfigValue::String(s.clone()),
            Self::Int(i) => ConfigValue::Int(*i),
            Self::List(items) => ConfigValue::String(items.join(",")),
        }
    }

    fn to_json(&self) -> Value {
        match self {
            Self::Bool(b) => Value::Bool(*b),
            Self::String(s) => Value::String(s.clone()),
            Self::Int(i) => Value::from(*i),
            Self::List(items) => Value::from(items.clone()),
        }
    }
}

#[derive(Debug, Clone)]
struct ParsedFlag {
    value: FlagValue,
    explicit: bool,
    config_key: Option<&'static str>,
    ambient: bool,
}

/// Flag values for the resolved command, including defaults.
#[derive(Debug, Clone, Default)]
pub struct ParsedFlags {
    values: BTreeMap<String, ParsedFlag>,
}

impl ParsedFlags {
    pub fn insert(&mut self, spec: &FlagSpec, value: FlagValue, explicit: bool) {
        self.values.insert(
            spec.long.to_string(),
            ParsedFlag {
                value,
                explicit,
                config_key: spec.config_key,
                ambient: spec.ambient,
            },
        );
    }

    pub fn get(&self, name: &str) -> Option<&FlagValue> {
        self.values.get(name).map(|flag| &flag.value)
    }

    /// Whether `name` was given on the command line (not just defaulted).
    pub fn is_set(&self, name: &str) -> bool {
        self.values.get(name).is_some_and(|flag| flag.explicit)
    }

    pub fn get_bool(&self, name: &str) -> bool {
        matches!(self.get(name), Some(FlagValue::Bool(true)))
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        match self.get(name) {
            Some(FlagValue::String(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn get_int(&self, name: &str) -> Option<i64> {
        match self.get(name) {
            Some(FlagValue::Int(i)) => Some(*i),
            _ => None,
        }
    }

    pub fn get_list(&self, name: &str) -> &[String] {
        match self.get(name) {
            Some(FlagValue::List(items)) => items,
            _ => &[],
        }
    }

    /// Rewrite the flag tier from explicitly given, config-bound flags.
    pub fn apply_to(&self, config: &mut ConfigStore) {
        config.clear_tier(Tier::Flag);
        for flag in self.values.values().filter(|flag| flag.explicit) {
            if let Some(key) = flag.config_key {
                config.set_at(Tier::Flag, key, flag.value.to_config());
            }
        }
    }

    /// Explicit, non-ambient flags as request parameters for the storage service.
    pub fn params(&self) -> Map<String, Value> {
        self.values
            .iter()
            .filter(|(_, flag)| flag.explicit && !flag.ambient)
            .map(|(name, flag)| (name.clone(), flag.value.to_json()))
            .collect()
    }
}
