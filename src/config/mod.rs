//! Layered key/value configuration.
//!
//! Every key is a dotted path (`stowage.logLevel`). Values live in one of five
//! tiers; reads return the value from the highest tier that holds the key:
//!
//! 1. Flags given on the command line
//! 2. Overrides the CLI forces on itself
//! 3. Environment variables (`stowage.logLevel` -> `STOWAGE_LOGLEVEL`)
//! 4. The TOML config file
//! 5. Built-in defaults

use std::collections::BTreeMap;
use std::time::Duration;

mod defaults;
mod env;
mod file;
mod value;

pub use defaults::{
    CONFIG_FILE_ENV, DEFAULT_CONFIG_FILE, KEY_CLIENT_HOST, KEY_CLIENT_SERVICE,
    KEY_CLIENT_TIMEOUT, KEY_HOST, KEY_LOG_LEVEL, KEY_OUTPUT_FORMAT, KEY_OUTPUT_TEMPLATE,
    KEY_OUTPUT_TEMPLATE_TABS, KEY_PATH_CACHE, KEY_PID_FILE, KEY_SERVICE, KEY_UNIT_FILE,
};
pub use env::env_var_name;
pub use file::{flatten_table, ConfigValidator, TomlValidator};
pub use value::{parse_duration, ConfigValue, Tier};

/// Layered configuration store.
#[derive(Debug, Clone, Default)]
pub struct ConfigStore {
    tiers: BTreeMap<Tier, BTreeMap<String, ConfigValue>>,
}

impl ConfigStore {
    /// Empty store with no defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with the built-in default tier.
    pub fn with_defaults() -> Self {
        let mut store = Self::new();
        defaults::install(&mut store);
        store
    }

    /// Write `key` into one specific tier.
    pub fn set_at(&mut self, tier: Tier, key: &str, value: impl Into<ConfigValue>) {
        self.tiers
            .entry(tier)
            .or_default()
            .insert(key.to_string(), value.into());
    }

    /// Write `key` into the override tier.
    pub fn set(&mut self, key: &str, value: impl Into<ConfigValue>) {
        self.set_at(Tier::Override, key, value);
    }

    pub fn remove_at(&mut self, tier: Tier, key: &str) -> Option<ConfigValue> {
        self.tiers.get_mut(&tier)?.remove(key)
    }

    pub fn clear_tier(&mut self, tier: Tier) {
        self.tiers.remove(&tier);
    }

    /// Effective value of `key` across all tiers.
    pub fn get(&self, key: &str) -> Option<&ConfigValue> {
        self.lookup(key).map(|(value, _)| value)
    }

    /// Value of `key` in exactly one tier.
    pub fn get_at(&self, tier: Tier, key: &str) -> Option<&ConfigValue> {
        self.tiers.get(&tier)?.get(key)
    }

    /// Tier the effective value of `key` comes from.
    pub fn source_of(&self, key: &str) -> Option<Tier> {
        self.lookup(key).map(|(_, tier)| tier)
    }

    /// Effective value rendered as a string; empty when unset.
    pub fn get_string(&self, key: &str) -> String {
        self.get(key).map(ToString::to_string).unwrap_or_default()
    }

    /// Effective value as a bool; unset or unparsable values read as false.
    pub fn get_bool(&self, key: &str) -> bool {
        self.get(key).and_then(ConfigValue::as_bool).unwrap_or(false)
    }

    pub fn get_int(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(ConfigValue::as_int)
    }

    pub fn get_duration(&self, key: &str) -> Option<Duration> {
        self.get(key).and_then(ConfigValue::as_duration)
    }

    /// Every known key with its effective value and source tier.
    pub fn effective(&self) -> BTreeMap<&str, (&ConfigValue, Tier)> {
        let mut out = BTreeMap::new();
        for tier in Tier::ALL {
            let Some(entries) = self.tiers.get(&tier) else {
                continue;
            };
            for (key, value) in entries {
                out.insert(key.as_str(), (value, tier));
            }
        }
        out
    }

    fn lookup(&self, key: &str) -> Option<(&ConfigValue, Tier)> {
        Tier::ALL
            .iter()
            .rev()
            .find_map(|tier| self.get_at(*tier, key).map(|value| (value, *tier)))
    }

    /// Keys that the environment tier may override.
    fn known_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = [Tier::Default, Tier::File]
            .iter()
            .filter_map(|tier| self.tiers.get(tier))
            .flat_map(|entries| entries.keys().cloned())
            .collect();
        keys.sort();
        keys.dedup();
        keys
    }
}
