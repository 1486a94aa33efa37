//! Environment tier.
//!
//! A dotted key maps to an upper-case variable with dots replaced by
//! underscores: `stowage.logLevel` is read from `STOWAGE_LOGLEVEL`. Only keys
//! already known from the default or file tier are consulted.

use super::{ConfigStore, Tier};

/// Environment variable name for a dotted config key.
pub fn env_var_name(key: &str) -> String {
    key.replace('.', "_").to_ascii_uppercase()
}

impl ConfigStore {
    /// Rebuild the environment tier from `env_lookup`.
    pub fn apply_env_tier<FEnv>(&mut self, env_lookup: FEnv) -> usize
    where
        FEnv: Fn(&str) -> Option<String>,
    {
        self.clear_tier(Tier::Env);
        let mut applied = 0;
        for key in self.known_keys() {
            if let Some(value) = env_lookup(&env_var_name(&key)) {
                self.set_at(Tier::Env, &key, value);
                applied += 1;
            }
        }
        applied
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::KEY_LOG_LEVEL;
    use std::collections::BTreeMap;

    #[test]
    fn env_var_name_uppercases_and_replaces_dots() {
        assert_eq!(env_var_name("stowage.logLevel"), "STOWAGE_LOGLEVEL");
        assert_eq!(env_var_name("client.host"), "CLIENT_HOST");
    }

    #[test]
    fn env_tier_overrides_file_for_known_keys() {
        let vars = BTreeMap::from([
            ("STOWAGE_LOGLEVEL".to_string(), "debug".to_string()),
            ("UNRELATED_VAR".to_string(), "x".to_string()),
        ]);
        let mut store = ConfigStore::with_defaults();
        store.set_at(Tier::File, KEY_LOG_LEVEL, "info");
        let applied = store.apply_env_tier(|name| vars.get(name).cloned());
        assert_eq!(applied, 1);
        assert_eq!(store.get_string(KEY_LOG_LEVEL), "debug");
        assert_eq!(store.source_of(KEY_LOG_LEVEL), Some(Tier::Env));
    }

    #[test]
    fn env_tier_picks_up_keys_introduced_by_the_file() {
        let vars = BTreeMap::from([("VOLUME_DEFAULT_SIZE".to_string(), "20".to_string())]);
        let mut store = ConfigStore::with_defaults();
        assert_eq!(store.apply_env_tier(|name| vars.get(name).cloned()), 0);
        store.set_at(Tier::File, "volume.default.size", 10_i64);
        store.apply_env_tier(|name| vars.get(name).cloned());
        assert_eq!(store.get_int("volume.default.size"), Some(20));
    }
}
