//! Well-known configuration keys and their built-in defaults.

use std::time::Duration;

use super::{ConfigStore, Tier};

/// Environment variable that supplies (and receives) the config file path.
pub const CONFIG_FILE_ENV: &str = "STOWAGE_CONFIG_FILE";
/// Config file consulted when neither `--config` nor the env var is set.
pub const DEFAULT_CONFIG_FILE: &str = "/etc/stowage/stowage.toml";

pub const KEY_LOG_LEVEL: &str = "stowage.logLevel";
pub const KEY_HOST: &str = "stowage.host";
pub const KEY_SERVICE: &str = "stowage.service";
pub const KEY_PATH_CACHE: &str = "stowage.volume.pathCache.enabled";
pub const KEY_OUTPUT_FORMAT: &str = "stowage.cli.format";
pub const KEY_OUTPUT_TEMPLATE: &str = "stowage.cli.template";
pub const KEY_OUTPUT_TEMPLATE_TABS: &str = "stowage.cli.templateTabs";
pub const KEY_PID_FILE: &str = "stowage.service.pidFile";
pub const KEY_UNIT_FILE: &str = "stowage.install.unitFile";
pub const KEY_CLIENT_HOST: &str = "client.host";
pub const KEY_CLIENT_SERVICE: &str = "client.service";
pub const KEY_CLIENT_TIMEOUT: &str = "client.timeout";

pub(super) const DEFAULT_LOG_LEVEL: &str = "warn";
pub(super) const DEFAULT_CLIENT_HOST: &str = "http://127.0.0.1:7979";
pub(super) const DEFAULT_CLIENT_TIMEOUT: Duration = Duration::from_secs(60);
pub(super) const DEFAULT_PID_FILE: &str = "/var/run/stowage/stowage.pid";
pub(super) const DEFAULT_UNIT_FILE: &str = "/etc/systemd/system/stowage.service";

/// Populate the default tier with every well-known key.
pub(super) fn install(store: &mut ConfigStore) {
    let defaults: [(&str, super::ConfigValue); 12] = [
        (KEY_LOG_LEVEL, DEFAULT_LOG_LEVEL.into()),
        (KEY_HOST, "".into()),
        (KEY_SERVICE, "".into()),
        (KEY_PATH_CACHE, true.into()),
        (KEY_OUTPUT_FORMAT, "tmpl".into()),
        (KEY_OUTPUT_TEMPLATE, "".into()),
        (KEY_OUTPUT_TEMPLATE_TABS, true.into()),
        (KEY_PID_FILE, DEFAULT_PID_FILE.into()),
        (KEY_UNIT_FILE, DEFAULT_UNIT_FILE.into()),
        (KEY_CLIENT_HOST, DEFAULT_CLIENT_HOST.into()),
        (KEY_CLIENT_SERVICE, "".into()),
        (KEY_CLIENT_TIMEOUT, DEFAULT_CLIENT_TIMEOUT.into()),
    ];
    for (key, value) in defaults {
        store.set_at(Tier::Default, key, value);
    }
}
