//! Typed configuration values and the precedence tiers that hold them.

use std::fmt;
use std::time::Duration;

/// Source tier of a configuration entry, lowest precedence first.
///
/// `Override` holds settings the CLI forces on itself (for example disabling
/// the volume path cache); they beat file and environment values but never an
/// explicit flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Tier {
    Default,
    File,
    Env,
    Override,
    Flag,
}

impl Tier {
    /// All tiers ordered from lowest to highest precedence.
    pub const ALL: [Tier; 5] = [
        Tier::Default,
        Tier::File,
        Tier::Env,
        Tier::Override,
        Tier::Flag,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Tier::Default => "default",
            Tier::File => "file",
            Tier::Env => "env",
            Tier::Override => "override",
            Tier::Flag => "flag",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One typed configuration value.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValue {
    String(String),
    Bool(bool),
    Int(i64),
    Duration(Duration),
}

impl ConfigValue {
    /// Interpret the value as a boolean; strings accept the usual spellings.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            Self::Int(i) => Some(*i != 0),
            Self::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => Some(true),
                "false" | "0" | "no" | "off" | "" => Some(false),
                _ => None,
            },
            Self::Duration(_) => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            Self::Bool(b) => Some(i64::from(*b)),
            Self::String(s) => s.trim().parse().ok(),
            Self::Duration(d) => i64::try_from(d.as_secs()).ok(),
        }
    }

    /// Interpret the value as a duration; bare integers are seconds.
    pub fn as_duration(&self) -> Option<Duration> {
        match self {
            Self::Duration(d) => Some(*d),
            Self::Int(i) => u64::try_from(*i).ok().map(Duration::from_secs),
            Self::String(s) => parse_duration(s),
            Self::Bool(_) => None,
        }
    }
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => f.write_str(s),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Duration(d) => f.write_str(&format_duration(*d)),
        }
    }
}

impl From<&str> for ConfigValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for ConfigValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<bool> for ConfigValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for ConfigValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<Duration> for ConfigValue {
    fn from(value: Duration) -> Self {
        Self::Duration(value)
    }
}

/// Parse `500ms`, `30s`, `10m`, `2h`, `1d`, or bare seconds.
pub fn parse_duration(input: &str) -> Option<Duration> {
    let s = input.trim().to_ascii_lowercase();
    if s.is_empty() {
        return None;
    }
    let (digits, unit) = if let Some(rest) = s.strip_suffix("ms") {
        (rest, "ms")
    } else if s.ends_with(|c: char| c.is_ascii_alphabetic()) {
        s.split_at(s.len() - 1)
    } else {
        (s.as_str(), "s")
    };
    // u64 with checked arithmetic so day/hour conversions cannot overflow silently.
    let value = digits.parse::<u64>().ok()?;
    match unit {
        "ms" => Some(Duration::from_millis(value)),
        "s" => Some(Duration::from_secs(value)),
        "m" => value.checked_mul(60).map(Duration::from_secs),
        "h" => value.checked_mul(3_600).map(Duration::from_secs),
        "d" => value.checked_mul(86_400).map(Duration::from_secs),
        _ => None,
    }
}

fn format_duration(d: Duration) -> String {
    if d.subsec_millis() != 0 {
        format!("{}ms", d.as_millis())
    } else {
        format!("{}s", d.as_secs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_duration_supports_common_units() {
        assert_eq!(parse_duration("10m"), Some(Duration::from_secs(600)));
        assert_eq!(parse_duration("30"), Some(Duration::from_secs(30)));
        assert_eq!(parse_duration("500ms"), Some(Duration::from_millis(500)));
        assert_eq!(parse_duration("2h"), Some(Duration::from_secs(7200)));
        assert_eq!(parse_duration("bad"), None);
        assert_eq!(parse_duration(""), None);
    }

    #[test]
    fn string_values_coerce_to_bool() {
        assert_eq!(ConfigValue::from("TRUE").as_bool(), Some(true));
        assert_eq!(ConfigValue::from("off").as_bool(), Some(false));
        assert_eq!(ConfigValue::from("maybe").as_bool(), None);
    }

    #[test]
    fn durations_display_in_parseable_form() {
        let v = ConfigValue::from(Duration::from_millis(1500));
        assert_eq!(v.to_string(), "1500ms");
        assert_eq!(
            parse_duration(&v.to_string()),
            Some(Duration::from_millis(1500))
        );
        assert_eq!(ConfigValue::from(Duration::from_secs(60)).to_string(), "60s");
    }

    #[test]
    fn tiers_order_by_precedence() {
        assert!(Tier::Flag > Tier::Override);
        assert!(Tier::Override > Tier::Env);
        assert!(Tier::Env > Tier::File);
        assert!(Tier::File > Tier::Default);
    }
}
