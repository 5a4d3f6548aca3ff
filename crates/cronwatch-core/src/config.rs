use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CronwatchError, Result};

pub const DEFAULT_BIND: &str = "0.0.0.0";
pub const ENV_PREFIX: &str = "CRONWATCH_";

/// Controller configuration (cronwatch.toml + CRONWATCH_* env overrides).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Dashboard bind address, e.g. ":8998" or "127.0.0.1:8998".
    /// Absent or empty disables the dashboard.
    #[serde(default)]
    pub address: Option<String>,
    /// IANA timezone used to evaluate schedules. Absent means the local zone.
    #[serde(default)]
    pub location: Option<String>,
}

/// Timezone in which schedule expressions are evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Location {
    #[default]
    Local,
    Zone(chrono_tz::Tz),
}

impl Location {
    pub fn parse(name: &str) -> Result<Self> {
        let name = name.trim();
        if name.is_empty() || name.eq_ignore_ascii_case("local") {
            return Ok(Location::Local);
        }
        name.parse::<chrono_tz::Tz>()
            .map(Location::Zone)
            .map_err(|e| CronwatchError::Config(format!("unknown location {name:?}: {e}")))
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Location::Local => write!(f, "Local"),
            Location::Zone(tz) => write!(f, "{}", tz.name()),
        }
    }
}

impl Config {
    /// Load config from a TOML file with CRONWATCH_* env var overrides.
    ///
    /// Path resolution: explicit argument, then ~/.cronwatch/cronwatch.toml.
    /// A missing file is not an error; every field has a default.
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);
        debug!(path = %path, "loading config");

        Figment::new()
            .merge(Toml::file(&path))
            .merge(Env::prefixed(ENV_PREFIX))
            .extract()
            .map_err(|e| CronwatchError::Config(e.to_string()))
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Resolve the configured timezone.
    pub fn timezone(&self) -> Result<Location> {
        match self.location.as_deref() {
            Some(name) => Location::parse(name),
            None => Ok(Location::Local),
        }
    }

    /// Normalised socket address for the dashboard, or `None` when disabled.
    ///
    /// A bare ":port" binds every interface.
    pub fn bind_addr(&self) -> Option<String> {
        let address = self.address.as_deref()?.trim();
        if address.is_empty() {
            return None;
        }
        if let Some(port) = address.strip_prefix(':') {
            return Some(format!("{DEFAULT_BIND}:{port}"));
        }
        Some(address.to_string())
    }
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.cronwatch/cronwatch.toml", home)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_addr_expands_bare_port() {
        let cfg = Config::default().with_address(":8998");
        assert_eq!(cfg.bind_addr().as_deref(), Some("0.0.0.0:8998"));

        let cfg = Config::default().with_address("127.0.0.1:9000");
        assert_eq!(cfg.bind_addr().as_deref(), Some("127.0.0.1:9000"));
    }

    #[test]
    fn empty_address_disables_dashboard() {
        assert_eq!(Config::default().bind_addr(), None);
        assert_eq!(Config::default().with_address("  ").bind_addr(), None);
    }

    #[test]
    fn timezone_resolution() {
        assert_eq!(Config::default().timezone().unwrap(), Location::Local);
        let cfg = Config::default().with_location("Asia/Jakarta");
        assert_eq!(
            cfg.timezone().unwrap(),
            Location::Zone(chrono_tz::Asia::Jakarta)
        );
        let err = Config::default()
            .with_location("Mars/Olympus")
            .timezone()
            .unwrap_err();
        assert_eq!(err.code(), "CONFIG_ERROR");
    }

    #[test]
    fn load_merges_file_and_env() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "cronwatch.toml",
                r#"
                address = ":8000"
                location = "UTC"
                "#,
            )?;
            jail.set_env("CRONWATCH_LOCATION", "Asia/Jakarta");

            let cfg = Config::load(Some("cronwatch.toml")).expect("config should load");
            assert_eq!(cfg.address.as_deref(), Some(":8000"));
            assert_eq!(cfg.location.as_deref(), Some("Asia/Jakarta"));
            Ok(())
        });
    }

    #[test]
    fn load_missing_file_yields_defaults() {
        figment::Jail::expect_with(|_jail| {
            let cfg = Config::load(Some("does-not-exist.toml")).expect("defaults");
            assert_eq!(cfg, Config::default());
            Ok(())
        });
    }
}
