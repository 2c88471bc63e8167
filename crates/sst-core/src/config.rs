use anyhow::{Context, Result};
use chrono::TimeDelta;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::model::UnitRange;

/// Name of the config file inside the data directory.
pub const CONFIG_FILE: &str = "config.toml";
/// Name of the SQLite document store inside the data directory.
pub const STORE_FILE: &str = "sst.sqlite3";
/// Advisory lock held while a sync cycle runs.
pub const SYNC_LOCK_FILE: &str = "sync.lock";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub units: UnitsConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_debounce_secs")]
    pub debounce_secs: u64,
    #[serde(default = "default_min_interval_secs")]
    pub min_interval_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            api_key: None,
            timeout_secs: default_timeout_secs(),
            debounce_secs: default_debounce_secs(),
            min_interval_secs: default_min_interval_secs(),
        }
    }
}

/// Where and how to reach the remote snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteTarget {
    pub endpoint: String,
    pub api_key: String,
    pub timeout: Duration,
}

impl SyncConfig {
    /// The remote target, or `None` when no endpoint is configured.
    #[must_use]
    pub fn remote(&self) -> Option<RemoteTarget> {
        let endpoint = self.endpoint.as_deref().map(str::trim).filter(|e| !e.is_empty())?;
        Some(RemoteTarget {
            endpoint: endpoint.to_string(),
            api_key: self.api_key.clone().unwrap_or_default(),
            timeout: Duration::from_secs(self.timeout_secs),
        })
    }

    #[must_use]
    pub fn debounce(&self) -> TimeDelta {
        TimeDelta::seconds(i64::try_from(self.debounce_secs).unwrap_or(i64::MAX / 1000))
    }

    #[must_use]
    pub fn min_interval(&self) -> TimeDelta {
        TimeDelta::seconds(i64::try_from(self.min_interval_secs).unwrap_or(i64::MAX / 1000))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitsConfig {
    /// Ranges written by `init` when the store has none.
    #[serde(default = "default_ranges")]
    pub default_ranges: Vec<UnitRange>,
}

impl Default for UnitsConfig {
    fn default() -> Self {
        Self {
            default_ranges: default_ranges(),
        }
    }
}

/// Environment values that take part in resolution, captured once so tests
/// can pass them explicitly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvOverrides {
    pub home: Option<PathBuf>,
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
}

impl EnvOverrides {
    /// Read `SST_HOME`, `SST_ENDPOINT`, and `SST_API_KEY`. Empty values are
    /// treated as unset.
    #[must_use]
    pub fn from_env() -> Self {
        fn var(name: &str) -> Option<String> {
            std::env::var(name).ok().filter(|value| !value.trim().is_empty())
        }

        Self {
            home: var("SST_HOME").map(PathBuf::from),
            endpoint: var("SST_ENDPOINT"),
            api_key: var("SST_API_KEY"),
        }
    }
}

/// Pick the data directory: explicit flag, then `SST_HOME`, then the
/// platform data directory.
///
/// # Errors
///
/// Returns an error when none of the three yields a directory.
pub fn resolve_data_dir(flag: Option<&Path>, env: &EnvOverrides) -> Result<PathBuf> {
    if let Some(dir) = flag {
        return Ok(dir.to_path_buf());
    }
    if let Some(dir) = &env.home {
        return Ok(dir.clone());
    }
    dirs::data_dir()
        .map(|dir| dir.join("sst"))
        .context("no platform data directory; pass --data-dir or set SST_HOME")
}

/// Load `<data_dir>/config.toml`; a missing file yields the defaults.
///
/// # Errors
///
/// Returns an error when the file exists but cannot be read or parsed.
pub fn load_config(data_dir: &Path) -> Result<Config> {
    let path = data_dir.join(CONFIG_FILE);
    if !path.exists() {
        return Ok(Config::default());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<Config>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

/// Load the config file and apply environment overrides on top.
///
/// # Errors
///
/// Returns an error when the config file cannot be read or parsed.
pub fn resolve_config(data_dir: &Path, env: &EnvOverrides) -> Result<Config> {
    let mut config = load_config(data_dir)?;
    if let Some(endpoint) = &env.endpoint {
        config.sync.endpoint = Some(endpoint.clone());
    }
    if let Some(api_key) = &env.api_key {
        config.sync.api_key = Some(api_key.clone());
    }
    Ok(config)
}

const DEFAULT_CONFIG_TEMPLATE: &str = r#"# sst configuration

[sync]
# endpoint = "https://example.invalid/sst/v1"
# api_key = ""
timeout_secs = 20
debounce_secs = 5
min_interval_secs = 30

[units]
default_ranges = [{ start = 1, end = 80 }]
"#;

/// Write a commented default config unless one already exists.
///
/// Returns `true` when a file was written.
///
/// # Errors
///
/// Returns an error when the directory or file cannot be written.
pub fn write_default_config(data_dir: &Path) -> Result<bool> {
    let path = data_dir.join(CONFIG_FILE);
    if path.exists() {
        return Ok(false);
    }
    std::fs::create_dir_all(data_dir)
        .with_context(|| format!("Failed to create {}", data_dir.display()))?;
    std::fs::write(&path, DEFAULT_CONFIG_TEMPLATE)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(true)
}

const fn default_timeout_secs() -> u64 {
    20
}

const fn default_debounce_secs() -> u64 {
    5
}

const fn default_min_interval_secs() -> u64 {
    30
}

fn default_ranges() -> Vec<UnitRange> {
    vec![UnitRange::new(1, 80)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_config_uses_defaults() {
        let dir = tempfile::tempdir().expect("temp dir");
        let cfg = load_config(dir.path()).expect("load should succeed");
        assert_eq!(cfg.sync.timeout_secs, 20);
        assert_eq!(cfg.sync.debounce(), TimeDelta::seconds(5));
        assert_eq!(cfg.sync.min_interval(), TimeDelta::seconds(30));
        assert_eq!(cfg.units.default_ranges, vec![UnitRange::new(1, 80)]);
        assert!(cfg.sync.remote().is_none());
    }

    #[test]
    fn template_parses_to_defaults() {
        let dir = tempfile::tempdir().expect("temp dir");
        assert!(write_default_config(dir.path()).expect("write"));
        assert!(!write_default_config(dir.path()).expect("second write"));
        let cfg = load_config(dir.path()).expect("load");
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn partial_sync_section_keeps_other_defaults() {
        let cfg: Config = toml::from_str(
            r#"
[sync]
endpoint = "https://sync.test/sst"
api_key = "k-123"
timeout_secs = 3
"#,
        )
        .expect("parse");
        let remote = cfg.sync.remote().expect("remote");
        assert_eq!(remote.endpoint, "https://sync.test/sst");
        assert_eq!(remote.api_key, "k-123");
        assert_eq!(remote.timeout, Duration::from_secs(3));
        assert_eq!(cfg.sync.debounce_secs, 5);
    }

    #[test]
    fn env_overrides_win_over_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        std::fs::write(
            dir.path().join(CONFIG_FILE),
            "[sync]\nendpoint = \"https://file.test\"\napi_key = \"file\"\n",
        )
        .expect("write");
        let env = EnvOverrides {
            home: None,
            endpoint: Some("https://env.test".to_string()),
            api_key: None,
        };
        let cfg = resolve_config(dir.path(), &env).expect("resolve");
        assert_eq!(cfg.sync.endpoint.as_deref(), Some("https://env.test"));
        assert_eq!(cfg.sync.api_key.as_deref(), Some("file"));
    }

    #[test]
    fn blank_endpoint_is_not_configured() {
        let sync = SyncConfig {
            endpoint: Some("   ".to_string()),
            ..SyncConfig::default()
        };
        assert!(sync.remote().is_none());
    }

    #[test]
    fn data_dir_precedence() {
        let env = EnvOverrides {
            home: Some(PathBuf::from("/srv/sst-env")),
            ..EnvOverrides::default()
        };
        let flag = PathBuf::from("/srv/sst-flag");
        assert_eq!(resolve_data_dir(Some(&flag), &env).expect("flag"), flag);
        assert_eq!(
            resolve_data_dir(None, &env).expect("env"),
            PathBuf::from("/srv/sst-env")
        );
    }

    #[test]
    fn malformed_config_is_an_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        std::fs::write(dir.path().join(CONFIG_FILE), "[sync\n").expect("write");
        let err = load_config(dir.path()).expect_err("should fail");
        assert!(format!("{err:#}").contains("Failed to parse"));
    }
}
