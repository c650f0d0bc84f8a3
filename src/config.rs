//! Configuration file parser for ~/.config/trawl/config.toml.
//!
//! The config file is optional — a missing file yields `Config::default()`.
//! `login` and `register` rewrite it to record the current user, so saving
//! uses a write-to-temp-then-rename pattern to never leave a partial file.

use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid polling interval {0:?}: {1}")]
    InvalidInterval(String, String),
}

// ============================================================================
// Configuration
// ============================================================================

/// Top-level application configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Path to the SQLite database file. Defaults to `trawl.db` next to the
    /// config file when unset.
    pub db_path: Option<String>,

    /// Name of the currently logged-in user. Set by `register` and `login`.
    pub current_user: Option<String>,
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config = toml::from_str(&content)?;
        tracing::debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Persist the configuration, atomically replacing any previous file.
    ///
    /// Writes to a temporary sibling first and renames it into place, so a
    /// crash mid-write cannot corrupt the existing config.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        let temp_path = path.with_extension("toml.tmp");

        let mut temp_file = std::fs::File::create(&temp_path)?;
        temp_file.write_all(content.as_bytes())?;
        temp_file.sync_all()?;
        drop(temp_file);

        std::fs::rename(&temp_path, path).inspect_err(|_| {
            let _ = std::fs::remove_file(&temp_path);
        })?;
        Ok(())
    }
}

// ============================================================================
// Interval Parsing
// ============================================================================

/// Parse a polling interval string such as `"30s"`, `"1m"`, or `"1h30m"`.
///
/// Accepted units are `ms`, `s`, `m`, and `h`; components may be chained.
/// A zero or unparsable interval is rejected before the scheduler starts.
pub fn parse_interval(input: &str) -> Result<Duration, ConfigError> {
    let err = |msg: &str| ConfigError::InvalidInterval(input.to_string(), msg.to_string());

    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(err("empty interval"));
    }

    let mut total = Duration::ZERO;
    let mut rest = trimmed;
    while !rest.is_empty() {
        let digits_end = rest
            .find(|c: char| !c.is_ascii_digit())
            .ok_or_else(|| err("missing unit suffix (expected ms, s, m, or h)"))?;
        if digits_end == 0 {
            return Err(err("expected a number"));
        }
        let (digits, after) = rest.split_at(digits_end);
        let value: u64 = digits.parse().map_err(|_| err("number out of range"))?;

        let unit_end = after
            .find(|c: char| c.is_ascii_digit())
            .unwrap_or(after.len());
        let (unit, next) = after.split_at(unit_end);

        let component = match unit {
            "ms" => Duration::from_millis(value),
            "s" => Duration::from_secs(value),
            "m" => Duration::from_secs(value * 60),
            "h" => Duration::from_secs(value * 3600),
            other => return Err(err(&format!("unknown unit {other:?}"))),
        };
        total += component;
        rest = next;
    }

    if total.is_zero() {
        return Err(err("interval must be positive"));
    }
    Ok(total)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.db_path.is_none());
        assert!(config.current_user.is_none());
    }

    #[test]
    fn test_missing_file_returns_default() {
        let path = Path::new("/tmp/trawl_test_nonexistent_config.toml");
        let config = Config::load(path).unwrap();
        assert!(config.current_user.is_none());
    }

    #[test]
    fn test_partial_config_uses_defaults_for_missing() {
        let dir = std::env::temp_dir().join("trawl_config_test_partial");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, "current_user = \"ana\"\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.current_user.as_deref(), Some("ana"));
        assert!(config.db_path.is_none());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_invalid_toml_returns_error() {
        let dir = std::env::temp_dir().join("trawl_config_test_invalid");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, "this is not [valid toml").unwrap();

        let result = Config::load(&path);
        assert!(matches!(result, Err(ConfigError::Parse(_))));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_wrong_type_returns_error() {
        let dir = std::env::temp_dir().join("trawl_config_test_wrongtype");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, "current_user = 42\n").unwrap();

        assert!(Config::load(&path).is_err());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_save_then_load_round_trip() {
        let dir = std::env::temp_dir().join("trawl_config_test_roundtrip");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");

        let config = Config {
            db_path: Some("/var/lib/trawl/trawl.db".to_string()),
            current_user: Some("ana".to_string()),
        };
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.db_path, config.db_path);
        assert_eq!(loaded.current_user, config.current_user);

        // No leftover temp file
        assert!(!path.with_extension("toml.tmp").exists());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_save_creates_parent_directory() {
        let dir = std::env::temp_dir().join("trawl_config_test_mkdir");
        std::fs::remove_dir_all(&dir).ok();
        let path = dir.join("nested").join("config.toml");

        Config::default().save(&path).unwrap();
        assert!(path.exists());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_parse_interval_units() {
        assert_eq!(parse_interval("30s").unwrap(), Duration::from_secs(30));
        assert_eq!(parse_interval("1m").unwrap(), Duration::from_secs(60));
        assert_eq!(parse_interval("2h").unwrap(), Duration::from_secs(7200));
        assert_eq!(parse_interval("500ms").unwrap(), Duration::from_millis(500));
    }

    #[test]
    fn test_parse_interval_compound() {
        assert_eq!(
            parse_interval("1h30m").unwrap(),
            Duration::from_secs(90 * 60)
        );
        assert_eq!(parse_interval("1m30s").unwrap(), Duration::from_secs(90));
    }

    #[test]
    fn test_parse_interval_rejects_garbage() {
        assert!(parse_interval("").is_err());
        assert!(parse_interval("fast").is_err());
        assert!(parse_interval("10").is_err());
        assert!(parse_interval("10x").is_err());
        assert!(parse_interval("s10").is_err());
    }

    #[test]
    fn test_parse_interval_rejects_zero() {
        assert!(parse_interval("0s").is_err());
        assert!(parse_interval("0m0s").is_err());
    }

    proptest! {
        // Any whole number of seconds survives a format/parse round trip.
        #[test]
        fn prop_parse_interval_seconds_round_trip(secs in 1u64..100_000) {
            let parsed = parse_interval(&format!("{secs}s")).unwrap();
            prop_assert_eq!(parsed, Duration::from_secs(secs));
        }
    }
}
