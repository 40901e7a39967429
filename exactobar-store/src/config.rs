//! Routing configuration: concurrency/timeout knobs, cost multipliers,
//! and named roles, resolved environment variable > config file >
//! built-in defaults.

use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::StoreError;

/// A named, ordered set of model ids ranked together under one role.
///
/// Mirrors `exactobar_routing::RoleConfig` but lives here so this
/// crate stays independent of the routing crate; the CLI converts
/// between the two when it wires a routing service together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleConfig {
    /// Model ids or prefixes listed for this role, in priority order.
    pub models: Vec<String>,
}

/// Resolved routing configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Maximum number of provider pipelines fetched concurrently.
    pub max_concurrent: i32,
    /// Per-strategy fetch timeout, in seconds.
    pub fetch_timeout_secs: u64,
    /// Maximum cached-snapshot age to serve when nothing was
    /// attempted, in minutes.
    pub stale_threshold_minutes: i64,
    /// Whether the pipeline's cache-fallback rules may engage.
    pub use_cache: bool,
    /// Named roles, keyed by role name.
    pub roles: HashMap<String, RoleConfig>,
    /// Cost multipliers: model name -> provider id -> multiplier.
    pub multipliers: HashMap<String, HashMap<String, f64>>,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 5,
            fetch_timeout_secs: 30,
            stale_threshold_minutes: 15,
            use_cache: true,
            roles: HashMap::new(),
            multipliers: HashMap::new(),
        }
    }
}

impl RoutingConfig {
    /// Returns the default config file path, `~/.config/exactobar/routing.toml`.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("exactobar")
            .join("routing.toml")
    }

    /// Resolves the effective configuration: environment variable
    /// overrides, then the config file (if present), then built-in
    /// defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be read
    /// or parsed.
    pub fn resolve() -> Result<Self, StoreError> {
        Self::resolve_from(&Self::default_path())
    }

    /// Resolves the effective configuration from a specific file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be read
    /// or parsed.
    pub fn resolve_from(path: &Path) -> Result<Self, StoreError> {
        let mut config = if path.exists() {
            info!(path = %path.display(), "Loading routing config");
            let content = std::fs::read_to_string(path)?;
            toml::from_str(&content).map_err(|e| StoreError::Parse(e.to_string()))?
        } else {
            debug!(path = %path.display(), "Routing config not found, using defaults");
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Applies `EXACTOBAR_*` environment variable overrides in place.
    fn apply_env_overrides(&mut self) {
        if let Some(v) = env_parsed::<i32>("EXACTOBAR_MAX_CONCURRENT") {
            self.max_concurrent = v;
        }
        if let Some(v) = env_parsed::<u64>("EXACTOBAR_FETCH_TIMEOUT_SECS") {
            self.fetch_timeout_secs = v;
        }
        if let Some(v) = env_parsed::<i64>("EXACTOBAR_STALE_THRESHOLD_MINUTES") {
            self.stale_threshold_minutes = v;
        }
        if let Some(v) = env_parsed::<bool>("EXACTOBAR_USE_CACHE") {
            self.use_cache = v;
        }
    }

    /// Saves this configuration to the default path, creating parent
    /// directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save(&self) -> Result<(), StoreError> {
        self.save_to(&Self::default_path())
    }

    /// Saves this configuration to a specific path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save_to(&self, path: &Path) -> Result<(), StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self).map_err(|e| StoreError::Parse(e.to_string()))?;
        std::fs::write(path, content)?;
        info!(path = %path.display(), "Saved routing config");
        Ok(())
    }

    /// Looks up the multiplier for a `(model_name, provider_id)` pair.
    pub fn multiplier(&self, model_name: &str, provider_id: &str) -> Option<f64> {
        self.multipliers.get(model_name)?.get(provider_id).copied()
    }
}

/// Parses an environment variable, warning (not failing) on a value
/// that doesn't parse.
fn env_parsed<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = env::var(key).ok()?;
    match raw.parse() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!(key, value = %raw, "Ignoring unparseable environment override");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = RoutingConfig::default();
        assert_eq!(config.max_concurrent, 5);
        assert_eq!(config.fetch_timeout_secs, 30);
        assert!(config.use_cache);
        assert!(config.roles.is_empty());
    }

    #[test]
    fn multiplier_lookup_missing_is_none() {
        let config = RoutingConfig::default();
        assert_eq!(config.multiplier("gpt-5", "codex"), None);
    }

    #[test]
    fn multiplier_lookup_present() {
        let mut config = RoutingConfig::default();
        config
            .multipliers
            .entry("gpt-5".to_string())
            .or_default()
            .insert("codex".to_string(), 2.0);
        assert_eq!(config.multiplier("gpt-5", "codex"), Some(2.0));
        assert_eq!(config.multiplier("gpt-5", "copilot"), None);
    }

    #[test]
    fn round_trips_through_toml() {
        let mut config = RoutingConfig::default();
        config.roles.insert(
            "coding".to_string(),
            RoleConfig {
                models: vec!["gpt-5".into(), "claude-sonnet".into()],
            },
        );

        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: RoutingConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed.roles.get("coding").unwrap().models.len(), 2);
    }

    #[test]
    fn resolve_from_missing_file_uses_defaults() {
        let path = std::env::temp_dir().join("exactobar-routing-config-test-missing.toml");
        let _ = std::fs::remove_file(&path);
        let config = RoutingConfig::resolve_from(&path).unwrap();
        assert_eq!(config, RoutingConfig::default());
    }
}
