//! Configuration management for the client.

use crate::{CoreError, CoreResult, Paths};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Default base of shareable game links.
pub const DEFAULT_SHARE_BASE_URL: &str = "https://tac.example/";

/// Reconnect and keepalive policy for the realtime channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RealtimeSettings {
    /// Consecutive failed connects before falling back to local-only mode.
    pub max_reconnect_attempts: u32,
    /// Retry delay per attempt; the n-th retry waits n times this.
    pub reconnect_base_delay_ms: u64,
    /// How long to wait for the server to confirm a subscription.
    pub join_timeout_ms: u64,
    pub heartbeat_interval_ms: u64,
}

impl Default for RealtimeSettings {
    fn default() -> Self {
        Self {
            max_reconnect_attempts: 5,
            reconnect_base_delay_ms: 1000,
            join_timeout_ms: 10_000,
            heartbeat_interval_ms: 30_000,
        }
    }
}

impl RealtimeSettings {
    pub fn reconnect_base_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_base_delay_ms)
    }

    pub fn join_timeout(&self) -> Duration {
        Duration::from_millis(self.join_timeout_ms)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }
}

/// Main client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Supabase project URL. Without it games are never shared remotely.
    #[serde(default)]
    pub supabase_url: Option<String>,
    /// Supabase anon key (public, safe to expose).
    #[serde(default)]
    pub supabase_anon_key: Option<String>,
    /// Base URL that share links are built on.
    #[serde(default = "default_share_base_url")]
    pub share_base_url: String,
    #[serde(default)]
    pub realtime: RealtimeSettings,
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_share_base_url() -> String {
    DEFAULT_SHARE_BASE_URL.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            supabase_url: None,
            supabase_anon_key: None,
            share_base_url: default_share_base_url(),
            realtime: RealtimeSettings::default(),
        }
    }
}

impl Config {
    /// Load configuration from the config file if present, falling back to
    /// defaults, then apply environment overrides.
    pub fn load(paths: &Paths) -> CoreResult<Self> {
        let config_path = paths.config_file();

        let mut config = if config_path.exists() {
            Self::load_from_file(&config_path)?
        } else {
            Self::default()
        };

        config.load_from_env();
        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a file.
    pub fn save(&self, paths: &Paths) -> CoreResult<()> {
        paths.ensure_dirs()?;
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(paths.config_file(), content)?;
        Ok(())
    }

    fn load_from_env(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    /// Override settings from `TAC_LOG_LEVEL`, `TAC_SUPABASE_URL` and
    /// `TAC_SUPABASE_ANON_KEY` as reported by `lookup`. Blank values are ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let var = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        if let Some(level) = var("TAC_LOG_LEVEL") {
            self.log_level = level;
        }
        if let Some(url) = var("TAC_SUPABASE_URL") {
            self.supabase_url = Some(url);
        }
        if let Some(key) = var("TAC_SUPABASE_ANON_KEY") {
            self.supabase_anon_key = Some(key);
        }
    }

    /// Returns the Supabase URL and key, or `None` when either is missing.
    pub fn supabase(&self) -> CoreResult<Option<(Url, String)>> {
        match (&self.supabase_url, &self.supabase_anon_key) {
            (Some(url), Some(key)) => Ok(Some((Url::parse(url)?, key.clone()))),
            (Some(_), None) => Err(CoreError::Config(
                "supabase_url is set but supabase_anon_key is missing".to_string(),
            )),
            _ => Ok(None),
        }
    }

    /// Get the share link base as a parsed URL.
    pub fn share_base_url(&self) -> CoreResult<Url> {
        Url::parse(&self.share_base_url).map_err(CoreError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.log_level, DEFAULT_LOG_LEVEL);
        assert_eq!(config.share_base_url, DEFAULT_SHARE_BASE_URL);
        assert!(config.supabase_url.is_none());
        assert_eq!(config.realtime.max_reconnect_attempts, 5);
        assert_eq!(config.realtime.reconnect_base_delay(), Duration::from_secs(1));
    }

    #[test]
    fn test_config_load_from_file() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.json");

        let config_json = r#"{
            "log_level": "debug",
            "realtime": { "max_reconnect_attempts": 3 }
        }"#;
        std::fs::write(&config_path, config_json).unwrap();

        let config = Config::load_from_file(&config_path).unwrap();
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.realtime.max_reconnect_attempts, 3);
        assert_eq!(config.realtime.reconnect_base_delay_ms, 1000);
        assert_eq!(config.share_base_url, DEFAULT_SHARE_BASE_URL);
    }

    #[test]
    fn test_config_load_from_malformed_file() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.json");
        std::fs::write(&config_path, "{ not json").unwrap();

        assert!(matches!(
            Config::load_from_file(&config_path),
            Err(CoreError::Json(_))
        ));
    }

    #[test]
    fn test_config_save_and_load_roundtrip() {
        let dir = tempdir().unwrap();
        let paths = Paths::with_base_dir(dir.path().to_path_buf());

        let mut config = Config::default();
        config.log_level = "trace".to_string();
        config.supabase_url = Some("https://demo.supabase.co".to_string());
        config.supabase_anon_key = Some("anon".to_string());
        config.save(&paths).unwrap();

        let loaded = Config::load_from_file(&paths.config_file()).unwrap();
        assert_eq!(loaded.log_level, "trace");
        assert_eq!(loaded.supabase_anon_key.as_deref(), Some("anon"));
    }

    #[test]
    fn test_config_load_nonexistent_uses_defaults() {
        let dir = tempdir().unwrap();
        let paths = Paths::with_base_dir(dir.path().to_path_buf());

        let config = Config::load(&paths).unwrap();
        assert_eq!(config.share_base_url, DEFAULT_SHARE_BASE_URL);
    }

    #[test]
    fn test_overrides() {
        let mut config = Config::default();
        config.apply_overrides(env(&[
            ("TAC_LOG_LEVEL", "warn"),
            ("TAC_SUPABASE_URL", "https://x.supabase.co"),
            ("TAC_SUPABASE_ANON_KEY", " key "),
        ]));
        assert_eq!(config.log_level, "warn");
        assert_eq!(config.supabase_url.as_deref(), Some("https://x.supabase.co"));
        assert_eq!(config.supabase_anon_key.as_deref(), Some("key"));
    }

    #[test]
    fn test_blank_overrides_ignored() {
        let mut config = Config::default();
        config.apply_overrides(env(&[("TAC_LOG_LEVEL", "  ")]));
        assert_eq!(config.log_level, DEFAULT_LOG_LEVEL);
    }

    #[test]
    fn test_supabase_requires_both_values() {
        let mut config = Config::default();
        assert!(config.supabase().unwrap().is_none());

        config.supabase_url = Some("https://x.supabase.co".to_string());
        assert!(matches!(config.supabase(), Err(CoreError::Config(_))));

        config.supabase_anon_key = Some("anon".to_string());
        let (url, key) = config.supabase().unwrap().unwrap();
        assert_eq!(url.host_str(), Some("x.supabase.co"));
        assert_eq!(key, "anon");
    }

    #[test]
    fn test_invalid_urls() {
        let mut config = Config::default();
        config.supabase_url = Some("not a valid url".to_string());
        config.supabase_anon_key = Some("anon".to_string());
        assert!(matches!(config.supabase(), Err(CoreError::InvalidUrl(_))));

        config.share_base_url = "::".to_string();
        assert!(config.share_base_url().is_err());
    }
}
