//! Host configuration file.
//!
//! Loaded from the platform config dir (`atrium/config.toml`) or an explicit
//! path. A missing file yields defaults; a malformed one is an error, because
//! silently ignoring a config the user wrote hides real mistakes.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config parse error: {0}")]
    Parse(String),

    #[error("config validation error: {0}")]
    Validation(String),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HostConfig {
    /// Default tracing directive; the --log-level flag wins over this.
    pub log_directive: String,
    /// Per-request deadline for async surface calls, in milliseconds.
    pub max_request_time_ms: u64,
    pub updates: UpdateSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UpdateSettings {
    pub check_on_launch: bool,
    /// GitHub `owner/repo` the updater polls for releases.
    pub feed: String,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            log_directive: "atrium=info".to_string(),
            max_request_time_ms: 5000,
            updates: UpdateSettings::default(),
        }
    }
}

impl Default for UpdateSettings {
    fn default() -> Self {
        Self {
            check_on_launch: false,
            feed: "dylan/atrium".to_string(),
        }
    }
}

impl HostConfig {
    /// Load from `override_path`, or the default location if none is given.
    pub fn load(override_path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match override_path {
            Some(p) => p.to_path_buf(),
            None => default_path(),
        };
        match std::fs::read_to_string(&path) {
            Ok(contents) => Self::parse(&contents),
            Err(_) => {
                debug!(path = %path.display(), "no config file, using defaults");
                Ok(Self::default())
            }
        }
    }

    fn parse(contents: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_request_time_ms == 0 {
            return Err(ConfigError::Validation(
                "max_request_time_ms must be non-zero".into(),
            ));
        }
        if !self.updates.feed.contains('/') {
            return Err(ConfigError::Validation(format!(
                "updates.feed must be owner/repo, got {:?}",
                self.updates.feed
            )));
        }
        Ok(())
    }
}

fn default_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("atrium")
        .join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = HostConfig::default();
        assert_eq!(config.log_directive, "atrium=info");
        assert_eq!(config.max_request_time_ms, 5000);
        assert!(!config.updates.check_on_launch);
    }

    #[test]
    fn parses_partial_config() {
        let config = HostConfig::parse(
            r#"
            max_request_time_ms = 2500

            [updates]
            check_on_launch = true
            feed = "someone/atrium-fork"
            "#,
        )
        .unwrap();
        assert_eq!(config.max_request_time_ms, 2500);
        assert_eq!(config.log_directive, "atrium=info");
        assert!(config.updates.check_on_launch);
        assert_eq!(config.updates.feed, "someone/atrium-fork");
    }

    #[test]
    fn rejects_zero_timeout() {
        let err = HostConfig::parse("max_request_time_ms = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn rejects_unknown_fields() {
        let err = HostConfig::parse("max_reqest_time_ms = 10").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn rejects_malformed_feed() {
        let err = HostConfig::parse("[updates]\nfeed = \"not-a-repo\"").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }
}
