//! Configuration types and loading
//!
//! Loaded from a TOML file with validation; every field has a sensible
//! default except the API base URL. The token file path feeds the default
//! file-backed [`harbor_auth::FileBackend`]; embedders that inject their own
//! backend ignore it.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Root configuration for the authenticated client.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

/// Upstream API settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Base URL all request paths are joined to
    pub base_url: String,
    /// Fixed per-operation timeout, applied independently to the initial
    /// request, the refresh exchange, and the retry
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Value of the `x-client-version` header on every request
    #[serde(default = "default_client_version")]
    pub client_version: String,
}

/// Session token settings.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Where the file backend persists the token pair
    #[serde(default = "default_token_path")]
    pub token_path: PathBuf,
    /// Margin subtracted from token lifetime so a token that is valid when
    /// read is not already expired when it reaches the server
    #[serde(default = "default_expiry_skew")]
    pub expiry_skew_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            token_path: default_token_path(),
            expiry_skew_secs: default_expiry_skew(),
        }
    }
}

fn default_timeout() -> u64 {
    30
}

fn default_client_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn default_token_path() -> PathBuf {
    PathBuf::from("session-tokens.json")
}

fn default_expiry_skew() -> u64 {
    30
}

impl Config {
    /// Load configuration from a TOML file and validate it.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !self.api.base_url.starts_with("http://") && !self.api.base_url.starts_with("https://")
        {
            return Err(ConfigError::Invalid(format!(
                "base_url must start with http:// or https://, got: {}",
                self.api.base_url
            )));
        }
        if self.api.timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "timeout_secs must be greater than 0".into(),
            ));
        }
        if self.session.expiry_skew_secs == 0 {
            return Err(ConfigError::Invalid(
                "expiry_skew_secs must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    /// Per-operation timeout as a `Duration`.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.api.timeout_secs)
    }

    /// Expiry skew margin as a `Duration`.
    pub fn expiry_skew(&self) -> Duration {
        Duration::from_secs(self.session.expiry_skew_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_toml() -> &'static str {
        r#"
[api]
base_url = "https://api.harbor.example"
timeout_secs = 45
client_version = "1.4.2"

[session]
token_path = "/var/lib/harbor/session-tokens.json"
expiry_skew_secs = 20
"#
    }

    fn write_config(contents: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, contents).unwrap();
        (dir, path)
    }

    #[test]
    fn load_valid_config() {
        let (_dir, path) = write_config(valid_toml());
        let config = Config::load(&path).unwrap();
        assert_eq!(config.api.base_url, "https://api.harbor.example");
        assert_eq!(config.api.timeout_secs, 45);
        assert_eq!(config.api.client_version, "1.4.2");
        assert_eq!(
            config.session.token_path,
            PathBuf::from("/var/lib/harbor/session-tokens.json")
        );
        assert_eq!(config.session.expiry_skew_secs, 20);
    }

    #[test]
    fn defaults_fill_missing_fields() {
        let (_dir, path) = write_config(
            r#"
[api]
base_url = "https://api.harbor.example"
"#,
        );
        let config = Config::load(&path).unwrap();
        assert_eq!(config.api.timeout_secs, 30);
        assert_eq!(config.session.expiry_skew_secs, 30);
        assert_eq!(config.session.token_path, PathBuf::from("session-tokens.json"));
        assert_eq!(config.api.client_version, env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn load_missing_file_errors() {
        let result = Config::load(Path::new("/nonexistent/path/config.toml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn load_invalid_toml_errors() {
        let (_dir, path) = write_config("not valid {{{{ toml");
        let result = Config::load(&path);
        assert!(matches!(result, Err(ConfigError::Toml(_))));
    }

    #[test]
    fn rejects_non_http_base_url() {
        let (_dir, path) = write_config(
            r#"
[api]
base_url = "ftp://api.harbor.example"
"#,
        );
        let err = Config::load(&path).unwrap_err();
        assert!(err.to_string().contains("base_url"));
    }

    #[test]
    fn rejects_zero_timeout() {
        let (_dir, path) = write_config(
            r#"
[api]
base_url = "https://api.harbor.example"
timeout_secs = 0
"#,
        );
        let err = Config::load(&path).unwrap_err();
        assert!(err.to_string().contains("timeout_secs"));
    }

    #[test]
    fn rejects_zero_skew() {
        let (_dir, path) = write_config(
            r#"
[api]
base_url = "https://api.harbor.example"

[session]
expiry_skew_secs = 0
"#,
        );
        let err = Config::load(&path).unwrap_err();
        assert!(err.to_string().contains("expiry_skew_secs"));
    }
}
