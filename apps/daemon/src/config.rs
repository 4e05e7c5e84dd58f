//! Daemon configuration.
//!
//! Configuration is stored as TOML. Every field has a default, so a partial
//! file (or no file at all) is valid.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use chunkyard_protocol::DEFAULT_PORT;
use chunkyard_transfer::DEFAULT_SESSION_TTL;
use chunkyard_upload_server::DEFAULT_MAX_CHUNK_SIZE;
use serde::{Deserialize, Serialize};

/// Daemon configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding session chunks and committed files.
    #[serde(default = "default_content_path")]
    pub content_path: PathBuf,

    /// HTTP port (0 = auto-assign).
    #[serde(default = "default_port")]
    pub port: u16,

    /// How long a session accepts chunks, in seconds.
    #[serde(default = "default_session_ttl_secs")]
    pub session_ttl_secs: u64,

    /// Largest accepted chunk body in bytes.
    #[serde(default = "default_max_chunk_size")]
    pub max_chunk_size: usize,

    /// Expired-session sweep interval in seconds (0 = never sweep).
    #[serde(default)]
    pub sweep_interval_secs: u64,
}

fn default_content_path() -> PathBuf {
    PathBuf::from(".")
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_session_ttl_secs() -> u64 {
    DEFAULT_SESSION_TTL.as_secs()
}

fn default_max_chunk_size() -> usize {
    DEFAULT_MAX_CHUNK_SIZE
}

impl Default for Config {
    fn default() -> Self {
        Self {
            content_path: default_content_path(),
            port: default_port(),
            session_ttl_secs: default_session_ttl_secs(),
            max_chunk_size: default_max_chunk_size(),
            sweep_interval_secs: 0,
        }
    }
}

impl Config {
    /// Loads configuration from `path`. A missing path or file yields the
    /// defaults.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        if !path.exists() {
            tracing::warn!(path = %path.display(), "config file not found, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("parsing config {}", path.display()))?;
        tracing::debug!(path = %path.display(), "configuration read");
        Ok(config)
    }

    /// Command-line flags win over file values.
    pub fn apply_overrides(&mut self, content_path: Option<PathBuf>, port: Option<u16>) {
        if let Some(content_path) = content_path {
            self.content_path = content_path;
        }
        if let Some(port) = port {
            self.port = port;
        }
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }

    pub fn sweep_interval(&self) -> Option<Duration> {
        (self.sweep_interval_secs > 0).then(|| Duration::from_secs(self.sweep_interval_secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.content_path, PathBuf::from("."));
        assert_eq!(config.port, 19502);
        assert_eq!(config.session_ttl_secs, 86_400);
        assert_eq!(config.max_chunk_size, 64 * 1024 * 1024);
        assert_eq!(config.sweep_interval(), None);
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = Config {
            content_path: "/srv/uploads".into(),
            port: 8888,
            session_ttl_secs: 60,
            max_chunk_size: 1024,
            sweep_interval_secs: 30,
        };

        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();

        assert_eq!(parsed, config);
        assert_eq!(parsed.session_ttl(), Duration::from_secs(60));
        assert_eq!(parsed.sweep_interval(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn config_partial_toml() {
        // Only specify the port, rest should use defaults.
        let config: Config = toml::from_str("port = 9000").unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.content_path, PathBuf::from("."));
        assert_eq!(config.session_ttl_secs, 86_400);
    }

    #[test]
    fn load_without_path_is_default() {
        assert_eq!(Config::load(None).unwrap(), Config::default());
    }

    #[test]
    fn load_missing_file_is_default() {
        let tmp = tempfile::tempdir().unwrap();
        let config = Config::load(Some(&tmp.path().join("absent.toml"))).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn load_from_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("chunkyard.toml");
        std::fs::write(
            &path,
            "content_path = \"/data\"\nsession_ttl_secs = 120\nsweep_interval_secs = 10\n",
        )
        .unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.content_path, PathBuf::from("/data"));
        assert_eq!(config.session_ttl_secs, 120);
        assert_eq!(config.sweep_interval(), Some(Duration::from_secs(10)));
        assert_eq!(config.port, 19502);
    }

    #[test]
    fn load_rejects_malformed_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("bad.toml");
        std::fs::write(&path, "port = \"not a number\"").unwrap();
        assert!(Config::load(Some(&path)).is_err());
    }

    #[test]
    fn overrides_take_precedence() {
        let mut config = Config {
            port: 1234,
            ..Config::default()
        };
        config.apply_overrides(Some("/override".into()), None);
        assert_eq!(config.content_path, PathBuf::from("/override"));
        assert_eq!(config.port, 1234);

        config.apply_overrides(None, Some(0));
        assert_eq!(config.port, 0);
    }
}
