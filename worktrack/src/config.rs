//! Settings loaded from `~/.worktrack/config.toml`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Directory under the home directory holding config and cache.
const APP_DIR: &str = ".worktrack";
const CONFIG_FILE: &str = "config.toml";

/// Environment variable overriding the service URL.
pub const API_URL_ENV: &str = "WORKTRACK_API_URL";

/// Default service port, shared by the client default and `serve`.
pub const DEFAULT_PORT: u16 = 58231;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Settings {
    /// Base URL of the work service.
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default)]
    pub cache: CacheSettings,
    #[serde(default)]
    pub server: ServerSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CacheSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Defaults to `~/.worktrack/cache`.
    pub dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ServerSettings {
    #[serde(default = "default_port")]
    pub port: u16,
    /// Users registered when the service starts with an empty store.
    #[serde(default)]
    pub users: Vec<String>,
    /// Persist the store to this JSON file.
    pub data_file: Option<PathBuf>,
}

fn default_api_url() -> String {
    format!("http://127.0.0.1:{DEFAULT_PORT}")
}

const fn default_true() -> bool {
    true
}

const fn default_port() -> u16 {
    DEFAULT_PORT
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            cache: CacheSettings::default(),
            server: ServerSettings::default(),
        }
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: None,
        }
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            users: Vec::new(),
            data_file: None,
        }
    }
}

impl Settings {
    /// Load from the default location, then apply the environment.
    pub fn load() -> Result<Self> {
        let mut settings = match config_path() {
            Some(path) => Self::load_from(&path)?,
            None => Self::default(),
        };
        if let Ok(url) = std::env::var(API_URL_ENV) {
            if !url.trim().is_empty() {
                settings.api_url = url;
            }
        }
        Ok(settings)
    }

    /// Load from `path`; a missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))
    }

    /// Where the offline cache lives, if it is enabled.
    pub fn cache_dir(&self) -> Option<PathBuf> {
        if !self.cache.enabled {
            return None;
        }
        self.cache
            .dir
            .clone()
            .or_else(|| app_dir().map(|d| d.join("cache")))
    }
}

/// `~/.worktrack`, if there is a home directory.
pub fn app_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(APP_DIR))
}

pub fn config_path() -> Option<PathBuf> {
    app_dir().map(|d| d.join(CONFIG_FILE))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let settings = Settings::load_from(&dir.path().join("config.toml")).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.api_url, "http://127.0.0.1:58231");
        assert!(settings.cache.enabled);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
api_url = "https://work.example.com"

[cache]
enabled = false

[server]
users = ["Ada", "Grace"]
"#,
        )
        .unwrap();

        let settings = Settings::load_from(&path).unwrap();
        assert_eq!(settings.api_url, "https://work.example.com");
        assert_eq!(settings.cache_dir(), None);
        assert_eq!(settings.server.port, DEFAULT_PORT);
        assert_eq!(settings.server.users, vec!["Ada", "Grace"]);
    }

    #[test]
    fn explicit_cache_dir_wins() {
        let mut settings = Settings::default();
        settings.cache.dir = Some(PathBuf::from("/tmp/wt-cache"));
        assert_eq!(settings.cache_dir(), Some(PathBuf::from("/tmp/wt-cache")));
    }

    #[test]
    fn invalid_toml_is_reported() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "api_url = [").unwrap();
        assert!(Settings::load_from(&path).is_err());
    }
}
