//! Application settings.
//!
//! Settings are layered: built-in defaults, then an optional JSON file for
//! the selected environment, then individual environment variables.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::access::AccessMode;

const APP_DIR: &str = "spectral-display";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Deployment environment used to pick the settings file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Dev,
    Test,
    Prod,
}

impl Environment {
    /// Pick the environment from a `VALIS_ENV`/`SOLARA_ENV` style value.
    pub fn from_name(name: &str) -> Self {
        if name.starts_with("dev") {
            Environment::Dev
        } else if name.starts_with("test") {
            Environment::Test
        } else {
            Environment::Prod
        }
    }

    pub fn from_env() -> Self {
        let name = std::env::var("VALIS_ENV")
            .or_else(|_| std::env::var("SOLARA_ENV"))
            .unwrap_or_default();
        Self::from_name(&name)
    }

    pub fn config_filename(&self) -> &'static str {
        match self {
            Environment::Dev => "config.dev.json",
            Environment::Test => "config.test.json",
            Environment::Prod => "config.prod.json",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Base URL of the target lookup API.
    pub api_url: String,
    pub request_timeout_secs: u64,
    /// Minimum delay between retries while a lookup keeps coming back empty.
    pub retry_interval_secs: u64,
    pub access_mode: AccessMode,
    /// Remote root the science archive is served from.
    pub sas_remote_url: String,
    /// Local mirror root stripped from local paths when building URLs.
    pub sas_base_dir: String,
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_url: "https://api.sdss.org/valis".to_string(),
            request_timeout_secs: 30,
            retry_interval_secs: 10,
            access_mode: AccessMode::Curl,
            sas_remote_url: "https://data.sdss5.org/".to_string(),
            sas_base_dir: String::new(),
            log_level: "info".to_string(),
        }
    }
}

impl Settings {
    /// Default location of the settings file for an environment.
    pub fn default_path(env: Environment) -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR).join(env.config_filename()))
    }

    /// Read a settings file. Missing keys take their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Load settings for the current environment. Never fails: a missing
    /// file is normal, a broken one is reported and ignored.
    pub fn load() -> Self {
        let env = Environment::from_env();
        let mut settings = match Self::default_path(env) {
            Some(path) if path.exists() => match Self::from_file(&path) {
                Ok(s) => {
                    log::info!("Loaded settings from {}", path.display());
                    s
                }
                Err(e) => {
                    log::warn!("Ignoring settings file {}: {e}", path.display());
                    Self::default()
                }
            },
            _ => Self::default(),
        };
        settings.apply_overrides(|key| std::env::var(key).ok());
        settings
    }

    /// Apply environment overrides through a lookup function.
    pub fn apply_overrides<F>(&mut self, var: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = var("VALIS_API_URL").filter(|v| !v.is_empty()) {
            self.api_url = url;
        }
        if let Some(dir) = var("SAS_BASE_DIR") {
            self.sas_base_dir = dir;
        }
        if let Some(mode) = var("SDSS_ACCESS_MODE") {
            match mode.as_str() {
                "curl" => self.access_mode = AccessMode::Curl,
                "rsync" => self.access_mode = AccessMode::Rsync,
                other => log::warn!("Unknown SDSS_ACCESS_MODE '{other}'"),
            }
        }
    }

    pub fn level_filter(&self) -> log::LevelFilter {
        self.log_level.parse().unwrap_or(log::LevelFilter::Info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_environment_selection() {
        assert_eq!(Environment::from_name("development"), Environment::Dev);
        assert_eq!(Environment::from_name("testing"), Environment::Test);
        assert_eq!(Environment::from_name(""), Environment::Prod);
        assert_eq!(Environment::Dev.config_filename(), "config.dev.json");
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"api_url": "http://localhost:8000", "access_mode": "rsync"}}"#).unwrap();

        let s = Settings::from_file(file.path()).unwrap();
        assert_eq!(s.api_url, "http://localhost:8000");
        assert_eq!(s.access_mode, AccessMode::Rsync);
        assert_eq!(s.request_timeout_secs, 30);
        assert_eq!(s.log_level, "info");
    }

    #[test]
    fn test_malformed_file_is_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(matches!(
            Settings::from_file(file.path()),
            Err(ConfigError::Json(_))
        ));
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("VALIS_API_URL", "http://valis.test"),
            ("SAS_BASE_DIR", "/mnt/sas"),
            ("SDSS_ACCESS_MODE", "rsync"),
        ]
        .into_iter()
        .collect();

        let mut s = Settings::default();
        s.apply_overrides(|k| vars.get(k).map(|v| v.to_string()));
        assert_eq!(s.api_url, "http://valis.test");
        assert_eq!(s.sas_base_dir, "/mnt/sas");
        assert_eq!(s.access_mode, AccessMode::Rsync);
    }

    #[test]
    fn test_level_filter() {
        let s = Settings {
            log_level: "debug".into(),
            ..Settings::default()
        };
        assert_eq!(s.level_filter(), log::LevelFilter::Debug);
        let bad = Settings {
            log_level: "loud".into(),
            ..Settings::default()
        };
        assert_eq!(bad.level_filter(), log::LevelFilter::Info);
    }
}
