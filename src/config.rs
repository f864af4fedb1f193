use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const TOKEN_VAR: &str = "GITHUB_TOKEN";
pub const EVENT_PATH_VAR: &str = "GITHUB_EVENT_PATH";
pub const API_URL_VAR: &str = "GITHUB_API_URL";

const CONFIG_FILE: &str = ".pr-autocommit.toml";
const DEFAULT_API_URL: &str = "https://api.github.com";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("No {0} env var found. This tool is designed to run inside GitHub Actions, which provides it")]
    MissingEnv(&'static str),

    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Run configuration, read once at startup and passed down explicitly.
///
/// Everything is optional at load time; the accessors fail with
/// `ConfigError::MissingEnv` at the point a value is actually needed.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub github: GitHubConfig,

    /// Location of the Actions event document. Only ever set from the environment.
    #[serde(skip)]
    pub event_path: Option<PathBuf>,
}

#[derive(Clone, Default, Deserialize)]
pub struct GitHubConfig {
    /// API token. GITHUB_TOKEN overrides it when set.
    pub token: Option<String>,
    /// REST API base URL, defaults to public GitHub.
    pub api_url: Option<String>,
}

impl std::fmt::Debug for GitHubConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubConfig")
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("api_url", &self.api_url)
            .finish()
    }
}

impl Config {
    /// Load `.pr-autocommit.toml` from the current directory if present,
    /// then apply the process environment on top.
    pub fn load() -> Result<Config, ConfigError> {
        let path = Path::new(CONFIG_FILE);
        let config = if path.exists() {
            Self::load_from(path)?
        } else {
            Config::default()
        };

        Ok(config.with_env(|key| std::env::var(key).ok()))
    }

    /// Load from a specific path (no environment applied).
    pub fn load_from(path: &Path) -> Result<Config, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Overlay environment values using `lookup`. Environment wins over the file.
    pub fn with_env<F>(mut self, lookup: F) -> Config
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(token) = lookup(TOKEN_VAR).filter(|t| !t.is_empty()) {
            self.github.token = Some(token);
        }
        if let Some(url) = lookup(API_URL_VAR).filter(|u| !u.is_empty()) {
            self.github.api_url = Some(url);
        }
        if let Some(path) = lookup(EVENT_PATH_VAR).filter(|p| !p.is_empty()) {
            self.event_path = Some(PathBuf::from(path));
        }
        self
    }

    pub fn github_token(&self) -> Result<&str, ConfigError> {
        self.github
            .token
            .as_deref()
            .ok_or(ConfigError::MissingEnv(TOKEN_VAR))
    }

    pub fn event_path(&self) -> Result<&Path, ConfigError> {
        self.event_path
            .as_deref()
            .ok_or(ConfigError::MissingEnv(EVENT_PATH_VAR))
    }

    pub fn api_url(&self) -> &str {
        self.github
            .api_url
            .as_deref()
            .unwrap_or(DEFAULT_API_URL)
            .trim_end_matches('/')
    }
}
