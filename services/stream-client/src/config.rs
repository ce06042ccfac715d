//! Configuration types and loading
//!
//! Config precedence: CLI args > env vars > config file > defaults.
//! The login password is loaded from MAGICSTREAM_PASSWORD or password_file,
//! never stored in the TOML directly.

use common::Secret;
use serde::Deserialize;
use session::{Endpoints, LOGIN_PATH, LOGOUT_PATH, REFRESH_PATH};
use std::path::{Path, PathBuf};
use std::time::Duration;
use transport::{HeaderInjection, HttpTransportConfig};

/// Root configuration
#[derive(Debug, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    pub session: SessionConfig,
    #[serde(default)]
    pub headers: Vec<HeaderConfig>,
}

/// Backend connection settings
#[derive(Debug, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

/// Login identity and auth endpoint paths
#[derive(Debug, Deserialize)]
pub struct SessionConfig {
    pub email: String,
    #[serde(skip)]
    pub password: Option<Secret<String>>,
    #[serde(default)]
    pub password_file: Option<PathBuf>,
    #[serde(default = "default_login_path")]
    pub login_path: String,
    #[serde(default = "default_refresh_path")]
    pub refresh_path: String,
    #[serde(default = "default_logout_path")]
    pub logout_path: String,
}

/// Static header sent with every request
#[derive(Debug, Clone, Deserialize)]
pub struct HeaderConfig {
    pub name: String,
    pub value: String,
}

fn default_timeout() -> u64 {
    30
}

fn default_login_path() -> String {
    LOGIN_PATH.to_string()
}

fn default_refresh_path() -> String {
    REFRESH_PATH.to_string()
}

fn default_logout_path() -> String {
    LOGOUT_PATH.to_string()
}

impl Config {
    /// Load configuration from a TOML file, then overlay environment variables.
    ///
    /// Password resolution order:
    /// 1. MAGICSTREAM_PASSWORD env var
    /// 2. password_file path from config
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&contents)?;

        if let Ok(url) = std::env::var("API_BASE_URL") {
            config.api.base_url = url;
        }

        if !config.api.base_url.starts_with("http://")
            && !config.api.base_url.starts_with("https://")
        {
            return Err(common::Error::Config(format!(
                "base_url must start with http:// or https://, got: {}",
                config.api.base_url
            )));
        }

        if config.api.timeout_secs == 0 {
            return Err(common::Error::Config(
                "timeout_secs must be greater than 0".into(),
            ));
        }

        if let Ok(password) = std::env::var("MAGICSTREAM_PASSWORD") {
            config.session.password = Some(Secret::new(password));
        } else if let Some(ref password_file) = config.session.password_file {
            let password = std::fs::read_to_string(password_file).map_err(|e| {
                common::Error::Config(format!(
                    "failed to read password_file {}: {e}",
                    password_file.display()
                ))
            })?;
            let password = password.trim_end_matches(['\r', '\n']).to_owned();
            if !password.is_empty() {
                config.session.password = Some(Secret::new(password));
            }
        }

        Ok(config)
    }

    /// Resolve config file path from CLI arg or CONFIG_PATH env var.
    pub fn resolve_path(cli_path: Option<&str>) -> PathBuf {
        if let Some(p) = cli_path {
            return PathBuf::from(p);
        }
        if let Ok(p) = std::env::var("CONFIG_PATH") {
            return PathBuf::from(p);
        }
        PathBuf::from("magicstream-client.toml")
    }

    /// The login password, or `MissingSecret` when neither source provided one.
    pub fn password(&self) -> common::Result<&Secret<String>> {
        self.session.password.as_ref().ok_or_else(|| {
            common::Error::MissingSecret(
                "set MAGICSTREAM_PASSWORD or session.password_file".into(),
            )
        })
    }

    pub fn endpoints(&self) -> Endpoints {
        Endpoints {
            login: self.session.login_path.clone(),
            refresh: self.session.refresh_path.clone(),
            logout: self.session.logout_path.clone(),
        }
    }

    pub fn transport(&self) -> HttpTransportConfig {
        HttpTransportConfig {
            base_url: self.api.base_url.clone(),
            timeout: Duration::from_secs(self.api.timeout_secs),
            headers: self
                .headers
                .iter()
                .map(|h| HeaderInjection {
                    name: h.name.clone(),
                    value: h.value.clone(),
                })
                .collect(),
        }
    }
}
