//! Configuration types and loading
//!
//! Config precedence: CLI args > env vars > config file > defaults.
//! Every field has a default, so the helper runs without a config file as
//! long as the client-secrets file sits next to it. The client secret itself
//! never lives in this file; it comes from the client-secrets JSON.

use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Config file looked up when neither `--config` nor `CONFIG_PATH` is given
pub const DEFAULT_CONFIG_PATH: &str = "oauth-code-helper.toml";

/// Root configuration
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub oauth: OAuthConfig,
    pub resource: ResourceConfig,
}

/// Listener settings
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: SocketAddr,
    pub max_connections: usize,
    /// Separate Prometheus listener; disabled when unset
    pub metrics_addr: Option<SocketAddr>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 3030)),
            max_connections: 64,
            metrics_addr: None,
        }
    }
}

/// Authorization flow settings
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct OAuthConfig {
    /// Client-secrets JSON downloaded from the provider (read-only)
    pub credentials_path: PathBuf,
    /// Where the token pair is persisted
    pub token_path: PathBuf,
    pub redirect_uri: String,
    pub scope: String,
    /// Where the browser lands after a successful exchange
    pub landing_path: String,
}

impl Default for OAuthConfig {
    fn default() -> Self {
        Self {
            credentials_path: PathBuf::from("cred.json"),
            token_path: PathBuf::from("tokens.json"),
            redirect_uri: oauth_client::DEFAULT_REDIRECT_URI.to_string(),
            scope: oauth_client::DEFAULT_SCOPE.to_string(),
            landing_path: "/anywhere".to_string(),
        }
    }
}

/// Protected resource settings
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ResourceConfig {
    pub url: String,
    /// Timeout for every outbound call (token endpoint and resource)
    pub timeout_secs: u64,
}

impl Default for ResourceConfig {
    fn default() -> Self {
        Self {
            url: "https://www.googleapis.com/drive/v2/files".to_string(),
            timeout_secs: 30,
        }
    }
}

impl Config {
    /// Load configuration for startup.
    ///
    /// An explicitly named file (CLI or `CONFIG_PATH`) must exist. Without
    /// one, `DEFAULT_CONFIG_PATH` is used if present, otherwise defaults.
    pub fn load_for_startup(cli_path: Option<&str>) -> common::Result<Self> {
        if let Some(path) = Self::resolve_path(cli_path) {
            return Self::load(&path);
        }
        let default_path = Path::new(DEFAULT_CONFIG_PATH);
        if default_path.exists() {
            return Self::load(default_path);
        }
        Self::finish(Config::default())
    }

    /// Load configuration from a TOML file, then overlay environment variables.
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Self::finish(config)
    }

    fn finish(mut config: Config) -> common::Result<Self> {
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Overlay `PORT`, `CREDENTIALS_PATH` and `TOKEN_PATH`.
    fn apply_env(&mut self) -> common::Result<()> {
        if let Ok(port) = std::env::var("PORT") {
            let port: u16 = port.trim().parse().map_err(|e| common::Error::Env {
                name: "PORT".into(),
                message: format!("{e}"),
            })?;
            self.server.listen_addr.set_port(port);
        }
        if let Ok(path) = std::env::var("CREDENTIALS_PATH") {
            self.oauth.credentials_path = PathBuf::from(path);
        }
        if let Ok(path) = std::env::var("TOKEN_PATH") {
            self.oauth.token_path = PathBuf::from(path);
        }
        Ok(())
    }

    fn validate(&self) -> common::Result<()> {
        if !is_http_url(&self.oauth.redirect_uri) {
            return Err(common::Error::Config(format!(
                "redirect_uri must start with http:// or https://, got: {}",
                self.oauth.redirect_uri
            )));
        }

        if !is_http_url(&self.resource.url) {
            return Err(common::Error::Config(format!(
                "resource url must start with http:// or https://, got: {}",
                self.resource.url
            )));
        }

        if !self.oauth.landing_path.starts_with('/') {
            return Err(common::Error::Config(format!(
                "landing_path must start with '/', got: {}",
                self.oauth.landing_path
            )));
        }

        if self.resource.timeout_secs == 0 {
            return Err(common::Error::Config(
                "timeout_secs must be greater than 0".into(),
            ));
        }

        if self.server.max_connections == 0 {
            return Err(common::Error::Config(
                "max_connections must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Resolve config file path from CLI arg or CONFIG_PATH env var.
    pub fn resolve_path(cli_path: Option<&str>) -> Option<PathBuf> {
        if let Some(p) = cli_path {
            return Some(PathBuf::from(p));
        }
        std::env::var("CONFIG_PATH").ok().map(PathBuf::from)
    }
}

fn is_http_url(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://")
}
