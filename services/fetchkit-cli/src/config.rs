//! CLI configuration
//!
//! Config precedence: `--config` > `FETCHKIT_CONFIG` env var > `fetchkit.toml`.
//! The bearer token comes from the `FETCHKIT_TOKEN` env var or
//! `[auth] token_file`, never from the TOML itself.

use std::path::{Path, PathBuf};

use common::Secret;
use fetchkit::ClientConfig;
use serde::Deserialize;

pub const DEFAULT_CONFIG_PATH: &str = "fetchkit.toml";

/// Root configuration
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub client: ClientConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(skip)]
    pub token: Option<Secret>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthConfig {
    /// File holding the bearer token. Re-read whenever a request comes back 401.
    #[serde(default)]
    pub token_file: Option<PathBuf>,
}

impl Config {
    /// Load configuration from a TOML file, then resolve the token.
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Like `load`, but a missing file yields the defaults.
    pub fn load_or_default(path: &Path) -> common::Result<Self> {
        if path.exists() {
            return Self::load(path);
        }
        let mut config = Config::default();
        config.resolve_token()?;
        Ok(config)
    }

    pub fn from_toml(contents: &str) -> common::Result<Self> {
        let mut config: Config = toml::from_str(contents)?;
        config.client.validate()?;
        config.resolve_token()?;
        Ok(config)
    }

    /// Token resolution order:
    /// 1. FETCHKIT_TOKEN env var
    /// 2. token_file path from config
    fn resolve_token(&mut self) -> common::Result<()> {
        if let Ok(token) = std::env::var("FETCHKIT_TOKEN") {
            let token = Secret::new(token);
            if !token.is_empty() {
                self.token = Some(token);
            }
        } else if let Some(ref path) = self.auth.token_file {
            let token = read_token_file(path)?;
            if !token.is_empty() {
                self.token = Some(token);
            }
        }
        Ok(())
    }

    /// Resolve config file path from CLI arg or FETCHKIT_CONFIG env var.
    /// The flag reports whether the path was given explicitly.
    pub fn resolve_path(cli_path: Option<&str>) -> (PathBuf, bool) {
        if let Some(p) = cli_path {
            return (PathBuf::from(p), true);
        }
        if let Ok(p) = std::env::var("FETCHKIT_CONFIG") {
            return (PathBuf::from(p), true);
        }
        (PathBuf::from(DEFAULT_CONFIG_PATH), false)
    }
}

pub fn read_token_file(path: &Path) -> common::Result<Secret> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
        common::Error::Config(format!("failed to read token_file {}: {e}", path.display()))
    })?;
    Ok(Secret::new(raw))
}
