use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::{env, fs};

use crate::config::settings::SettingsConfig;
use crate::utils::constants::{DEFAULT_CACHE_KEY, DEFAULT_PROBE_PATH};

/// ================================
/// Full service configuration
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct ServiceConfig {
    #[serde(default)]
    pub settings: SettingsConfig,
    pub identity: IdentityConfig,
    pub crm: CrmConfig,
    #[serde(default)]
    pub cache: CacheConfig,
}

/// ================================
/// Identity provider (token issuance)
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct IdentityConfig {
    /// login base, e.g. https://login.salesforce.com
    pub login_url: String,
    #[serde(default)]
    pub grant: GrantType,
    pub client_id: ConfigValue,
    pub client_secret: ConfigValue,
    /// required when grant = password
    pub username: Option<ConfigValue>,
    /// required when grant = password
    pub password: Option<ConfigValue>,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum GrantType {
    #[default]
    ClientCredentials,
    Password,
}

impl GrantType {
    pub fn as_str(&self) -> &'static str {
        match self {
            GrantType::ClientCredentials => "client_credentials",
            GrantType::Password => "password",
        }
    }
}

/// ================================
/// CRM (probe target)
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct CrmConfig {
    pub base_url: String,
    /// cheap authenticated GET answering 2xx iff the bearer token is honored
    #[serde(default = "default_probe_path")]
    pub probe_path: String,
}

/// ================================
/// Distributed cache
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct CacheConfig {
    /// absent or empty → local memory only
    pub redis_url: Option<String>,
    #[serde(default = "default_cache_key")]
    pub key: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            redis_url: None,
            key: default_cache_key(),
        }
    }
}

/// Secret-bearing value sources
#[derive(Debug, Deserialize, Clone)]
#[serde(untagged)]
pub enum ConfigValue {
    Literal {
        value: String,
    },
    FromEnv {
        from_env: String,
    },
    FromFile {
        path: String,
    },
}

impl ConfigValue {
    pub fn resolve(&self) -> Result<String> {
        let resolved = match self {
            ConfigValue::Literal { value } => value.to_owned(),
            ConfigValue::FromEnv { from_env } => env::var(from_env)
                .map_err(|err| anyhow!("env var '{}': {}", from_env, err))?,
            ConfigValue::FromFile { path } => fs::read_to_string(path)
                .map_err(|err| anyhow!("file '{}': {}", path, err))?
                .trim()
                .to_string(),
        };
        if resolved.is_empty() {
            return Err(anyhow!("{} resolved to an empty value", self.describe()));
        }
        Ok(resolved)
    }

    /// Where the value comes from, never the value itself
    pub fn describe(&self) -> String {
        match self {
            ConfigValue::Literal { .. } => "literal value".to_string(),
            ConfigValue::FromEnv { from_env } => format!("env var '{}'", from_env),
            ConfigValue::FromFile { path } => format!("file '{}'", path),
        }
    }
}

fn default_probe_path() -> String {
    DEFAULT_PROBE_PATH.to_string()
}

fn default_cache_key() -> String {
    DEFAULT_CACHE_KEY.to_string()
}
