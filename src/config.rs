use serde::{Deserialize, Serialize};
use std::env;

use crate::types::ConfigurationError;

pub const DEFAULT_REGION: &str = "us-east-1";
pub const DEFAULT_LOG_FILTER: &str = "object_canary=info";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub storage: StorageConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    pub region: String,
    /// Custom S3-compatible endpoint; `None` means the AWS endpoint for `region`.
    pub endpoint: Option<String>,
    pub path_style: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    pub filter: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            region: DEFAULT_REGION.to_string(),
            endpoint: None,
            path_style: false,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigurationError> {
        dotenvy::dotenv().ok();

        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigurationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            storage: StorageConfig::from_lookup(&lookup)?,
            log: LogConfig {
                filter: lookup("RUST_LOG").unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string()),
            },
        })
    }
}

impl StorageConfig {
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigurationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let region = lookup("S3_REGION").unwrap_or_else(|| DEFAULT_REGION.to_string());
        let endpoint = lookup("S3_ENDPOINT").filter(|e| !e.trim().is_empty());

        // Path-style by default whenever a custom endpoint is set.
        let path_style = match lookup("S3_PATH_STYLE") {
            Some(raw) => parse_bool(&raw).ok_or(ConfigurationError::InvalidValue {
                name: "S3_PATH_STYLE",
                value: raw,
            })?,
            None => endpoint.is_some(),
        };

        Ok(Self {
            region,
            endpoint,
            path_style,
        })
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
