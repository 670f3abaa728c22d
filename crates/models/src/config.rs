use crate::{GantryError, LogLevel};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub docker: DockerConfig,
    pub image: ImageConfig,
    pub server: ServerConfig,
    pub limits: LimitsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct DockerConfig {
    pub host: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ImageConfig {
    pub repository: String,
    pub base_image: String,
    pub tag_digest_chars: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub log_level: LogLevel,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct LimitsConfig {
    pub max_context_bytes: u64,
    pub stop_grace_secs: u64,
    pub wait_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            docker: DockerConfig {
                host: "".to_string(),
            },
            image: ImageConfig {
                repository: "gantry".to_string(),
                base_image: "python:3.11-slim".to_string(),
                tag_digest_chars: 12,
            },
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
                log_level: LogLevel::Info,
            },
            limits: LimitsConfig {
                max_context_bytes: 50 * 1024 * 1024, // 50MB build context limit
                stop_grace_secs: 10,
                wait_timeout_ms: 300_000,
            },
        }
    }
}

impl Config {
    pub fn load(config_path: &str) -> Result<Self, GantryError> {
        let config_str =
            std::fs::read_to_string(config_path).map_err(|e| GantryError::ConfigError {
                reason: format!("{config_path}: {e}"),
            })?;
        let config: Config = toml::from_str(&config_str).map_err(|e| GantryError::ConfigError {
            reason: format!("{config_path}: {e}"),
        })?;
        Ok(config)
    }
}
