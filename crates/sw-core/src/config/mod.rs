//! Configuration management for Slidewall

mod agent;
mod coordinator;
mod serde_utils;

pub use agent::{AgentConfig, BackoffConfig, TuningConfig};
pub use coordinator::CoordinatorConfig;
pub use serde_utils::{duration_millis, duration_secs};

use crate::error::ConfigError;
use std::path::{Path, PathBuf};

/// Get the default configuration directory
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("slidewall")
}

/// Default path of the coordinator configuration file
pub fn default_coordinator_config_path() -> PathBuf {
    default_config_dir().join("coordinator.toml")
}

/// Default path of the agent configuration file
pub fn default_agent_config_path() -> PathBuf {
    default_config_dir().join("agent.toml")
}

/// Load configuration from a TOML file
pub fn load_config<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound(path.to_path_buf()));
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::Invalid(format!("Failed to read config: {}", e)))?;

    let config: T = toml::from_str(&content)?;
    Ok(config)
}

/// Save configuration to a TOML file
pub fn save_config<T: serde::Serialize>(path: &Path, config: &T) -> Result<(), ConfigError> {
    let content = toml::to_string_pretty(config)?;

    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| ConfigError::Invalid(format!("Failed to create config dir: {}", e)))?;
    }

    std::fs::write(path, content)
        .map_err(|e| ConfigError::Invalid(format!("Failed to write config: {}", e)))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_config_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("agent.toml");

        let config = AgentConfig::default();
        save_config(&path, &config).unwrap();

        let loaded: AgentConfig = load_config(&path).unwrap();
        assert_eq!(loaded.coordinator_url, config.coordinator_url);
        assert_eq!(loaded.tuning.heartbeat_interval, config.tuning.heartbeat_interval);
    }

    #[test]
    fn test_missing_config_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.toml");
        let result: Result<AgentConfig, _> = load_config(&path);
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }
}
