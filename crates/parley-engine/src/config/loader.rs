use super::schema::ParleyConfig;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load from default locations:
    /// 1. ./parley.yaml
    /// 2. ~/.parley/config.yaml
    /// 3. Default configuration
    pub async fn load_default() -> Result<ParleyConfig, ConfigError> {
        let local_config = PathBuf::from("./parley.yaml");
        if local_config.exists() {
            return Self::load_from(&local_config).await;
        }

        if let Some(home) = dirs::home_dir() {
            let home_config = home.join(".parley").join("config.yaml");
            if home_config.exists() {
                return Self::load_from(&home_config).await;
            }
        }

        Ok(ParleyConfig::default())
    }

    pub async fn load_from(path: &Path) -> Result<ParleyConfig, ConfigError> {
        let content = tokio::fs::read_to_string(path).await?;
        let config: ParleyConfig = serde_yaml::from_str(&content)?;
        Self::validate(&config)?;
        tracing::debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Reject values that would stall or crash the engine at runtime.
    pub fn validate(config: &ParleyConfig) -> Result<(), ConfigError> {
        if config.context.sweep_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "context.sweep_interval_secs must be at least 1".into(),
            ));
        }
        if config.context.history_size == 0 {
            return Err(ConfigError::Invalid(
                "context.history_size must be at least 1".into(),
            ));
        }
        if config.ensemble.strategy_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "ensemble.strategy_timeout_ms must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
