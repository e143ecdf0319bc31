use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParleyConfig {
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default)]
    pub ensemble: EnsembleConfig,
    #[serde(default)]
    pub context: ContextConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

impl Default for ParleyConfig {
    fn default() -> Self {
        Self {
            language: default_language(),
            ensemble: EnsembleConfig::default(),
            context: ContextConfig::default(),
            cache: CacheConfig::default(),
            pipeline: PipelineConfig::default(),
        }
    }
}

fn default_language() -> String {
    "en".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnsembleConfig {
    #[serde(default = "default_strategy_timeout_ms")]
    pub strategy_timeout_ms: u64,
    #[serde(default)]
    pub weights: StrategyWeights,
}

impl Default for EnsembleConfig {
    fn default() -> Self {
        Self {
            strategy_timeout_ms: default_strategy_timeout_ms(),
            weights: StrategyWeights::default(),
        }
    }
}

impl EnsembleConfig {
    pub fn strategy_timeout(&self) -> Duration {
        Duration::from_millis(self.strategy_timeout_ms)
    }
}

fn default_strategy_timeout_ms() -> u64 {
    2000
}

/// Static trust level per built-in strategy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyWeights {
    #[serde(default = "default_pattern_weight")]
    pub pattern: f64,
    #[serde(default = "default_semantic_weight")]
    pub semantic: f64,
    #[serde(default = "default_model_weight")]
    pub model: f64,
}

impl Default for StrategyWeights {
    fn default() -> Self {
        Self {
            pattern: default_pattern_weight(),
            semantic: default_semantic_weight(),
            model: default_model_weight(),
        }
    }
}

fn default_pattern_weight() -> f64 {
    0.6
}

fn default_semantic_weight() -> f64 {
    0.8
}

fn default_model_weight() -> f64 {
    1.0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextConfig {
    #[serde(default = "default_history_size")]
    pub history_size: usize,
    #[serde(default = "default_retention_secs")]
    pub retention_secs: u64,
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
    #[serde(default = "default_known_applications")]
    pub known_applications: Vec<String>,
    #[serde(default = "default_music_applications")]
    pub music_applications: Vec<String>,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            history_size: default_history_size(),
            retention_secs: default_retention_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
            known_applications: default_known_applications(),
            music_applications: default_music_applications(),
        }
    }
}

impl ContextConfig {
    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

fn default_history_size() -> usize {
    16
}

fn default_retention_secs() -> u64 {
    300
}

fn default_sweep_interval_secs() -> u64 {
    60
}

fn default_known_applications() -> Vec<String> {
    [
        "Spotify",
        "Chrome",
        "Firefox",
        "Visual Studio Code",
        "Terminal",
        "Calculator",
        "Notepad",
        "Outlook",
        "Slack",
        "Discord",
        "VLC",
        "iTunes",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_music_applications() -> Vec<String> {
    ["Spotify", "iTunes", "VLC"]
        .into_iter()
        .map(String::from)
        .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_sliding_secs")]
    pub default_sliding_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_sliding_secs: default_sliding_secs(),
        }
    }
}

impl CacheConfig {
    pub fn default_sliding(&self) -> Duration {
        Duration::from_secs(self.default_sliding_secs)
    }
}

fn default_sliding_secs() -> u64 {
    300
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "default_slow_threshold_ms")]
    pub slow_threshold_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            slow_threshold_ms: default_slow_threshold_ms(),
        }
    }
}

impl PipelineConfig {
    pub fn slow_threshold(&self) -> Duration {
        Duration::from_millis(self.slow_threshold_ms)
    }
}

fn default_slow_threshold_ms() -> u64 {
    500
}
