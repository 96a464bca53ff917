use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use super::deadline::DeadlineConfig;
use super::error::ExtractionError;

pub const DEFAULT_WORKERS: usize = 4;

/// 提取器配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    pub workers: usize,
    pub thread_name_prefix: String,
    /// Upper bound for draining in-flight work on shutdown. `None` waits for all of it.
    pub drain_timeout_secs: Option<f64>,
    pub deadline: DeadlineConfig,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            thread_name_prefix: "thermal-extract".to_string(),
            drain_timeout_secs: None,
            deadline: DeadlineConfig::default(),
        }
    }
}

impl ExtractorConfig {
    pub fn for_available_cpus() -> Self {
        Self {
            workers: num_cpus::get().clamp(1, DEFAULT_WORKERS),
            ..Default::default()
        }
    }

    pub fn for_validation() -> Self {
        Self {
            deadline: DeadlineConfig {
                validation_timeout_secs: 30.0,
                ..Default::default()
            },
            drain_timeout_secs: Some(30.0),
            ..Default::default()
        }
    }

    pub fn from_json5_str(text: &str) -> Result<Self, ExtractionError> {
        let config: ExtractorConfig = json5::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ExtractionError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json5_str(&text)
    }

    pub fn validate(&self) -> Result<(), ExtractionError> {
        if self.workers == 0 {
            return Err(ExtractionError::InvalidConfig(
                "workers must be at least 1".to_string(),
            ));
        }
        if let Some(secs) = self.drain_timeout_secs {
            if !(secs.is_finite() && secs >= 0.0) {
                return Err(ExtractionError::InvalidConfig(format!(
                    "drain_timeout_secs must be non-negative, got {}",
                    secs
                )));
            }
        }
        self.deadline
            .validate()
            .map_err(ExtractionError::InvalidConfig)
    }

    pub fn drain_timeout(&self) -> Option<Duration> {
        self.drain_timeout_secs
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
    }
}
