//! 截止时间计算 - 根据实时帧率推导每次调用的时间预算

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Smallest deadline ever handed out, whatever the config says.
const FLOOR: Duration = Duration::from_millis(1);

/// 截止时间配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeadlineConfig {
    /// Fraction of one frame interval the extraction may use.
    pub safety_margin: f64,
    pub min_timeout_secs: f64,
    /// Used when the source rate is unknown or zero.
    pub default_timeout_secs: f64,
    pub validation_timeout_secs: f64,
}

impl Default for DeadlineConfig {
    fn default() -> Self {
        Self {
            safety_margin: 0.95,
            min_timeout_secs: 0.1,
            default_timeout_secs: 10.0,
            validation_timeout_secs: 10.0,
        }
    }
}

impl DeadlineConfig {
    pub fn validate(&self) -> Result<(), String> {
        if !(self.safety_margin > 0.0 && self.safety_margin < 1.0) {
            return Err(format!(
                "safety_margin must be in (0, 1), got {}",
                self.safety_margin
            ));
        }
        for (name, secs) in [
            ("min_timeout_secs", self.min_timeout_secs),
            ("default_timeout_secs", self.default_timeout_secs),
            ("validation_timeout_secs", self.validation_timeout_secs),
        ] {
            if !(secs.is_finite() && secs > 0.0) {
                return Err(format!("{} must be positive, got {}", name, secs));
            }
        }
        Ok(())
    }

    pub fn min_timeout(&self) -> Duration {
        secs_to_duration(self.min_timeout_secs)
    }

    pub fn default_timeout(&self) -> Duration {
        secs_to_duration(self.default_timeout_secs)
    }

    /// Never shorter than the non-validation default.
    pub fn validation_timeout(&self) -> Duration {
        secs_to_duration(self.validation_timeout_secs).max(self.default_timeout())
    }
}

/// Computes the deadline for one extraction call.
///
/// - validation calls get the fixed validation budget
/// - a known positive rate gives `max(min_timeout, safety_margin / rate_hz)`
/// - anything else falls back to the default timeout
pub fn compute_deadline(
    rate_hz: Option<f64>,
    validation_mode: bool,
    config: &DeadlineConfig,
) -> Duration {
    if validation_mode {
        return config.validation_timeout().max(FLOOR);
    }

    match rate_hz {
        Some(rate) if rate.is_finite() && rate > 0.0 => {
            let frame_budget = (1.0 / rate) * config.safety_margin;
            secs_to_duration(frame_budget)
                .max(config.min_timeout())
                .max(FLOOR)
        }
        _ => config.default_timeout().max(FLOOR),
    }
}

/// Live production rate of a data source, in samples per second.
pub trait RateSignal {
    fn rate_hz(&self) -> Option<f64>;
}

/// 超时信息 - 当前截止时间的推导过程
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeoutInfo {
    pub current_timeout: f64,
    pub camera_fps: Option<f64>,
    pub timeout_multiplier: f64,
    pub default_timeout: f64,
    pub frequency_seconds: Option<f64>,
}

impl TimeoutInfo {
    pub fn new(rate_hz: Option<f64>, config: &DeadlineConfig) -> Self {
        let frequency_seconds = rate_hz.filter(|r| r.is_finite() && *r > 0.0).map(|r| 1.0 / r);
        Self {
            current_timeout: compute_deadline(rate_hz, false, config).as_secs_f64(),
            camera_fps: rate_hz,
            timeout_multiplier: config.safety_margin,
            default_timeout: config.default_timeout_secs,
            frequency_seconds,
        }
    }
}

fn secs_to_duration(secs: f64) -> Duration {
    Duration::try_from_secs_f64(secs).unwrap_or(FLOOR)
}
