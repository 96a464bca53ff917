//! 部分结果合并 - 只保留成功类别的键，失败与超时单独记录

use indexmap::IndexMap;
use log::{debug, error, warn};
use serde::Serialize;

use super::category::Category;
use super::outcome::ExtractionOutcome;
use super::resource::Payload;

/// Per-call outcomes, in the order they were gathered.
pub type OutcomeMap = IndexMap<Category, ExtractionOutcome>;

/// 未产出数据的类别及原因
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MissingCategory {
    pub category: Category,
    pub reason: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// 合并结果
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AggregatedResult {
    pub data_keys: Vec<String>,
    #[serde(rename = "imageData")]
    pub image_data: Payload,
    /// Output key -> category that last wrote it.
    #[serde(skip)]
    pub provenance: IndexMap<String, Category>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub missing: Vec<MissingCategory>,
}

impl AggregatedResult {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.data_keys.is_empty()
    }

    /// Categories that own at least one key. Ordered by the first slot of each key,
    /// so a category that only overwrote a key shows up where that key was first written.
    pub fn contributing_categories(&self) -> Vec<Category> {
        let mut seen: Vec<Category> = Vec::new();
        for category in self.provenance.values() {
            if !seen.contains(category) {
                seen.push(category.clone());
            }
        }
        seen
    }

    pub fn missing_categories(&self) -> Vec<Category> {
        self.missing.iter().map(|m| m.category.clone()).collect()
    }
}

/// Folds per-category outcomes into one result.
///
/// Only `Success` payloads are copied. On a key collision the later outcome
/// in `outcomes` wins and the collision is logged.
pub fn merge(outcomes: OutcomeMap) -> AggregatedResult {
    let mut result = AggregatedResult::empty();

    for (category, outcome) in outcomes {
        match outcome {
            ExtractionOutcome::Success(payload) => {
                for (key, value) in payload {
                    match result.provenance.get(&key) {
                        Some(previous) => {
                            if previous != &category {
                                warn!(
                                    "⚠️ Key '{}' from {} overwrites value from {}",
                                    key, category, previous
                                );
                            }
                        }
                        None => result.data_keys.push(key.clone()),
                    }
                    result.provenance.insert(key.clone(), category.clone());
                    result.image_data.insert(key, value);
                }
            }
            ExtractionOutcome::Failure(cause) => {
                error!("Error extracting {}: {}", category, cause);
                result.missing.push(MissingCategory {
                    category,
                    reason: "failure",
                    detail: Some(cause),
                });
            }
            other => {
                match other {
                    ExtractionOutcome::TimedOut => {
                        warn!("No result for {} (deadline exceeded)", category)
                    }
                    _ => debug!("No result for {} ({})", category, other.label()),
                }
                result.missing.push(MissingCategory {
                    category,
                    reason: other.label(),
                    detail: None,
                });
            }
        }
    }

    result
}
