//! 数据类别 - 可提取的数据种类及其目录

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use super::error::ExtractionError;

pub const COMPLETE: &str = "complete";

static CATALOG: Lazy<IndexMap<&'static str, &'static str>> = Lazy::new(|| {
    IndexMap::from([
        (COMPLETE, "All available thermal data"),
        ("gps", "GPS coordinates and location information"),
        (
            "camera",
            "Camera model, serial number, and technical specifications",
        ),
        (
            "thermal_params",
            "Thermal measurement parameters (emissivity, distance, etc.)",
        ),
        ("gas", "Gas detection and quantification data"),
        (
            "compass",
            "Compass and orientation information (degrees, roll, pitch)",
        ),
        ("zoom", "Zoom level and optical information"),
        (
            "statistics",
            "Statistical data (min, max, average, standard deviation)",
        ),
        (
            "metadata",
            "Basic image metadata (dimensions, units, timestamps)",
        ),
        ("palette", "Palette information (name, colors, etc.)"),
    ])
});

/// A named kind of data to extract, e.g. `gps` or `statistics`.
/// 数据类别名称（已规范化为小写）
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Category(String);

impl Category {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Trims and lowercases user input. Empty input means `complete`.
    pub fn parse(raw: &str) -> Self {
        let normalized = raw.trim().to_lowercase();
        if normalized.is_empty() {
            Self(COMPLETE.to_string())
        } else {
            Self(normalized)
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_complete(&self) -> bool {
        self.0 == COMPLETE
    }

    pub fn is_known(&self) -> bool {
        CATALOG.contains_key(self.0.as_str())
    }

    pub fn description(&self) -> Option<&'static str> {
        CATALOG.get(self.0.as_str()).copied()
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Category {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for Category {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl AsRef<str> for Category {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// 可用类别及说明（按目录顺序）
pub fn available_categories() -> &'static IndexMap<&'static str, &'static str> {
    &CATALOG
}

/// 校验类别名称，返回说明；未知类别返回可用列表
pub fn validate_category(raw: &str) -> Result<&'static str, ExtractionError> {
    let category = Category::parse(raw);
    category
        .description()
        .ok_or_else(|| ExtractionError::UnknownCategory {
            name: raw.to_string(),
            available: CATALOG.keys().copied().collect::<Vec<_>>().join(", "),
        })
}

/// 去重 - 保留每个类别首次出现的位置
pub fn dedup_preserving_order(categories: &[Category]) -> Vec<Category> {
    let mut seen = HashSet::with_capacity(categories.len());
    categories
        .iter()
        .filter(|c| seen.insert(c.as_str()))
        .cloned()
        .collect()
}
