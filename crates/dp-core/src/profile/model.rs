use crate::serde_compat::string_or_number;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// One row of a data preview, column name to cell value.
pub type PreviewRow = Map<String, Value>;

/// Column-level statistics and quality assessment of a data file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataProfile {
    pub shape: DataShape,
    /// Human-readable size, or a byte count on some backends.
    #[serde(default, with = "string_or_number")]
    pub memory_usage: String,
    /// Column name to statistics, in name order.
    #[serde(default)]
    pub columns: BTreeMap<String, ColumnStats>,
    #[serde(default)]
    pub quality: QualityReport,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataShape {
    pub rows: u64,
    pub columns: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnStats {
    /// Backend dtype name, e.g. `Int64`, `Float64`, `String`.
    #[serde(rename = "type", alias = "dtype")]
    pub dtype: String,
    #[serde(default)]
    pub non_null_count: u64,
    #[serde(default)]
    pub null_count: u64,
    #[serde(default)]
    pub unique_count: u64,
    #[serde(default)]
    pub duplicate_rate: f64,
    #[serde(default)]
    pub numeric_stats: Option<NumericSummary>,
    /// `(value, count)` pairs, most frequent first.
    #[serde(default)]
    pub top_values: Option<Vec<(Value, u64)>>,
}

impl ColumnStats {
    /// True for integer and floating-point dtypes.
    pub fn is_numeric(&self) -> bool {
        let dtype = self.dtype.to_ascii_lowercase();
        ["int", "uint", "float"]
            .iter()
            .any(|prefix| dtype.starts_with(prefix))
    }

    /// Share of null cells in `[0, 1]`.
    pub fn null_ratio(&self) -> f64 {
        let total = self.null_count + self.non_null_count;
        if total == 0 {
            0.0
        } else {
            self.null_count as f64 / total as f64
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NumericSummary {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    /// Score in `[0, 100]`.
    #[serde(default)]
    pub score: f64,
    /// Issue tags, e.g. "high null rate in column x".
    #[serde(default)]
    pub issues: Vec<String>,
}

impl QualityReport {
    pub fn grade(&self) -> QualityGrade {
        QualityGrade::from_score(self.score)
    }
}

/// Coarse quality band shown next to the score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QualityGrade {
    Good,
    Fair,
    Poor,
}

impl QualityGrade {
    pub fn from_score(score: f64) -> Self {
        if score >= 80.0 {
            Self::Good
        } else if score >= 60.0 {
            Self::Fair
        } else {
            Self::Poor
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Good => "good",
            Self::Fair => "fair",
            Self::Poor => "poor",
        }
    }
}
