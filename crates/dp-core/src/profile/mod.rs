//! Data profiles: derived column statistics and previews of a file.
//!
//! Profiles are keyed by server-side file path and are idempotent for the
//! same file content, which makes them safe to cache.

mod gateway;
mod model;

pub use gateway::DataGateway;
pub use model::{
    ColumnStats, DataProfile, DataShape, NumericSummary, PreviewRow, QualityGrade, QualityReport,
};
