//! Version history domain module.
//!
//! Versions form an append-only log. Rollback never edits or removes an
//! entry; the backend appends a new version mirroring the target.

mod gateway;
mod model;

pub use gateway::VersionGateway;
pub use model::{NewVersion, Version, VersionKind, VersionMetadata, human_file_size};
