//! Uploaded data files.

mod gateway;
mod model;

pub use gateway::FileGateway;
pub use model::{ALLOWED_EXTENSIONS, FileItem, FileUpload};
