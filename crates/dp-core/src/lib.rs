pub mod epoch;
pub mod error;
pub mod file;
pub mod gateway;
pub mod profile;
pub mod project;
pub mod serde_compat;
pub mod session;
pub mod version;

// Re-export common error type
pub use error::{DpError, Result};
pub use gateway::Gateways;
