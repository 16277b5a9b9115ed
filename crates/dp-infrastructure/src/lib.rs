pub mod config;
pub mod dto;
pub mod http_gateway;
pub mod paths;

pub use crate::config::ClientConfig;
pub use crate::http_gateway::HttpGateway;
pub use crate::paths::DpPaths;
