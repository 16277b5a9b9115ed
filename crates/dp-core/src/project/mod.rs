//! Project domain module.
//!
//! - `model`: the `Project` entity and its creation request
//! - `gateway`: remote API boundary for projects

mod gateway;
mod model;

pub use gateway::ProjectGateway;
pub use model::{NewProject, Project};
