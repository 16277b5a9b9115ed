//! The bundle of gateway handles shared by the application layer.

use crate::file::FileGateway;
use crate::profile::DataGateway;
use crate::project::ProjectGateway;
use crate::session::SessionGateway;
use crate::version::VersionGateway;
use std::sync::Arc;

/// One handle per API area.
///
/// Each manager only receives the trait it needs. In production all five
/// usually point at the same HTTP client; tests swap individual fakes.
#[derive(Clone)]
pub struct Gateways {
    pub projects: Arc<dyn ProjectGateway>,
    pub sessions: Arc<dyn SessionGateway>,
    pub files: Arc<dyn FileGateway>,
    pub data: Arc<dyn DataGateway>,
    pub versions: Arc<dyn VersionGateway>,
}

impl Gateways {
    /// Uses a single implementation for every API area.
    pub fn from_shared<G>(gateway: Arc<G>) -> Self
    where
        G: ProjectGateway + SessionGateway + FileGateway + DataGateway + VersionGateway + 'static,
    {
        Self {
            projects: gateway.clone(),
            sessions: gateway.clone(),
            files: gateway.clone(),
            data: gateway.clone(),
            versions: gateway,
        }
    }
}

impl std::fmt::Debug for Gateways {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateways").finish_non_exhaustive()
    }
}
