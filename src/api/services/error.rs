//! Errors raised synchronously by the architecture and deployment services.

use crate::graph::TopologyError;
use crate::layout::LayoutError;
use crate::storage::StorageError;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    #[error("Architecture not found: {0}")]
    NotFound(Uuid),
    #[error("Deployment not found: {0}")]
    DeploymentNotFound(Uuid),
    #[error("Architecture {0} belongs to another user")]
    Forbidden(Uuid),
    #[error("Architecture has no resources to deploy")]
    EmptyTopology,
    #[error("Invalid topology: {0}")]
    InvalidTopology(String),
    #[error("Architecture has no deployed stack")]
    NothingDeployed,
    #[error("Architecture still has a deployed stack or a deployment in progress")]
    StillDeployed,
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl From<TopologyError> for OrchestratorError {
    fn from(e: TopologyError) -> Self {
        OrchestratorError::InvalidTopology(e.to_string())
    }
}

impl From<LayoutError> for OrchestratorError {
    fn from(e: LayoutError) -> Self {
        match e {
            LayoutError::InvalidDiagram(topology) => topology.into(),
        }
    }
}
