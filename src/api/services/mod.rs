//! Services module - architecture management and deployment orchestration.

pub mod architecture_service;
pub mod deployment_queue;
pub mod deployment_service;
pub mod deployment_worker;
pub mod error;
pub mod jwt_service;

// Re-export for convenience
pub use architecture_service::ArchitectureService;
pub use deployment_queue::{DeploymentJob, DeploymentQueue, JobRunner};
pub use deployment_service::{DeploymentOrchestrator, DeploymentSettings, INTERRUPTED_MESSAGE};
pub use deployment_worker::DeploymentWorker;
pub use error::OrchestratorError;
pub use jwt_service::{Claims, JwtService, SharedJwtService};
