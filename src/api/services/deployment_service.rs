//! Deployment orchestrator.
//!
//! Validates deploy and teardown requests synchronously, records an
//! `in_progress` deployment and hands the provider work to the queue.
//! Callers follow progress through [`DeploymentOrchestrator::get_status`].

use super::deployment_queue::{DeploymentJob, DeploymentQueue};
use super::deployment_worker::DeploymentWorker;
use super::error::OrchestratorError;
use crate::graph;
use crate::layout::{self, LayoutConfig};
use crate::models::{
    Architecture, ArchitectureStateUpdate, Deployment, DeploymentTicket, DiagramEdge, DiagramNode,
    FieldUpdate, LifecycleEvent, StackAction,
};
use crate::provider::ProviderClient;
use crate::storage::{StorageBackend, UserContext};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

/// Upper bound for a caller-supplied history limit
const MAX_HISTORY_LIMIT: usize = 100;

/// Message recorded on deployments found `in_progress` at startup
pub const INTERRUPTED_MESSAGE: &str = "Deployment interrupted by a service restart";

/// Orchestrator tuning
#[derive(Debug, Clone)]
pub struct DeploymentSettings {
    /// Size of the worker pool
    pub workers: usize,
    /// How long an idle architecture lane stays open
    pub lane_idle: Duration,
    /// Deployments returned by a status read without a deployment id
    pub history_limit: usize,
    pub stack_name_prefix: String,
    pub layout: LayoutConfig,
}

impl Default for DeploymentSettings {
    fn default() -> Self {
        Self {
            workers: 4,
            lane_idle: Duration::from_secs(30),
            history_limit: 20,
            stack_name_prefix: "topology".to_string(),
            layout: LayoutConfig::default(),
        }
    }
}

pub struct DeploymentOrchestrator {
    storage: Arc<dyn StorageBackend>,
    queue: DeploymentQueue,
    settings: DeploymentSettings,
}

impl DeploymentOrchestrator {
    pub fn new(
        storage: Arc<dyn StorageBackend>,
        provider: Arc<dyn ProviderClient>,
        settings: DeploymentSettings,
    ) -> Self {
        let worker = DeploymentWorker::new(
            storage.clone(),
            provider,
            settings.stack_name_prefix.clone(),
        );
        let queue = DeploymentQueue::new(Arc::new(worker), settings.workers, settings.lane_idle);
        Self {
            storage,
            queue,
            settings,
        }
    }

    pub fn settings(&self) -> &DeploymentSettings {
        &self.settings
    }

    pub fn queue(&self) -> &DeploymentQueue {
        &self.queue
    }

    /// Start a deployment of the architecture's current diagram.
    ///
    /// Returns as soon as the deployment is recorded and queued.
    pub async fn deploy(
        &self,
        user: &UserContext,
        architecture_id: Uuid,
    ) -> Result<DeploymentTicket, OrchestratorError> {
        let architecture = self.owned_architecture(user, architecture_id).await?;
        // Containers alone produce an empty stack
        if architecture.diagram.resource_count() == 0 {
            return Err(OrchestratorError::EmptyTopology);
        }
        graph::validate_containment(&architecture.diagram.nodes)?;

        let action = if architecture.deployed_stack_ref.is_some() {
            StackAction::Update
        } else {
            StackAction::Create
        };
        self.start(architecture, action, LifecycleEvent::DeployRequested)
            .await
    }

    /// Start tearing down the architecture's deployed stack
    pub async fn tear_down(
        &self,
        user: &UserContext,
        architecture_id: Uuid,
    ) -> Result<DeploymentTicket, OrchestratorError> {
        let architecture = self.owned_architecture(user, architecture_id).await?;
        if architecture.deployed_stack_ref.is_none() {
            return Err(OrchestratorError::NothingDeployed);
        }
        self.start(architecture, StackAction::Delete, LifecycleEvent::TearDownRequested)
            .await
    }

    async fn start(
        &self,
        architecture: Architecture,
        action: StackAction,
        event: LifecycleEvent,
    ) -> Result<DeploymentTicket, OrchestratorError> {
        let deployment = self
            .storage
            .create_deployment(Deployment::start(
                architecture.id,
                architecture.version,
                action,
            ))
            .await?;
        self.storage
            .update_architecture_state(architecture.id, ArchitectureStateUpdate::event(event))
            .await?;

        info!(
            deployment_id = %deployment.id,
            architecture_id = %architecture.id,
            %action,
            "Deployment queued"
        );
        self.queue
            .submit(DeploymentJob {
                deployment_id: deployment.id,
                architecture_id: architecture.id,
                action,
                diagram: architecture.diagram,
            })
            .await;

        Ok(DeploymentTicket {
            deployment_id: deployment.id,
            status: deployment.status,
        })
    }

    /// The named deployment, or the most recent ones of the architecture
    pub async fn get_status(
        &self,
        user: &UserContext,
        architecture_id: Uuid,
        deployment_id: Option<Uuid>,
        limit: Option<usize>,
    ) -> Result<Vec<Deployment>, OrchestratorError> {
        self.owned_architecture(user, architecture_id).await?;

        match deployment_id {
            Some(deployment_id) => {
                let deployment = self
                    .storage
                    .get_deployment(architecture_id, deployment_id)
                    .await?
                    .ok_or(OrchestratorError::DeploymentNotFound(deployment_id))?;
                Ok(vec![deployment])
            }
            None => {
                let limit = limit
                    .unwrap_or(self.settings.history_limit)
                    .clamp(1, MAX_HISTORY_LIMIT);
                Ok(self.storage.list_deployments(architecture_id, limit).await?)
            }
        }
    }

    /// Lay out nodes with the configured spacing. Pure.
    pub fn compute_layout(
        &self,
        nodes: &[DiagramNode],
        edges: &[DiagramEdge],
    ) -> Result<Vec<DiagramNode>, OrchestratorError> {
        Ok(layout::compute_layout(nodes, edges, &self.settings.layout)?)
    }

    /// Fail deployments a previous process left `in_progress`.
    ///
    /// Must run before the queue takes new work. Returns the number failed.
    pub async fn recover_interrupted(&self) -> Result<usize, OrchestratorError> {
        let stuck = self.storage.list_in_progress_deployments().await?;
        let mut recovered = 0;

        for mut deployment in stuck {
            if deployment.fail(INTERRUPTED_MESSAGE).is_err() {
                continue;
            }
            self.storage.save_deployment(&deployment).await?;
            recovered += 1;

            let update = ArchitectureStateUpdate::event(LifecycleEvent::OperationFailed)
                .with_error(FieldUpdate::Set(INTERRUPTED_MESSAGE.to_string()));
            if let Err(e) = self
                .storage
                .update_architecture_state(deployment.architecture_id, update)
                .await
            {
                warn!(
                    deployment_id = %deployment.id,
                    architecture_id = %deployment.architecture_id,
                    error = %e,
                    "Could not mark architecture failed after interruption"
                );
            }
        }

        if recovered > 0 {
            warn!("Failed {} deployments interrupted by a restart", recovered);
        }
        Ok(recovered)
    }

    /// Wait for every queued job to finish
    pub async fn wait_idle(&self) {
        self.queue.wait_idle().await;
    }

    async fn owned_architecture(
        &self,
        user: &UserContext,
        architecture_id: Uuid,
    ) -> Result<Architecture, OrchestratorError> {
        let architecture = self
            .storage
            .get_architecture(architecture_id)
            .await?
            .ok_or(OrchestratorError::NotFound(architecture_id))?;
        if !architecture.is_owned_by(user.user_id) {
            return Err(OrchestratorError::Forbidden(architecture_id));
        }
        Ok(architecture)
    }
}
