//! Deployment worker: turns a queued job into provider calls and records the
//! outcome.
//!
//! Steps run in strict order within one job: resolve create vs update, issue
//! the provider call, reconcile live resources, finalize. Provider failures
//! are recorded verbatim and never retried.

use super::deployment_queue::{DeploymentJob, JobRunner};
use crate::graph;
use crate::models::{
    Architecture, ArchitectureStateUpdate, ArchitectureStatus, Deployment, DeploymentStatus,
    DiagramNode, FieldUpdate, LifecycleEvent, Resource, ResourceType, StackAction, UpsertOutcome,
};
use crate::provider::{ProviderClient, ProviderError, StackOutcome};
use crate::storage::{StorageBackend, StorageError};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

pub struct DeploymentWorker {
    storage: Arc<dyn StorageBackend>,
    provider: Arc<dyn ProviderClient>,
    stack_name_prefix: String,
}

/// Outcome of the provider phase of a deploy
enum ProviderPhase {
    Succeeded { stack_ref: String, pre_call: HashSet<String> },
    Failed(String),
}

impl DeploymentWorker {
    pub fn new(
        storage: Arc<dyn StorageBackend>,
        provider: Arc<dyn ProviderClient>,
        stack_name_prefix: impl Into<String>,
    ) -> Self {
        Self {
            storage,
            provider,
            stack_name_prefix: stack_name_prefix.into(),
        }
    }

    /// Provider stack name for an architecture
    pub fn stack_name(&self, architecture_id: Uuid) -> String {
        format!("{}-{}", self.stack_name_prefix, architecture_id.simple())
    }

    async fn execute(&self, job: &DeploymentJob) -> Result<(), StorageError> {
        let Some(mut deployment) = self
            .storage
            .get_deployment(job.architecture_id, job.deployment_id)
            .await?
        else {
            warn!(deployment_id = %job.deployment_id, "Queued deployment no longer exists");
            return Ok(());
        };
        if deployment.status.is_terminal() {
            return Ok(());
        }

        let requested = match job.action {
            StackAction::Delete => LifecycleEvent::TearDownRequested,
            StackAction::Create | StackAction::Update => LifecycleEvent::DeployRequested,
        };
        let architecture = match self
            .storage
            .update_architecture_state(job.architecture_id, ArchitectureStateUpdate::event(requested))
            .await
        {
            Ok(architecture) => architecture,
            Err(StorageError::NotFound { .. }) => {
                warn!(deployment_id = %deployment.id, "Architecture deleted before its deployment ran");
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        deployment.log(format!("Started {}", job.action));
        self.storage.save_deployment(&deployment).await?;

        match job.action {
            StackAction::Delete => self.tear_down(&mut deployment, &architecture).await,
            StackAction::Create | StackAction::Update => {
                self.deploy(&mut deployment, &architecture, job).await
            }
        }
    }

    async fn deploy(
        &self,
        deployment: &mut Deployment,
        architecture: &Architecture,
        job: &DeploymentJob,
    ) -> Result<(), StorageError> {
        let order = graph::deployment_order(&job.diagram.nodes, &job.diagram.edges);
        let nodes: Vec<DiagramNode> = order
            .iter()
            .map(|i| job.diagram.nodes[*i].clone())
            .collect();

        match self.provision(deployment, architecture, &nodes, job).await? {
            ProviderPhase::Failed(message) => self.fail(deployment, architecture.id, message).await,
            ProviderPhase::Succeeded {
                stack_ref,
                pre_call,
            } => {
                if let Err(e) = self
                    .reconcile(deployment, architecture, &stack_ref, &pre_call)
                    .await
                {
                    warn!(
                        deployment_id = %deployment.id,
                        architecture_id = %architecture.id,
                        error = %e,
                        "Resource reconciliation incomplete"
                    );
                    deployment.log(format!("Resource reconciliation incomplete: {}", e));
                }

                finalize(deployment, |d| d.complete());
                self.settle(
                    deployment,
                    architecture.id,
                    ArchitectureStateUpdate::event(LifecycleEvent::DeploySucceeded)
                        .with_error(FieldUpdate::Clear),
                )
                .await?;

                info!(
                    deployment_id = %deployment.id,
                    architecture_id = %architecture.id,
                    created = deployment.resources_created,
                    updated = deployment.resources_updated,
                    deleted = deployment.resources_deleted,
                    "Deployment completed"
                );
                Ok(())
            }
        }
    }

    /// Resolve create vs update and issue the provider call
    async fn provision(
        &self,
        deployment: &mut Deployment,
        architecture: &Architecture,
        nodes: &[DiagramNode],
        job: &DeploymentJob,
    ) -> Result<ProviderPhase, StorageError> {
        let mut existing = None;
        if let Some(stack_ref) = &architecture.deployed_stack_ref {
            match self.provider.stack_exists(stack_ref).await {
                Ok(true) => existing = Some(stack_ref.clone()),
                Ok(false) => deployment.log(format!(
                    "Stack {} no longer exists at the provider, creating a new stack",
                    stack_ref
                )),
                Err(e) => return Ok(ProviderPhase::Failed(e.message())),
            }
        }

        deployment.action = if existing.is_some() {
            StackAction::Update
        } else {
            StackAction::Create
        };
        deployment.log(format!("Resolved action: {}", deployment.action));
        self.storage.save_deployment(deployment).await?;

        if let Some(stack_ref) = existing {
            let pre_call: HashSet<String> = self
                .storage
                .list_resources(architecture.id)
                .await?
                .into_iter()
                .map(|r| r.identifier)
                .collect();

            match self
                .provider
                .update_stack(&stack_ref, nodes, &job.diagram.edges)
                .await
            {
                Ok(StackOutcome { stack_ref }) => {
                    deployment.log(format!("Updated stack {}", stack_ref));
                    return Ok(ProviderPhase::Succeeded {
                        stack_ref,
                        pre_call,
                    });
                }
                Err(ProviderError::StackNotFound(_)) => {
                    deployment.action = StackAction::Create;
                    deployment.log(format!(
                        "Stack {} disappeared during update, falling back to create",
                        stack_ref
                    ));
                    self.storage.save_deployment(deployment).await?;
                }
                Err(e) => return Ok(ProviderPhase::Failed(e.message())),
            }
        }

        let name = self.stack_name(architecture.id);
        match self
            .provider
            .create_stack(&name, nodes, &job.diagram.edges)
            .await
        {
            Ok(StackOutcome { stack_ref }) => {
                // Persist the new ref right away so a later failure cannot orphan the stack
                self.storage
                    .update_architecture_state(
                        architecture.id,
                        ArchitectureStateUpdate::default()
                            .with_stack_ref(FieldUpdate::Set(stack_ref.clone())),
                    )
                    .await?;
                deployment.log(format!("Created stack {}", stack_ref));
                Ok(ProviderPhase::Succeeded {
                    stack_ref,
                    pre_call: HashSet::new(),
                })
            }
            Err(e) => Ok(ProviderPhase::Failed(e.message())),
        }
    }

    /// Mirror the stack's live resources into local rows.
    ///
    /// Counts are updated as rows are written, so a failure part way through
    /// leaves them undercounted rather than wrong.
    async fn reconcile(
        &self,
        deployment: &mut Deployment,
        architecture: &Architecture,
        stack_ref: &str,
        pre_call: &HashSet<String>,
    ) -> Result<(), String> {
        let live = self
            .provider
            .list_stack_resources(stack_ref)
            .await
            .map_err(|e| e.message())?;

        let mut reported = HashSet::with_capacity(live.len());
        for item in live {
            let identifier = Resource::stable_identifier(stack_ref, &item.logical_name);
            let resource_type = ResourceType::from_native(&item.native_type);
            if !resource_type.is_known() {
                deployment.log(format!(
                    "Unmapped resource type {} kept as-is for {}",
                    item.native_type, item.logical_name
                ));
            }

            let now = Utc::now();
            let resource = Resource {
                id: Uuid::new_v4(),
                tenant_scope_id: architecture.owner_id,
                architecture_id: architecture.id,
                resource_type,
                provider_id: item.native_id,
                identifier: identifier.clone(),
                name: item.logical_name,
                status: item.status,
                config: json!({ "nativeType": item.native_type }),
                created_at: now,
                updated_at: now,
            };
            let outcome = self
                .storage
                .upsert_resource(resource)
                .await
                .map_err(|e| e.to_string())?;

            if pre_call.contains(&identifier) {
                deployment.resources_updated += 1;
            } else {
                deployment.resources_created += 1;
                if outcome == UpsertOutcome::Updated {
                    warn!(%identifier, "Resource row existed before a fresh create");
                }
            }
            reported.insert(identifier);
        }

        let stale: Vec<String> = self
            .storage
            .list_resources(architecture.id)
            .await
            .map_err(|e| e.to_string())?
            .into_iter()
            .map(|r| r.identifier)
            .filter(|identifier| !reported.contains(identifier))
            .collect();
        if !stale.is_empty() {
            let removed = self
                .storage
                .delete_resources(architecture.id, &stale)
                .await
                .map_err(|e| e.to_string())?;
            deployment.resources_deleted += i32::try_from(removed).unwrap_or(i32::MAX);
        }

        deployment.log(format!(
            "Reconciled resources: {} created, {} updated, {} deleted",
            deployment.resources_created, deployment.resources_updated, deployment.resources_deleted
        ));
        Ok(())
    }

    async fn tear_down(
        &self,
        deployment: &mut Deployment,
        architecture: &Architecture,
    ) -> Result<(), StorageError> {
        // An earlier teardown queued on the same lane already removed the stack
        let Some(stack_ref) = architecture.deployed_stack_ref.clone() else {
            deployment.log("No deployed stack left to tear down, nothing to do");
            finalize(deployment, |d| d.complete());
            self.settle(deployment, architecture.id, torn_down()).await?;
            info!(
                deployment_id = %deployment.id,
                architecture_id = %architecture.id,
                "Teardown skipped, stack already removed"
            );
            return Ok(());
        };

        match self.provider.delete_stack(&stack_ref).await {
            Ok(()) => deployment.log(format!("Deleted stack {}", stack_ref)),
            Err(ProviderError::StackNotFound(_)) => {
                deployment.log(format!("Stack {} was already gone", stack_ref))
            }
            Err(e) => return self.fail(deployment, architecture.id, e.message()).await,
        }

        let removed = self
            .storage
            .delete_resources_for_architecture(architecture.id)
            .await?;
        deployment.resources_deleted = i32::try_from(removed).unwrap_or(i32::MAX);

        finalize(deployment, |d| d.complete());
        self.settle(deployment, architecture.id, torn_down()).await?;

        info!(
            deployment_id = %deployment.id,
            architecture_id = %architecture.id,
            deleted = deployment.resources_deleted,
            "Stack torn down"
        );
        Ok(())
    }

    /// Record a provider failure. The stack ref is left untouched.
    async fn fail(
        &self,
        deployment: &mut Deployment,
        architecture_id: Uuid,
        message: String,
    ) -> Result<(), StorageError> {
        warn!(
            deployment_id = %deployment.id,
            %architecture_id,
            error = %message,
            "Deployment failed"
        );
        finalize(deployment, |d| d.fail(message.clone()));
        self.settle(
            deployment,
            architecture_id,
            ArchitectureStateUpdate::event(LifecycleEvent::OperationFailed)
                .with_error(FieldUpdate::Set(message)),
        )
        .await
    }

    /// Persist a finalized deployment, then move the architecture out of
    /// `deploying`. Anyone who sees the architecture settled also sees the
    /// deployment's terminal status.
    async fn settle(
        &self,
        deployment: &Deployment,
        architecture_id: Uuid,
        update: ArchitectureStateUpdate,
    ) -> Result<(), StorageError> {
        self.storage.save_deployment(deployment).await?;
        self.storage
            .update_architecture_state(architecture_id, update)
            .await?;
        Ok(())
    }

    /// Last resort when the job itself errored (storage unavailable)
    async fn abort(&self, job: &DeploymentJob, cause: &StorageError) {
        let message = format!("Deployment aborted: {}", cause);
        let mut deployment = match self
            .storage
            .get_deployment(job.architecture_id, job.deployment_id)
            .await
        {
            Ok(Some(deployment)) => deployment,
            _ => return,
        };

        if deployment.status.is_terminal() {
            self.resync_architecture(&deployment).await;
            return;
        }
        if let Err(e) = self.fail(&mut deployment, job.architecture_id, message).await {
            error!(
                deployment_id = %job.deployment_id,
                error = %e,
                "Could not record aborted deployment"
            );
        }
    }

    /// The deployment row was settled but the architecture write that follows
    /// it was lost. Bring a still-`deploying` architecture in line with it.
    async fn resync_architecture(&self, deployment: &Deployment) {
        let update = match (deployment.status, deployment.action) {
            (DeploymentStatus::InProgress, _) => return,
            (DeploymentStatus::Completed, StackAction::Delete) => torn_down(),
            (DeploymentStatus::Completed, _) => {
                ArchitectureStateUpdate::event(LifecycleEvent::DeploySucceeded)
                    .with_error(FieldUpdate::Clear)
            }
            (DeploymentStatus::Failed, _) => {
                ArchitectureStateUpdate::event(LifecycleEvent::OperationFailed).with_error(
                    FieldUpdate::Set(deployment.error.clone().unwrap_or_default()),
                )
            }
        };

        match self.storage.get_architecture(deployment.architecture_id).await {
            Ok(Some(architecture)) if architecture.status == ArchitectureStatus::Deploying => {}
            _ => return,
        }
        if let Err(e) = self
            .storage
            .update_architecture_state(deployment.architecture_id, update)
            .await
        {
            error!(
                deployment_id = %deployment.id,
                error = %e,
                "Could not settle architecture after deployment"
            );
        }
    }
}

fn torn_down() -> ArchitectureStateUpdate {
    ArchitectureStateUpdate::event(LifecycleEvent::TearDownSucceeded)
        .with_stack_ref(FieldUpdate::Clear)
        .with_error(FieldUpdate::Clear)
}

/// Apply a terminal transition; a deployment finalized elsewhere is left alone
fn finalize<F, E>(deployment: &mut Deployment, transition: F)
where
    F: FnOnce(&mut Deployment) -> Result<(), E>,
    E: std::fmt::Display,
{
    if let Err(e) = transition(deployment) {
        warn!(deployment_id = %deployment.id, "{}", e);
    }
}

#[async_trait]
impl JobRunner for DeploymentWorker {
    async fn run(&self, job: DeploymentJob) {
        info!(
            deployment_id = %job.deployment_id,
            architecture_id = %job.architecture_id,
            action = %job.action,
            "Running deployment job"
        );
        if let Err(e) = self.execute(&job).await {
            error!(
                deployment_id = %job.deployment_id,
                architecture_id = %job.architecture_id,
                error = %e,
                "Deployment job failed"
            );
            self.abort(&job, &e).await;
        }
    }
}
