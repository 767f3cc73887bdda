//! Storage trait definitions for the API storage backends.

use super::StorageError;
use crate::models::{
    Architecture, ArchitectureStateUpdate, Deployment, Diagram, Resource, UpsertOutcome,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// User context for storage operations
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UserContext {
    pub user_id: Uuid,
    pub email: String,
}

/// Storage backend trait for architecture, deployment and resource records.
///
/// Writes are scoped: each call touches only the fields it names, keyed by id.
#[async_trait::async_trait]
pub trait StorageBackend: Send + Sync {
    // Architectures

    async fn create_architecture(
        &self,
        architecture: Architecture,
    ) -> Result<Architecture, StorageError>;

    async fn get_architecture(&self, id: Uuid) -> Result<Option<Architecture>, StorageError>;

    /// Architectures owned by a user, oldest first
    async fn list_architectures(&self, owner_id: Uuid) -> Result<Vec<Architecture>, StorageError>;

    /// Replace the diagram, bumping `version`.
    ///
    /// Fails with `VersionConflict` when `expected_version` is set and stale.
    async fn update_architecture_diagram(
        &self,
        id: Uuid,
        diagram: Diagram,
        expected_version: Option<i32>,
    ) -> Result<Architecture, StorageError>;

    /// Replace the diagram geometry without touching `version`
    async fn replace_architecture_layout(
        &self,
        id: Uuid,
        diagram: Diagram,
    ) -> Result<Architecture, StorageError>;

    /// Update status, stack ref and last error
    async fn update_architecture_state(
        &self,
        id: Uuid,
        update: ArchitectureStateUpdate,
    ) -> Result<Architecture, StorageError>;

    async fn delete_architecture(&self, id: Uuid) -> Result<(), StorageError>;

    // Deployments

    async fn create_deployment(&self, deployment: Deployment) -> Result<Deployment, StorageError>;

    async fn get_deployment(
        &self,
        architecture_id: Uuid,
        deployment_id: Uuid,
    ) -> Result<Option<Deployment>, StorageError>;

    /// Most recent deployments first
    async fn list_deployments(
        &self,
        architecture_id: Uuid,
        limit: usize,
    ) -> Result<Vec<Deployment>, StorageError>;

    /// Deployments still `in_progress` across all architectures
    async fn list_in_progress_deployments(&self) -> Result<Vec<Deployment>, StorageError>;

    /// Persist progress of a deployment. Refused once the stored row is terminal.
    async fn save_deployment(&self, deployment: &Deployment) -> Result<(), StorageError>;

    // Resources

    async fn list_resources(&self, architecture_id: Uuid) -> Result<Vec<Resource>, StorageError>;

    /// Insert or update keyed by `(tenant_scope_id, identifier)`
    async fn upsert_resource(&self, resource: Resource) -> Result<UpsertOutcome, StorageError>;

    /// Delete the given identifiers of an architecture, returning the count removed
    async fn delete_resources(
        &self,
        architecture_id: Uuid,
        identifiers: &[String],
    ) -> Result<u64, StorageError>;

    /// Delete every resource of an architecture, returning the count removed
    async fn delete_resources_for_architecture(
        &self,
        architecture_id: Uuid,
    ) -> Result<u64, StorageError>;
}
