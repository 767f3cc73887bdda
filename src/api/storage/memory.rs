//! In-memory storage backend.
//!
//! Used when no DATABASE_URL is configured, and by the test suite.

use super::{StorageError, traits::StorageBackend};
use crate::models::{
    Architecture, ArchitectureStateUpdate, Deployment, Diagram, Resource, UpsertOutcome,
};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct Inner {
    architectures: HashMap<Uuid, Architecture>,
    /// Insertion order doubles as start order
    deployments: Vec<Deployment>,
    resources: BTreeMap<(Uuid, String), Resource>,
}

/// In-memory storage backend guarded by a single RwLock
#[derive(Default)]
pub struct InMemoryStorageBackend {
    inner: RwLock<Inner>,
}

impl InMemoryStorageBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

fn architecture_mut(
    inner: &mut Inner,
    id: Uuid,
) -> Result<&mut Architecture, StorageError> {
    inner
        .architectures
        .get_mut(&id)
        .ok_or_else(|| StorageError::not_found("architecture", id))
}

#[async_trait]
impl StorageBackend for InMemoryStorageBackend {
    async fn create_architecture(
        &self,
        architecture: Architecture,
    ) -> Result<Architecture, StorageError> {
        let mut inner = self.inner.write().await;
        inner
            .architectures
            .insert(architecture.id, architecture.clone());
        Ok(architecture)
    }

    async fn get_architecture(&self, id: Uuid) -> Result<Option<Architecture>, StorageError> {
        Ok(self.inner.read().await.architectures.get(&id).cloned())
    }

    async fn list_architectures(&self, owner_id: Uuid) -> Result<Vec<Architecture>, StorageError> {
        let inner = self.inner.read().await;
        let mut owned: Vec<Architecture> = inner
            .architectures
            .values()
            .filter(|a| a.owner_id == owner_id)
            .cloned()
            .collect();
        owned.sort_by_key(|a| (a.created_at, a.id));
        Ok(owned)
    }

    async fn update_architecture_diagram(
        &self,
        id: Uuid,
        diagram: Diagram,
        expected_version: Option<i32>,
    ) -> Result<Architecture, StorageError> {
        let mut inner = self.inner.write().await;
        let architecture = architecture_mut(&mut inner, id)?;

        if let Some(expected) = expected_version {
            if expected != architecture.version {
                return Err(StorageError::VersionConflict {
                    entity_type: "architecture".to_string(),
                    entity_id: id.to_string(),
                    expected_version: expected,
                    current_version: architecture.version,
                });
            }
        }

        architecture.diagram = diagram;
        architecture.version += 1;
        architecture.updated_at = Utc::now();
        Ok(architecture.clone())
    }

    async fn replace_architecture_layout(
        &self,
        id: Uuid,
        diagram: Diagram,
    ) -> Result<Architecture, StorageError> {
        let mut inner = self.inner.write().await;
        let architecture = architecture_mut(&mut inner, id)?;
        architecture.diagram = diagram;
        architecture.updated_at = Utc::now();
        Ok(architecture.clone())
    }

    async fn update_architecture_state(
        &self,
        id: Uuid,
        update: ArchitectureStateUpdate,
    ) -> Result<Architecture, StorageError> {
        let mut inner = self.inner.write().await;
        let architecture = architecture_mut(&mut inner, id)?;
        update
            .apply(architecture)
            .map_err(|e| StorageError::InvalidTransition(e.to_string()))?;
        Ok(architecture.clone())
    }

    async fn delete_architecture(&self, id: Uuid) -> Result<(), StorageError> {
        let mut inner = self.inner.write().await;
        if inner.architectures.remove(&id).is_none() {
            return Err(StorageError::not_found("architecture", id));
        }
        inner.deployments.retain(|d| d.architecture_id != id);
        inner.resources.retain(|_, r| r.architecture_id != id);
        Ok(())
    }

    async fn create_deployment(&self, deployment: Deployment) -> Result<Deployment, StorageError> {
        self.inner.write().await.deployments.push(deployment.clone());
        Ok(deployment)
    }

    async fn get_deployment(
        &self,
        architecture_id: Uuid,
        deployment_id: Uuid,
    ) -> Result<Option<Deployment>, StorageError> {
        let inner = self.inner.read().await;
        Ok(inner
            .deployments
            .iter()
            .find(|d| d.id == deployment_id && d.architecture_id == architecture_id)
            .cloned())
    }

    async fn list_deployments(
        &self,
        architecture_id: Uuid,
        limit: usize,
    ) -> Result<Vec<Deployment>, StorageError> {
        let inner = self.inner.read().await;
        Ok(inner
            .deployments
            .iter()
            .rev()
            .filter(|d| d.architecture_id == architecture_id)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn list_in_progress_deployments(&self) -> Result<Vec<Deployment>, StorageError> {
        let inner = self.inner.read().await;
        Ok(inner
            .deployments
            .iter()
            .filter(|d| !d.status.is_terminal())
            .cloned()
            .collect())
    }

    async fn save_deployment(&self, deployment: &Deployment) -> Result<(), StorageError> {
        let mut inner = self.inner.write().await;
        let stored = inner
            .deployments
            .iter_mut()
            .find(|d| d.id == deployment.id)
            .ok_or_else(|| StorageError::not_found("deployment", deployment.id))?;

        if stored.status.is_terminal() {
            return Err(StorageError::Finalized {
                deployment_id: deployment.id.to_string(),
            });
        }
        *stored = deployment.clone();
        Ok(())
    }

    async fn list_resources(&self, architecture_id: Uuid) -> Result<Vec<Resource>, StorageError> {
        let inner = self.inner.read().await;
        Ok(inner
            .resources
            .values()
            .filter(|r| r.architecture_id == architecture_id)
            .cloned()
            .collect())
    }

    async fn upsert_resource(&self, resource: Resource) -> Result<UpsertOutcome, StorageError> {
        let mut inner = self.inner.write().await;
        let key = (resource.tenant_scope_id, resource.identifier.clone());

        match inner.resources.entry(key) {
            Entry::Occupied(mut slot) => {
                let existing = slot.get_mut();
                existing.architecture_id = resource.architecture_id;
                existing.resource_type = resource.resource_type;
                existing.provider_id = resource.provider_id;
                existing.name = resource.name;
                existing.status = resource.status;
                existing.config = resource.config;
                existing.updated_at = Utc::now();
                Ok(UpsertOutcome::Updated)
            }
            Entry::Vacant(slot) => {
                slot.insert(resource);
                Ok(UpsertOutcome::Created)
            }
        }
    }

    async fn delete_resources(
        &self,
        architecture_id: Uuid,
        identifiers: &[String],
    ) -> Result<u64, StorageError> {
        let mut inner = self.inner.write().await;
        let before = inner.resources.len();
        inner.resources.retain(|(_, identifier), r| {
            !(r.architecture_id == architecture_id && identifiers.contains(identifier))
        });
        Ok((before - inner.resources.len()) as u64)
    }

    async fn delete_resources_for_architecture(
        &self,
        architecture_id: Uuid,
    ) -> Result<u64, StorageError> {
        let mut inner = self.inner.write().await;
        let before = inner.resources.len();
        inner
            .resources
            .retain(|_, r| r.architecture_id != architecture_id);
        Ok((before - inner.resources.len()) as u64)
    }
}
