//! Architecture CRUD scoped to the owning user.

use super::error::OrchestratorError;
use crate::graph;
use crate::layout::{self, LayoutConfig};
use crate::models::{
    Architecture, ArchitectureStatus, CreateArchitectureRequest, Resource,
    UpdateArchitectureRequest,
};
use crate::storage::{StorageBackend, UserContext};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

pub struct ArchitectureService {
    storage: Arc<dyn StorageBackend>,
    layout: LayoutConfig,
}

impl ArchitectureService {
    pub fn new(storage: Arc<dyn StorageBackend>, layout: LayoutConfig) -> Self {
        Self { storage, layout }
    }

    pub async fn create(
        &self,
        user: &UserContext,
        request: CreateArchitectureRequest,
    ) -> Result<Architecture, OrchestratorError> {
        graph::validate_containment(&request.diagram.nodes)?;
        let architecture = self
            .storage
            .create_architecture(Architecture::new(
                user.user_id,
                request.name,
                request.diagram,
            ))
            .await?;
        info!(architecture_id = %architecture.id, owner = %user.email, "Created architecture");
        Ok(architecture)
    }

    pub async fn get(
        &self,
        user: &UserContext,
        id: Uuid,
    ) -> Result<Architecture, OrchestratorError> {
        let architecture = self
            .storage
            .get_architecture(id)
            .await?
            .ok_or(OrchestratorError::NotFound(id))?;
        if !architecture.is_owned_by(user.user_id) {
            return Err(OrchestratorError::Forbidden(id));
        }
        Ok(architecture)
    }

    pub async fn list(&self, user: &UserContext) -> Result<Vec<Architecture>, OrchestratorError> {
        Ok(self.storage.list_architectures(user.user_id).await?)
    }

    /// Replace the diagram, bumping the version
    pub async fn update_diagram(
        &self,
        user: &UserContext,
        id: Uuid,
        request: UpdateArchitectureRequest,
    ) -> Result<Architecture, OrchestratorError> {
        self.get(user, id).await?;
        graph::validate_containment(&request.diagram.nodes)?;
        Ok(self
            .storage
            .update_architecture_diagram(id, request.diagram, request.expected_version)
            .await?)
    }

    /// Lay out the stored diagram in place. The version is unchanged.
    pub async fn apply_layout(
        &self,
        user: &UserContext,
        id: Uuid,
    ) -> Result<Architecture, OrchestratorError> {
        let architecture = self.get(user, id).await?;
        let diagram = layout::layout_diagram(&architecture.diagram, &self.layout)?;
        Ok(self.storage.replace_architecture_layout(id, diagram).await?)
    }

    /// Delete an architecture that has nothing deployed
    pub async fn delete(&self, user: &UserContext, id: Uuid) -> Result<(), OrchestratorError> {
        let architecture = self.get(user, id).await?;
        if architecture.deployed_stack_ref.is_some()
            || architecture.status == ArchitectureStatus::Deploying
        {
            return Err(OrchestratorError::StillDeployed);
        }
        self.storage.delete_architecture(id).await?;
        info!(architecture_id = %id, "Deleted architecture");
        Ok(())
    }

    pub async fn list_resources(
        &self,
        user: &UserContext,
        id: Uuid,
    ) -> Result<Vec<Resource>, OrchestratorError> {
        self.get(user, id).await?;
        Ok(self.storage.list_resources(id).await?)
    }
}
