//! PostgreSQL storage backend implementation.
//!
//! Uses sqlx for database operations and implements the StorageBackend trait.
//! Diagrams, action logs and resource configs are stored as JSONB.

use super::{StorageError, traits::StorageBackend};
use crate::models::{
    ActionLogEntry, Architecture, ArchitectureStateUpdate, ArchitectureStatus, Deployment,
    DeploymentStatus, Diagram, Resource, ResourceType, StackAction, UpsertOutcome,
};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use std::str::FromStr;
use uuid::Uuid;

const ARCHITECTURE_COLUMNS: &str = "id, owner_id, name, diagram, version, status, \
     deployed_stack_ref, last_deploy_error, created_at, updated_at";

const DEPLOYMENT_COLUMNS: &str = "id, architecture_id, architecture_version, action, status, \
     resources_created, resources_updated, resources_deleted, started_at, completed_at, error, \
     action_log";

const RESOURCE_COLUMNS: &str = "id, tenant_scope_id, architecture_id, resource_type, provider_id, \
     identifier, name, status, config, created_at, updated_at";

/// PostgreSQL storage backend implementation.
pub struct PostgresStorageBackend {
    pool: PgPool,
}

impl PostgresStorageBackend {
    /// Create a new PostgreSQL storage backend.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect and run the embedded migrations
    pub async fn connect(database_url: &str) -> Result<Self, StorageError> {
        let pool = PgPool::connect(database_url).await.map_err(|e| {
            StorageError::ConnectionError(format!("Failed to connect to database: {}", e))
        })?;
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| StorageError::ConnectionError(format!("Migration failed: {}", e)))?;
        Ok(Self::new(pool))
    }
}

fn parse<T: FromStr<Err = String>>(value: &str) -> Result<T, StorageError> {
    T::from_str(value).map_err(StorageError::Serialization)
}

fn architecture_from_row(row: &PgRow) -> Result<Architecture, StorageError> {
    let diagram: serde_json::Value = row.try_get("diagram")?;
    let status: String = row.try_get("status")?;
    Ok(Architecture {
        id: row.try_get("id")?,
        owner_id: row.try_get("owner_id")?,
        name: row.try_get("name")?,
        diagram: serde_json::from_value::<Diagram>(diagram)?,
        version: row.try_get("version")?,
        status: parse::<ArchitectureStatus>(&status)?,
        deployed_stack_ref: row.try_get("deployed_stack_ref")?,
        last_deploy_error: row.try_get("last_deploy_error")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn deployment_from_row(row: &PgRow) -> Result<Deployment, StorageError> {
    let action: String = row.try_get("action")?;
    let status: String = row.try_get("status")?;
    let action_log: serde_json::Value = row.try_get("action_log")?;
    Ok(Deployment {
        id: row.try_get("id")?,
        architecture_id: row.try_get("architecture_id")?,
        architecture_version: row.try_get("architecture_version")?,
        action: parse::<StackAction>(&action)?,
        status: parse::<DeploymentStatus>(&status)?,
        resources_created: row.try_get("resources_created")?,
        resources_updated: row.try_get("resources_updated")?,
        resources_deleted: row.try_get("resources_deleted")?,
        started_at: row.try_get("started_at")?,
        completed_at: row.try_get("completed_at")?,
        error: row.try_get("error")?,
        action_log: serde_json::from_value::<Vec<ActionLogEntry>>(action_log)?,
    })
}

fn resource_from_row(row: &PgRow) -> Result<Resource, StorageError> {
    let resource_type: String = row.try_get("resource_type")?;
    Ok(Resource {
        id: row.try_get("id")?,
        tenant_scope_id: row.try_get("tenant_scope_id")?,
        architecture_id: row.try_get("architecture_id")?,
        resource_type: ResourceType::from(resource_type),
        provider_id: row.try_get("provider_id")?,
        identifier: row.try_get("identifier")?,
        name: row.try_get("name")?,
        status: row.try_get("status")?,
        config: row.try_get("config")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[async_trait]
impl StorageBackend for PostgresStorageBackend {
    async fn create_architecture(
        &self,
        architecture: Architecture,
    ) -> Result<Architecture, StorageError> {
        let diagram = serde_json::to_value(&architecture.diagram)?;

        sqlx::query(
            r#"
            INSERT INTO architectures (id, owner_id, name, diagram, version, status,
                deployed_stack_ref, last_deploy_error, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(architecture.id)
        .bind(architecture.owner_id)
        .bind(&architecture.name)
        .bind(diagram)
        .bind(architecture.version)
        .bind(architecture.status.as_str())
        .bind(&architecture.deployed_stack_ref)
        .bind(&architecture.last_deploy_error)
        .bind(architecture.created_at)
        .bind(architecture.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(architecture)
    }

    async fn get_architecture(&self, id: Uuid) -> Result<Option<Architecture>, StorageError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM architectures WHERE id = $1",
            ARCHITECTURE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(architecture_from_row).transpose()
    }

    async fn list_architectures(&self, owner_id: Uuid) -> Result<Vec<Architecture>, StorageError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM architectures WHERE owner_id = $1 ORDER BY created_at, id",
            ARCHITECTURE_COLUMNS
        ))
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(architecture_from_row).collect()
    }

    async fn update_architecture_diagram(
        &self,
        id: Uuid,
        diagram: Diagram,
        expected_version: Option<i32>,
    ) -> Result<Architecture, StorageError> {
        let data = serde_json::to_value(&diagram)?;

        let row = sqlx::query(&format!(
            r#"
            UPDATE architectures
            SET diagram = $2, version = version + 1, updated_at = $3
            WHERE id = $1 AND ($4::INTEGER IS NULL OR version = $4)
            RETURNING {}
            "#,
            ARCHITECTURE_COLUMNS
        ))
        .bind(id)
        .bind(data)
        .bind(Utc::now())
        .bind(expected_version)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = row {
            return architecture_from_row(&row);
        }

        // Nothing updated: either missing or stale
        let current_version: Option<i32> =
            sqlx::query_scalar("SELECT version FROM architectures WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        match (current_version, expected_version) {
            (Some(current_version), Some(expected_version)) => Err(StorageError::VersionConflict {
                entity_type: "architecture".to_string(),
                entity_id: id.to_string(),
                expected_version,
                current_version,
            }),
            _ => Err(StorageError::not_found("architecture", id)),
        }
    }

    async fn replace_architecture_layout(
        &self,
        id: Uuid,
        diagram: Diagram,
    ) -> Result<Architecture, StorageError> {
        let data = serde_json::to_value(&diagram)?;

        let row = sqlx::query(&format!(
            "UPDATE architectures SET diagram = $2, updated_at = $3 WHERE id = $1 RETURNING {}",
            ARCHITECTURE_COLUMNS
        ))
        .bind(id)
        .bind(data)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StorageError::not_found("architecture", id))?;

        architecture_from_row(&row)
    }

    async fn update_architecture_state(
        &self,
        id: Uuid,
        update: ArchitectureStateUpdate,
    ) -> Result<Architecture, StorageError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(&format!(
            "SELECT {} FROM architectures WHERE id = $1 FOR UPDATE",
            ARCHITECTURE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| StorageError::not_found("architecture", id))?;

        let mut architecture = architecture_from_row(&row)?;
        update
            .apply(&mut architecture)
            .map_err(|e| StorageError::InvalidTransition(e.to_string()))?;

        sqlx::query(
            r#"
            UPDATE architectures
            SET status = $2, deployed_stack_ref = $3, last_deploy_error = $4, updated_at = $5
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(architecture.status.as_str())
        .bind(&architecture.deployed_stack_ref)
        .bind(&architecture.last_deploy_error)
        .bind(architecture.updated_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(architecture)
    }

    async fn delete_architecture(&self, id: Uuid) -> Result<(), StorageError> {
        let result = sqlx::query("DELETE FROM architectures WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::not_found("architecture", id));
        }
        Ok(())
    }

    async fn create_deployment(&self, deployment: Deployment) -> Result<Deployment, StorageError> {
        let action_log = serde_json::to_value(&deployment.action_log)?;

        sqlx::query(
            r#"
            INSERT INTO deployments (id, architecture_id, architecture_version, action, status,
                resources_created, resources_updated, resources_deleted, started_at,
                completed_at, error, action_log)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(deployment.id)
        .bind(deployment.architecture_id)
        .bind(deployment.architecture_version)
        .bind(deployment.action.as_str())
        .bind(deployment.status.as_str())
        .bind(deployment.resources_created)
        .bind(deployment.resources_updated)
        .bind(deployment.resources_deleted)
        .bind(deployment.started_at)
        .bind(deployment.completed_at)
        .bind(&deployment.error)
        .bind(action_log)
        .execute(&self.pool)
        .await?;

        Ok(deployment)
    }

    async fn get_deployment(
        &self,
        architecture_id: Uuid,
        deployment_id: Uuid,
    ) -> Result<Option<Deployment>, StorageError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM deployments WHERE id = $1 AND architecture_id = $2",
            DEPLOYMENT_COLUMNS
        ))
        .bind(deployment_id)
        .bind(architecture_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(deployment_from_row).transpose()
    }

    async fn list_deployments(
        &self,
        architecture_id: Uuid,
        limit: usize,
    ) -> Result<Vec<Deployment>, StorageError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM deployments WHERE architecture_id = $1 ORDER BY seq DESC LIMIT $2",
            DEPLOYMENT_COLUMNS
        ))
        .bind(architecture_id)
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(deployment_from_row).collect()
    }

    async fn list_in_progress_deployments(&self) -> Result<Vec<Deployment>, StorageError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM deployments WHERE status = $1 ORDER BY seq",
            DEPLOYMENT_COLUMNS
        ))
        .bind(DeploymentStatus::InProgress.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(deployment_from_row).collect()
    }

    async fn save_deployment(&self, deployment: &Deployment) -> Result<(), StorageError> {
        let action_log = serde_json::to_value(&deployment.action_log)?;

        // Only rows still in progress accept writes
        let result = sqlx::query(
            r#"
            UPDATE deployments
            SET action = $2, status = $3, resources_created = $4, resources_updated = $5,
                resources_deleted = $6, completed_at = $7, error = $8, action_log = $9
            WHERE id = $1 AND status = $10
            "#,
        )
        .bind(deployment.id)
        .bind(deployment.action.as_str())
        .bind(deployment.status.as_str())
        .bind(deployment.resources_created)
        .bind(deployment.resources_updated)
        .bind(deployment.resources_deleted)
        .bind(deployment.completed_at)
        .bind(&deployment.error)
        .bind(action_log)
        .bind(DeploymentStatus::InProgress.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() > 0 {
            return Ok(());
        }

        let exists: Option<Uuid> = sqlx::query_scalar("SELECT id FROM deployments WHERE id = $1")
            .bind(deployment.id)
            .fetch_optional(&self.pool)
            .await?;
        match exists {
            Some(_) => Err(StorageError::Finalized {
                deployment_id: deployment.id.to_string(),
            }),
            None => Err(StorageError::not_found("deployment", deployment.id)),
        }
    }

    async fn list_resources(&self, architecture_id: Uuid) -> Result<Vec<Resource>, StorageError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM resources WHERE architecture_id = $1 ORDER BY identifier",
            RESOURCE_COLUMNS
        ))
        .bind(architecture_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(resource_from_row).collect()
    }

    async fn upsert_resource(&self, resource: Resource) -> Result<UpsertOutcome, StorageError> {
        // xmax = 0 only for freshly inserted tuples
        let inserted: bool = sqlx::query_scalar(
            r#"
            INSERT INTO resources (id, tenant_scope_id, architecture_id, resource_type,
                provider_id, identifier, name, status, config, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (tenant_scope_id, identifier) DO UPDATE SET
                architecture_id = EXCLUDED.architecture_id,
                resource_type = EXCLUDED.resource_type,
                provider_id = EXCLUDED.provider_id,
                name = EXCLUDED.name,
                status = EXCLUDED.status,
                config = EXCLUDED.config,
                updated_at = EXCLUDED.updated_at
            RETURNING (xmax = 0)
            "#,
        )
        .bind(resource.id)
        .bind(resource.tenant_scope_id)
        .bind(resource.architecture_id)
        .bind(resource.resource_type.as_str())
        .bind(&resource.provider_id)
        .bind(&resource.identifier)
        .bind(&resource.name)
        .bind(&resource.status)
        .bind(&resource.config)
        .bind(resource.created_at)
        .bind(resource.updated_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(if inserted {
            UpsertOutcome::Created
        } else {
            UpsertOutcome::Updated
        })
    }

    async fn delete_resources(
        &self,
        architecture_id: Uuid,
        identifiers: &[String],
    ) -> Result<u64, StorageError> {
        if identifiers.is_empty() {
            return Ok(0);
        }
        let result = sqlx::query(
            "DELETE FROM resources WHERE architecture_id = $1 AND identifier = ANY($2)",
        )
        .bind(architecture_id)
        .bind(identifiers)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn delete_resources_for_architecture(
        &self,
        architecture_id: Uuid,
    ) -> Result<u64, StorageError> {
        let result = sqlx::query("DELETE FROM resources WHERE architecture_id = $1")
            .bind(architecture_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
