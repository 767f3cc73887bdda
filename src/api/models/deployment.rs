//! Deployment model.
//!
//! One row per deploy / teardown attempt. Rows are append-only per
//! architecture and immutable once they reach a terminal status.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentStatus {
    InProgress,
    Completed,
    Failed,
}

impl DeploymentStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, DeploymentStatus::InProgress)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DeploymentStatus::InProgress => "in_progress",
            DeploymentStatus::Completed => "completed",
            DeploymentStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for DeploymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeploymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in_progress" => Ok(DeploymentStatus::InProgress),
            "completed" => Ok(DeploymentStatus::Completed),
            "failed" => Ok(DeploymentStatus::Failed),
            other => Err(format!("Unknown deployment status: {}", other)),
        }
    }
}

/// Stack operation performed by a deployment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum StackAction {
    Create,
    Update,
    Delete,
}

impl StackAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            StackAction::Create => "create",
            StackAction::Update => "update",
            StackAction::Delete => "delete",
        }
    }
}

impl fmt::Display for StackAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StackAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create" => Ok(StackAction::Create),
            "update" => Ok(StackAction::Update),
            "delete" => Ok(StackAction::Delete),
            other => Err(format!("Unknown stack action: {}", other)),
        }
    }
}

/// Timestamped action log line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ActionLogEntry {
    pub at: DateTime<Utc>,
    pub message: String,
}

/// Attempted write to a finalized deployment
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Deployment {0} is already finalized")]
pub struct AlreadyFinalized(pub Uuid);

/// Deployment model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Deployment {
    pub id: Uuid,
    pub architecture_id: Uuid,
    /// Architecture version the deployment was started from
    pub architecture_version: i32,
    pub action: StackAction,
    pub status: DeploymentStatus,
    pub resources_created: i32,
    pub resources_updated: i32,
    pub resources_deleted: i32,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    /// Provider error message, verbatim
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub action_log: Vec<ActionLogEntry>,
}

impl Deployment {
    /// Start a new in-progress deployment
    pub fn start(architecture_id: Uuid, architecture_version: i32, action: StackAction) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            architecture_id,
            architecture_version,
            action,
            status: DeploymentStatus::InProgress,
            resources_created: 0,
            resources_updated: 0,
            resources_deleted: 0,
            started_at: now,
            completed_at: None,
            error: None,
            action_log: vec![ActionLogEntry {
                at: now,
                message: format!("Queued {} of architecture version {}", action, architecture_version),
            }],
        }
    }

    pub fn log(&mut self, message: impl Into<String>) {
        self.action_log.push(ActionLogEntry {
            at: Utc::now(),
            message: message.into(),
        });
    }

    /// Mark completed. `completed_at` is only ever set here or in `fail`.
    pub fn complete(&mut self) -> Result<(), AlreadyFinalized> {
        self.finalize(DeploymentStatus::Completed, None)
    }

    /// Mark failed with the error retained verbatim
    pub fn fail(&mut self, error: impl Into<String>) -> Result<(), AlreadyFinalized> {
        self.finalize(DeploymentStatus::Failed, Some(error.into()))
    }

    fn finalize(
        &mut self,
        status: DeploymentStatus,
        error: Option<String>,
    ) -> Result<(), AlreadyFinalized> {
        if self.status.is_terminal() {
            return Err(AlreadyFinalized(self.id));
        }
        let now = Utc::now();
        self.status = status;
        self.completed_at = Some(now);
        self.action_log.push(ActionLogEntry {
            at: now,
            message: match &error {
                Some(e) => format!("Failed: {}", e),
                None => "Completed".to_string(),
            },
        });
        self.error = error;
        Ok(())
    }
}

/// Immediate response of deploy / teardown calls
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentTicket {
    pub deployment_id: Uuid,
    pub status: DeploymentStatus,
}
