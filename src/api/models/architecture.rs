//! Architecture aggregate.
//!
//! Owns a diagram and tracks the lifecycle of the provider stack built from it.

use super::diagram::Diagram;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

/// Lifecycle status of an architecture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ArchitectureStatus {
    Draft,
    Deploying,
    Deployed,
    Failed,
}

/// Events that drive the architecture state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// A deploy was requested or a deploy job started running
    DeployRequested,
    /// A teardown was requested or a teardown job started running
    TearDownRequested,
    DeploySucceeded,
    TearDownSucceeded,
    OperationFailed,
}

/// Rejected state transition
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid transition from {from} on {event:?}")]
pub struct InvalidTransition {
    pub from: ArchitectureStatus,
    pub event: LifecycleEvent,
}

impl ArchitectureStatus {
    /// Apply a lifecycle event.
    ///
    /// Requests are accepted from any state (concurrent requests are queued,
    /// not rejected) and always land in `Deploying`. Outcomes are only
    /// accepted while `Deploying`.
    pub fn apply(self, event: LifecycleEvent) -> Result<ArchitectureStatus, InvalidTransition> {
        use ArchitectureStatus::*;
        use LifecycleEvent::*;

        match (self, event) {
            (_, DeployRequested) | (_, TearDownRequested) => Ok(Deploying),
            (Deploying, DeploySucceeded) => Ok(Deployed),
            (Deploying, TearDownSucceeded) => Ok(Draft),
            (Deploying, OperationFailed) => Ok(Failed),
            (from, event) => Err(InvalidTransition { from, event }),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ArchitectureStatus::Draft => "draft",
            ArchitectureStatus::Deploying => "deploying",
            ArchitectureStatus::Deployed => "deployed",
            ArchitectureStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for ArchitectureStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ArchitectureStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(ArchitectureStatus::Draft),
            "deploying" => Ok(ArchitectureStatus::Deploying),
            "deployed" => Ok(ArchitectureStatus::Deployed),
            "failed" => Ok(ArchitectureStatus::Failed),
            other => Err(format!("Unknown architecture status: {}", other)),
        }
    }
}

/// Architecture model
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Architecture {
    pub id: Uuid,
    /// Principal that owns the architecture (tenant scope for resources)
    pub owner_id: Uuid,
    pub name: String,
    pub diagram: Diagram,
    /// Incremented whenever nodes or edges change
    pub version: i32,
    pub status: ArchitectureStatus,
    /// Live provider stack, set after a successful create
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deployed_stack_ref: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_deploy_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Architecture {
    /// Create a new draft architecture
    pub fn new(owner_id: Uuid, name: String, diagram: Diagram) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            owner_id,
            name,
            diagram,
            version: 1,
            status: ArchitectureStatus::Draft,
            deployed_stack_ref: None,
            last_deploy_error: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.owner_id == user_id
    }
}

/// Tri-state field update for scoped writes
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FieldUpdate<T> {
    #[default]
    Keep,
    Set(T),
    Clear,
}

impl<T: Clone> FieldUpdate<T> {
    /// Apply to an optional field
    pub fn apply_to(&self, field: &mut Option<T>) {
        match self {
            FieldUpdate::Keep => {}
            FieldUpdate::Set(value) => *field = Some(value.clone()),
            FieldUpdate::Clear => *field = None,
        }
    }
}

/// Scoped update of the deployment-related architecture fields.
///
/// The status only moves through a [`LifecycleEvent`], so every write goes
/// through the state machine.
#[derive(Debug, Clone, Default)]
pub struct ArchitectureStateUpdate {
    pub event: Option<LifecycleEvent>,
    pub deployed_stack_ref: FieldUpdate<String>,
    pub last_deploy_error: FieldUpdate<String>,
}

impl ArchitectureStateUpdate {
    pub fn event(event: LifecycleEvent) -> Self {
        Self {
            event: Some(event),
            ..Default::default()
        }
    }

    pub fn with_stack_ref(mut self, update: FieldUpdate<String>) -> Self {
        self.deployed_stack_ref = update;
        self
    }

    pub fn with_error(mut self, update: FieldUpdate<String>) -> Self {
        self.last_deploy_error = update;
        self
    }

    /// Apply to an in-memory architecture. Nothing changes on a rejected transition.
    pub fn apply(&self, architecture: &mut Architecture) -> Result<(), InvalidTransition> {
        if let Some(event) = self.event {
            architecture.status = architecture.status.apply(event)?;
        }
        self.deployed_stack_ref
            .apply_to(&mut architecture.deployed_stack_ref);
        self.last_deploy_error
            .apply_to(&mut architecture.last_deploy_error);
        architecture.updated_at = Utc::now();
        Ok(())
    }
}

/// Request to create an architecture
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateArchitectureRequest {
    pub name: String,
    #[serde(default)]
    pub diagram: Diagram,
}

/// Request to replace an architecture's diagram
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateArchitectureRequest {
    pub diagram: Diagram,
    /// Expected version for optimistic locking
    pub expected_version: Option<i32>,
}
