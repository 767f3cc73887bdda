//! Cloud provider gateway.
//!
//! The orchestrator talks to the provider only through [`ProviderClient`].
//! Calls are long-running and are the single failure point of a deployment.

pub mod http;
pub mod simulated;

pub use http::HttpProviderClient;
pub use simulated::{ProviderCall, ProviderOperation, SimulatedProvider, native_type_for};

use crate::models::{DiagramEdge, DiagramNode};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Provider call failures. Messages are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    #[error("Stack not found: {0}")]
    StackNotFound(String),
    #[error("{0}")]
    Failed(String),
}

impl ProviderError {
    /// Message as reported by the provider
    pub fn message(&self) -> String {
        match self {
            ProviderError::StackNotFound(stack_ref) => format!("Stack not found: {}", stack_ref),
            ProviderError::Failed(message) => message.clone(),
        }
    }
}

/// Result of a successful create or update
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackOutcome {
    pub stack_ref: String,
}

/// One live resource of a stack as reported by the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackResource {
    /// Provider-native type, e.g. `AWS::EC2::Instance`
    pub native_type: String,
    /// Physical id
    pub native_id: String,
    /// Logical name inside the stack
    pub logical_name: String,
    pub status: String,
}

#[async_trait]
pub trait ProviderClient: Send + Sync {
    async fn stack_exists(&self, stack_ref: &str) -> Result<bool, ProviderError>;

    async fn create_stack(
        &self,
        name: &str,
        nodes: &[DiagramNode],
        edges: &[DiagramEdge],
    ) -> Result<StackOutcome, ProviderError>;

    /// Fails with [`ProviderError::StackNotFound`] when the stack is gone
    async fn update_stack(
        &self,
        stack_ref: &str,
        nodes: &[DiagramNode],
        edges: &[DiagramEdge],
    ) -> Result<StackOutcome, ProviderError>;

    async fn delete_stack(&self, stack_ref: &str) -> Result<(), ProviderError>;

    async fn list_stack_resources(&self, stack_ref: &str)
    -> Result<Vec<StackResource>, ProviderError>;
}
