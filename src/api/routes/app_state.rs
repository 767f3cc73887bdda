//! Application state management.
//!
//! Holds the storage backend and the services built on top of it.

use crate::provider::{ProviderClient, SimulatedProvider};
use crate::services::{ArchitectureService, DeploymentOrchestrator, DeploymentSettings, JwtService};
use crate::storage::{InMemoryStorageBackend, StorageBackend};
use std::sync::Arc;

/// Application state shared across all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<dyn StorageBackend>,
    pub architectures: Arc<ArchitectureService>,
    pub orchestrator: Arc<DeploymentOrchestrator>,
    pub jwt: Arc<JwtService>,
}

impl AppState {
    pub fn new(
        storage: Arc<dyn StorageBackend>,
        provider: Arc<dyn ProviderClient>,
        settings: DeploymentSettings,
        jwt: JwtService,
    ) -> Self {
        let architectures = ArchitectureService::new(storage.clone(), settings.layout.clone());
        let orchestrator = DeploymentOrchestrator::new(storage.clone(), provider, settings);
        Self {
            storage,
            architectures: Arc::new(architectures),
            orchestrator: Arc::new(orchestrator),
            jwt: Arc::new(jwt),
        }
    }

    /// In-memory storage with a simulated provider
    pub fn in_memory(jwt_secret: &str, provider: Arc<SimulatedProvider>) -> Self {
        Self::new(
            Arc::new(InMemoryStorageBackend::new()),
            provider,
            DeploymentSettings::default(),
            JwtService::new(jwt_secret),
        )
    }
}
