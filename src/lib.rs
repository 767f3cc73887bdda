// Containment tree validation and deployment ordering
pub mod graph;

// Automatic diagram layout
pub mod layout;

// Cloud provider gateway
pub mod provider;

// API module for Rust backend
pub mod api;

// Re-export api modules at crate root (so routes can use crate::services, crate::models)
pub use api::config;
pub use api::middleware;
pub use api::models;
pub use api::routes;
pub use api::services;
pub use api::storage;
