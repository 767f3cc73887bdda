//! Automatic diagram layout.
//!
//! Pure functions only: no I/O beyond optional config loading, no shared state.

pub mod config;
pub mod engine;
pub mod tiers;

pub use config::LayoutConfig;
pub use engine::compute_layout;
pub use tiers::{Tier, is_entry_point};

use crate::graph::TopologyError;
use crate::models::Diagram;

/// Layout failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LayoutError {
    #[error("Invalid diagram: {0}")]
    InvalidDiagram(#[from] TopologyError),
}

/// Lay out a whole diagram, keeping its edges and schema version
pub fn layout_diagram(diagram: &Diagram, config: &LayoutConfig) -> Result<Diagram, LayoutError> {
    let nodes = compute_layout(&diagram.nodes, &diagram.edges, config)?;
    Ok(Diagram {
        schema_version: diagram.schema_version,
        nodes,
        edges: diagram.edges.clone(),
    })
}
