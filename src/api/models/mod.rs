// Models module - contains the diagram, Architecture, Deployment and Resource types

pub mod architecture;
pub mod deployment;
pub mod diagram;
pub mod resource;

pub use architecture::{
    Architecture, ArchitectureStateUpdate, ArchitectureStatus, CreateArchitectureRequest,
    FieldUpdate, LifecycleEvent, UpdateArchitectureRequest,
};
pub use deployment::{
    ActionLogEntry, Deployment, DeploymentStatus, DeploymentTicket, StackAction,
};
pub use diagram::{
    Diagram, DiagramEdge, DiagramNode, NodeAttributes, NodeKind, Position, Size, SubnetRole,
};
pub use resource::{Resource, ResourceType, UpsertOutcome};
