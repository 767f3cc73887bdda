//! Diagram model.
//!
//! Nodes, edges and containment shared by the layout engine and the
//! deployment orchestrator. Field names follow the canvas JSON (camelCase).

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Current diagram schema version
pub const DIAGRAM_SCHEMA_VERSION: u32 = 1;

/// Kind of diagram node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum NodeKind {
    /// Virtual network enclosure
    ContainerNetwork,
    /// Subnet enclosure
    ContainerSubnet,
    /// Leaf resource (compute, database, gateway, ...)
    Resource,
}

impl NodeKind {
    /// Whether this kind may enclose other nodes
    pub fn is_container(&self) -> bool {
        matches!(self, NodeKind::ContainerNetwork | NodeKind::ContainerSubnet)
    }
}

/// Role of a subnet container, used to split container rows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SubnetRole {
    Public,
    Private,
}

/// Top-left coordinate, relative to the parent container
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, ToSchema)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Node dimensions. Zero or negative values mean "not set".
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, ToSchema)]
pub struct Size {
    #[serde(default)]
    pub width: f64,
    #[serde(default)]
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Replace unset dimensions with the given defaults
    pub fn or_default(&self, default: Size) -> Size {
        let pick = |value: f64, fallback: f64| {
            if value.is_finite() && value > 0.0 {
                value
            } else {
                fallback
            }
        };
        Size {
            width: pick(self.width, default.width),
            height: pick(self.height, default.height),
        }
    }
}

/// Descriptive attributes of a node
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NodeAttributes {
    /// External resource type, e.g. "ec2", "rds", "alb"
    #[serde(default)]
    pub service_kind: String,
    #[serde(default)]
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sublabel: Option<String>,
    /// Explicit tier, overrides the tier derived from `service_kind`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tier_hint: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subnet_role: Option<SubnetRole>,
}

/// A node of the topology diagram
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DiagramNode {
    pub id: String,
    pub kind: NodeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub position: Position,
    #[serde(default)]
    pub size: Size,
    #[serde(default)]
    pub attributes: NodeAttributes,
}

impl DiagramNode {
    /// Create a resource leaf
    pub fn resource(id: &str, service_kind: &str, parent_id: Option<&str>) -> Self {
        Self {
            id: id.to_string(),
            kind: NodeKind::Resource,
            parent_id: parent_id.map(str::to_string),
            position: Position::default(),
            size: Size::default(),
            attributes: NodeAttributes {
                service_kind: service_kind.to_string(),
                label: id.to_string(),
                ..Default::default()
            },
        }
    }

    /// Create a container node
    pub fn container(id: &str, kind: NodeKind, parent_id: Option<&str>) -> Self {
        Self {
            id: id.to_string(),
            kind,
            parent_id: parent_id.map(str::to_string),
            position: Position::default(),
            size: Size::default(),
            attributes: NodeAttributes {
                label: id.to_string(),
                ..Default::default()
            },
        }
    }

    /// Builder-style subnet role
    pub fn with_role(mut self, role: SubnetRole) -> Self {
        self.attributes.subnet_role = Some(role);
        self
    }

    /// Builder-style position
    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.position = Position::new(x, y);
        self
    }

    /// Builder-style size
    pub fn sized(mut self, width: f64, height: f64) -> Self {
        self.size = Size::new(width, height);
        self
    }

    pub fn is_container(&self) -> bool {
        self.kind.is_container()
    }
}

/// A directed dependency / traffic edge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DiagramEdge {
    pub id: String,
    pub source_node_id: String,
    pub target_node_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl DiagramEdge {
    pub fn new(id: &str, source: &str, target: &str) -> Self {
        Self {
            id: id.to_string(),
            source_node_id: source.to_string(),
            target_node_id: target.to_string(),
            label: None,
        }
    }
}

fn default_schema_version() -> u32 {
    DIAGRAM_SCHEMA_VERSION
}

/// Versioned set of nodes and edges
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Diagram {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    #[serde(default)]
    pub nodes: Vec<DiagramNode>,
    #[serde(default)]
    pub edges: Vec<DiagramEdge>,
}

impl Default for Diagram {
    fn default() -> Self {
        Self::new(Vec::new(), Vec::new())
    }
}

impl Diagram {
    pub fn new(nodes: Vec<DiagramNode>, edges: Vec<DiagramEdge>) -> Self {
        Self {
            schema_version: DIAGRAM_SCHEMA_VERSION,
            nodes,
            edges,
        }
    }

    /// Number of deployable resource nodes
    pub fn resource_count(&self) -> usize {
        self.nodes
            .iter()
            .filter(|node| node.kind == NodeKind::Resource)
            .count()
    }
}
