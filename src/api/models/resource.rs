//! Resource model.
//!
//! One row per live provider resource observed after a successful deployment.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;
use uuid::Uuid;

/// Internal resource type.
///
/// Provider-native types map onto a closed set; anything not in the table is
/// kept as `Unknown` with the native type string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ResourceType {
    Vpc,
    Subnet,
    InternetGateway,
    NatGateway,
    SecurityGroup,
    RouteTable,
    LoadBalancer,
    ApiGateway,
    Cdn,
    ComputeInstance,
    ContainerService,
    Function,
    Database,
    NoSqlTable,
    Cache,
    ObjectStorage,
    Queue,
    Topic,
    Unknown(String),
}

/// Provider-native type -> internal type
fn lookup_native(native_type: &str) -> Option<ResourceType> {
    let internal = match native_type {
        "AWS::EC2::VPC" => ResourceType::Vpc,
        "AWS::EC2::Subnet" => ResourceType::Subnet,
        "AWS::EC2::InternetGateway" => ResourceType::InternetGateway,
        "AWS::EC2::NatGateway" => ResourceType::NatGateway,
        "AWS::EC2::SecurityGroup" => ResourceType::SecurityGroup,
        "AWS::EC2::RouteTable" => ResourceType::RouteTable,
        "AWS::ElasticLoadBalancingV2::LoadBalancer" | "AWS::ElasticLoadBalancing::LoadBalancer" => {
            ResourceType::LoadBalancer
        }
        "AWS::ApiGateway::RestApi" | "AWS::ApiGatewayV2::Api" => ResourceType::ApiGateway,
        "AWS::CloudFront::Distribution" => ResourceType::Cdn,
        "AWS::EC2::Instance" | "AWS::AutoScaling::AutoScalingGroup" => {
            ResourceType::ComputeInstance
        }
        "AWS::ECS::Service" | "AWS::EKS::Cluster" => ResourceType::ContainerService,
        "AWS::Lambda::Function" => ResourceType::Function,
        "AWS::RDS::DBInstance" | "AWS::RDS::DBCluster" => ResourceType::Database,
        "AWS::DynamoDB::Table" => ResourceType::NoSqlTable,
        "AWS::ElastiCache::CacheCluster" | "AWS::ElastiCache::ReplicationGroup" => {
            ResourceType::Cache
        }
        "AWS::S3::Bucket" => ResourceType::ObjectStorage,
        "AWS::SQS::Queue" => ResourceType::Queue,
        "AWS::SNS::Topic" => ResourceType::Topic,
        _ => return None,
    };
    Some(internal)
}

impl ResourceType {
    /// Map a provider-native type. Unknown types pass through, never dropped.
    pub fn from_native(native_type: &str) -> Self {
        lookup_native(native_type)
            .unwrap_or_else(|| ResourceType::Unknown(native_type.to_string()))
    }

    pub fn as_str(&self) -> &str {
        match self {
            ResourceType::Vpc => "vpc",
            ResourceType::Subnet => "subnet",
            ResourceType::InternetGateway => "internet_gateway",
            ResourceType::NatGateway => "nat_gateway",
            ResourceType::SecurityGroup => "security_group",
            ResourceType::RouteTable => "route_table",
            ResourceType::LoadBalancer => "load_balancer",
            ResourceType::ApiGateway => "api_gateway",
            ResourceType::Cdn => "cdn",
            ResourceType::ComputeInstance => "compute_instance",
            ResourceType::ContainerService => "container_service",
            ResourceType::Function => "function",
            ResourceType::Database => "database",
            ResourceType::NoSqlTable => "nosql_table",
            ResourceType::Cache => "cache",
            ResourceType::ObjectStorage => "object_storage",
            ResourceType::Queue => "queue",
            ResourceType::Topic => "topic",
            ResourceType::Unknown(native) => native.as_str(),
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, ResourceType::Unknown(_))
    }
}

impl From<String> for ResourceType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "vpc" => ResourceType::Vpc,
            "subnet" => ResourceType::Subnet,
            "internet_gateway" => ResourceType::InternetGateway,
            "nat_gateway" => ResourceType::NatGateway,
            "security_group" => ResourceType::SecurityGroup,
            "route_table" => ResourceType::RouteTable,
            "load_balancer" => ResourceType::LoadBalancer,
            "api_gateway" => ResourceType::ApiGateway,
            "cdn" => ResourceType::Cdn,
            "compute_instance" => ResourceType::ComputeInstance,
            "container_service" => ResourceType::ContainerService,
            "function" => ResourceType::Function,
            "database" => ResourceType::Database,
            "nosql_table" => ResourceType::NoSqlTable,
            "cache" => ResourceType::Cache,
            "object_storage" => ResourceType::ObjectStorage,
            "queue" => ResourceType::Queue,
            "topic" => ResourceType::Topic,
            _ => ResourceType::Unknown(value),
        }
    }
}

impl From<ResourceType> for String {
    fn from(value: ResourceType) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resource model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    pub id: Uuid,
    /// Tenant scope (architecture owner)
    pub tenant_scope_id: Uuid,
    pub architecture_id: Uuid,
    #[serde(rename = "type")]
    #[schema(value_type = String)]
    pub resource_type: ResourceType,
    /// Provider physical id
    pub provider_id: String,
    /// Stable arn-like key, `<stackRef>/<logicalName>`
    pub identifier: String,
    /// Logical name within the stack
    pub name: String,
    pub status: String,
    pub config: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Resource {
    /// Stable identifier of a stack resource
    pub fn stable_identifier(stack_ref: &str, logical_name: &str) -> String {
        format!("{}/{}", stack_ref, logical_name)
    }
}

/// Result of a resource upsert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Created,
    Updated,
}
