//! Unit tests for native type mapping and tier classification.

use cloud_topology_api::layout::{Tier, is_entry_point};
use cloud_topology_api::models::{DiagramNode, NodeKind, Resource, ResourceType};
use cloud_topology_api::provider::native_type_for;

#[test]
fn test_known_native_types_map_to_internal_types() {
    let cases = [
        ("AWS::EC2::VPC", ResourceType::Vpc),
        ("AWS::EC2::Subnet", ResourceType::Subnet),
        ("AWS::EC2::Instance", ResourceType::ComputeInstance),
        ("AWS::RDS::DBInstance", ResourceType::Database),
        ("AWS::RDS::DBCluster", ResourceType::Database),
        ("AWS::ElasticLoadBalancingV2::LoadBalancer", ResourceType::LoadBalancer),
        ("AWS::ElastiCache::CacheCluster", ResourceType::Cache),
        ("AWS::S3::Bucket", ResourceType::ObjectStorage),
        ("AWS::Lambda::Function", ResourceType::Function),
    ];

    for (native, expected) in cases {
        assert_eq!(ResourceType::from_native(native), expected, "{}", native);
    }
}

#[test]
fn test_unknown_native_type_passes_through() {
    let resource_type = ResourceType::from_native("AWS::Kinesis::Stream");

    assert_eq!(
        resource_type,
        ResourceType::Unknown("AWS::Kinesis::Stream".to_string())
    );
    assert!(!resource_type.is_known());
    assert_eq!(resource_type.to_string(), "AWS::Kinesis::Stream");
}

#[test]
fn test_resource_type_serializes_as_string() {
    assert_eq!(
        serde_json::to_value(ResourceType::NatGateway).unwrap(),
        serde_json::json!("nat_gateway")
    );
    let parsed: ResourceType = serde_json::from_value(serde_json::json!("database")).unwrap();
    assert_eq!(parsed, ResourceType::Database);
    let passthrough: ResourceType =
        serde_json::from_value(serde_json::json!("Custom::Thing")).unwrap();
    assert_eq!(passthrough, ResourceType::Unknown("Custom::Thing".to_string()));
}

#[test]
fn test_stable_identifier_is_deterministic() {
    let a = Resource::stable_identifier("sim:topology-1:abc", "web");
    let b = Resource::stable_identifier("sim:topology-1:abc", "web");

    assert_eq!(a, b);
    assert_eq!(a, "sim:topology-1:abc/web");
    assert_ne!(a, Resource::stable_identifier("sim:topology-1:def", "web"));
}

#[test]
fn test_simulated_native_types_are_mapped() {
    let nodes = [
        DiagramNode::container("vpc", NodeKind::ContainerNetwork, None),
        DiagramNode::container("subnet", NodeKind::ContainerSubnet, Some("vpc")),
        DiagramNode::resource("lb", "alb", Some("subnet")),
        DiagramNode::resource("web", "ec2", Some("subnet")),
        DiagramNode::resource("db", "rds", Some("subnet")),
        DiagramNode::resource("cache", "redis", Some("subnet")),
    ];

    for node in &nodes {
        let native = native_type_for(node);
        assert!(
            ResourceType::from_native(&native).is_known(),
            "{} -> {} is unmapped",
            node.id,
            native
        );
    }
}

#[test]
fn test_unknown_service_kind_becomes_custom_type() {
    let node = DiagramNode::resource("thing", "quantum-widget", None);

    assert_eq!(native_type_for(&node), "Custom::quantum-widget");
}

#[test]
fn test_service_kind_tiers() {
    assert_eq!(Tier::for_service_kind("alb"), Tier::Edge);
    assert_eq!(Tier::for_service_kind("AWS_NAT_Gateway"), Tier::Edge);
    assert_eq!(Tier::for_service_kind("ec2"), Tier::Compute);
    assert_eq!(Tier::for_service_kind("something-new"), Tier::Compute);
    assert_eq!(Tier::for_service_kind("ElastiCache"), Tier::Cache);
    assert_eq!(Tier::for_service_kind("amazon-rds"), Tier::Data);
}

#[test]
fn test_tier_hint_clamps_to_data() {
    assert_eq!(Tier::from_hint(0), Tier::Edge);
    assert_eq!(Tier::from_hint(2), Tier::Cache);
    assert_eq!(Tier::from_hint(9), Tier::Data);
    assert!(Tier::Edge.rank() < Tier::Data.rank());
}

#[test]
fn test_entry_points() {
    assert!(is_entry_point("alb"));
    assert!(is_entry_point("API Gateway"));
    assert!(!is_entry_point("nat-gateway"));
    assert!(!is_entry_point("ec2"));
}
