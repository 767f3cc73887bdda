//! In-process provider used when no gateway is configured, and in tests.

use super::{ProviderClient, ProviderError, StackOutcome, StackResource};
use crate::models::{DiagramEdge, DiagramNode, NodeKind};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderOperation {
    StackExists,
    Create,
    Update,
    Delete,
    ListResources,
}

/// Recorded provider call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderCall {
    pub operation: ProviderOperation,
    /// Stack name for creates, stack ref otherwise
    pub target: String,
}

/// Simulated provider keeping stacks in memory.
///
/// Supports injected failures, artificial latency and out-of-band stack
/// removal.
#[derive(Default)]
pub struct SimulatedProvider {
    stacks: Mutex<HashMap<String, Vec<StackResource>>>,
    faults: Mutex<HashMap<ProviderOperation, VecDeque<ProviderError>>>,
    calls: Mutex<Vec<ProviderCall>>,
    latency: Option<Duration>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

/// Native type the simulated provider reports for a node
pub fn native_type_for(node: &DiagramNode) -> String {
    match node.kind {
        NodeKind::ContainerNetwork => return "AWS::EC2::VPC".to_string(),
        NodeKind::ContainerSubnet => return "AWS::EC2::Subnet".to_string(),
        NodeKind::Resource => {}
    }
    let kind = node.attributes.service_kind.to_ascii_lowercase().replace('_', "-");
    let native = match kind.as_str() {
        "alb" | "nlb" | "load-balancer" => "AWS::ElasticLoadBalancingV2::LoadBalancer",
        "elb" => "AWS::ElasticLoadBalancing::LoadBalancer",
        "api-gateway" | "apigateway" => "AWS::ApiGateway::RestApi",
        "cloudfront" | "cdn" => "AWS::CloudFront::Distribution",
        "internet-gateway" | "igw" => "AWS::EC2::InternetGateway",
        "nat-gateway" | "nat" => "AWS::EC2::NatGateway",
        "ec2" | "bastion" => "AWS::EC2::Instance",
        "ecs" | "fargate" => "AWS::ECS::Service",
        "eks" => "AWS::EKS::Cluster",
        "lambda" => "AWS::Lambda::Function",
        "rds" | "aurora" => "AWS::RDS::DBInstance",
        "dynamodb" => "AWS::DynamoDB::Table",
        "elasticache" | "redis" | "memcached" => "AWS::ElastiCache::CacheCluster",
        "s3" => "AWS::S3::Bucket",
        "sqs" => "AWS::SQS::Queue",
        "sns" => "AWS::SNS::Topic",
        _ => return format!("Custom::{}", node.attributes.service_kind),
    };
    native.to_string()
}

impl SimulatedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call sleeps for `latency` before answering
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency: Some(latency),
            ..Self::default()
        }
    }

    /// Fail the next call of `operation` with `error`
    pub async fn fail_next(&self, operation: ProviderOperation, error: ProviderError) {
        self.faults
            .lock()
            .await
            .entry(operation)
            .or_default()
            .push_back(error);
    }

    /// Drop a stack as if it had been deleted outside this service
    pub async fn forget_stack(&self, stack_ref: &str) -> bool {
        self.stacks.lock().await.remove(stack_ref).is_some()
    }

    pub async fn has_stack(&self, stack_ref: &str) -> bool {
        self.stacks.lock().await.contains_key(stack_ref)
    }

    pub async fn stack_count(&self) -> usize {
        self.stacks.lock().await.len()
    }

    pub async fn calls(&self) -> Vec<ProviderCall> {
        self.calls.lock().await.clone()
    }

    /// Highest number of calls observed in flight at once
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    async fn begin(&self, operation: ProviderOperation, target: &str) -> Result<(), ProviderError> {
        self.calls.lock().await.push(ProviderCall {
            operation,
            target: target.to_string(),
        });

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let injected = self
            .faults
            .lock()
            .await
            .get_mut(&operation)
            .and_then(VecDeque::pop_front);
        match injected {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    /// Materialize nodes, reusing physical ids of logical names that survive
    fn materialize(nodes: &[DiagramNode], previous: &[StackResource]) -> Vec<StackResource> {
        let existing: HashMap<&str, &StackResource> = previous
            .iter()
            .map(|r| (r.logical_name.as_str(), r))
            .collect();

        nodes
            .iter()
            .map(|node| {
                let native_id = match existing.get(node.id.as_str()) {
                    Some(resource) => resource.native_id.clone(),
                    None => format!("{}-{}", node.id, &Uuid::new_v4().simple().to_string()[..8]),
                };
                let status = if existing.contains_key(node.id.as_str()) {
                    "UPDATE_COMPLETE"
                } else {
                    "CREATE_COMPLETE"
                };
                StackResource {
                    native_type: native_type_for(node),
                    native_id,
                    logical_name: node.id.clone(),
                    status: status.to_string(),
                }
            })
            .collect()
    }
}

#[async_trait]
impl ProviderClient for SimulatedProvider {
    async fn stack_exists(&self, stack_ref: &str) -> Result<bool, ProviderError> {
        self.begin(ProviderOperation::StackExists, stack_ref).await?;
        Ok(self.stacks.lock().await.contains_key(stack_ref))
    }

    async fn create_stack(
        &self,
        name: &str,
        nodes: &[DiagramNode],
        _edges: &[DiagramEdge],
    ) -> Result<StackOutcome, ProviderError> {
        self.begin(ProviderOperation::Create, name).await?;
        let stack_ref = format!("sim:{}:{}", name, Uuid::new_v4().simple());
        let resources = Self::materialize(nodes, &[]);
        debug!("Simulated stack {} created with {} resources", stack_ref, resources.len());
        self.stacks.lock().await.insert(stack_ref.clone(), resources);
        Ok(StackOutcome { stack_ref })
    }

    async fn update_stack(
        &self,
        stack_ref: &str,
        nodes: &[DiagramNode],
        _edges: &[DiagramEdge],
    ) -> Result<StackOutcome, ProviderError> {
        self.begin(ProviderOperation::Update, stack_ref).await?;
        let mut stacks = self.stacks.lock().await;
        let previous = stacks
            .get(stack_ref)
            .ok_or_else(|| ProviderError::StackNotFound(stack_ref.to_string()))?;
        let resources = Self::materialize(nodes, previous);
        stacks.insert(stack_ref.to_string(), resources);
        Ok(StackOutcome {
            stack_ref: stack_ref.to_string(),
        })
    }

    async fn delete_stack(&self, stack_ref: &str) -> Result<(), ProviderError> {
        self.begin(ProviderOperation::Delete, stack_ref).await?;
        // Deleting a missing stack is a no-op, like the real provider
        self.stacks.lock().await.remove(stack_ref);
        Ok(())
    }

    async fn list_stack_resources(
        &self,
        stack_ref: &str,
    ) -> Result<Vec<StackResource>, ProviderError> {
        self.begin(ProviderOperation::ListResources, stack_ref).await?;
        self.stacks
            .lock()
            .await
            .get(stack_ref)
            .cloned()
            .ok_or_else(|| ProviderError::StackNotFound(stack_ref.to_string()))
    }
}
