//! HttpProviderClient tests against a local gateway served by axum.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use cloud_topology_api::models::DiagramNode;
use cloud_topology_api::provider::{
    HttpProviderClient, ProviderClient, ProviderError, StackOutcome, StackResource,
    native_type_for,
};
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

const ARN: &str = "arn:aws:cloudformation:us-east-1:123456789012:stack/topology-abc/0f1e";

#[derive(Default)]
struct GatewayState {
    stacks: HashMap<String, Vec<StackResource>>,
    /// Stack refs as decoded by the gateway, per request
    seen_refs: Vec<String>,
    authorization: Vec<String>,
}

type Gateway = Arc<Mutex<GatewayState>>;

#[derive(Deserialize)]
struct StackBody {
    #[serde(default)]
    name: Option<String>,
    nodes: Vec<DiagramNode>,
}

fn not_found(stack_ref: &str) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({"message": format!("Stack {} does not exist", stack_ref)})),
    )
        .into_response()
}

fn resources_for(nodes: &[DiagramNode]) -> Vec<StackResource> {
    nodes
        .iter()
        .map(|node| StackResource {
            native_type: native_type_for(node),
            native_id: format!("{}-0001", node.id),
            logical_name: node.id.clone(),
            status: "CREATE_COMPLETE".to_string(),
        })
        .collect()
}

async fn record(gateway: &Gateway, headers: &HeaderMap, stack_ref: Option<&str>) {
    let mut state = gateway.lock().await;
    if let Some(value) = headers.get("authorization").and_then(|v| v.to_str().ok()) {
        state.authorization.push(value.to_string());
    }
    if let Some(stack_ref) = stack_ref {
        state.seen_refs.push(stack_ref.to_string());
    }
}

async fn describe_stack(
    State(gateway): State<Gateway>,
    headers: HeaderMap,
    Path(stack_ref): Path<String>,
) -> Response {
    record(&gateway, &headers, Some(&stack_ref)).await;
    if gateway.lock().await.stacks.contains_key(&stack_ref) {
        Json(json!({"stackRef": stack_ref})).into_response()
    } else {
        not_found(&stack_ref)
    }
}

async fn create_stack(
    State(gateway): State<Gateway>,
    headers: HeaderMap,
    Json(body): Json<StackBody>,
) -> Response {
    record(&gateway, &headers, None).await;
    let name = body.name.unwrap_or_default();
    if name == "broken" {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"message": "Template format error: unsupported resource"})),
        )
            .into_response();
    }
    let stack_ref = format!(
        "arn:aws:cloudformation:us-east-1:123456789012:stack/{}/0f1e",
        name
    );
    gateway
        .lock()
        .await
        .stacks
        .insert(stack_ref.clone(), resources_for(&body.nodes));
    Json(StackOutcome { stack_ref }).into_response()
}

async fn update_stack(
    State(gateway): State<Gateway>,
    headers: HeaderMap,
    Path(stack_ref): Path<String>,
    Json(body): Json<StackBody>,
) -> Response {
    record(&gateway, &headers, Some(&stack_ref)).await;
    let mut state = gateway.lock().await;
    match state.stacks.get_mut(&stack_ref) {
        Some(resources) => {
            *resources = resources_for(&body.nodes);
            Json(StackOutcome { stack_ref }).into_response()
        }
        None => not_found(&stack_ref),
    }
}

async fn delete_stack(
    State(gateway): State<Gateway>,
    headers: HeaderMap,
    Path(stack_ref): Path<String>,
) -> Response {
    record(&gateway, &headers, Some(&stack_ref)).await;
    match gateway.lock().await.stacks.remove(&stack_ref) {
        Some(_) => StatusCode::NO_CONTENT.into_response(),
        None => not_found(&stack_ref),
    }
}

async fn list_resources(
    State(gateway): State<Gateway>,
    headers: HeaderMap,
    Path(stack_ref): Path<String>,
) -> Response {
    record(&gateway, &headers, Some(&stack_ref)).await;
    match gateway.lock().await.stacks.get(&stack_ref) {
        Some(resources) => Json(json!({"resources": resources})).into_response(),
        None => not_found(&stack_ref),
    }
}

/// Serve a fake gateway on an ephemeral port and return its base URL
async fn start_gateway(gateway: Gateway) -> String {
    let router = Router::new()
        .route("/stacks", post(create_stack))
        .route(
            "/stacks/{stack_ref}",
            get(describe_stack).put(update_stack).delete(delete_stack),
        )
        .route("/stacks/{stack_ref}/resources", get(list_resources))
        .with_state(gateway);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}/", addr)
}

async fn client_with_stack(stacks: &[&str]) -> (HttpProviderClient, Gateway) {
    let gateway = Gateway::default();
    {
        let mut state = gateway.lock().await;
        for stack_ref in stacks {
            state.stacks.insert(stack_ref.to_string(), Vec::new());
        }
    }
    let base_url = start_gateway(gateway.clone()).await;
    let client = HttpProviderClient::new(
        &base_url,
        Some("gateway-token".to_string()),
        Duration::from_secs(5),
    )
    .unwrap();
    (client, gateway)
}

fn nodes() -> Vec<DiagramNode> {
    vec![
        DiagramNode::resource("web", "ec2", None),
        DiagramNode::resource("db", "rds", None),
    ]
}

#[tokio::test]
async fn test_arn_stack_ref_is_sent_as_one_path_segment() {
    let (client, gateway) = client_with_stack(&[ARN]).await;

    assert_eq!(client.stack_exists(ARN).await, Ok(true));
    assert_eq!(client.stack_exists("topology-missing").await, Ok(false));

    let state = gateway.lock().await;
    assert_eq!(state.seen_refs, vec![ARN.to_string(), "topology-missing".to_string()]);
    assert!(state.authorization.iter().all(|h| h == "Bearer gateway-token"));
}

#[tokio::test]
async fn test_create_update_and_list_resources() {
    let (client, gateway) = client_with_stack(&[]).await;

    let created = client
        .create_stack("topology-abc", &nodes(), &[])
        .await
        .unwrap();
    assert_eq!(created.stack_ref, ARN);

    let mut grown = nodes();
    grown.push(DiagramNode::resource("cache", "redis", None));
    let updated = client.update_stack(ARN, &grown, &[]).await.unwrap();
    assert_eq!(updated.stack_ref, ARN);

    let resources = client.list_stack_resources(ARN).await.unwrap();
    assert_eq!(resources.len(), 3);
    assert_eq!(resources[2].logical_name, "cache");
    assert_eq!(resources[2].native_type, "AWS::ElastiCache::CacheCluster");
    assert_eq!(gateway.lock().await.stacks.len(), 1);
}

#[tokio::test]
async fn test_missing_stack_maps_to_stack_not_found() {
    let (client, _gateway) = client_with_stack(&[]).await;

    assert_eq!(
        client.update_stack(ARN, &nodes(), &[]).await,
        Err(ProviderError::StackNotFound(ARN.to_string()))
    );
    assert_eq!(
        client.delete_stack(ARN).await,
        Err(ProviderError::StackNotFound(ARN.to_string()))
    );
    assert_eq!(
        client.list_stack_resources(ARN).await,
        Err(ProviderError::StackNotFound(ARN.to_string()))
    );
}

#[tokio::test]
async fn test_delete_removes_stack() {
    let (client, gateway) = client_with_stack(&[ARN]).await;

    client.delete_stack(ARN).await.unwrap();

    assert!(gateway.lock().await.stacks.is_empty());
    assert_eq!(client.stack_exists(ARN).await, Ok(false));
}

#[tokio::test]
async fn test_gateway_error_message_is_kept_verbatim() {
    let (client, _gateway) = client_with_stack(&[]).await;

    let result = client.create_stack("broken", &nodes(), &[]).await;

    assert_eq!(
        result,
        Err(ProviderError::Failed(
            "Template format error: unsupported resource".to_string()
        ))
    );
}

#[tokio::test]
async fn test_unreachable_gateway_is_a_failure() {
    // Nothing listens on the discard port
    let client =
        HttpProviderClient::new("http://127.0.0.1:9", None, Duration::from_secs(2)).unwrap();

    let result = client.stack_exists(ARN).await;

    assert!(matches!(result, Err(ProviderError::Failed(_))));
}
