//! HTTP endpoint tests.
//!
//! Covers the routes the canvas frontend calls:
//! - GET/POST /architectures, GET/PUT/DELETE /architectures/{id}
//! - POST /layout, POST /architectures/{id}/layout
//! - POST /architectures/{id}/deploy and /teardown
//! - GET /architectures/{id}/deployments[/{deployment_id}]

use axum::http::StatusCode;
use axum_test::TestServer;
use cloud_topology_api::provider::SimulatedProvider;
use cloud_topology_api::routes::{AppState, create_api_router};
use serde_json::{Value, json};
use std::sync::Arc;

const SECRET: &str = "test-secret-that-is-long-enough-for-hs256";

fn create_test_server() -> (TestServer, AppState) {
    let state = AppState::in_memory(SECRET, Arc::new(SimulatedProvider::new()));
    let router = create_api_router(state.clone()).with_state(state.clone());
    (TestServer::new(router).unwrap(), state)
}

fn token_for(state: &AppState, subject: &str) -> String {
    state
        .jwt
        .issue_access_token(subject, Some(&format!("{}@example.com", subject)))
        .unwrap()
}

fn web_diagram() -> Value {
    json!({
        "nodes": [
            {"id": "vpc", "kind": "container-network"},
            {"id": "subnet", "kind": "container-subnet", "parentId": "vpc"},
            {"id": "web", "kind": "resource", "parentId": "subnet", "attributes": {"serviceKind": "ec2"}},
            {"id": "db", "kind": "resource", "parentId": "subnet", "attributes": {"serviceKind": "rds"}}
        ],
        "edges": [
            {"id": "e1", "sourceNodeId": "web", "targetNodeId": "db"}
        ]
    })
}

async fn create_architecture(server: &TestServer, token: &str, diagram: Value) -> Value {
    let response = server
        .post("/architectures")
        .authorization_bearer(token)
        .json(&json!({"name": "demo", "diagram": diagram}))
        .await;
    assert_eq!(response.status_code(), StatusCode::CREATED);
    response.json()
}

#[tokio::test]
async fn test_health_endpoint() {
    let (server, _) = create_test_server();

    let response = server.get("/health").await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_requests_without_token_are_rejected() {
    let (server, _) = create_test_server();

    let response = server.get("/architectures").await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);

    let response = server
        .get("/architectures")
        .authorization_bearer("not-a-jwt")
        .await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    let body: Value = response.json();
    assert_eq!(body["status"], 401);
}

#[tokio::test]
async fn test_architecture_crud() {
    let (server, state) = create_test_server();
    let token = token_for(&state, "alice");

    let created = create_architecture(&server, &token, web_diagram()).await;
    assert_eq!(created["status"], "draft");
    assert_eq!(created["version"], 1);
    let id = created["id"].as_str().unwrap().to_string();

    let response = server
        .get(&format!("/architectures/{}", id))
        .authorization_bearer(&token)
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let fetched: Value = response.json();
    assert_eq!(fetched["diagram"]["nodes"].as_array().unwrap().len(), 4);

    let response = server
        .get("/architectures")
        .authorization_bearer(&token)
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.json::<Vec<Value>>().len(), 1);

    let mut diagram = web_diagram();
    diagram["nodes"].as_array_mut().unwrap().pop();
    diagram["edges"] = json!([]);
    let response = server
        .put(&format!("/architectures/{}", id))
        .authorization_bearer(&token)
        .json(&json!({"diagram": diagram, "expectedVersion": 1}))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let updated: Value = response.json();
    assert_eq!(updated["version"], 2);

    // Stale version is a conflict
    let response = server
        .put(&format!("/architectures/{}", id))
        .authorization_bearer(&token)
        .json(&json!({"diagram": diagram, "expectedVersion": 1}))
        .await;
    assert_eq!(response.status_code(), StatusCode::CONFLICT);

    let response = server
        .delete(&format!("/architectures/{}", id))
        .authorization_bearer(&token)
        .await;
    assert_eq!(response.status_code(), StatusCode::NO_CONTENT);

    let response = server
        .get(&format!("/architectures/{}", id))
        .authorization_bearer(&token)
        .await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_invalid_containment_is_unprocessable() {
    let (server, state) = create_test_server();
    let token = token_for(&state, "alice");

    let response = server
        .post("/architectures")
        .authorization_bearer(&token)
        .json(&json!({
            "name": "broken",
            "diagram": {
                "nodes": [{"id": "web", "kind": "resource", "parentId": "nowhere"}]
            }
        }))
        .await;

    assert_eq!(response.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_other_users_are_forbidden() {
    let (server, state) = create_test_server();
    let alice = token_for(&state, "alice");
    let mallory = token_for(&state, "mallory");
    let created = create_architecture(&server, &alice, web_diagram()).await;
    let id = created["id"].as_str().unwrap();

    let response = server
        .get(&format!("/architectures/{}", id))
        .authorization_bearer(&mallory)
        .await;
    assert_eq!(response.status_code(), StatusCode::FORBIDDEN);

    let response = server
        .post(&format!("/architectures/{}/deploy", id))
        .authorization_bearer(&mallory)
        .await;
    assert_eq!(response.status_code(), StatusCode::FORBIDDEN);

    let response = server
        .get("/architectures")
        .authorization_bearer(&mallory)
        .await;
    assert!(response.json::<Vec<Value>>().is_empty());
}

#[tokio::test]
async fn test_stateless_layout() {
    let (server, state) = create_test_server();
    let token = token_for(&state, "alice");

    let response = server
        .post("/layout")
        .authorization_bearer(&token)
        .json(&web_diagram())
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    let nodes = body["nodes"].as_array().unwrap();
    assert_eq!(nodes.len(), 4);
    let subnet = nodes.iter().find(|n| n["id"] == "subnet").unwrap();
    assert!(subnet["size"]["width"].as_f64().unwrap() >= 240.0);
}

#[tokio::test]
async fn test_apply_layout_keeps_version() {
    let (server, state) = create_test_server();
    let token = token_for(&state, "alice");
    let created = create_architecture(&server, &token, web_diagram()).await;
    let id = created["id"].as_str().unwrap();

    let response = server
        .post(&format!("/architectures/{}/layout", id))
        .authorization_bearer(&token)
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["version"], 1);
    let web = body["diagram"]["nodes"]
        .as_array()
        .unwrap()
        .iter()
        .find(|n| n["id"] == "web")
        .unwrap()
        .clone();
    assert!(web["position"]["x"].as_f64().unwrap() > 0.0);
}

#[tokio::test]
async fn test_deploy_then_poll_status() {
    let (server, state) = create_test_server();
    let token = token_for(&state, "alice");
    let created = create_architecture(&server, &token, web_diagram()).await;
    let id = created["id"].as_str().unwrap();

    let response = server
        .post(&format!("/architectures/{}/deploy", id))
        .authorization_bearer(&token)
        .await;
    assert_eq!(response.status_code(), StatusCode::ACCEPTED);
    let ticket: Value = response.json();
    assert_eq!(ticket["status"], "in_progress");
    let deployment_id = ticket["deploymentId"].as_str().unwrap();

    state.orchestrator.wait_idle().await;

    let response = server
        .get(&format!("/architectures/{}/deployments/{}", id, deployment_id))
        .authorization_bearer(&token)
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let deployment: Value = response.json();
    assert_eq!(deployment["status"], "completed");
    assert_eq!(deployment["action"], "create");
    assert_eq!(deployment["resourcesCreated"], 4);

    let response = server
        .get(&format!("/architectures/{}/deployments?limit=5", id))
        .authorization_bearer(&token)
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.json::<Vec<Value>>().len(), 1);

    let response = server
        .get(&format!("/architectures/{}/resources", id))
        .authorization_bearer(&token)
        .await;
    assert_eq!(response.json::<Vec<Value>>().len(), 4);

    let response = server
        .get(&format!("/architectures/{}", id))
        .authorization_bearer(&token)
        .await;
    let architecture: Value = response.json();
    assert_eq!(architecture["status"], "deployed");
    assert!(architecture["deployedStackRef"].is_string());

    // A deployed architecture cannot be deleted
    let response = server
        .delete(&format!("/architectures/{}", id))
        .authorization_bearer(&token)
        .await;
    assert_eq!(response.status_code(), StatusCode::CONFLICT);

    let response = server
        .post(&format!("/architectures/{}/teardown", id))
        .authorization_bearer(&token)
        .await;
    assert_eq!(response.status_code(), StatusCode::ACCEPTED);
    state.orchestrator.wait_idle().await;

    let response = server
        .delete(&format!("/architectures/{}", id))
        .authorization_bearer(&token)
        .await;
    assert_eq!(response.status_code(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_deploy_rejections() {
    let (server, state) = create_test_server();
    let token = token_for(&state, "alice");

    let empty = create_architecture(&server, &token, json!({"nodes": []})).await;
    let response = server
        .post(&format!("/architectures/{}/deploy", empty["id"].as_str().unwrap()))
        .authorization_bearer(&token)
        .await;
    assert_eq!(response.status_code(), StatusCode::UNPROCESSABLE_ENTITY);

    let draft = create_architecture(&server, &token, web_diagram()).await;
    let response = server
        .post(&format!("/architectures/{}/teardown", draft["id"].as_str().unwrap()))
        .authorization_bearer(&token)
        .await;
    assert_eq!(response.status_code(), StatusCode::CONFLICT);

    let response = server
        .post(&format!(
            "/architectures/{}/deploy",
            "00000000-0000-0000-0000-000000000000"
        ))
        .authorization_bearer(&token)
        .await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unknown_deployment_is_not_found() {
    let (server, state) = create_test_server();
    let token = token_for(&state, "alice");
    let created = create_architecture(&server, &token, web_diagram()).await;

    let response = server
        .get(&format!(
            "/architectures/{}/deployments/{}",
            created["id"].as_str().unwrap(),
            "00000000-0000-0000-0000-000000000001"
        ))
        .authorization_bearer(&token)
        .await;

    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_openapi_document() {
    let (server, _) = create_test_server();

    let response = server.get("/openapi.json").await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert!(body["paths"].get("/architectures/{id}/deploy").is_some());
    assert!(body["components"]["securitySchemes"].get("bearer_auth").is_some());
}
