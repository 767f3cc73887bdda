//! REST provider gateway client (reqwest).

use super::{ProviderClient, ProviderError, StackOutcome, StackResource};
use crate::models::{DiagramEdge, DiagramNode};
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

/// Client for a provider gateway speaking the `/stacks` REST contract
pub struct HttpProviderClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StackRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
    nodes: &'a [DiagramNode],
    edges: &'a [DiagramEdge],
}

#[derive(Deserialize)]
struct ResourceList {
    resources: Vec<StackResource>,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

impl HttpProviderClient {
    pub fn new(
        base_url: &str,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::Failed(format!("Failed to build HTTP client: {}", e)))?;
        info!("Provider gateway client configured for {}", base_url);
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// URL of one stack. The ref is a single path segment even when it is an
    /// ARN containing `/` or `:`.
    fn stack_url(&self, stack_ref: &str, suffix: &str) -> String {
        self.url(&format!("/stacks/{}{}", urlencoding::encode(stack_ref), suffix))
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.header("Authorization", format!("Bearer {}", token)),
            None => request,
        }
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<Response, ProviderError> {
        self.authorized(request)
            .send()
            .await
            .map_err(|e| ProviderError::Failed(format!("Provider request failed: {}", e)))
    }
}

/// Extract the provider's error message, verbatim
async fn error_message(response: Response) -> String {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    match serde_json::from_str::<ErrorBody>(&text) {
        Ok(body) => body.message,
        Err(_) if !text.trim().is_empty() => text,
        Err(_) => format!("Provider returned {}", status),
    }
}

async fn expect_success(response: Response) -> Result<Response, ProviderError> {
    if response.status().is_success() {
        Ok(response)
    } else {
        Err(ProviderError::Failed(error_message(response).await))
    }
}

#[async_trait]
impl ProviderClient for HttpProviderClient {
    async fn stack_exists(&self, stack_ref: &str) -> Result<bool, ProviderError> {
        let response = self
            .send(self.client.get(self.stack_url(stack_ref, "")))
            .await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(false),
            status if status.is_success() => Ok(true),
            _ => Err(ProviderError::Failed(error_message(response).await)),
        }
    }

    async fn create_stack(
        &self,
        name: &str,
        nodes: &[DiagramNode],
        edges: &[DiagramEdge],
    ) -> Result<StackOutcome, ProviderError> {
        debug!("Creating stack {} with {} nodes", name, nodes.len());
        let body = StackRequest {
            name: Some(name),
            nodes,
            edges,
        };
        let response = self
            .send(self.client.post(self.url("/stacks")).json(&body))
            .await?;
        expect_success(response)
            .await?
            .json::<StackOutcome>()
            .await
            .map_err(|e| ProviderError::Failed(format!("Invalid create response: {}", e)))
    }

    async fn update_stack(
        &self,
        stack_ref: &str,
        nodes: &[DiagramNode],
        edges: &[DiagramEdge],
    ) -> Result<StackOutcome, ProviderError> {
        debug!("Updating stack {} with {} nodes", stack_ref, nodes.len());
        let body = StackRequest {
            name: None,
            nodes,
            edges,
        };
        let response = self
            .send(
                self.client
                    .put(self.stack_url(stack_ref, ""))
                    .json(&body),
            )
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(ProviderError::StackNotFound(stack_ref.to_string()));
        }
        expect_success(response)
            .await?
            .json::<StackOutcome>()
            .await
            .map_err(|e| ProviderError::Failed(format!("Invalid update response: {}", e)))
    }

    async fn delete_stack(&self, stack_ref: &str) -> Result<(), ProviderError> {
        let response = self
            .send(self.client.delete(self.stack_url(stack_ref, "")))
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(ProviderError::StackNotFound(stack_ref.to_string()));
        }
        expect_success(response).await.map(|_| ())
    }

    async fn list_stack_resources(
        &self,
        stack_ref: &str,
    ) -> Result<Vec<StackResource>, ProviderError> {
        let response = self
            .send(self.client.get(self.stack_url(stack_ref, "/resources")))
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(ProviderError::StackNotFound(stack_ref.to_string()));
        }
        let list = expect_success(response)
            .await?
            .json::<ResourceList>()
            .await
            .map_err(|e| ProviderError::Failed(format!("Invalid resource list: {}", e)))?;
        Ok(list.resources)
    }
}
