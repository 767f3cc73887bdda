//! OpenAPI specification definition.
//!
//! Aggregates all route handlers and schemas for OpenAPI documentation generation.

use utoipa::{Modify, OpenApi};

#[derive(OpenApi)]
#[openapi(
    paths(
        // Layout
        crate::routes::layout::compute_layout,
        // Architectures
        crate::routes::architectures::list_architectures,
        crate::routes::architectures::create_architecture,
        crate::routes::architectures::get_architecture,
        crate::routes::architectures::update_architecture,
        crate::routes::architectures::delete_architecture,
        crate::routes::architectures::apply_layout,
        crate::routes::architectures::list_resources,
        // Deployments
        crate::routes::deployments::deploy_architecture,
        crate::routes::deployments::tear_down_architecture,
        crate::routes::deployments::list_deployments,
        crate::routes::deployments::get_deployment,
        // OpenAPI
        crate::routes::openapi::serve_openapi_json,
    ),
    components(schemas(
        crate::models::Diagram,
        crate::models::DiagramNode,
        crate::models::DiagramEdge,
        crate::models::NodeAttributes,
        crate::models::NodeKind,
        crate::models::SubnetRole,
        crate::models::Position,
        crate::models::Size,
        crate::models::Architecture,
        crate::models::ArchitectureStatus,
        crate::models::CreateArchitectureRequest,
        crate::models::UpdateArchitectureRequest,
        crate::models::Deployment,
        crate::models::DeploymentStatus,
        crate::models::DeploymentTicket,
        crate::models::ActionLogEntry,
        crate::models::StackAction,
        crate::models::Resource,
        crate::routes::layout::LayoutRequest,
        crate::routes::layout::LayoutResponse,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "Layout", description = "Automatic diagram layout"),
        (name = "Architectures", description = "Architecture management"),
        (name = "Deployments", description = "Asynchronous stack deployment and teardown"),
        (name = "OpenAPI", description = "OpenAPI specification"),
    ),
    info(
        title = "Cloud Topology API",
        description = "REST API for laying out cloud architecture diagrams and deploying them as provider stacks",
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8081/api/v1", description = "Local development server")
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};

        // Keep the document version in step with Cargo.toml
        openapi.info.version = env!("CARGO_PKG_VERSION").to_string();

        let components = openapi
            .components
            .get_or_insert_with(utoipa::openapi::Components::new);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
        );
    }
}
