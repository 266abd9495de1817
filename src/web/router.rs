//! Router configuration for the web API.

use axum::{
    routing::{get, MethodRouter},
    Json, Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use super::handlers::{
    create_resource, delete_resource, get_resource, patch_resource, put_resource, AppState,
};
use super::openapi::ApiDoc;
use crate::config::Config;

/// All methods served on a resource path.
fn resource_methods() -> MethodRouter<Arc<AppState>> {
    get(get_resource)
        .post(create_resource)
        .patch(patch_resource)
        .put(put_resource)
        .delete(delete_resource)
}

/// Create the resource API routes, relative to the mount point.
pub fn create_api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/resources", resource_methods())
        .route("/resources/", resource_methods())
        .route("/resources/*path", resource_methods())
}

/// Create the main router.
///
/// The resource API is mounted at `config.api.prefix`; the health check and
/// the OpenAPI document stay at the top level.
pub fn create_router(app_state: Arc<AppState>, config: &Config) -> Router {
    let prefix = config.api.prefix.as_str();
    let api = if prefix.is_empty() {
        create_api_routes()
    } else {
        Router::new().nest(prefix, create_api_routes())
    };

    Router::new()
        .merge(api)
        .merge(create_health_router())
        .merge(create_openapi_router())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(create_cors_layer(&config.server.cors_origins)),
        )
        .with_state(app_state)
}

/// Create a CORS layer from the configured origins.
///
/// An empty list allows any origin.
pub fn create_cors_layer(origins: &[String]) -> CorsLayer {
    use axum::http::header::{ACCEPT, CONTENT_TYPE};
    use axum::http::{HeaderValue, Method};
    use tower_http::cors::Any;

    let methods = [
        Method::GET,
        Method::POST,
        Method::PUT,
        Method::DELETE,
        Method::PATCH,
        Method::OPTIONS,
    ];

    let parsed_origins: Vec<HeaderValue> =
        origins.iter().filter_map(|o| o.parse().ok()).collect();

    if parsed_origins.is_empty() {
        CorsLayer::new()
            .allow_methods(methods)
            .allow_headers(Any)
            .allow_origin(Any)
    } else {
        CorsLayer::new()
            .allow_methods(methods)
            .allow_headers([CONTENT_TYPE, ACCEPT])
            .allow_origin(parsed_origins)
    }
}

/// Create a health check router.
pub fn create_health_router<S: Clone + Send + Sync + 'static>() -> Router<S> {
    Router::new().route("/health", get(health_check))
}

/// Health check handler.
async fn health_check() -> &'static str {
    "OK"
}

/// Create the router serving the OpenAPI document.
pub fn create_openapi_router<S: Clone + Send + Sync + 'static>() -> Router<S> {
    Router::new().route(
        "/api-docs/openapi.json",
        get(|| async { Json(ApiDoc::openapi()) }),
    )
}
