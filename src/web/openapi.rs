//! OpenAPI document for the resource API.

use utoipa::OpenApi;

use super::dto::{CreateResourceRequest, ResourceResponse, ResourceSummary, UpdateResourceRequest};
use super::handlers::resource;

/// Generated API description. Paths are relative to the API mount point.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "FCI",
        description = "File Collection Index: a tree of directories and files with JSON metadata"
    ),
    paths(
        resource::get_resource,
        resource::create_resource,
        resource::patch_resource,
        resource::put_resource,
        resource::delete_resource,
    ),
    components(schemas(
        ResourceSummary,
        ResourceResponse,
        CreateResourceRequest,
        UpdateResourceRequest,
    )),
    tags((name = "resources", description = "Resource tree browsing and editing"))
)]
pub struct ApiDoc;
