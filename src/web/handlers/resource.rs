//! Resource tree handlers.
//!
//! Every route takes the resource path as a wildcard; `/resources` and
//! `/resources/` address the root.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use super::AppState;
use crate::resource::{CreateResource, ResourceChanges, ResourceService};
use crate::web::dto::{
    CreateResourceRequest, ResourceResponse, UpdateResourceRequest, ValidatedJson,
};
use crate::web::error::ApiError;

fn resource_path(path: Option<Path<String>>) -> String {
    path.map(|Path(p)| p).unwrap_or_default()
}

/// GET /resources/{path} - Get a resource and its direct children.
#[utoipa::path(
    get,
    path = "/resources/{path}",
    tag = "resources",
    params(
        ("path" = String, Path, description = "Slash-separated resource path (empty for the root)")
    ),
    responses(
        (status = 200, description = "Resource details", body = ResourceResponse),
        (status = 404, description = "No resource at this path")
    )
)]
pub async fn get_resource(
    State(state): State<Arc<AppState>>,
    path: Option<Path<String>>,
) -> Result<Json<ResourceResponse>, ApiError> {
    let path = resource_path(path);
    let detail = ResourceService::new(&state.db).retrieve(&path).await?;
    Ok(Json(ResourceResponse::from_detail(detail, &state.url_prefix)))
}

/// POST /resources/{path} - Create a resource inside the directory at `path`.
#[utoipa::path(
    post,
    path = "/resources/{path}",
    tag = "resources",
    params(
        ("path" = String, Path, description = "Path of the parent directory")
    ),
    request_body = CreateResourceRequest,
    responses(
        (status = 201, description = "Resource created", body = ResourceResponse),
        (status = 400, description = "Validation failed"),
        (status = 404, description = "Parent directory not found")
    )
)]
pub async fn create_resource(
    State(state): State<Arc<AppState>>,
    path: Option<Path<String>>,
    ValidatedJson(req, errors): ValidatedJson<CreateResourceRequest>,
) -> Result<(StatusCode, Json<ResourceResponse>), ApiError> {
    let path = resource_path(path);
    let request = CreateResource::from(req).with_input_errors(errors);
    let detail = ResourceService::new(&state.db).create(&path, request).await?;
    Ok((
        StatusCode::CREATED,
        Json(ResourceResponse::from_detail(detail, &state.url_prefix)),
    ))
}

/// PATCH /resources/{path} - Partially update a resource.
#[utoipa::path(
    patch,
    path = "/resources/{path}",
    tag = "resources",
    params(
        ("path" = String, Path, description = "Resource path")
    ),
    request_body = UpdateResourceRequest,
    responses(
        (status = 200, description = "Resource updated", body = ResourceResponse),
        (status = 400, description = "Validation failed"),
        (status = 404, description = "No resource at this path")
    )
)]
pub async fn patch_resource(
    State(state): State<Arc<AppState>>,
    path: Option<Path<String>>,
    ValidatedJson(req, errors): ValidatedJson<UpdateResourceRequest>,
) -> Result<Json<ResourceResponse>, ApiError> {
    let path = resource_path(path);
    let service = ResourceService::new(&state.db);

    let detail = match req {
        UpdateResourceRequest {
            metadata: Some(metadata),
            name: None,
            parent: None,
            is_collection: None,
            size: None,
        } if errors.is_empty() => service.update_metadata(&path, metadata).await?,
        req => {
            let changes = ResourceChanges::from(req).with_input_errors(errors);
            service.update(&path, changes).await?
        }
    };
    Ok(Json(ResourceResponse::from_detail(detail, &state.url_prefix)))
}

/// PUT /resources/{path} - Replace the mutable fields of a resource.
///
/// `name` is required; omitted `metadata` clears it.
#[utoipa::path(
    put,
    path = "/resources/{path}",
    tag = "resources",
    params(
        ("path" = String, Path, description = "Resource path")
    ),
    request_body = UpdateResourceRequest,
    responses(
        (status = 200, description = "Resource replaced", body = ResourceResponse),
        (status = 400, description = "Validation failed"),
        (status = 404, description = "No resource at this path")
    )
)]
pub async fn put_resource(
    State(state): State<Arc<AppState>>,
    path: Option<Path<String>>,
    ValidatedJson(req, errors): ValidatedJson<UpdateResourceRequest>,
) -> Result<Json<ResourceResponse>, ApiError> {
    let path = resource_path(path);
    let changes = ResourceChanges::from(req).with_input_errors(errors);
    let detail = ResourceService::new(&state.db)
        .replace(&path, changes)
        .await?;
    Ok(Json(ResourceResponse::from_detail(detail, &state.url_prefix)))
}

/// DELETE /resources/{path} - Delete a file or an empty directory.
#[utoipa::path(
    delete,
    path = "/resources/{path}",
    tag = "resources",
    params(
        ("path" = String, Path, description = "Resource path")
    ),
    responses(
        (status = 204, description = "Resource deleted"),
        (status = 404, description = "No resource at this path"),
        (status = 409, description = "Root or non-empty directory")
    )
)]
pub async fn delete_resource(
    State(state): State<Arc<AppState>>,
    path: Option<Path<String>>,
) -> Result<StatusCode, ApiError> {
    let path = resource_path(path);
    ResourceService::new(&state.db).delete(&path).await?;
    Ok(StatusCode::NO_CONTENT)
}
