//! Request DTOs for Web API.

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use utoipa::ToSchema;
use validator::Validate;

use super::validation::{json_type, JsonFields};
use crate::error::FieldErrors;
use crate::resource::{CreateResource, ResourceChanges};

/// Deserialize a present field as `Some`, even when it is `null`.
///
/// Combined with `#[serde(default)]` this separates an omitted field
/// (`None`) from an explicit `null` (`Some(None)` or `Some(Value::Null)`).
fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

/// Canonical name of a resource field sent in a body.
fn resource_field(key: &str) -> Option<&'static str> {
    match key {
        "name" => Some("name"),
        "parent" => Some("parent"),
        "is_collection" | "isCollection" => Some("is_collection"),
        "size" => Some("size"),
        "metadata" => Some("metadata"),
        _ => None,
    }
}

/// Message for a resource field holding a value of the wrong type.
fn resource_type_error(field: &str, value: &Value) -> String {
    match field {
        "name" => "Not a valid string.".to_string(),
        "is_collection" => "Must be a valid boolean.".to_string(),
        "size" => "A valid integer is required.".to_string(),
        "parent" => format!(
            "Incorrect type. Expected pk value, received {}.",
            json_type(value)
        ),
        _ => "Invalid value.".to_string(),
    }
}

/// Create resource request.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateResourceRequest {
    /// Resource name (no `/`).
    #[serde(default)]
    #[validate(required(message = "This field is required."))]
    pub name: Option<String>,
    /// Whether to create a directory.
    #[serde(default, alias = "isCollection")]
    #[validate(required(message = "This field is required."))]
    pub is_collection: Option<bool>,
    /// File size in bytes (files only, default 0).
    #[serde(default)]
    #[validate(range(min = 0, message = "Ensure this value is greater than or equal to 0."))]
    pub size: Option<i64>,
    /// Metadata object, or a string of encoded JSON.
    #[serde(default)]
    #[schema(value_type = Object)]
    pub metadata: Option<Value>,
}

impl JsonFields for CreateResourceRequest {
    fn field_name(key: &str) -> Option<&'static str> {
        resource_field(key).filter(|field| *field != "parent")
    }

    fn accepts_null(field: &str) -> bool {
        field == "metadata"
    }

    fn type_error(field: &str, value: &Value) -> String {
        resource_type_error(field, value)
    }
}

impl From<CreateResourceRequest> for CreateResource {
    fn from(req: CreateResourceRequest) -> Self {
        CreateResource {
            name: req.name.unwrap_or_default(),
            is_collection: req.is_collection.unwrap_or_default(),
            size: req.size.unwrap_or(0),
            metadata: req.metadata,
            input_errors: FieldErrors::new(),
        }
    }
}

/// Update resource request, for both PATCH and PUT.
///
/// Unknown fields (such as a whole representation sent back) are ignored.
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateResourceRequest {
    /// New name.
    #[serde(default)]
    pub name: Option<String>,
    /// New parent id.
    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = Option<i64>)]
    pub parent: Option<Option<i64>>,
    /// Stored type, which must not change.
    #[serde(default, alias = "isCollection")]
    pub is_collection: Option<bool>,
    /// New file size (ignored for directories).
    #[serde(default)]
    #[validate(range(min = 0, message = "Ensure this value is greater than or equal to 0."))]
    pub size: Option<i64>,
    /// Replacement metadata, object or encoded JSON string.
    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = Object)]
    pub metadata: Option<Value>,
}

impl JsonFields for UpdateResourceRequest {
    fn field_name(key: &str) -> Option<&'static str> {
        resource_field(key)
    }

    fn accepts_null(field: &str) -> bool {
        matches!(field, "parent" | "metadata")
    }

    fn type_error(field: &str, value: &Value) -> String {
        resource_type_error(field, value)
    }
}

impl From<UpdateResourceRequest> for ResourceChanges {
    fn from(req: UpdateResourceRequest) -> Self {
        ResourceChanges {
            name: req.name,
            parent: req.parent,
            size: req.size,
            is_collection: req.is_collection,
            metadata: req.metadata,
            input_errors: FieldErrors::new(),
        }
    }
}
