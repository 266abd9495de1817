//! Validated JSON extraction for Web API DTOs.

use axum::{
    async_trait,
    extract::{FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use validator::{Validate, ValidationErrors};

use crate::error::FieldErrors;
use crate::resource::validator::FIELD_NOT_NULL;
use crate::web::error::ApiError;

/// Key for errors about the body as a whole.
pub const NON_FIELD_ERRORS: &str = "non_field_errors";

/// Field-by-field decoding rules of a request body.
pub trait JsonFields: DeserializeOwned + Validate {
    /// Canonical name of a body key, `None` for keys the request ignores.
    fn field_name(key: &str) -> Option<&'static str>;

    /// Whether an explicit `null` means something for the field.
    fn accepts_null(_field: &str) -> bool {
        false
    }

    /// Message for a value of the wrong type.
    fn type_error(field: &str, value: &Value) -> String;
}

/// A JSON extractor that decodes and validates the request body per field.
///
/// Only a body that is not a JSON object is rejected. Fields of the wrong
/// type are left unset and every field error travels with the value, so
/// the service can report them together with its own rules.
///
/// ```ignore
/// async fn create(
///     ValidatedJson(payload, errors): ValidatedJson<CreateResourceRequest>,
/// ) -> Result<Json<ResourceResponse>, ApiError> {
///     // errors holds everything the body itself got wrong
/// }
/// ```
pub struct ValidatedJson<T>(pub T, pub FieldErrors);

#[async_trait]
impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: JsonFields + Send,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(body) = Json::<Value>::from_request(req, state)
            .await
            .map_err(|e| ApiError::bad_request(format!("Invalid JSON: {}", e.body_text())))?;

        let fields = match body {
            Value::Object(fields) => fields,
            other => {
                return Err(ApiError::validation(FieldErrors::single(
                    NON_FIELD_ERRORS,
                    format!(
                        "Invalid data. Expected a dictionary, but got {}.",
                        json_type(&other)
                    ),
                )))
            }
        };

        let (fields, mut errors) = decode_fields::<T>(fields);
        let value: T = serde_json::from_value(Value::Object(fields))
            .map_err(|e| ApiError::bad_request(format!("Invalid JSON: {e}")))?;

        if let Err(e) = value.validate() {
            errors.merge_unreported(field_errors(&e));
        }

        Ok(ValidatedJson(value, errors))
    }
}

/// Drop every field that does not decode on its own, recording why.
fn decode_fields<T: JsonFields>(
    mut fields: Map<String, Value>,
) -> (Map<String, Value>, FieldErrors) {
    let mut errors = FieldErrors::new();
    let keys: Vec<String> = fields.keys().cloned().collect();

    for key in keys {
        let Some(field) = T::field_name(&key) else {
            continue;
        };
        let Some(value) = fields.get(&key) else {
            continue;
        };

        let message = if value.is_null() {
            (!T::accepts_null(field)).then(|| FIELD_NOT_NULL.to_string())
        } else {
            let single = Value::Object(Map::from_iter([(key.clone(), value.clone())]));
            serde_json::from_value::<T>(single)
                .err()
                .map(|_| T::type_error(field, value))
        };

        if let Some(message) = message {
            errors.add(field, message);
            fields.remove(&key);
        }
    }

    (fields, errors)
}

/// Collect `validator` failures into field errors.
fn field_errors(errors: &ValidationErrors) -> FieldErrors {
    let mut fields = FieldErrors::new();
    for (field, field_errors) in errors.field_errors() {
        for e in field_errors.iter() {
            let message = e
                .message
                .as_ref()
                .map(|m| m.to_string())
                .unwrap_or_else(|| format!("Invalid value for {}", field));
            fields.add(field.to_string(), message);
        }
    }
    fields
}

/// Type name of a JSON value, as shown in messages.
pub fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "NoneType",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "int",
        Value::String(_) => "str",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    }
}
