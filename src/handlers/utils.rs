use axum::{
    async_trait,
    extract::{FromRequest, Request},
    Json,
};
use chrono::{SecondsFormat, Utc};
use serde_json::{Map, Value};

use crate::database::is_valid_key;
use crate::error::ApiError;

/// JSON request body that must be an object; rejections render as `{detail}`
#[derive(Debug)]
pub struct JsonObject(pub Map<String, Value>);

#[async_trait]
impl<S> FromRequest<S> for JsonObject
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<Value>::from_request(req, state).await {
            Ok(Json(Value::Object(map))) => Ok(Self(map)),
            Ok(Json(_)) => Err(ApiError::bad_request(
                "O corpo da requisição deve ser um objeto JSON.",
            )),
            Err(rejection) => Err(ApiError::bad_request(format!(
                "Corpo da requisição inválido: {}",
                rejection.body_text()
            ))),
        }
    }
}

/// Required keys absent from `body`, in declaration order.
///
/// Only absence counts: `null`, `""` and `0` are present values.
pub fn missing_fields(body: &Map<String, Value>, required: &[&'static str]) -> Vec<&'static str> {
    required
        .iter()
        .copied()
        .filter(|field| !body.contains_key(*field))
        .collect()
}

pub fn require_fields(body: &Map<String, Value>, required: &[&'static str]) -> Result<(), ApiError> {
    let missing = missing_fields(body, required);
    if missing.is_empty() {
        Ok(())
    } else {
        Err(ApiError::missing_fields(&missing))
    }
}

/// Current UTC time as ISO-8601 with millisecond precision
pub fn timestamp_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Store path of one record; ids that cannot be keys can never exist
pub fn record_path(collection: &str, id: &str, not_found: &str) -> Result<String, ApiError> {
    if is_valid_key(id) {
        Ok(format!("{}/{}", collection, id))
    } else {
        Err(ApiError::not_found(not_found))
    }
}
