use axum::{extract::State, http::StatusCode, response::Json};
use serde_json::Value;
use uuid::Uuid;

use crate::error::ApiError;
use crate::handlers::utils::{require_fields, timestamp_now, JsonObject};
use crate::state::AppState;

const COLLECTION: &str = "sugestoes_ecopontos";

const REQUIRED_FIELDS: &[&str] = &["usuarioId", "nome", "endereco", "cep", "latitude", "longitude"];

/// Status every new suggestion starts in
pub const PENDING: &str = "pendente";

/// POST /sugestoes_ecopontos - Store a suggestion under a fresh UUID.
///
/// `data` and `status` are always set by the server. The response is the stored
/// record plus its `id`.
pub async fn create(
    State(state): State<AppState>,
    JsonObject(mut body): JsonObject,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    require_fields(&body, REQUIRED_FIELDS)?;

    body.remove("id");
    body.insert("data".to_string(), Value::String(timestamp_now()));
    body.insert("status".to_string(), Value::String(PENDING.to_string()));

    let id = Uuid::new_v4().to_string();
    state
        .store
        .set(&format!("{}/{}", COLLECTION, id), Value::Object(body.clone()))
        .await
        .map_err(|e| ApiError::dependency("Erro ao criar sugestão", e))?;

    tracing::info!("Created suggestion {}", id);

    body.insert("id".to_string(), Value::String(id));
    Ok((StatusCode::CREATED, Json(Value::Object(body))))
}
