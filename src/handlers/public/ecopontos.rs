use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::handlers::utils::{record_path, require_fields, timestamp_now, JsonObject};
use crate::state::AppState;

const COLLECTION: &str = "ecopontos";

const REQUIRED_FIELDS: &[&str] = &[
    "nome",
    "endereco",
    "cep",
    "latitude",
    "longitude",
    "criadoPor",
    "status",
];

/// GET /ecopontos - All drop-off points keyed by id, `{}` when none
pub async fn list(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let all = state
        .store
        .get(COLLECTION)
        .await
        .map_err(|e| ApiError::dependency("Erro ao buscar ecopontos", e))?;

    Ok(Json(all.unwrap_or_else(|| json!({}))))
}

/// GET /ecopontos/:id
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    const NOT_FOUND: &str = "Ecoponto não encontrado.";
    let path = record_path(COLLECTION, &id, NOT_FOUND)?;

    state
        .store
        .get(&path)
        .await
        .map_err(|e| ApiError::dependency("Erro ao buscar ecoponto", e))?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(NOT_FOUND))
}

/// POST /ecopontos - Create with a store-generated key.
///
/// Stamps `criadoEm` and defaults `avaliacoes` to `{}`; any `id` in the body is dropped.
pub async fn create(
    State(state): State<AppState>,
    JsonObject(mut body): JsonObject,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    require_fields(&body, REQUIRED_FIELDS)?;

    body.remove("id");
    body.insert("criadoEm".to_string(), Value::String(timestamp_now()));
    if body.get("avaliacoes").map_or(true, Value::is_null) {
        body.insert("avaliacoes".to_string(), json!({}));
    }

    let id = state
        .store
        .push(COLLECTION, Value::Object(body))
        .await
        .map_err(|e| ApiError::dependency("Erro ao criar ecoponto", e))?;

    tracing::info!("Created ecoponto {}", id);

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Ecoponto criado com sucesso.", "id": id })),
    ))
}

/// PUT /ecopontos/:id - Shallow merge of the body into the existing record.
///
/// Existence check and write are separate calls; a concurrent delete in
/// between leaves only the merged fields behind.
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonObject(updates): JsonObject,
) -> Result<Json<Value>, ApiError> {
    const NOT_FOUND: &str = "Ecoponto não encontrado para atualização.";
    let path = record_path(COLLECTION, &id, NOT_FOUND)?;

    let existing = state
        .store
        .get(&path)
        .await
        .map_err(|e| ApiError::dependency("Erro ao atualizar ecoponto", e))?;
    if existing.is_none() {
        return Err(ApiError::not_found(NOT_FOUND));
    }

    state
        .store
        .update(&path, updates)
        .await
        .map_err(|e| ApiError::dependency("Erro ao atualizar ecoponto", e))?;

    Ok(Json(json!({ "message": "Ecoponto atualizado com sucesso." })))
}

/// DELETE /ecopontos/:id
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    const NOT_FOUND: &str = "Ecoponto não encontrado.";
    let path = record_path(COLLECTION, &id, NOT_FOUND)?;

    let existing = state
        .store
        .get(&path)
        .await
        .map_err(|e| ApiError::dependency("Erro ao deletar ecoponto", e))?;
    if existing.is_none() {
        return Err(ApiError::not_found(NOT_FOUND));
    }

    state
        .store
        .delete(&path)
        .await
        .map_err(|e| ApiError::dependency("Erro ao deletar ecoponto", e))?;

    tracing::info!("Deleted ecoponto {}", id);

    Ok(Json(json!({ "message": "Ecoponto deletado com sucesso." })))
}
