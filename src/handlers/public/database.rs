use axum::{extract::State, response::Json};
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::state::AppState;

/// GET /full-db - Entire database tree, `{}` when empty
pub async fn full_db(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let tree = state
        .store
        .get("")
        .await
        .map_err(|e| ApiError::dependency("Erro ao buscar dados", e))?;

    Ok(Json(tree.unwrap_or_else(|| json!({}))))
}
