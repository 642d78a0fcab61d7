use axum::{
    extract::{Extension, State},
    response::Json,
};
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::state::AppState;
use crate::types::Identity;

/// GET /users/me - Profile of the authenticated user.
///
/// The email comes from the verified token, not from the stored profile.
pub async fn me(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<Value>, ApiError> {
    let profile = state
        .store
        .get(&format!("users/{}", identity.uid))
        .await
        .map_err(|e| ApiError::dependency("Erro ao buscar dados do usuário", e))?
        .ok_or_else(|| ApiError::not_found("Usuário não encontrado no banco de dados."))?;

    let field = |name: &str| profile.get(name).cloned().unwrap_or(Value::Null);

    Ok(Json(json!({
        "id": identity.uid,
        "email": identity.email,
        "nome": field("nome"),
        "usuario": field("usuario"),
    })))
}
