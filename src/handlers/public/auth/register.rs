// handlers/public/auth/register.rs - POST /register handler

use axum::{extract::State, http::StatusCode, response::Json};
use serde_json::{json, Value};

use crate::auth::AuthError;
use crate::error::ApiError;
use crate::handlers::utils::{require_fields, JsonObject};
use crate::state::AppState;

const REQUIRED_FIELDS: &[&str] = &["email", "senha", "nome", "usuario"];

/// POST /register - Create an identity and its profile at `users/{uid}`
///
/// Expected Input:
/// ```json
/// { "email": "string", "senha": "string", "nome": "string", "usuario": "string" }
/// ```
///
/// Returns 201 with `{ id, email, nome, usuario }`, 409 when the email is taken.
pub async fn register(
    State(state): State<AppState>,
    JsonObject(body): JsonObject,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    require_fields(&body, REQUIRED_FIELDS)?;

    let (Some(email), Some(senha)) = (
        body.get("email").and_then(Value::as_str),
        body.get("senha").and_then(Value::as_str),
    ) else {
        return Err(ApiError::bad_request(
            "Os campos 'email' e 'senha' devem ser textos.",
        ));
    };
    let nome = body.get("nome").cloned().unwrap_or(Value::Null);
    let usuario = body.get("usuario").cloned().unwrap_or(Value::Null);

    let uid = match state.identity.create_identity(email, senha).await {
        Ok(uid) => uid,
        Err(AuthError::EmailInUse) => {
            tracing::info!("Registration rejected, email already in use");
            return Err(ApiError::conflict("O e-mail já está em uso."));
        }
        Err(e) => return Err(ApiError::dependency("Erro ao criar usuário", e)),
    };

    let profile = json!({ "email": email, "nome": nome, "usuario": usuario });
    if let Err(e) = state.store.set(&format!("users/{}", uid), profile).await {
        // The identity stays behind without a profile
        tracing::error!("Identity {} created but profile write failed", uid);
        return Err(ApiError::dependency("Erro ao criar usuário", e));
    }

    tracing::info!("Registered user {}", uid);

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "id": uid,
            "email": email,
            "nome": nome,
            "usuario": usuario,
        })),
    ))
}
