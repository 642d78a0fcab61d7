use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};

use crate::auth::IdentityVerifier;
use crate::error::ApiError;
use crate::state::AppState;
use crate::types::Identity;

const MISSING_TOKEN: &str = "Token de autenticação ausente.";
const INVALID_TOKEN: &str = "Token de autenticação inválido";

/// Token from the Authorization header, or from `?token=` when the request
/// carries no Authorization header at all.
///
/// The token is the second space-separated part of the header whatever the
/// scheme, so `Token abc` reaches the verifier and fails there.
pub fn extract_token(headers: &HeaderMap, query: Option<&str>) -> Option<String> {
    if let Some(value) = headers.get(AUTHORIZATION) {
        let value = value.to_str().ok()?;
        return value
            .split_whitespace()
            .nth(1)
            .map(str::to_string);
    }

    query.and_then(|q| {
        url::form_urlencoded::parse(q.as_bytes())
            .find(|(key, _)| key == "token")
            .map(|(_, value)| value.into_owned())
            .filter(|token| !token.is_empty())
    })
}

/// Resolve the caller's identity or fail with 401.
///
/// The verifier is only consulted when a token is present.
pub async fn authenticate(
    verifier: &dyn IdentityVerifier,
    headers: &HeaderMap,
    query: Option<&str>,
) -> Result<Identity, ApiError> {
    let token = extract_token(headers, query).ok_or_else(|| ApiError::unauthorized(MISSING_TOKEN))?;

    verifier.verify_token(&token).await.map_err(|e| {
        tracing::warn!("Authentication failed: {}", e);
        ApiError::unauthorized(INVALID_TOKEN)
    })
}

/// Route layer that attaches the verified Identity to request extensions
pub async fn require_identity(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let identity = authenticate(
        state.identity.as_ref(),
        request.headers(),
        request.uri().query(),
    )
    .await?;

    tracing::debug!("Authenticated request for uid {}", identity.uid);
    request.extensions_mut().insert(identity);

    Ok(next.run(request).await)
}
