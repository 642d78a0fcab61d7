//! Firebase adapters against a local stand-in for the Google REST endpoints

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    extract::{Query, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::{json, Map, Value};
use url::Url;

use ecopontos_api::auth::{
    AuthEndpoints, AuthError, FirebaseAuth, IdentityVerifier, ServiceAccountTokenSource,
};
use ecopontos_api::config::ServiceAccount;
use ecopontos_api::database::{DocumentStore, RealtimeDatabase, StoreError};

const PROJECT_ID: &str = "bd-ecopontos";
const ACCESS_TOKEN: &str = "ya29.local-access-token";
const PRIVATE_KEY: &str = include_str!("fixtures/service_account_key.pem");
const SIGNING_KEYS: &str = include_str!("fixtures/jwks.json");
const KEY_ID: &str = "test-key-1";

#[derive(Default)]
struct Calls {
    token: AtomicUsize,
    signing_keys: AtomicUsize,
}

type Shared = Arc<Calls>;

struct MockGoogle {
    base_url: String,
    calls: Shared,
    client: reqwest::Client,
}

impl MockGoogle {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn tokens(&self, token_path: &str) -> Result<Arc<ServiceAccountTokenSource>> {
        let account = ServiceAccount::from_json(
            &json!({
                "project_id": PROJECT_ID,
                "client_email": "firebase-adminsdk@bd-ecopontos.iam.gserviceaccount.com",
                "private_key": PRIVATE_KEY,
                "token_uri": self.url(token_path),
            })
            .to_string(),
        )?;
        Ok(Arc::new(ServiceAccountTokenSource::new(
            self.client.clone(),
            account,
        )?))
    }

    fn database(&self, token_path: &str) -> Result<RealtimeDatabase> {
        let base = Url::parse(&self.url("/db/"))?;
        Ok(RealtimeDatabase::new(
            self.client.clone(),
            base,
            self.tokens(token_path)?,
        ))
    }

    fn auth(&self) -> Result<FirebaseAuth> {
        Ok(FirebaseAuth::with_endpoints(
            self.client.clone(),
            self.tokens("/token")?,
            AuthEndpoints {
                identity_toolkit: self.url("/identitytoolkit/v1"),
                signing_keys: self.url("/jwks"),
            },
        ))
    }
}

async fn spawn_mock() -> Result<MockGoogle> {
    let port = portpicker::pick_unused_port().context("failed to pick free port")?;
    let calls: Shared = Arc::new(Calls::default());

    let router = Router::new()
        .route("/token", post(token))
        .route("/rejected-token", post(rejected_token))
        .route("/jwks", get(signing_keys))
        .route("/db/ecopontos/missing.json", get(|q| db(q, Value::Null)))
        .route(
            "/db/ecopontos/k1.json",
            get(|q| db(q, json!({"nome": "Centro"}))).patch(patch_silent),
        )
        .route("/db/ecopontos.json", post(|q| db(q, json!({"name": "-NzPushed00000000000"}))))
        .route("/db/locked.json", get(locked))
        .route(
            &format!("/identitytoolkit/v1/projects/{}/accounts", PROJECT_ID),
            post(sign_up),
        )
        .with_state(calls.clone());

    let listener = tokio::net::TcpListener::bind(("127.0.0.1", port)).await?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });

    Ok(MockGoogle {
        base_url: format!("http://127.0.0.1:{}", port),
        calls,
        client: reqwest::Client::new(),
    })
}

async fn token(State(calls): State<Shared>) -> Json<Value> {
    calls.token.fetch_add(1, Ordering::SeqCst);
    Json(json!({"access_token": ACCESS_TOKEN, "expires_in": 3599, "token_type": "Bearer"}))
}

async fn rejected_token() -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({"error": "invalid_grant", "error_description": "Invalid JWT Signature."})),
    )
        .into_response()
}

async fn signing_keys(State(calls): State<Shared>) -> Response {
    calls.signing_keys.fetch_add(1, Ordering::SeqCst);
    (
        [(axum::http::header::CONTENT_TYPE, "application/json")],
        SIGNING_KEYS,
    )
        .into_response()
}

fn has_access_token(query: &HashMap<String, String>) -> bool {
    query.get("access_token").map(String::as_str) == Some(ACCESS_TOKEN)
}

async fn db(Query(query): Query<HashMap<String, String>>, body: Value) -> Response {
    if !has_access_token(&query) {
        return (StatusCode::UNAUTHORIZED, Json(json!({"error": "Unauthorized request."})))
            .into_response();
    }
    Json(body).into_response()
}

async fn patch_silent(Query(query): Query<HashMap<String, String>>) -> StatusCode {
    match (has_access_token(&query), query.get("print").map(String::as_str)) {
        (true, Some("silent")) => StatusCode::NO_CONTENT,
        _ => StatusCode::BAD_REQUEST,
    }
}

async fn locked() -> Response {
    (StatusCode::UNAUTHORIZED, Json(json!({"error": "Permission denied"}))).into_response()
}

async fn sign_up(headers: HeaderMap, Json(body): Json<Value>) -> Response {
    let expected = format!("Bearer {}", ACCESS_TOKEN);
    if headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()) != Some(expected.as_str()) {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    let error = |message: &str| {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": {"code": 400, "message": message}})),
        )
            .into_response()
    };

    match body["email"].as_str() {
        Some("taken@example.com") => error("EMAIL_EXISTS"),
        Some(_) if body["password"].as_str().map_or(0, str::len) < 6 => {
            error("WEAK_PASSWORD : Password should be at least 6 characters")
        }
        Some(_) => Json(json!({"kind": "identitytoolkit#SignupNewUserResponse", "localId": "uid-nova"}))
            .into_response(),
        None => error("MISSING_EMAIL"),
    }
}

fn id_token(kid: &str, overrides: Value) -> Result<String> {
    let now = chrono::Utc::now().timestamp();
    let mut claims: Map<String, Value> = match json!({
        "iss": format!("https://securetoken.google.com/{}", PROJECT_ID),
        "aud": PROJECT_ID,
        "sub": "uid-ana",
        "email": "ana@example.com",
        "email_verified": true,
        "iat": now,
        "exp": now + 3600,
    }) {
        Value::Object(map) => map,
        _ => unreachable!(),
    };
    if let Value::Object(extra) = overrides {
        claims.extend(extra);
    }

    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some(kid.to_string());
    let key = EncodingKey::from_rsa_pem(PRIVATE_KEY.as_bytes())?;
    Ok(encode(&header, &claims, &key)?)
}

#[tokio::test]
async fn access_token_is_exchanged_once_and_cached() -> Result<()> {
    let mock = spawn_mock().await?;
    let tokens = mock.tokens("/token")?;

    assert_eq!(tokens.access_token().await?, ACCESS_TOKEN);
    assert_eq!(tokens.access_token().await?, ACCESS_TOKEN);
    assert_eq!(mock.calls.token.load(Ordering::SeqCst), 1);
    Ok(())
}

#[tokio::test]
async fn rejected_token_exchange_is_a_credentials_error() -> Result<()> {
    let mock = spawn_mock().await?;
    let tokens = mock.tokens("/rejected-token")?;

    match tokens.access_token().await {
        Err(AuthError::Credentials(message)) => {
            assert!(message.contains("400"), "{}", message);
            assert!(message.contains("invalid_grant"), "{}", message);
        }
        other => panic!("expected credentials error, got {:?}", other.map(|_| ())),
    }
    Ok(())
}

#[tokio::test]
async fn database_reads_map_null_to_none() -> Result<()> {
    let mock = spawn_mock().await?;
    let db = mock.database("/token")?;

    assert_eq!(db.get("ecopontos/missing").await?, None);
    assert_eq!(db.get("ecopontos/k1").await?, Some(json!({"nome": "Centro"})));
    Ok(())
}

#[tokio::test]
async fn database_push_returns_generated_name() -> Result<()> {
    let mock = spawn_mock().await?;
    let db = mock.database("/token")?;

    let key = db.push("ecopontos", json!({"nome": "Novo"})).await?;
    assert_eq!(key, "-NzPushed00000000000");
    Ok(())
}

#[tokio::test]
async fn database_update_is_sent_silently() -> Result<()> {
    let mock = spawn_mock().await?;
    let db = mock.database("/token")?;

    let mut fields = Map::new();
    fields.insert("status".to_string(), json!("ativo"));
    db.update("ecopontos/k1", fields).await?;
    Ok(())
}

#[tokio::test]
async fn database_error_body_becomes_remote_error() -> Result<()> {
    let mock = spawn_mock().await?;
    let db = mock.database("/token")?;

    match db.get("locked").await {
        Err(StoreError::Remote { status, message }) => {
            assert_eq!(status, 401);
            assert_eq!(message, "Permission denied");
        }
        other => panic!("expected remote error, got {:?}", other),
    }
    Ok(())
}

#[tokio::test]
async fn database_without_access_token_is_a_credentials_error() -> Result<()> {
    let mock = spawn_mock().await?;
    let db = mock.database("/rejected-token")?;

    let err = db.get("ecopontos/k1").await.unwrap_err();
    assert!(matches!(err, StoreError::Credentials(_)), "{:?}", err);
    Ok(())
}

#[tokio::test]
async fn create_identity_returns_local_id() -> Result<()> {
    let mock = spawn_mock().await?;
    let auth = mock.auth()?;

    assert_eq!(
        auth.create_identity("nova@example.com", "segredo123").await?,
        "uid-nova"
    );
    Ok(())
}

#[tokio::test]
async fn create_identity_maps_existing_email() -> Result<()> {
    let mock = spawn_mock().await?;
    let auth = mock.auth()?;

    let err = auth
        .create_identity("taken@example.com", "segredo123")
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::EmailInUse), "{:?}", err);

    let err = auth.create_identity("nova@example.com", "123").await.unwrap_err();
    match err {
        AuthError::Remote { status, message } => {
            assert_eq!(status, 400);
            assert!(message.starts_with("WEAK_PASSWORD"), "{}", message);
        }
        other => panic!("expected remote error, got {:?}", other),
    }
    Ok(())
}

#[tokio::test]
async fn verify_token_accepts_signed_id_token() -> Result<()> {
    let mock = spawn_mock().await?;
    let auth = mock.auth()?;

    let identity = auth.verify_token(&id_token(KEY_ID, json!({}))?).await?;
    assert_eq!(identity.uid, "uid-ana");
    assert_eq!(identity.email.as_deref(), Some("ana@example.com"));
    assert_eq!(identity.claims["email_verified"], json!(true));

    // Second verification uses the cached keys
    auth.verify_token(&id_token(KEY_ID, json!({}))?).await?;
    assert_eq!(mock.calls.signing_keys.load(Ordering::SeqCst), 1);
    Ok(())
}

#[tokio::test]
async fn verify_token_rejects_other_projects() -> Result<()> {
    let mock = spawn_mock().await?;
    let auth = mock.auth()?;

    let token = id_token(KEY_ID, json!({"aud": "outro-projeto"}))?;
    let err = auth.verify_token(&token).await.unwrap_err();
    assert!(matches!(err, AuthError::InvalidToken(_)), "{:?}", err);

    let token = id_token(
        KEY_ID,
        json!({"iss": "https://securetoken.google.com/outro-projeto"}),
    )?;
    let err = auth.verify_token(&token).await.unwrap_err();
    assert!(matches!(err, AuthError::InvalidToken(_)), "{:?}", err);
    Ok(())
}

#[tokio::test]
async fn unknown_key_ids_do_not_refetch_fresh_keys() -> Result<()> {
    let mock = spawn_mock().await?;
    let auth = mock.auth()?;

    for _ in 0..5 {
        let err = auth
            .verify_token(&id_token("forged-key", json!({}))?)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken(_)), "{:?}", err);
    }
    assert_eq!(mock.calls.signing_keys.load(Ordering::SeqCst), 1);

    // The key set fetched for the first miss still serves known ids
    auth.verify_token(&id_token(KEY_ID, json!({}))?).await?;
    assert_eq!(mock.calls.signing_keys.load(Ordering::SeqCst), 1);
    Ok(())
}
