#![allow(dead_code)]

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::{json, Map, Value};

use ecopontos_api::auth::MemoryIdentityVerifier;
use ecopontos_api::database::{DocumentStore, MemoryStore, StoreError};
use ecopontos_api::{app, AppState};

/// Router served on a free local port, backed by in-memory adapters
pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    pub store: Arc<MemoryStore>,
    pub identity: Arc<MemoryIdentityVerifier>,
    pub client: reqwest::Client,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// POST /ecopontos with a complete body, returning the generated id
    pub async fn create_ecoponto(&self, extra: Value) -> Result<String> {
        let mut body = ecoponto_body();
        if let (Value::Object(target), Value::Object(extra)) = (&mut body, extra) {
            target.extend(extra);
        }

        let res = self
            .client
            .post(self.url("/ecopontos"))
            .json(&body)
            .send()
            .await?;
        anyhow::ensure!(res.status().as_u16() == 201, "create failed: {}", res.status());

        let created = res.json::<Value>().await?;
        created["id"]
            .as_str()
            .map(str::to_string)
            .context("response without id")
    }
}

pub async fn spawn_server() -> Result<TestServer> {
    spawn_server_with(MemoryStore::new()).await
}

pub async fn spawn_server_with(store: MemoryStore) -> Result<TestServer> {
    let store = Arc::new(store);
    spawn(store.clone(), store).await
}

/// Server whose store fails the given kind of call
pub async fn spawn_failing_server(store: MemoryStore, failures: Failures) -> Result<TestServer> {
    let store = Arc::new(store);
    let backend = Arc::new(FailingStore {
        inner: store.clone(),
        failures,
    });
    spawn(store, backend).await
}

async fn spawn(store: Arc<MemoryStore>, backend: Arc<dyn DocumentStore>) -> Result<TestServer> {
    // Pick an unused port for isolation
    let port = portpicker::pick_unused_port().context("failed to pick free port")?;
    let base_url = format!("http://127.0.0.1:{}", port);

    let identity = Arc::new(MemoryIdentityVerifier::new());
    let state = AppState::new(backend, identity.clone());

    let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
        .await
        .context("failed to bind test listener")?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, app(state)).await;
    });

    Ok(TestServer {
        port,
        base_url,
        store,
        identity,
        client: reqwest::Client::new(),
    })
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Failures {
    Reads,
    Writes,
}

pub const STORE_FAILURE: &str = "Service Unavailable";

/// MemoryStore wrapper that answers one kind of call with a 503 from the database
pub struct FailingStore {
    inner: Arc<MemoryStore>,
    failures: Failures,
}

impl FailingStore {
    fn fail_if(&self, kind: Failures) -> Result<(), StoreError> {
        if self.failures == kind {
            return Err(StoreError::Remote {
                status: 503,
                message: STORE_FAILURE.to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for FailingStore {
    async fn get(&self, path: &str) -> Result<Option<Value>, StoreError> {
        self.fail_if(Failures::Reads)?;
        self.inner.get(path).await
    }

    async fn set(&self, path: &str, value: Value) -> Result<(), StoreError> {
        self.fail_if(Failures::Writes)?;
        self.inner.set(path, value).await
    }

    async fn update(&self, path: &str, fields: Map<String, Value>) -> Result<(), StoreError> {
        self.fail_if(Failures::Writes)?;
        self.inner.update(path, fields).await
    }

    async fn delete(&self, path: &str) -> Result<(), StoreError> {
        self.fail_if(Failures::Writes)?;
        self.inner.delete(path).await
    }

    async fn push(&self, path: &str, value: Value) -> Result<String, StoreError> {
        self.fail_if(Failures::Writes)?;
        self.inner.push(path, value).await
    }
}

/// Assert a 500 whose detail starts with `prefix` and carries the store's message
pub async fn assert_dependency_error(res: reqwest::Response, prefix: &str) -> Result<()> {
    assert_eq!(res.status().as_u16(), 500);
    let body = res.json::<Value>().await?;
    let detail = body["detail"].as_str().context("detail string")?;
    assert!(
        detail.starts_with(&format!("{}: ", prefix)),
        "unexpected detail: {}",
        detail
    );
    assert!(detail.contains(STORE_FAILURE), "unexpected detail: {}", detail);
    Ok(())
}

pub fn ecoponto_body() -> Value {
    json!({
        "nome": "Ecoponto Vila Mariana",
        "endereco": "Rua Domingos de Morais, 100",
        "cep": "04010-000",
        "latitude": -23.5874,
        "longitude": -46.6367,
        "criadoPor": "uid-ana",
        "status": "pendente"
    })
}

pub fn sugestao_body() -> Value {
    json!({
        "usuarioId": "uid-ana",
        "nome": "Ponto de coleta Pinheiros",
        "endereco": "Rua dos Pinheiros, 500",
        "cep": "05422-000",
        "latitude": -23.5665,
        "longitude": -46.6844
    })
}
