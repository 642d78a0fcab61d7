use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use url::Url;

use super::{segments, DocumentStore, StoreError};
use crate::auth::ServiceAccountTokenSource;

/// Firebase Realtime Database over its REST API
pub struct RealtimeDatabase {
    client: reqwest::Client,
    base_url: Url,
    tokens: Arc<ServiceAccountTokenSource>,
}

#[derive(Debug, Deserialize)]
struct PushResponse {
    name: String,
}

impl RealtimeDatabase {
    pub fn new(
        client: reqwest::Client,
        base_url: Url,
        tokens: Arc<ServiceAccountTokenSource>,
    ) -> Self {
        Self {
            client,
            base_url,
            tokens,
        }
    }

    /// `{base}/{path}.json?access_token=...`
    async fn endpoint(&self, path: &str) -> Result<Url, StoreError> {
        let mut url = resource_url(&self.base_url, path)?;

        let token = self
            .tokens
            .access_token()
            .await
            .map_err(|e| StoreError::Credentials(e.to_string()))?;
        url.query_pairs_mut().append_pair("access_token", &token);

        Ok(url)
    }
}

/// Resource URL for `path`, without credentials
pub(crate) fn resource_url(base_url: &Url, path: &str) -> Result<Url, StoreError> {
    let mut url = base_url.clone();
    let parts: Vec<&str> = segments(path).collect();

    {
        let mut url_segments = url
            .path_segments_mut()
            .map_err(|_| StoreError::Decode(format!("cannot build paths on {}", base_url)))?;
        url_segments.pop_if_empty();

        match parts.split_last() {
            None => {
                url_segments.push(".json");
            }
            Some((last, parents)) => {
                url_segments.extend(parents.iter().copied());
                url_segments.push(&format!("{}.json", last));
            }
        }
    }

    Ok(url)
}

/// Turn a non-2xx response into a StoreError, keeping the database's message
async fn check(response: reqwest::Response) -> Result<reqwest::Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|v| v.get("error").and_then(Value::as_str).map(str::to_string))
        .unwrap_or(body);

    Err(StoreError::Remote {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl DocumentStore for RealtimeDatabase {
    async fn get(&self, path: &str) -> Result<Option<Value>, StoreError> {
        let url = self.endpoint(path).await?;
        let response = check(self.client.get(url).send().await?).await?;

        let value: Value = response
            .json()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))?;

        Ok(match value {
            Value::Null => None,
            other => Some(other),
        })
    }

    async fn set(&self, path: &str, value: Value) -> Result<(), StoreError> {
        let mut url = self.endpoint(path).await?;
        url.query_pairs_mut().append_pair("print", "silent");
        check(self.client.put(url).json(&value).send().await?).await?;
        Ok(())
    }

    async fn update(&self, path: &str, fields: Map<String, Value>) -> Result<(), StoreError> {
        let mut url = self.endpoint(path).await?;
        url.query_pairs_mut().append_pair("print", "silent");
        check(self.client.patch(url).json(&fields).send().await?).await?;
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<(), StoreError> {
        let url = self.endpoint(path).await?;
        check(self.client.delete(url).send().await?).await?;
        Ok(())
    }

    async fn push(&self, path: &str, value: Value) -> Result<String, StoreError> {
        let url = self.endpoint(path).await?;
        let response = check(self.client.post(url).json(&value).send().await?).await?;

        let body: PushResponse = response
            .json()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))?;
        tracing::debug!("pushed new child {} under {}", body.name, path);

        Ok(body.name)
    }
}
