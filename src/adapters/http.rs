//! HTTP adapter for JSON REST document APIs.
//!
//! Route shape: `GET /{collection}`, `GET|PATCH|DELETE /{collection}/{id}`,
//! `POST /{collection}` for inserts and `POST /{collection}/query` for
//! filtered reads. Authentication is the embedding application's concern and
//! rides on the preconfigured [`reqwest::Client`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::domain::errors::RemoteStoreError;
use crate::domain::models::{QuerySpec, RawDocument};
use crate::domain::ports::RemoteStore;

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Remote store speaking a JSON REST dialect.
pub struct HttpRemoteStore {
    client: Client,
    base_url: String,
}

#[derive(Deserialize)]
struct InsertResponse {
    id: String,
}

impl HttpRemoteStore {
    /// Build a store with a default client (30s timeout, rustls).
    pub fn new(base_url: impl Into<String>) -> Result<Self, RemoteStoreError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .map_err(|err| {
                RemoteStoreError::InvalidResponse(format!("failed to build http client: {err}"))
            })?;
        Ok(Self::with_client(client, base_url))
    }

    /// Build a store around a preconfigured client (auth headers, proxies).
    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }
}

/// Transport-level failures (connect, timeout, body read) are transient.
fn transport_error(err: reqwest::Error) -> RemoteStoreError {
    RemoteStoreError::Transient(err.to_string())
}

fn check_status(response: Response) -> Result<Response, RemoteStoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        Err(RemoteStoreError::PermissionDenied(format!(
            "store returned {status}"
        )))
    } else if status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::TOO_MANY_REQUESTS
        || status.is_server_error()
    {
        Err(RemoteStoreError::Transient(format!(
            "store returned {status}"
        )))
    } else {
        Err(RemoteStoreError::InvalidResponse(format!(
            "store returned {status}"
        )))
    }
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, RemoteStoreError> {
    response
        .json::<T>()
        .await
        .map_err(|err| RemoteStoreError::InvalidResponse(err.to_string()))
}

#[async_trait]
impl RemoteStore for HttpRemoteStore {
    async fn fetch_all(&self, collection: &str) -> Result<Vec<RawDocument>, RemoteStoreError> {
        let response = self
            .client
            .get(self.url(collection))
            .send()
            .await
            .map_err(transport_error)?;
        read_json(check_status(response)?).await
    }

    async fn fetch_by_id(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<RawDocument>, RemoteStoreError> {
        let response = self
            .client
            .get(self.url(&format!("{collection}/{id}")))
            .send()
            .await
            .map_err(transport_error)?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let doc: RawDocument = read_json(check_status(response)?).await?;
        Ok(Some(doc))
    }

    async fn insert(&self, collection: &str, fields: Value) -> Result<String, RemoteStoreError> {
        let response = self
            .client
            .post(self.url(collection))
            .json(&fields)
            .send()
            .await
            .map_err(transport_error)?;

        let body: InsertResponse = read_json(check_status(response)?).await?;
        if body.id.is_empty() {
            return Err(RemoteStoreError::InvalidResponse(
                "store returned an empty id".to_string(),
            ));
        }
        debug!(collection, id = %body.id, "inserted document");
        Ok(body.id)
    }

    async fn patch(
        &self,
        collection: &str,
        id: &str,
        partial: Value,
    ) -> Result<(), RemoteStoreError> {
        let response = self
            .client
            .patch(self.url(&format!("{collection}/{id}")))
            .json(&partial)
            .send()
            .await
            .map_err(transport_error)?;
        check_status(response)?;
        Ok(())
    }

    async fn remove(&self, collection: &str, id: &str) -> Result<(), RemoteStoreError> {
        let response = self
            .client
            .delete(self.url(&format!("{collection}/{id}")))
            .send()
            .await
            .map_err(transport_error)?;
        check_status(response)?;
        Ok(())
    }

    async fn fetch_filtered(
        &self,
        collection: &str,
        spec: &QuerySpec,
    ) -> Result<Vec<RawDocument>, RemoteStoreError> {
        let response = self
            .client
            .post(self.url(&format!("{collection}/query")))
            .json(spec)
            .send()
            .await
            .map_err(transport_error)?;
        read_json(check_status(response)?).await
    }
}
