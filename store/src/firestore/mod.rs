//! Firestore-backed `DocumentStore` over the REST API.

pub mod auth;
pub mod client;
pub mod value;

use std::sync::Arc;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

use crate::error::StoreError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::path::{CollectionPath, DocumentPath};
use crate::store::DocumentStore;
use crate::types::{Document, Fields};

pub use auth::{ServiceAccountKey, ServiceAccountTokenSource, StaticToken, TokenSource};
pub use client::{FirestoreClient, ListPage};

/// Production API root.
pub const FIRESTORE_ENDPOINT: &str = "https://firestore.googleapis.com/v1";

/// Executes `FirestoreClient` requests with `reqwest`, attaching a bearer
/// token from its `TokenSource`.
#[derive(Clone)]
pub struct FirestoreStore {
    client: FirestoreClient,
    http: reqwest::Client,
    tokens: Arc<dyn TokenSource>,
}

impl FirestoreStore {
    pub fn new(
        endpoint: &str,
        project_id: &str,
        http: reqwest::Client,
        tokens: Arc<dyn TokenSource>,
    ) -> Self {
        Self {
            client: FirestoreClient::new(endpoint, project_id),
            http,
            tokens,
        }
    }

    /// Production Firestore, authenticated as the given service account.
    pub fn with_service_account(key: ServiceAccountKey) -> Self {
        let http = reqwest::Client::new();
        let project_id = key.project_id.clone();
        let tokens = Arc::new(ServiceAccountTokenSource::new(key, http.clone()));
        Self::new(FIRESTORE_ENDPOINT, &project_id, http, tokens)
    }

    /// A local emulator at `host` (`host:port`, no scheme).
    pub fn with_emulator(host: &str, project_id: &str) -> Self {
        Self::new(
            &format!("http://{host}/v1"),
            project_id,
            reqwest::Client::new(),
            Arc::new(StaticToken::emulator()),
        )
    }

    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, StoreError> {
        let token = self.tokens.access_token().await?;
        execute(&self.http, request, Some(&token)).await
    }
}

/// Perform one HTTP round trip. Non-2xx statuses are returned as data.
pub(crate) async fn execute(
    http: &reqwest::Client,
    request: HttpRequest,
    bearer: Option<&SecretString>,
) -> Result<HttpResponse, StoreError> {
    let method = match request.method {
        HttpMethod::Get => reqwest::Method::GET,
        HttpMethod::Post => reqwest::Method::POST,
        HttpMethod::Patch => reqwest::Method::PATCH,
        HttpMethod::Delete => reqwest::Method::DELETE,
    };

    let mut builder = http.request(method, &request.url);
    for (name, value) in &request.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    if let Some(token) = bearer {
        builder = builder.bearer_auth(token.expose_secret());
    }
    if let Some(body) = request.body {
        builder = builder.body(body);
    }

    let response = builder
        .send()
        .await
        .map_err(|e| StoreError::Transport(e.to_string()))?;
    let status = response.status().as_u16();
    let body = response
        .text()
        .await
        .map_err(|e| StoreError::Transport(e.to_string()))?;
    Ok(HttpResponse { status, body })
}

#[async_trait]
impl DocumentStore for FirestoreStore {
    async fn list(&self, collection: &CollectionPath) -> Result<Vec<Document>, StoreError> {
        let mut documents = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let request = self.client.build_list(collection, page_token.as_deref());
            let page = self.client.parse_list(self.send(request).await?)?;
            documents.extend(page.documents);
            match page.next_page_token {
                Some(token) if page_token.as_deref() == Some(token.as_str()) => {
                    tracing::warn!(%collection, %token, "page token repeated, stopping list");
                    break;
                }
                Some(token) => page_token = Some(token),
                None => break,
            }
        }
        tracing::debug!(%collection, count = documents.len(), "listed documents");
        Ok(documents)
    }

    async fn get(&self, document: &DocumentPath) -> Result<Option<Document>, StoreError> {
        let request = self.client.build_get(document);
        let found = self.client.parse_get(self.send(request).await?)?;
        tracing::debug!(%document, found = found.is_some(), "fetched document");
        Ok(found)
    }

    async fn insert(
        &self,
        collection: &CollectionPath,
        fields: Fields,
    ) -> Result<Document, StoreError> {
        let request = self.client.build_insert(collection, &fields)?;
        let created = self.client.parse_insert(self.send(request).await?)?;
        tracing::debug!(%collection, id = %created.id, "inserted document");
        Ok(created)
    }

    async fn merge_update(
        &self,
        document: &DocumentPath,
        fields: Fields,
    ) -> Result<(), StoreError> {
        let request = self.client.build_merge_update(document, &fields)?;
        self.client.parse_merge_update(self.send(request).await?)?;
        tracing::debug!(%document, "merged document fields");
        Ok(())
    }

    async fn delete(&self, document: &DocumentPath) -> Result<(), StoreError> {
        let request = self.client.build_delete(document);
        self.client.parse_delete(self.send(request).await?)?;
        tracing::debug!(%document, "deleted document");
        Ok(())
    }
}
