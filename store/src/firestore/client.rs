//! Stateless request builder and response parser for the Firestore REST API.
//!
//! # Design
//! `FirestoreClient` holds only the documents root URL and carries no mutable
//! state between calls. Each store operation is split into a `build_*` method
//! that produces an `HttpRequest` and a `parse_*` method that consumes an
//! `HttpResponse`. `FirestoreStore` performs the round trip in between and
//! adds the bearer token.

use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::error::StoreError;
use crate::firestore::value::{decode_fields, encode_fields};
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::path::{CollectionPath, DocumentPath};
use crate::types::{Document, Fields};

/// Documents requested per page when listing a collection.
pub const LIST_PAGE_SIZE: u32 = 300;

/// Precondition that makes update and delete fail on a missing document.
const MUST_EXIST: &str = "currentDocument.exists=true";

/// One page of a collection listing.
#[derive(Debug, Clone, PartialEq)]
pub struct ListPage {
    pub documents: Vec<Document>,
    pub next_page_token: Option<String>,
}

#[derive(Deserialize)]
struct WireDocument {
    name: String,
    #[serde(default)]
    fields: Map<String, Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireListResponse {
    #[serde(default)]
    documents: Vec<WireDocument>,
    next_page_token: Option<String>,
}

#[derive(Deserialize)]
struct WireErrorBody {
    error: WireError,
}

#[derive(Deserialize)]
struct WireError {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
}

/// Synchronous, stateless client for the Firestore documents API.
#[derive(Debug, Clone)]
pub struct FirestoreClient {
    documents_url: String,
}

impl FirestoreClient {
    /// `endpoint` is the API root, e.g. `https://firestore.googleapis.com/v1`.
    pub fn new(endpoint: &str, project_id: &str) -> Self {
        Self {
            documents_url: format!(
                "{}/projects/{}/databases/(default)/documents",
                endpoint.trim_end_matches('/'),
                urlencoding::encode(project_id)
            ),
        }
    }

    pub fn documents_url(&self) -> &str {
        &self.documents_url
    }

    pub fn build_list(&self, collection: &CollectionPath, page_token: Option<&str>) -> HttpRequest {
        let mut url = format!(
            "{}?pageSize={LIST_PAGE_SIZE}",
            self.collection_url(collection)
        );
        if let Some(token) = page_token {
            url.push_str("&pageToken=");
            url.push_str(&urlencoding::encode(token));
        }
        HttpRequest::new(HttpMethod::Get, url)
    }

    pub fn build_get(&self, document: &DocumentPath) -> HttpRequest {
        HttpRequest::new(HttpMethod::Get, self.document_url(document))
    }

    pub fn build_insert(
        &self,
        collection: &CollectionPath,
        fields: &Fields,
    ) -> Result<HttpRequest, StoreError> {
        let body = write_body(fields)?;
        Ok(HttpRequest::new(HttpMethod::Post, self.collection_url(collection)).with_json(body))
    }

    pub fn build_merge_update(
        &self,
        document: &DocumentPath,
        fields: &Fields,
    ) -> Result<HttpRequest, StoreError> {
        let mut url = format!("{}?", self.document_url(document));
        for name in fields.keys() {
            url.push_str("updateMask.fieldPaths=");
            url.push_str(&urlencoding::encode(&quote_field_path(name)));
            url.push('&');
        }
        url.push_str(MUST_EXIST);
        let body = write_body(fields)?;
        Ok(HttpRequest::new(HttpMethod::Patch, url).with_json(body))
    }

    pub fn build_delete(&self, document: &DocumentPath) -> HttpRequest {
        let url = format!("{}?{MUST_EXIST}", self.document_url(document));
        HttpRequest::new(HttpMethod::Delete, url)
    }

    pub fn parse_list(&self, response: HttpResponse) -> Result<ListPage, StoreError> {
        check_reachable(&response)?;
        let wire: WireListResponse = from_body(&response.body)?;
        let documents = wire
            .documents
            .into_iter()
            .map(into_document)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ListPage {
            documents,
            next_page_token: wire.next_page_token.filter(|token| !token.is_empty()),
        })
    }

    pub fn parse_get(&self, response: HttpResponse) -> Result<Option<Document>, StoreError> {
        match check_status(&response) {
            Ok(()) => into_document(from_body(&response.body)?).map(Some),
            Err(StoreError::NotFound) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub fn parse_insert(&self, response: HttpResponse) -> Result<Document, StoreError> {
        check_reachable(&response)?;
        into_document(from_body(&response.body)?)
    }

    pub fn parse_merge_update(&self, response: HttpResponse) -> Result<(), StoreError> {
        check_precondition(&response)
    }

    pub fn parse_delete(&self, response: HttpResponse) -> Result<(), StoreError> {
        check_precondition(&response)
    }

    fn collection_url(&self, collection: &CollectionPath) -> String {
        join_encoded(
            &self.documents_url,
            collection.segments().iter().map(String::as_str),
        )
    }

    fn document_url(&self, document: &DocumentPath) -> String {
        join_encoded(&self.documents_url, document.segments())
    }
}

fn join_encoded<'a>(base: &str, segments: impl Iterator<Item = &'a str>) -> String {
    let mut url = base.to_string();
    for segment in segments {
        url.push('/');
        url.push_str(&urlencoding::encode(segment));
    }
    url
}

fn write_body(fields: &Fields) -> Result<String, StoreError> {
    serde_json::to_string(&json!({ "fields": encode_fields(fields) }))
        .map_err(|e| StoreError::Decode(e.to_string()))
}

fn from_body<'a, T: Deserialize<'a>>(body: &'a str) -> Result<T, StoreError> {
    serde_json::from_str(body).map_err(|e| StoreError::Decode(e.to_string()))
}

fn into_document(wire: WireDocument) -> Result<Document, StoreError> {
    let id = wire
        .name
        .rsplit('/')
        .next()
        .filter(|id| !id.is_empty())
        .ok_or_else(|| StoreError::Decode(format!("bad document name {:?}", wire.name)))?;
    Ok(Document::new(id, decode_fields(&wire.fields)?))
}

/// Quote a field name for use in an update mask.
///
/// Names that are not plain identifiers must be wrapped in backticks, with
/// backticks and backslashes inside escaped.
fn quote_field_path(name: &str) -> String {
    let mut chars = name.chars();
    let simple = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if simple {
        return name.to_string();
    }
    let escaped = name.replace('\\', "\\\\").replace('`', "\\`");
    format!("`{escaped}`")
}

/// Map non-success status codes to the appropriate `StoreError` variant.
fn check_status(response: &HttpResponse) -> Result<(), StoreError> {
    if response.is_success() {
        return Ok(());
    }
    let (status, message) = error_detail(response);
    if (response.status == 404 || status == "NOT_FOUND") && !names_missing_container(&message) {
        return Err(StoreError::NotFound);
    }
    Err(StoreError::Status {
        status: response.status,
        message,
    })
}

/// Firestore also answers 404 when the project or database is missing, as in
/// "The database (default) does not exist for project demo". Absent documents
/// are reported as "not found" or "No document to update" instead.
fn names_missing_container(message: &str) -> bool {
    message.contains("does not exist")
}

/// Like `check_status`, for calls addressing a collection. A missing
/// collection lists as empty, so a 404 here means the project or database is
/// wrong rather than a document being absent.
fn check_reachable(response: &HttpResponse) -> Result<(), StoreError> {
    match check_status(response) {
        Err(StoreError::NotFound) => Err(StoreError::Status {
            status: response.status,
            message: error_detail(response).1,
        }),
        other => other,
    }
}

/// Like `check_status`, but a failed existence precondition also means the
/// document is absent.
fn check_precondition(response: &HttpResponse) -> Result<(), StoreError> {
    match check_status(response) {
        Err(StoreError::Status { .. }) if error_detail(response).0 == "FAILED_PRECONDITION" => {
            Err(StoreError::NotFound)
        }
        other => other,
    }
}

fn error_detail(response: &HttpResponse) -> (String, String) {
    match serde_json::from_str::<WireErrorBody>(&response.body) {
        Ok(body) => (body.error.status, body.error.message),
        Err(_) => (String::new(), response.body.clone()),
    }
}
