//! The owner identifier every todo request is scoped to.
//!
//! The owner is read verbatim from a request header and is not verified.
//! Extraction is confined to this module: replacing the header with a
//! verified identity (e.g. a token claim injected by an auth layer) only
//! changes `Owner::from_request_parts`.

use axum::{extract::FromRequestParts, http::request::Parts};
use todo_store::{CollectionPath, DocumentPath};

use crate::error::ServiceError;
use crate::AppState;

pub const OWNERS_COLLECTION: &str = "owners";
pub const TODOS_COLLECTION: &str = "todos";

/// A non-empty owner id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Owner(String);

impl Owner {
    pub fn new(id: impl Into<String>) -> Result<Self, ServiceError> {
        let id = id.into();
        if id.is_empty() {
            return Err(ServiceError::MissingOwner);
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `owners/{owner}/todos`
    pub fn todos(&self) -> Result<CollectionPath, ServiceError> {
        CollectionPath::root(OWNERS_COLLECTION)
            .and_then(|owners| owners.doc(&self.0))
            .and_then(|owner| owner.collection(TODOS_COLLECTION))
            .map_err(|e| ServiceError::invalid(format!("Invalid user ID: {e}.")))
    }

    /// `owners/{owner}/todos/{id}`. An id that cannot name a document is
    /// reported as not found.
    pub fn todo(&self, id: &str) -> Result<DocumentPath, ServiceError> {
        self.todos()?.doc(id).map_err(|_| ServiceError::NotFound)
    }
}

impl FromRequestParts<AppState> for Owner {
    type Rejection = ServiceError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(&state.owner_header)
            .ok_or(ServiceError::MissingOwner)?;
        // Header values are raw bytes; any UTF-8 text is a usable owner id.
        let id = std::str::from_utf8(value.as_bytes())
            .map_err(|_| ServiceError::invalid("Invalid user ID: header is not valid UTF-8."))?;
        Owner::new(id)
    }
}
