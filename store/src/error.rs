//! Error types for document stores.
//!
//! # Design
//! `NotFound` gets a dedicated variant because callers map it to a distinct
//! outcome ("the document does not exist") while every other failure is an
//! opaque store outage to them. Non-2xx responses from a remote store land in
//! `Status` with the raw status code and the store's message for logging.

use thiserror::Error;

/// Errors returned by `DocumentStore` implementations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The addressed document does not exist.
    #[error("document not found")]
    NotFound,

    /// The request never produced a response (connect, TLS, I/O).
    #[error("transport failed: {0}")]
    Transport(String),

    /// The store answered with a non-2xx status other than not-found.
    #[error("store returned HTTP {status}: {message}")]
    Status { status: u16, message: String },

    /// An access token could not be obtained.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// A response or stored document could not be decoded.
    #[error("decode failed: {0}")]
    Decode(String),

    /// The configured credentials are unusable.
    #[error("invalid credentials: {0}")]
    Credentials(String),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound)
    }
}

/// Reasons a collection or document id is rejected as a path segment.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("path segment is empty")]
    Empty,

    #[error("path segment {0:?} contains '/'")]
    ContainsSlash(String),

    #[error("path segment {0:?} is reserved")]
    Reserved(String),

    #[error("path segment exceeds {max} bytes")]
    TooLong { max: usize },
}
