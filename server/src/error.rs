//! Service errors and their HTTP rendering.
//!
//! # Design
//! Validation failures are raised before any store call. Store failures are
//! split in two: absence becomes `NotFound`, everything else becomes
//! `StoreUnavailable`, whose source is logged here and never serialized.

use std::fmt;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use todo_store::StoreError;

/// The store operation a request performs, used to word failure messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    List,
    Create,
    Get,
    Update,
    Delete,
}

impl Operation {
    fn failure_message(self) -> &'static str {
        match self {
            Operation::List => "Failed to fetch to-dos.",
            Operation::Create => "Failed to create to-do.",
            Operation::Get => "Failed to fetch to-do.",
            Operation::Update => "Failed to update to-do.",
            Operation::Delete => "Failed to delete to-do.",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::List => "list",
            Operation::Create => "create",
            Operation::Get => "get",
            Operation::Update => "update",
            Operation::Delete => "delete",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum ServiceError {
    /// No owner identifier accompanied the request.
    #[error("User ID is required.")]
    MissingOwner,

    /// A required field is missing or a value is unusable.
    #[error("{0}")]
    InvalidInput(String),

    /// The referenced todo does not exist for this owner.
    #[error("To-do not found.")]
    NotFound,

    /// The document store failed for a reason other than absence.
    #[error("store unavailable during {operation}: {source}")]
    StoreUnavailable {
        operation: Operation,
        #[source]
        source: StoreError,
    },
}

impl ServiceError {
    pub fn invalid(reason: impl Into<String>) -> Self {
        ServiceError::InvalidInput(reason.into())
    }

    /// Classify a store failure during `operation`.
    pub fn from_store(operation: Operation) -> impl FnOnce(StoreError) -> ServiceError {
        move |source| {
            if source.is_not_found() {
                ServiceError::NotFound
            } else {
                ServiceError::StoreUnavailable { operation, source }
            }
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ServiceError::MissingOwner | ServiceError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ServiceError::NotFound => StatusCode::NOT_FOUND,
            ServiceError::StoreUnavailable { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Body of every error response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub status: u16,
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error = match &self {
            ServiceError::StoreUnavailable { operation, source } => {
                tracing::error!(%operation, error = %source, "document store call failed");
                operation.failure_message().to_string()
            }
            other => {
                tracing::debug!(status = status.as_u16(), error = %other, "request rejected");
                other.to_string()
            }
        };

        (
            status,
            Json(ErrorBody {
                error,
                status: status.as_u16(),
            }),
        )
            .into_response()
    }
}
