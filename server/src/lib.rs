//! HTTP API for per-owner todo lists.
//!
//! Routes:
//!
//! | Method | Path | |
//! |---|---|---|
//! | GET | `/todos` | list the owner's todos |
//! | POST | `/todos` | create a todo from `{text, datetime}` |
//! | GET | `/todos/{id}` | fetch one todo |
//! | PUT | `/todos/{id}` | merge `text` and/or `datetime` into a todo |
//! | DELETE | `/todos/{id}` | delete a todo |
//! | GET | `/health` | liveness |
//!
//! Every `/todos` route requires the owner header (default `user-id`) and
//! only ever touches `owners/{owner}/todos` in the document store.

pub mod config;
pub mod error;
pub mod handlers;
pub mod model;
pub mod observability;
pub mod owner;
pub mod service;

use std::sync::Arc;

use axum::{http::HeaderName, routing::get, Router};
use tokio::net::TcpListener;
use todo_store::DocumentStore;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub use error::ServiceError;
pub use model::Todo;
pub use owner::Owner;
pub use service::TodoService;

/// Header carrying the owner id unless configured otherwise.
pub const DEFAULT_OWNER_HEADER: &str = "user-id";

/// State shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub service: TodoService,
    pub owner_header: HeaderName,
}

impl AppState {
    pub fn new(service: TodoService, owner_header: HeaderName) -> Self {
        Self {
            service,
            owner_header,
        }
    }

    /// State over `store` with the default owner header.
    pub fn with_store(store: Arc<dyn DocumentStore>) -> Self {
        Self::new(
            TodoService::new(store),
            HeaderName::from_static(DEFAULT_OWNER_HEADER),
        )
    }
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/todos", get(handlers::list_todos).post(handlers::create_todo))
        .route(
            "/todos/{id}",
            get(handlers::get_todo)
                .put(handlers::update_todo)
                .delete(handlers::delete_todo),
        )
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

pub async fn run(listener: TcpListener, state: AppState) -> Result<(), std::io::Error> {
    axum::serve(listener, app(state)).await
}
