use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};

use crate::error::ServiceError;
use crate::model::{
    CreateTodo, HealthResponse, MessageResponse, Todo, UpdateTodo, UpdatedResponse,
};
use crate::owner::Owner;
use crate::AppState;

const UPDATED_MESSAGE: &str = "To-do updated successfully.";
const DELETED_MESSAGE: &str = "To-do deleted successfully.";

/// Unwrap a JSON body, turning axum's rejection into the API's own 400.
fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ServiceError> {
    payload.map(|Json(value)| value).map_err(|rejection| {
        ServiceError::invalid(format!("Invalid JSON body: {}", rejection.body_text()))
    })
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

pub async fn list_todos(
    State(state): State<AppState>,
    owner: Owner,
) -> Result<Json<Vec<Todo>>, ServiceError> {
    state.service.list(&owner).await.map(Json)
}

pub async fn create_todo(
    State(state): State<AppState>,
    owner: Owner,
    payload: Result<Json<CreateTodo>, JsonRejection>,
) -> Result<(StatusCode, Json<Todo>), ServiceError> {
    let input = body(payload)?;
    let todo = state.service.create(&owner, input).await?;
    Ok((StatusCode::CREATED, Json(todo)))
}

pub async fn get_todo(
    State(state): State<AppState>,
    owner: Owner,
    Path(id): Path<String>,
) -> Result<Json<Todo>, ServiceError> {
    state.service.get(&owner, &id).await.map(Json)
}

pub async fn update_todo(
    State(state): State<AppState>,
    owner: Owner,
    Path(id): Path<String>,
    payload: Result<Json<UpdateTodo>, JsonRejection>,
) -> Result<Json<UpdatedResponse>, ServiceError> {
    let input = body(payload)?;
    let changes = state.service.update(&owner, &id, input).await?;
    Ok(Json(UpdatedResponse {
        message: UPDATED_MESSAGE,
        changes,
    }))
}

pub async fn delete_todo(
    State(state): State<AppState>,
    owner: Owner,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ServiceError> {
    state.service.delete(&owner, &id).await?;
    Ok(Json(MessageResponse {
        message: DELETED_MESSAGE,
    }))
}
