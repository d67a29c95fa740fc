//! Todo operations on top of a `DocumentStore`.
//!
//! Each operation validates its input, derives the owner-scoped path, and
//! performs exactly one store call. Nothing is cached and nothing is retried.

use std::sync::Arc;

use serde_json::Value;
use todo_store::{DocumentStore, Fields};

use crate::error::{Operation, ServiceError};
use crate::model::{CreateTodo, Todo, TodoChanges, UpdateTodo, DATETIME_FIELD, TEXT_FIELD};
use crate::owner::Owner;

const CREATE_FIELDS_REQUIRED: &str = "Both 'text' and 'datetime' are required.";
const UPDATE_FIELD_REQUIRED: &str = "At least one of 'text' or 'datetime' must be provided.";

#[derive(Clone)]
pub struct TodoService {
    store: Arc<dyn DocumentStore>,
}

/// Treat an empty string the same as an absent field.
fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

impl TodoService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub async fn list(&self, owner: &Owner) -> Result<Vec<Todo>, ServiceError> {
        let collection = owner.todos()?;
        let documents = self
            .store
            .list(&collection)
            .await
            .map_err(ServiceError::from_store(Operation::List))?;
        documents
            .into_iter()
            .map(Todo::try_from)
            .collect::<Result<Vec<_>, _>>()
            .map_err(ServiceError::from_store(Operation::List))
    }

    pub async fn create(&self, owner: &Owner, input: CreateTodo) -> Result<Todo, ServiceError> {
        let (Some(text), Some(datetime)) = (present(input.text), present(input.datetime)) else {
            return Err(ServiceError::invalid(CREATE_FIELDS_REQUIRED));
        };
        let collection = owner.todos()?;

        let mut fields = Fields::new();
        fields.insert(TEXT_FIELD.to_string(), Value::String(text.clone()));
        fields.insert(DATETIME_FIELD.to_string(), Value::String(datetime.clone()));

        let created = self
            .store
            .insert(&collection, fields)
            .await
            .map_err(ServiceError::from_store(Operation::Create))?;
        tracing::info!(owner = owner.as_str(), id = %created.id, "todo created");

        Ok(Todo {
            id: created.id,
            text,
            datetime,
        })
    }

    pub async fn get(&self, owner: &Owner, id: &str) -> Result<Todo, ServiceError> {
        let document = owner.todo(id)?;
        let found = self
            .store
            .get(&document)
            .await
            .map_err(ServiceError::from_store(Operation::Get))?
            .ok_or(ServiceError::NotFound)?;
        Todo::try_from(found).map_err(ServiceError::from_store(Operation::Get))
    }

    /// Merge the supplied fields into an existing todo. No existence check
    /// precedes the write; the store reports a missing document itself.
    pub async fn update(
        &self,
        owner: &Owner,
        id: &str,
        input: UpdateTodo,
    ) -> Result<TodoChanges, ServiceError> {
        let changes = TodoChanges {
            id: id.to_string(),
            text: present(input.text),
            datetime: present(input.datetime),
        };
        if changes.text.is_none() && changes.datetime.is_none() {
            return Err(ServiceError::invalid(UPDATE_FIELD_REQUIRED));
        }
        let document = owner.todo(id)?;

        self.store
            .merge_update(&document, changes.to_fields())
            .await
            .map_err(ServiceError::from_store(Operation::Update))?;
        tracing::info!(owner = owner.as_str(), id, "todo updated");

        Ok(changes)
    }

    /// Delete a todo. Deleting an id that does not exist is `NotFound`.
    pub async fn delete(&self, owner: &Owner, id: &str) -> Result<(), ServiceError> {
        let document = owner.todo(id)?;
        self.store
            .delete(&document)
            .await
            .map_err(ServiceError::from_store(Operation::Delete))?;
        tracing::info!(owner = owner.as_str(), id, "todo deleted");
        Ok(())
    }
}
