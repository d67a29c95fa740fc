//! Wire types of the todo API.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use todo_store::{Document, Fields, StoreError};

pub const TEXT_FIELD: &str = "text";
pub const DATETIME_FIELD: &str = "datetime";

/// A todo as returned by the API.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Todo {
    pub id: String,
    pub text: String,
    pub datetime: String,
}

impl TryFrom<Document> for Todo {
    type Error = StoreError;

    fn try_from(doc: Document) -> Result<Self, Self::Error> {
        let field = |name: &str| {
            doc.str_field(name).map(str::to_string).ok_or_else(|| {
                StoreError::Decode(format!("document {} has no string field {name}", doc.id))
            })
        };
        let text = field(TEXT_FIELD)?;
        let datetime = field(DATETIME_FIELD)?;
        Ok(Todo {
            id: doc.id,
            text,
            datetime,
        })
    }
}

/// Body of `POST /todos`. Both fields are required; presence is checked by
/// the service so that a missing field gets the API's own error message.
#[derive(Debug, Default, Deserialize)]
pub struct CreateTodo {
    pub text: Option<String>,
    pub datetime: Option<String>,
}

/// Body of `PUT /todos/{id}`. Only the fields present are applied; omitted
/// fields keep their stored values.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateTodo {
    pub text: Option<String>,
    pub datetime: Option<String>,
}

/// The fields an update actually wrote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TodoChanges {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub datetime: Option<String>,
}

impl TodoChanges {
    pub fn to_fields(&self) -> Fields {
        let mut fields = Fields::new();
        if let Some(text) = &self.text {
            fields.insert(TEXT_FIELD.to_string(), Value::String(text.clone()));
        }
        if let Some(datetime) = &self.datetime {
            fields.insert(DATETIME_FIELD.to_string(), Value::String(datetime.clone()));
        }
        fields
    }
}

/// Response of `PUT /todos/{id}`: a message plus the written fields.
#[derive(Debug, Serialize)]
pub struct UpdatedResponse {
    pub message: &'static str,
    #[serde(flatten)]
    pub changes: TodoChanges,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}
