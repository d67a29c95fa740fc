use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::StoreError;
use crate::path::{CollectionPath, DocumentPath};
use crate::store::DocumentStore;
use crate::types::{Document, Fields};

/// Length of generated document ids, matching Firestore auto-ids.
const AUTO_ID_LEN: usize = 20;

type Collections = HashMap<String, HashMap<String, Fields>>;

/// Process-local store keyed by collection path, then document id.
///
/// Used for local development and tests. Clones share the same data.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    collections: Arc<RwLock<Collections>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn auto_id() -> String {
    let mut id = Uuid::new_v4().simple().to_string();
    id.truncate(AUTO_ID_LEN);
    id
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn list(&self, collection: &CollectionPath) -> Result<Vec<Document>, StoreError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(&collection.to_string())
            .map(|docs| {
                docs.iter()
                    .map(|(id, fields)| Document::new(id.clone(), fields.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn get(&self, document: &DocumentPath) -> Result<Option<Document>, StoreError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(&document.parent().to_string())
            .and_then(|docs| docs.get(document.id()))
            .map(|fields| Document::new(document.id(), fields.clone())))
    }

    async fn insert(
        &self,
        collection: &CollectionPath,
        fields: Fields,
    ) -> Result<Document, StoreError> {
        let mut collections = self.collections.write().await;
        let docs = collections.entry(collection.to_string()).or_default();
        let mut id = auto_id();
        while docs.contains_key(&id) {
            id = auto_id();
        }
        docs.insert(id.clone(), fields.clone());
        Ok(Document::new(id, fields))
    }

    async fn merge_update(
        &self,
        document: &DocumentPath,
        fields: Fields,
    ) -> Result<(), StoreError> {
        let mut collections = self.collections.write().await;
        let existing = collections
            .get_mut(&document.parent().to_string())
            .and_then(|docs| docs.get_mut(document.id()))
            .ok_or(StoreError::NotFound)?;
        existing.extend(fields);
        Ok(())
    }

    async fn delete(&self, document: &DocumentPath) -> Result<(), StoreError> {
        let mut collections = self.collections.write().await;
        collections
            .get_mut(&document.parent().to_string())
            .and_then(|docs| docs.remove(document.id()))
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn todos(owner: &str) -> CollectionPath {
        CollectionPath::root("owners")
            .unwrap()
            .doc(owner)
            .unwrap()
            .collection("todos")
            .unwrap()
    }

    fn fields(value: serde_json::Value) -> Fields {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn insert_assigns_twenty_char_id() {
        let store = MemoryStore::new();
        let doc = store
            .insert(&todos("u1"), fields(json!({"text": "a"})))
            .await
            .unwrap();
        assert_eq!(doc.id.len(), AUTO_ID_LEN);
        assert!(doc.id.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[tokio::test]
    async fn list_of_unknown_collection_is_empty() {
        let store = MemoryStore::new();
        assert!(store.list(&todos("nobody")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn merge_update_keeps_unmentioned_fields() {
        let store = MemoryStore::new();
        let doc = store
            .insert(&todos("u1"), fields(json!({"text": "a", "datetime": "t1"})))
            .await
            .unwrap();
        let path = todos("u1").doc(&doc.id).unwrap();

        store
            .merge_update(&path, fields(json!({"text": "b"})))
            .await
            .unwrap();

        let fetched = store.get(&path).await.unwrap().unwrap();
        assert_eq!(fetched.str_field("text"), Some("b"));
        assert_eq!(fetched.str_field("datetime"), Some("t1"));
    }

    #[tokio::test]
    async fn merge_update_of_missing_document_is_not_found() {
        let store = MemoryStore::new();
        let path = todos("u1").doc("missing").unwrap();
        let err = store
            .merge_update(&path, fields(json!({"text": "b"})))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        assert!(store.get(&path).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_twice_reports_not_found_second_time() {
        let store = MemoryStore::new();
        let doc = store
            .insert(&todos("u1"), fields(json!({"text": "a"})))
            .await
            .unwrap();
        let path = todos("u1").doc(&doc.id).unwrap();

        store.delete(&path).await.unwrap();
        assert!(store.delete(&path).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn collections_are_isolated_per_owner() {
        let store = MemoryStore::new();
        let doc = store
            .insert(&todos("u1"), fields(json!({"text": "a"})))
            .await
            .unwrap();

        let other = todos("u2").doc(&doc.id).unwrap();
        assert!(store.get(&other).await.unwrap().is_none());
        assert_eq!(store.list(&todos("u2")).await.unwrap().len(), 0);
        assert_eq!(store.list(&todos("u1")).await.unwrap().len(), 1);
    }
}
