//! The capability set every document store offers.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::path::{CollectionPath, DocumentPath};
use crate::types::{Document, Fields};

/// A hierarchical document store addressed by collection and document paths.
///
/// Implementations must be safe to share between concurrent requests. No
/// operation retries; a failure is reported once to the caller.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Every document in `collection`, in store-native order.
    async fn list(&self, collection: &CollectionPath) -> Result<Vec<Document>, StoreError>;

    /// The document at `document`, or `None` if it does not exist.
    async fn get(&self, document: &DocumentPath) -> Result<Option<Document>, StoreError>;

    /// Create a document with a store-generated id.
    async fn insert(&self, collection: &CollectionPath, fields: Fields)
        -> Result<Document, StoreError>;

    /// Overwrite only the given fields of an existing document.
    ///
    /// Returns `StoreError::NotFound` if the document does not exist.
    async fn merge_update(&self, document: &DocumentPath, fields: Fields)
        -> Result<(), StoreError>;

    /// Remove an existing document.
    ///
    /// Returns `StoreError::NotFound` if the document does not exist.
    async fn delete(&self, document: &DocumentPath) -> Result<(), StoreError>;
}

#[async_trait]
impl<T: DocumentStore + ?Sized> DocumentStore for Arc<T> {
    async fn list(&self, collection: &CollectionPath) -> Result<Vec<Document>, StoreError> {
        (**self).list(collection).await
    }

    async fn get(&self, document: &DocumentPath) -> Result<Option<Document>, StoreError> {
        (**self).get(document).await
    }

    async fn insert(
        &self,
        collection: &CollectionPath,
        fields: Fields,
    ) -> Result<Document, StoreError> {
        (**self).insert(collection, fields).await
    }

    async fn merge_update(
        &self,
        document: &DocumentPath,
        fields: Fields,
    ) -> Result<(), StoreError> {
        (**self).merge_update(document, fields).await
    }

    async fn delete(&self, document: &DocumentPath) -> Result<(), StoreError> {
        (**self).delete(document).await
    }
}
