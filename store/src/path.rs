//! Collection and document paths in a hierarchical document store.
//!
//! A path alternates collection ids and document ids:
//! `owners` is a collection, `owners/u1` a document, `owners/u1/todos` a
//! nested collection, `owners/u1/todos/abc` a document inside it. Every
//! segment is validated on construction so a path can be spliced into a
//! store URL without further escaping of `/`.

use std::fmt;

use crate::error::PathError;

/// Maximum segment length accepted by the store, in bytes.
pub const MAX_SEGMENT_BYTES: usize = 1500;

/// Path to a collection: an odd number of segments.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CollectionPath {
    segments: Vec<String>,
}

/// Path to a single document: a collection plus a document id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentPath {
    collection: CollectionPath,
    id: String,
}

impl CollectionPath {
    /// A top-level collection such as `owners`.
    pub fn root(id: &str) -> Result<Self, PathError> {
        validate_segment(id)?;
        Ok(Self {
            segments: vec![id.to_string()],
        })
    }

    /// The document with the given id inside this collection.
    pub fn doc(&self, id: &str) -> Result<DocumentPath, PathError> {
        validate_segment(id)?;
        Ok(DocumentPath {
            collection: self.clone(),
            id: id.to_string(),
        })
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }
}

impl DocumentPath {
    /// A sub-collection nested under this document.
    pub fn collection(&self, id: &str) -> Result<CollectionPath, PathError> {
        validate_segment(id)?;
        let mut segments = self.collection.segments.clone();
        segments.push(self.id.clone());
        segments.push(id.to_string());
        Ok(CollectionPath { segments })
    }

    /// The collection that contains this document.
    pub fn parent(&self) -> &CollectionPath {
        &self.collection
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// All segments from the root collection down to this document's id.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.collection
            .segments
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(self.id.as_str()))
    }
}

impl fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("/"))
    }
}

impl fmt::Display for DocumentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.collection, self.id)
    }
}

/// Check that `segment` can stand alone as one collection or document id.
pub fn validate_segment(segment: &str) -> Result<(), PathError> {
    if segment.is_empty() {
        return Err(PathError::Empty);
    }
    if segment.contains('/') {
        return Err(PathError::ContainsSlash(segment.to_string()));
    }
    if segment == "." || segment == ".." {
        return Err(PathError::Reserved(segment.to_string()));
    }
    if segment.len() > 4 && segment.starts_with("__") && segment.ends_with("__") {
        return Err(PathError::Reserved(segment.to_string()));
    }
    if segment.len() > MAX_SEGMENT_BYTES {
        return Err(PathError::TooLong {
            max: MAX_SEGMENT_BYTES,
        });
    }
    Ok(())
}
