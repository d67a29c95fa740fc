//! Hierarchical document store access for the todo service.
//!
//! # Overview
//! `DocumentStore` is the capability set the service needs from its
//! database: list a collection, get one document, insert with a generated
//! id, merge-update selected fields, and delete. Two backends implement it:
//!
//! - `MemoryStore` keeps everything in process, for development and tests.
//! - `FirestoreStore` talks to Cloud Firestore (or its emulator) over REST.
//!
//! # Design
//! - Paths are typed (`CollectionPath`, `DocumentPath`) and validated per
//!   segment, so an id can never smuggle in extra path components.
//! - The Firestore backend splits every call into a pure `build_*` /
//!   `parse_*` pair (`FirestoreClient`) around a single `reqwest` round trip.
//! - Update and delete report `StoreError::NotFound` for absent documents
//!   without a separate read.

pub mod error;
pub mod firestore;
pub mod http;
pub mod memory;
pub mod path;
pub mod store;
pub mod types;

pub use error::{PathError, StoreError};
pub use firestore::{FirestoreClient, FirestoreStore, ServiceAccountKey};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use memory::MemoryStore;
pub use path::{CollectionPath, DocumentPath};
pub use store::DocumentStore;
pub use types::{Document, Fields};
