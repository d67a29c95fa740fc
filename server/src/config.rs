//! Server configuration from environment variables.
//!
//! | Variable | Default | |
//! |---|---|---|
//! | `HOST` | `0.0.0.0` | bind address, an IPv4 or IPv6 literal |
//! | `PORT` | `3001` | bind port |
//! | `OWNER_HEADER` | `user-id` | header carrying the owner id |
//! | `TODO_STORE` | `firestore` | `firestore` or `memory` |
//! | `FIREBASE_SERVICE_ACCOUNT` | | service-account key JSON |
//! | `FIRESTORE_EMULATOR_HOST` | | `host:port` of a local emulator |
//! | `FIRESTORE_PROJECT_ID` | key's project | project id |

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

use axum::http::HeaderName;
use thiserror::Error;
use todo_store::{DocumentStore, FirestoreStore, MemoryStore, ServiceAccountKey, StoreError};

use crate::DEFAULT_OWNER_HEADER;

const DEFAULT_HOST: IpAddr = IpAddr::V4(Ipv4Addr::UNSPECIFIED);
const DEFAULT_PORT: u16 = 3001;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("HOST must be an IP address, got {0:?}")]
    InvalidHost(String),

    #[error("PORT must be a port number, got {0:?}")]
    InvalidPort(String),

    #[error("OWNER_HEADER is not a valid header name: {0:?}")]
    InvalidOwnerHeader(String),

    #[error("TODO_STORE must be \"firestore\" or \"memory\", got {0:?}")]
    UnknownStore(String),

    #[error("firestore store needs FIREBASE_SERVICE_ACCOUNT or FIRESTORE_EMULATOR_HOST")]
    MissingCredentials,

    #[error("FIRESTORE_PROJECT_ID is required with the emulator when no service account is set")]
    MissingProjectId,

    #[error("FIREBASE_SERVICE_ACCOUNT is unusable: {0}")]
    ServiceAccount(#[source] StoreError),
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: IpAddr,
    pub port: u16,
    pub owner_header: HeaderName,
    pub store: StoreConfig,
}

/// Which document store backs the service.
#[derive(Debug, Clone)]
pub enum StoreConfig {
    Memory,
    Firestore(ServiceAccountKey),
    FirestoreEmulator { host: String, project_id: String },
}

impl StoreConfig {
    pub fn backend_name(&self) -> &'static str {
        match self {
            StoreConfig::Memory => "memory",
            StoreConfig::Firestore(_) => "firestore",
            StoreConfig::FirestoreEmulator { .. } => "firestore-emulator",
        }
    }

    /// Construct the store handle shared by all requests.
    pub fn build(&self) -> Arc<dyn DocumentStore> {
        match self {
            StoreConfig::Memory => Arc::new(MemoryStore::new()),
            StoreConfig::Firestore(key) => {
                Arc::new(FirestoreStore::with_service_account(key.clone()))
            }
            StoreConfig::FirestoreEmulator { host, project_id } => {
                Arc::new(FirestoreStore::with_emulator(host, project_id))
            }
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read configuration through `lookup`, which maps a variable name to its
    /// value. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let host = match var("HOST") {
            Some(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidHost(raw))?,
            None => DEFAULT_HOST,
        };
        let port = match var("PORT") {
            Some(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidPort(raw))?,
            None => DEFAULT_PORT,
        };
        let owner_header = match var("OWNER_HEADER") {
            Some(raw) => HeaderName::try_from(raw.trim().to_ascii_lowercase())
                .map_err(|_| ConfigError::InvalidOwnerHeader(raw))?,
            None => HeaderName::from_static(DEFAULT_OWNER_HEADER),
        };

        let store = match var("TODO_STORE").as_deref() {
            None | Some("firestore") => firestore_config(&var)?,
            Some("memory") => StoreConfig::Memory,
            Some(other) => return Err(ConfigError::UnknownStore(other.to_string())),
        };

        Ok(Self {
            host,
            port,
            owner_header,
            store,
        })
    }
}

fn firestore_config(var: &impl Fn(&str) -> Option<String>) -> Result<StoreConfig, ConfigError> {
    let key = var("FIREBASE_SERVICE_ACCOUNT")
        .map(|json| ServiceAccountKey::from_json(&json))
        .transpose()
        .map_err(ConfigError::ServiceAccount)?;

    if let Some(host) = var("FIRESTORE_EMULATOR_HOST") {
        let project_id = var("FIRESTORE_PROJECT_ID")
            .or_else(|| key.as_ref().map(|k| k.project_id.clone()))
            .ok_or(ConfigError::MissingProjectId)?;
        return Ok(StoreConfig::FirestoreEmulator { host, project_id });
    }

    let mut key = key.ok_or(ConfigError::MissingCredentials)?;
    if let Some(project_id) = var("FIRESTORE_PROJECT_ID") {
        key.project_id = project_id;
    }
    Ok(StoreConfig::Firestore(key))
}
