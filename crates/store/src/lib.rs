//! Document store backends for the Bixso Orchestrator.
//!
//! Two implementations of [`bixso_core::DocumentStore`]:
//! - [`FirestoreStore`] — Firestore REST API client (production)
//! - [`InMemoryStore`] — in-process store for tests and local development
//!
//! The backend is selected by `store.backend` in the configuration.

pub mod firestore;
pub mod in_memory;

pub use firestore::FirestoreStore;
pub use in_memory::InMemoryStore;

use bixso_config::StoreConfig;
use bixso_core::{DocumentStore, StoreError};
use std::sync::Arc;

/// Build a store from configuration.
///
/// `backend = "memory"` yields an empty in-memory store; anything the
/// config layer validated as `"firestore"` yields the REST client.
pub fn build_from_config(config: &StoreConfig) -> Result<Arc<dyn DocumentStore>, StoreError> {
    match config.backend.as_str() {
        "memory" => Ok(Arc::new(InMemoryStore::new())),
        "firestore" => {
            let project_id = config
                .project_id
                .clone()
                .ok_or_else(|| StoreError::NotConfigured("store.project_id is not set".into()))?;
            Ok(Arc::new(FirestoreStore::new(
                project_id,
                config.base_url.clone(),
                config.access_token.clone(),
            )))
        }
        other => Err(StoreError::NotConfigured(format!(
            "Unknown store backend: {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_backend_builds() {
        let config = StoreConfig {
            backend: "memory".into(),
            ..StoreConfig::default()
        };
        assert!(build_from_config(&config).is_ok());
    }

    #[test]
    fn firestore_backend_requires_project_id() {
        let config = StoreConfig {
            backend: "firestore".into(),
            project_id: None,
            ..StoreConfig::default()
        };
        let err = build_from_config(&config).unwrap_err();
        assert!(matches!(err, StoreError::NotConfigured(_)));
    }

    #[test]
    fn firestore_backend_builds_with_project_id() {
        let config = StoreConfig {
            backend: "firestore".into(),
            project_id: Some("bixso-test".into()),
            ..StoreConfig::default()
        };
        assert!(build_from_config(&config).is_ok());
    }
}
