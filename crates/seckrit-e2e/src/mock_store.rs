//! Mock secret store for E2E tests
//!
//! This module provides a mock implementation of the SecretStore trait
//! that can be used in tests without making real Secret Manager API calls.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;

use seckrit_secrets::{SecretError, SecretStore, SecretVersion};

/// Mock secret store that serves payloads from memory
pub struct MockSecretStore {
    /// Stored payloads: "project/secret" -> bytes
    secrets: DashMap<String, Vec<u8>>,
    /// Every version accessed, in order
    accessed: Mutex<Vec<SecretVersion>>,
    /// Whether to simulate failures on access
    fail_access: AtomicBool,
}

impl MockSecretStore {
    /// Create a new, empty mock store
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn key(project: &str, secret: &str) -> String {
        format!("{}/{}", project, secret)
    }

    /// Store a payload as the latest version of a secret
    pub fn insert(&self, project: &str, secret: &str, payload: impl Into<Vec<u8>>) {
        self.secrets
            .insert(Self::key(project, secret), payload.into());
    }

    /// Versions accessed so far (for test assertions)
    pub fn accessed(&self) -> Vec<SecretVersion> {
        self.accessed.lock().clone()
    }

    /// Number of access calls made
    pub fn access_count(&self) -> usize {
        self.accessed.lock().len()
    }

    /// Configure mock to fail every access
    pub fn set_fail_access(&self, fail: bool) {
        self.fail_access.store(fail, Ordering::SeqCst);
    }
}

impl Default for MockSecretStore {
    fn default() -> Self {
        Self {
            secrets: DashMap::new(),
            accessed: Mutex::new(Vec::new()),
            fail_access: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl SecretStore for MockSecretStore {
    fn backend_name(&self) -> &'static str {
        "mock"
    }

    async fn access(&self, version: &SecretVersion) -> Result<Vec<u8>, SecretError> {
        self.accessed.lock().push(version.clone());

        if self.fail_access.load(Ordering::SeqCst) {
            return Err(SecretError::backend("mock", "Simulated access failure"));
        }

        let payload = self
            .secrets
            .get(&Self::key(&version.project, &version.secret))
            .map(|entry| entry.value().clone())
            .ok_or_else(|| SecretError::NotFound(version.resource_name()))?;

        tracing::debug!("MockSecretStore: served {}", version);
        Ok(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_insert_and_access() {
        let store = MockSecretStore::new();
        store.insert("p", "api-key", "abc");

        let payload = store
            .access(&SecretVersion::latest("p", "api-key"))
            .await
            .unwrap();
        assert_eq!(payload, b"abc");
        assert_eq!(store.access_count(), 1);

        // Same secret name in another project is a different secret
        let other = store.access(&SecretVersion::latest("q", "api-key")).await;
        assert!(matches!(other, Err(SecretError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_failure_simulation() {
        let store = MockSecretStore::new();
        store.insert("p", "s", "v");

        store.set_fail_access(true);
        assert!(store.access(&SecretVersion::latest("p", "s")).await.is_err());

        store.set_fail_access(false);
        assert!(store.access(&SecretVersion::latest("p", "s")).await.is_ok());
        assert_eq!(store.access_count(), 2);
    }
}
