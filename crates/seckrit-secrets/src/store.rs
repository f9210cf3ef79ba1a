//! Secret store abstraction
//!
//! This trait allows the fetch loop to work with different stores
//! (Google Cloud Secret Manager in production, in-memory mocks for testing).

use async_trait::async_trait;

use crate::error::SecretError;
use crate::version::SecretVersion;

/// A remote store that hands out secret payloads by version
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Get the backend name for logging/errors
    fn backend_name(&self) -> &'static str;

    /// Read the raw payload of a secret version
    ///
    /// # Returns
    /// The exact bytes stored in the version, already decoded from any
    /// transport encoding
    async fn access(&self, version: &SecretVersion) -> Result<Vec<u8>, SecretError>;
}
