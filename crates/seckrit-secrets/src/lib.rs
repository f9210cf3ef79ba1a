//! Secret store clients for seckrit
//!
//! This crate reads secret payloads from a remote store by version:
//!
//! - **Google Cloud Secret Manager** (`projects/P/secrets/S/versions/V`): REST API,
//!   authenticated with a service account key or the default credential chain
//!
//! # Example
//!
//! ```rust,ignore
//! use seckrit_secrets::{connect, SecretStore, SecretVersion};
//!
//! let store = connect(None, None).await?;
//! let version = SecretVersion::latest("my-project", "api-key");
//! let payload: Vec<u8> = store.access(&version).await?;
//! ```
//!
//! # Features
//!
//! - `gcp` (default): Enable the Secret Manager client via `reqwest` and `gcp_auth`
//! - `base64` (default): Enable payload decoding

mod backends;
mod credentials;
mod error;
mod store;
mod version;

use std::sync::Arc;

pub use credentials::{StaticToken, TokenSource, CLOUD_PLATFORM_SCOPE, CREDENTIALS_JSON_ENV};
pub use error::SecretError;
pub use store::SecretStore;
pub use version::{SecretVersion, LATEST};

#[cfg(feature = "gcp")]
pub use backends::gcp::{GcpSecretManager, DEFAULT_ENDPOINT};
#[cfg(feature = "gcp")]
pub use credentials::Credentials;

/// Build the production secret store
///
/// `endpoint` overrides the public Secret Manager endpoint. A fixed
/// `access_token` skips credential discovery (emulators, pre-minted tokens).
#[cfg(feature = "gcp")]
pub async fn connect(
    endpoint: Option<&str>,
    access_token: Option<String>,
) -> Result<Arc<dyn SecretStore>, SecretError> {
    let tokens: Arc<dyn TokenSource> = match access_token {
        Some(token) => {
            tracing::debug!("Using fixed access token");
            Arc::new(StaticToken::new(token))
        }
        None => Arc::new(Credentials::from_env().await?),
    };
    let manager = match endpoint {
        Some(endpoint) => GcpSecretManager::with_endpoint(endpoint, tokens),
        None => GcpSecretManager::new(tokens),
    };

    tracing::info!(endpoint = manager.endpoint(), "Using Secret Manager endpoint");
    Ok(Arc::new(manager))
}

#[cfg(not(feature = "gcp"))]
pub async fn connect(
    _endpoint: Option<&str>,
    _access_token: Option<String>,
) -> Result<Arc<dyn SecretStore>, SecretError> {
    Err(SecretError::disabled("secretmanager"))
}

#[cfg(all(test, feature = "gcp"))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_with_fixed_token() {
        let store = connect(Some("http://localhost:8085"), Some("t".to_string()))
            .await
            .unwrap();
        assert_eq!(store.backend_name(), "secretmanager");
    }
}
