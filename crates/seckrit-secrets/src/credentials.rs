//! Access tokens for Google Cloud APIs
//!
//! Credentials are resolved in this order (first found wins):
//! 1. `GOOGLE_APPLICATION_CREDENTIALS_JSON`: an inline service account key
//! 2. The default provider chain (`GOOGLE_APPLICATION_CREDENTIALS` file,
//!    gcloud user credentials, metadata server)

#[cfg(feature = "gcp")]
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::SecretError;

/// Environment variable holding an inline service account key
pub const CREDENTIALS_JSON_ENV: &str = "GOOGLE_APPLICATION_CREDENTIALS_JSON";

/// OAuth scope required by Secret Manager
pub const CLOUD_PLATFORM_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";

/// Source of bearer tokens for API calls
#[async_trait]
pub trait TokenSource: Send + Sync {
    /// Get a valid bearer token
    async fn token(&self) -> Result<String, SecretError>;
}

/// Fixed bearer token, for emulators and tests
#[derive(Clone)]
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl std::fmt::Debug for StaticToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("StaticToken(..)")
    }
}

#[async_trait]
impl TokenSource for StaticToken {
    async fn token(&self) -> Result<String, SecretError> {
        Ok(self.0.clone())
    }
}

/// Tokens minted by `gcp_auth` from a service account key or the default chain
#[cfg(feature = "gcp")]
pub struct Credentials {
    provider: Arc<dyn gcp_auth::TokenProvider>,
    origin: &'static str,
}

#[cfg(feature = "gcp")]
impl Credentials {
    /// Resolve credentials from the environment
    pub async fn from_env() -> Result<Self, SecretError> {
        match std::env::var(CREDENTIALS_JSON_ENV) {
            Ok(json) => Self::from_service_account_json(&json),
            Err(_) => Self::default_chain().await,
        }
    }

    /// Use an inline service account key
    pub fn from_service_account_json(json: &str) -> Result<Self, SecretError> {
        let account = gcp_auth::CustomServiceAccount::from_json(json).map_err(|e| {
            SecretError::Credentials(format!("invalid {}: {}", CREDENTIALS_JSON_ENV, e))
        })?;

        tracing::debug!("Using service account credentials from {}", CREDENTIALS_JSON_ENV);
        Ok(Self {
            provider: Arc::new(account),
            origin: "service-account-json",
        })
    }

    /// Use the default provider chain
    pub async fn default_chain() -> Result<Self, SecretError> {
        let provider = gcp_auth::provider()
            .await
            .map_err(|e| SecretError::Credentials(e.to_string()))?;

        tracing::debug!("Using default credential provider chain");
        Ok(Self {
            provider,
            origin: "default-chain",
        })
    }
}

#[cfg(feature = "gcp")]
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("origin", &self.origin)
            .finish()
    }
}

#[cfg(feature = "gcp")]
#[async_trait]
impl TokenSource for Credentials {
    async fn token(&self) -> Result<String, SecretError> {
        let token = self
            .provider
            .token(&[CLOUD_PLATFORM_SCOPE])
            .await
            .map_err(|e| SecretError::Credentials(e.to_string()))?;
        Ok(token.as_str().to_string())
    }
}
