//! Google Cloud Secret Manager backend
//!
//! Talks to the v1 REST API directly: one `versions/*:access` call per secret.
//!
//! See: https://cloud.google.com/secret-manager/docs/reference/rest/v1/projects.secrets.versions/access

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;

use crate::credentials::TokenSource;
use crate::error::SecretError;
use crate::store::SecretStore;
use crate::version::SecretVersion;

/// Public Secret Manager endpoint
pub const DEFAULT_ENDPOINT: &str = "https://secretmanager.googleapis.com";

const BACKEND: &str = "secretmanager";

/// Secret Manager API client
pub struct GcpSecretManager {
    client: Client,
    endpoint: String,
    tokens: Arc<dyn TokenSource>,
}

#[derive(Debug, Deserialize)]
struct AccessSecretVersionResponse {
    payload: Option<SecretPayload>,
}

#[derive(Debug, Deserialize)]
struct SecretPayload {
    #[serde(default)]
    data: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
}

impl GcpSecretManager {
    /// Create a client against the public endpoint
    pub fn new(tokens: Arc<dyn TokenSource>) -> Self {
        Self::with_endpoint(DEFAULT_ENDPOINT, tokens)
    }

    /// Create a client against a custom endpoint (emulators, tests)
    pub fn with_endpoint(endpoint: impl Into<String>, tokens: Arc<dyn TokenSource>) -> Self {
        let endpoint = endpoint.into().trim_end_matches('/').to_string();
        Self {
            client: Client::new(),
            endpoint,
            tokens,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// `{endpoint}/v1/projects/P/secrets/S/versions/V:access`, each id escaped
    /// as a single path segment
    fn access_url(&self, version: &SecretVersion) -> Result<Url, SecretError> {
        let invalid = |reason: String| {
            SecretError::backend(BACKEND, format!("invalid endpoint '{}': {}", self.endpoint, reason))
        };

        let method = format!("{}:access", version.version);
        let mut url = Url::parse(&self.endpoint).map_err(|e| invalid(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| invalid("not a base URL".to_string()))?
            .pop_if_empty()
            .extend([
                "v1",
                "projects",
                version.project.as_str(),
                "secrets",
                version.secret.as_str(),
                "versions",
                method.as_str(),
            ]);
        Ok(url)
    }
}

impl std::fmt::Debug for GcpSecretManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GcpSecretManager")
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

#[async_trait]
impl SecretStore for GcpSecretManager {
    fn backend_name(&self) -> &'static str {
        BACKEND
    }

    async fn access(&self, version: &SecretVersion) -> Result<Vec<u8>, SecretError> {
        let name = version.resource_name();
        let url = self.access_url(version)?;
        let token = self.tokens.token().await?;

        tracing::debug!(secret = %version.secret, version = %version.version, "Accessing secret version");

        let response = self
            .client
            .get(url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| SecretError::backend(BACKEND, format!("request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| SecretError::backend(BACKEND, format!("failed to read response: {}", e)))?;

        if !status.is_success() {
            return Err(map_error(&name, status, &body));
        }

        let result: AccessSecretVersionResponse = serde_json::from_str(&body)
            .map_err(|e| SecretError::backend(BACKEND, format!("malformed response: {}", e)))?;

        let payload = result
            .payload
            .ok_or_else(|| SecretError::invalid_payload(&name, "response has no payload"))?;

        crate::backends::base64::decode(&name, &payload.data)
    }
}

/// Turn a non-success response into a typed error
fn map_error(name: &str, status: StatusCode, body: &str) -> SecretError {
    let detail = serde_json::from_str::<ErrorResponse>(body)
        .map(|r| {
            if r.error.status.is_empty() {
                r.error.message
            } else {
                format!("{}: {}", r.error.status, r.error.message)
            }
        })
        .unwrap_or_else(|_| body.trim().to_string());

    match status {
        StatusCode::NOT_FOUND => SecretError::NotFound(format!("{} ({})", name, detail)),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            SecretError::AccessDenied(format!("{} ({})", name, detail))
        }
        _ => SecretError::backend(BACKEND, format!("HTTP {} for {}: {}", status, name, detail)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::StaticToken;

    fn client(endpoint: &str) -> GcpSecretManager {
        GcpSecretManager::with_endpoint(endpoint, Arc::new(StaticToken::new("t")))
    }

    #[test]
    fn test_access_url() {
        let manager = client("http://localhost:8085/");
        let version = SecretVersion::latest("my-project", "api-key");
        assert_eq!(
            manager.access_url(&version).unwrap().as_str(),
            "http://localhost:8085/v1/projects/my-project/secrets/api-key/versions/latest:access"
        );
    }

    #[test]
    fn test_access_url_escapes_ids() {
        let manager = client("http://localhost:8085");
        let version = SecretVersion::latest("prod#x?q/y", "api-key");
        let url = manager.access_url(&version).unwrap();
        assert_eq!(
            url.path(),
            "/v1/projects/prod%23x%3Fq%2Fy/secrets/api-key/versions/latest:access"
        );
        assert_eq!(url.query(), None);
        assert_eq!(url.fragment(), None);
    }

    #[test]
    fn test_access_url_keeps_endpoint_path() {
        let manager = client("http://localhost:8085/emulator/");
        let url = manager
            .access_url(&SecretVersion::latest("my-project", "s"))
            .unwrap();
        assert_eq!(
            url.path(),
            "/emulator/v1/projects/my-project/secrets/s/versions/latest:access"
        );
    }

    #[test]
    fn test_access_url_bad_endpoint() {
        let manager = client("not a url");
        let result = manager.access_url(&SecretVersion::latest("my-project", "s"));
        assert!(matches!(result, Err(SecretError::BackendError { .. })));
    }

    #[test]
    fn test_default_endpoint() {
        let manager = GcpSecretManager::new(Arc::new(StaticToken::new("t")));
        assert_eq!(manager.endpoint(), DEFAULT_ENDPOINT);
        assert_eq!(manager.backend_name(), "secretmanager");
    }

    #[test]
    fn test_map_not_found() {
        let body = r#"{"error":{"code":404,"message":"Secret [x] not found","status":"NOT_FOUND"}}"#;
        let err = map_error("projects/p/secrets/x/versions/latest", StatusCode::NOT_FOUND, body);
        match err {
            SecretError::NotFound(msg) => {
                assert!(msg.contains("NOT_FOUND: Secret [x] not found"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_map_permission_denied() {
        let body = r#"{"error":{"code":403,"message":"denied","status":"PERMISSION_DENIED"}}"#;
        let err = map_error("n", StatusCode::FORBIDDEN, body);
        assert!(matches!(err, SecretError::AccessDenied(_)));
    }

    #[test]
    fn test_map_unparseable_body() {
        let err = map_error("n", StatusCode::BAD_GATEWAY, "upstream exploded\n");
        match err {
            SecretError::BackendError { backend, message } => {
                assert_eq!(backend, "secretmanager");
                assert!(message.contains("upstream exploded"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
