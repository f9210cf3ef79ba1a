use thiserror::Error;

/// Errors that can occur while reading a secret from a store
#[derive(Debug, Error)]
pub enum SecretError {
    /// Secret or version not found in the store
    #[error("Secret not found: {0}")]
    NotFound(String),

    /// Backend feature not compiled in
    #[error("Secret backend '{backend}' not available (feature not enabled)")]
    BackendDisabled { backend: String },

    /// Backend runtime error
    #[error("{backend} error: {message}")]
    BackendError { backend: String, message: String },

    /// Permission/access denied
    #[error("Access denied to secret: {0}")]
    AccessDenied(String),

    /// Credentials could not be loaded or exchanged for a token
    #[error("Failed to obtain credentials: {0}")]
    Credentials(String),

    /// Payload could not be decoded
    #[error("Invalid payload for '{name}': {message}")]
    InvalidPayload { name: String, message: String },
}

impl SecretError {
    /// Create a backend error
    pub fn backend(backend: impl Into<String>, message: impl Into<String>) -> Self {
        Self::BackendError {
            backend: backend.into(),
            message: message.into(),
        }
    }

    /// Create a backend disabled error
    pub fn disabled(backend: impl Into<String>) -> Self {
        Self::BackendDisabled {
            backend: backend.into(),
        }
    }

    /// Create an invalid payload error
    pub fn invalid_payload(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidPayload {
            name: name.into(),
            message: message.into(),
        }
    }
}
