//! Base64 payload decoding
//!
//! Secret Manager returns payloads as standard base64 inside JSON.

use base64::Engine;

use crate::error::SecretError;

/// Decode a base64-encoded payload into its raw bytes
pub fn decode(name: &str, data: &str) -> Result<Vec<u8>, SecretError> {
    base64::engine::general_purpose::STANDARD
        .decode(data)
        .map_err(|e| SecretError::invalid_payload(name, format!("base64 decode error: {}", e)))
}
