//! Secret store implementations

#[cfg(feature = "base64")]
pub mod base64;

#[cfg(feature = "gcp")]
pub mod gcp;
