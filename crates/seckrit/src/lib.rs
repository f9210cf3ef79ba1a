//! seckrit library
//!
//! This library provides the pieces behind the `seckrit` binary: manifest
//! loading and validation, the secret fetch loop, and the output writers.
//! It can be used to embed secret materialization in other tools or for testing.

mod fetch;
mod manifest;
mod output;
mod validate;

// Re-export public types
pub use fetch::{ErrorPolicy, FetchError, FetchReport, Fetcher, SecretFailure};
pub use manifest::{
    Manifest, ManifestError, ManifestSource, SecretDescriptor, SecretKind, MANIFEST_ENV,
};
pub use output::{create_parent_dirs, write_secret_file, EnvironmentFile, OutputError};
pub use validate::{validate, ValidationErrors};
