//! The secret fetch loop
//!
//! Secrets are fetched one at a time, in declaration order. Remote failures
//! always stop the run; failures writing a secret to its destination are
//! handled according to the [`ErrorPolicy`].

use std::path::Path;
use std::sync::Arc;

use clap::ValueEnum;
use seckrit_secrets::{SecretError, SecretStore};
use thiserror::Error;

use crate::manifest::{Manifest, SecretDescriptor, SecretKind};
use crate::output::{write_secret_file, EnvironmentFile, OutputError};

/// What to do when a secret cannot be written to its destination
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum ErrorPolicy {
    /// Stop at the first failure
    #[default]
    Abort,
    /// Log the failure, write the remaining secrets, then fail the run
    Continue,
}

/// A secret that could not be written under [`ErrorPolicy::Continue`]
#[derive(Debug)]
pub struct SecretFailure {
    pub name: String,
    pub destination: String,
    pub error: OutputError,
}

/// Summary of a fetch run
#[derive(Debug, Default)]
pub struct FetchReport {
    /// Lines written to the environment file
    pub environment_variables: usize,
    /// Standalone secret files written
    pub files: usize,
    /// Tolerated failures, in declaration order
    pub failures: Vec<SecretFailure>,
}

impl FetchReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Cannot create environment file: {0}")]
    EnvironmentFile(OutputError),

    #[error("Failed to fetch secret '{name}': {source}")]
    Remote { name: String, source: SecretError },

    #[error("Failed to write secret '{name}' to {destination}: {source}")]
    Output {
        name: String,
        destination: String,
        source: OutputError,
    },
}

/// Fetches every secret in a manifest and writes it out
pub struct Fetcher {
    store: Arc<dyn SecretStore>,
    policy: ErrorPolicy,
}

impl Fetcher {
    pub fn new(store: Arc<dyn SecretStore>, policy: ErrorPolicy) -> Self {
        Self { store, policy }
    }

    /// Run the fetch loop over all secrets in `manifest`
    pub async fn run(&self, manifest: &Manifest) -> Result<FetchReport, FetchError> {
        let mut env_file = EnvironmentFile::create(&manifest.environment_file)
            .map_err(FetchError::EnvironmentFile)?;
        let mut report = FetchReport::default();

        tracing::debug!(
            backend = self.store.backend_name(),
            secrets = manifest.secrets.len(),
            "Fetching secrets"
        );

        for secret in &manifest.secrets {
            let version = manifest.latest_version(secret);
            let payload =
                self.store
                    .access(&version)
                    .await
                    .map_err(|source| FetchError::Remote {
                        name: secret.name.clone(),
                        source,
                    })?;

            match self.deliver(secret, &payload, &mut env_file) {
                Ok(()) => match secret.kind {
                    SecretKind::EnvironmentVariable => report.environment_variables += 1,
                    SecretKind::File => report.files += 1,
                },
                Err(error) => self.handle_failure(secret, error, &mut report)?,
            }
        }

        env_file.finish().map_err(FetchError::EnvironmentFile)?;

        tracing::info!(
            environment_variables = report.environment_variables,
            files = report.files,
            failures = report.failures.len(),
            "Finished fetching secrets"
        );
        Ok(report)
    }

    fn deliver(
        &self,
        secret: &SecretDescriptor,
        payload: &[u8],
        env_file: &mut EnvironmentFile,
    ) -> Result<(), OutputError> {
        match secret.kind {
            SecretKind::EnvironmentVariable => {
                tracing::info!(
                    "Adding environment variable {} to {}",
                    secret.destination,
                    env_file.path().display()
                );
                env_file.append(&secret.destination, payload)
            }
            SecretKind::File => {
                tracing::info!("Writing file '{}'", secret.destination);
                write_secret_file(Path::new(&secret.destination), payload)
            }
        }
    }

    fn handle_failure(
        &self,
        secret: &SecretDescriptor,
        error: OutputError,
        report: &mut FetchReport,
    ) -> Result<(), FetchError> {
        match self.policy {
            ErrorPolicy::Abort => Err(FetchError::Output {
                name: secret.name.clone(),
                destination: secret.destination.clone(),
                source: error,
            }),
            ErrorPolicy::Continue => {
                tracing::error!(
                    secret = %secret.name,
                    destination = %secret.destination,
                    "{}",
                    error
                );
                report.failures.push(SecretFailure {
                    name: secret.name.clone(),
                    destination: secret.destination.clone(),
                    error,
                });
                Ok(())
            }
        }
    }
}
