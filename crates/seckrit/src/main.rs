use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use seckrit::{ErrorPolicy, Fetcher, ManifestError, ManifestSource, MANIFEST_ENV};

/// Fetches secrets from Google Cloud Secret Manager according to a YAML manifest
#[derive(Parser, Debug)]
#[command(name = "seckrit")]
#[command(about = "Fetches secrets from Google Cloud Secret Manager according to a YAML manifest")]
struct Args {
    /// YAML manifest file specifying which secrets to fetch and how they should be treated
    #[arg(short, long, value_name = "MANIFEST_FILE")]
    manifest: Option<PathBuf>,

    /// Inline YAML manifest, used when no manifest file is given
    #[arg(long, env = MANIFEST_ENV, hide_env_values = true, value_name = "YAML")]
    manifest_yaml: Option<String>,

    /// What to do when a secret cannot be written to its destination
    #[arg(long, value_enum, env = "SECKRIT_ON_ERROR", default_value_t = ErrorPolicy::Abort)]
    on_error: ErrorPolicy,

    /// Secret Manager endpoint (for emulators)
    #[arg(long, env = "SECKRIT_SECRET_MANAGER_ENDPOINT", value_name = "URL")]
    endpoint: Option<String>,

    /// Bearer token to use instead of discovering Google credentials
    #[arg(long, env = "SECKRIT_ACCESS_TOKEN", hide_env_values = true, value_name = "TOKEN")]
    access_token: Option<String>,
}

/// Settings resolved from CLI args and environment
struct RunSettings {
    source: ManifestSource,
    policy: ErrorPolicy,
    endpoint: Option<String>,
    access_token: Option<String>,
}

impl RunSettings {
    fn resolve(args: Args) -> Result<Self, ManifestError> {
        let source = ManifestSource::resolve(args.manifest, args.manifest_yaml)?;

        Ok(Self {
            source,
            policy: args.on_error,
            endpoint: args.endpoint,
            access_token: args.access_token.filter(|t| !t.is_empty()),
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("seckrit=info".parse()?)
                .add_directive("seckrit_secrets=info".parse()?),
        )
        .init();

    let args = Args::parse();

    let settings = match RunSettings::resolve(args) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    // Load the manifest that tells us which secrets we want and what to do with them
    let manifest = match settings.source.load() {
        Ok(m) => m,
        Err(ManifestError::Invalid(errors)) => {
            eprintln!("Errors encountered when parsing manifest file:\n");
            eprintln!("{}", errors);
            std::process::exit(1);
        }
        Err(e) => {
            return Err(e)
                .with_context(|| format!("Failed to load manifest from {}", settings.source))
        }
    };

    tracing::info!(
        "Loaded manifest from {}: project {}, {} secrets",
        settings.source,
        manifest.gcp_project_id,
        manifest.secrets.len()
    );

    let store = seckrit_secrets::connect(settings.endpoint.as_deref(), settings.access_token)
        .await
        .context("Failed to create Secret Manager client")?;

    let report = Fetcher::new(store, settings.policy)
        .run(&manifest)
        .await
        .context("Failed to fetch secrets")?;

    if !report.is_success() {
        for failure in &report.failures {
            tracing::error!(
                "Secret '{}' was not written to {}: {}",
                failure.name,
                failure.destination,
                failure.error
            );
        }
        anyhow::bail!(
            "{} of {} secrets could not be written",
            report.failures.len(),
            manifest.secrets.len()
        );
    }

    Ok(())
}
