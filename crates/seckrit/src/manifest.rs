//! Secret manifest loading
//!
//! The manifest is read from (first found wins):
//! 1. A file given with `--manifest`
//! 2. Inline YAML in the `SECKRIT_MANIFEST` environment variable
//!
//! It is validated against a fixed schema and normalized (`~` expanded in
//! output paths, `secrets` defaulted to an empty list) before anything is
//! fetched.

use std::fmt;
use std::path::{Path, PathBuf};

use seckrit_secrets::SecretVersion;
use serde::Deserialize;
use thiserror::Error;

use crate::validate::{validate, ValidationErrors};

/// Environment variable holding an inline manifest
pub const MANIFEST_ENV: &str = "SECKRIT_MANIFEST";

/// How a fetched secret is delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecretKind {
    /// `destination=value` line in the environment file
    EnvironmentVariable,
    /// Raw payload written to the path in `destination`
    File,
}

impl SecretKind {
    /// Parse the manifest spelling of a kind
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "environment_variable" => Some(SecretKind::EnvironmentVariable),
            "file" => Some(SecretKind::File),
            _ => None,
        }
    }
}

/// One secret to fetch and where to put it
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SecretDescriptor {
    /// Secret id in Secret Manager
    pub name: String,

    /// Delivery type
    #[serde(rename = "type")]
    pub kind: SecretKind,

    /// Environment variable name or file path
    pub destination: String,
}

/// Validated, normalized manifest
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    /// Project that owns the secrets
    pub gcp_project_id: String,

    /// Generated `KEY=VALUE` file
    pub environment_file: PathBuf,

    /// Secrets in declaration order
    #[serde(default)]
    pub secrets: Vec<SecretDescriptor>,
}

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("No manifest given. Pass --manifest or define SECKRIT_MANIFEST")]
    Missing,

    #[error("Failed to read manifest '{}': {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse manifest YAML: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Invalid manifest:\n{0}")]
    Invalid(ValidationErrors),
}

/// Where the manifest comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestSource {
    File(PathBuf),
    Inline(String),
}

impl ManifestSource {
    /// Pick the manifest source: an explicit path wins over inline YAML
    pub fn resolve(path: Option<PathBuf>, inline: Option<String>) -> Result<Self, ManifestError> {
        match (path, inline) {
            (Some(path), _) => Ok(ManifestSource::File(path)),
            (None, Some(yaml)) if !yaml.trim().is_empty() => Ok(ManifestSource::Inline(yaml)),
            _ => Err(ManifestError::Missing),
        }
    }

    /// Read, validate and normalize the manifest
    pub fn load(&self) -> Result<Manifest, ManifestError> {
        match self {
            ManifestSource::File(path) => Manifest::load_from_file(path),
            ManifestSource::Inline(yaml) => Manifest::load_from_str(yaml),
        }
    }
}

impl fmt::Display for ManifestSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ManifestSource::File(path) => write!(f, "{}", path.display()),
            ManifestSource::Inline(_) => write!(f, "${}", MANIFEST_ENV),
        }
    }
}

impl Manifest {
    /// Load a manifest from a YAML file
    pub fn load_from_file(path: &Path) -> Result<Self, ManifestError> {
        let content = std::fs::read_to_string(path).map_err(|source| ManifestError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!("Read manifest from {}", path.display());
        Self::load_from_str(&content)
    }

    /// Load a manifest from a YAML string
    pub fn load_from_str(yaml: &str) -> Result<Self, ManifestError> {
        let doc: serde_yaml::Value = serde_yaml::from_str(yaml)?;

        validate(&doc).into_result().map_err(ManifestError::Invalid)?;

        let manifest: Manifest = serde_yaml::from_value(doc)?;
        Ok(manifest.normalize())
    }

    /// Expand a leading `~` in output paths. `$` is kept literally.
    fn normalize(mut self) -> Self {
        self.environment_file = PathBuf::from(expand_path(&self.environment_file.to_string_lossy()));

        for secret in &mut self.secrets {
            if secret.kind == SecretKind::File {
                secret.destination = expand_path(&secret.destination);
            }
        }

        self
    }

    /// Latest-version reference for one of this manifest's secrets
    pub fn latest_version(&self, secret: &SecretDescriptor) -> SecretVersion {
        SecretVersion::latest(&self.gcp_project_id, &secret.name)
    }
}

fn expand_path(path: &str) -> String {
    shellexpand::tilde(path).into_owned()
}
