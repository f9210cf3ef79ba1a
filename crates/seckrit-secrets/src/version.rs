use std::fmt;

/// Version alias that always points at the most recent enabled version
pub const LATEST: &str = "latest";

/// Reference to one version of a secret in Secret Manager.
///
/// Formats as the resource name
/// `projects/{project}/secrets/{secret}/versions/{version}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SecretVersion {
    pub project: String,
    pub secret: String,
    pub version: String,
}

impl SecretVersion {
    /// Reference the latest version of `secret` in `project`
    pub fn latest(project: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            secret: secret.into(),
            version: LATEST.to_string(),
        }
    }

    /// Full resource name used by the API
    pub fn resource_name(&self) -> String {
        format!(
            "projects/{}/secrets/{}/versions/{}",
            self.project, self.secret, self.version
        )
    }
}

impl fmt::Display for SecretVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.resource_name())
    }
}
