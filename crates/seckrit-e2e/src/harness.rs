//! Test workspace harness for E2E tests
//!
//! This module provides a temporary directory to hold manifests and the
//! files seckrit writes, plus helpers to inspect the results.

use std::path::{Path, PathBuf};

use seckrit::{Manifest, ManifestError, ManifestSource};
use tempfile::TempDir;

/// Placeholder replaced by the workspace directory in manifest templates
pub const DIR_PLACEHOLDER: &str = "{dir}";

/// Initialize tracing for tests (ignored if already initialized)
pub fn init_test() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("seckrit=debug,seckrit_secrets=debug,seckrit_e2e=debug")
        .with_test_writer()
        .try_init();
}

/// A temporary directory holding a manifest and its outputs
pub struct TestWorkspace {
    dir: TempDir,
}

impl TestWorkspace {
    /// Create an empty workspace
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("Failed to create temp dir"),
        }
    }

    /// Root of the workspace
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Path of a file inside the workspace
    pub fn join(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.dir.path().join(relative)
    }

    /// Replace `{dir}` in a manifest template with the workspace path
    pub fn render(&self, template: &str) -> String {
        template.replace(DIR_PLACEHOLDER, &self.path().display().to_string())
    }

    /// Write a manifest template to `manifest.yml` and return its path
    pub fn write_manifest(&self, template: &str) -> PathBuf {
        let path = self.join("manifest.yml");
        std::fs::write(&path, self.render(template)).expect("Failed to write manifest");
        path
    }

    /// Write a manifest template and load it the way the binary does
    pub fn load_manifest(&self, template: &str) -> Result<Manifest, ManifestError> {
        let path = self.write_manifest(template);
        ManifestSource::resolve(Some(path), None)?.load()
    }

    /// Lines of a text file inside the workspace
    pub fn read_lines(&self, relative: impl AsRef<Path>) -> Vec<String> {
        std::fs::read_to_string(self.join(relative))
            .expect("Failed to read file")
            .lines()
            .map(str::to_string)
            .collect()
    }

    /// Raw bytes of a file inside the workspace
    pub fn read_bytes(&self, relative: impl AsRef<Path>) -> Vec<u8> {
        std::fs::read(self.join(relative)).expect("Failed to read file")
    }
}

impl Default for TestWorkspace {
    fn default() -> Self {
        Self::new()
    }
}
