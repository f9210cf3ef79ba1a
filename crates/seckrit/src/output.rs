//! Output writers: the generated environment file and standalone secret files

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors writing a secret to its destination
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Permission denied: {}", .path.display())]
    PermissionDenied { path: PathBuf },

    #[error("Failed to write '{}': {source}", .path.display())]
    Io { path: PathBuf, source: io::Error },

    #[error("Value for {key} is not valid UTF-8")]
    NotUtf8 { key: String },

    #[error("Value for {key} spans multiple lines")]
    Multiline { key: String },
}

impl OutputError {
    fn io(path: &Path, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::PermissionDenied {
            OutputError::PermissionDenied {
                path: path.to_path_buf(),
            }
        } else {
            OutputError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    }

    pub fn is_permission_denied(&self) -> bool {
        matches!(self, OutputError::PermissionDenied { .. })
    }
}

/// Creates parent directories for `path` so that a file can be written there
pub fn create_parent_dirs(path: &Path) -> Result<(), OutputError> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            std::fs::create_dir_all(parent).map_err(|e| OutputError::io(parent, e))
        }
        _ => Ok(()),
    }
}

/// Write a secret payload to its own file, replacing any previous content
///
/// On Unix a newly created file is only readable by its owner.
pub fn write_secret_file(path: &Path, payload: &[u8]) -> Result<(), OutputError> {
    create_parent_dirs(path)?;

    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(path).map_err(|e| OutputError::io(path, e))?;
    file.write_all(payload).map_err(|e| OutputError::io(path, e))?;
    file.flush().map_err(|e| OutputError::io(path, e))
}

/// The generated `KEY=VALUE` file
///
/// Created (or truncated) once per run and appended to per secret.
#[derive(Debug)]
pub struct EnvironmentFile {
    path: PathBuf,
    file: File,
    lines: usize,
}

impl EnvironmentFile {
    /// Create the file and its parent directories, truncating any previous content
    pub fn create(path: &Path) -> Result<Self, OutputError> {
        create_parent_dirs(path)?;
        let file = File::create(path).map_err(|e| OutputError::io(path, e))?;

        Ok(Self {
            path: path.to_path_buf(),
            file,
            lines: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of variables written so far
    pub fn lines(&self) -> usize {
        self.lines
    }

    /// Append `key=value`
    ///
    /// One trailing line break in the payload is dropped; any other line
    /// break is rejected so that every variable occupies exactly one line.
    pub fn append(&mut self, key: &str, payload: &[u8]) -> Result<(), OutputError> {
        let value = std::str::from_utf8(payload).map_err(|_| OutputError::NotUtf8 {
            key: key.to_string(),
        })?;

        let value = value
            .strip_suffix("\r\n")
            .or_else(|| value.strip_suffix('\n'))
            .unwrap_or(value);

        if value.contains(['\n', '\r']) {
            return Err(OutputError::Multiline {
                key: key.to_string(),
            });
        }

        writeln!(self.file, "{}={}", key, value).map_err(|e| OutputError::io(&self.path, e))?;
        self.lines += 1;
        Ok(())
    }

    /// Flush and close the file, returning the number of variables written
    pub fn finish(mut self) -> Result<usize, OutputError> {
        self.file
            .flush()
            .map_err(|e| OutputError::io(&self.path, e))?;
        self.file
            .sync_all()
            .map_err(|e| OutputError::io(&self.path, e))?;
        Ok(self.lines)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_file_lines_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/dir/app.env");

        let mut env = EnvironmentFile::create(&path).unwrap();
        env.append("FIRST", b"one").unwrap();
        env.append("SECOND", b"two\n").unwrap();
        assert_eq!(env.lines(), 2);
        assert_eq!(env.finish().unwrap(), 2);

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "FIRST=one\nSECOND=two\n");
    }

    #[test]
    fn test_environment_file_truncates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.env");
        std::fs::write(&path, "STALE=value\n").unwrap();

        let env = EnvironmentFile::create(&path).unwrap();
        assert_eq!(env.finish().unwrap(), 0);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "");
    }

    #[test]
    fn test_rejects_multiline_value() {
        let dir = tempfile::tempdir().unwrap();
        let mut env = EnvironmentFile::create(&dir.path().join("app.env")).unwrap();

        let result = env.append("CERT", b"line one\nline two\n");
        assert!(matches!(result, Err(OutputError::Multiline { .. })));
        assert_eq!(env.lines(), 0);
    }

    #[test]
    fn test_rejects_non_utf8_value() {
        let dir = tempfile::tempdir().unwrap();
        let mut env = EnvironmentFile::create(&dir.path().join("app.env")).unwrap();

        let result = env.append("BLOB", &[0xFF, 0xFE]);
        assert!(matches!(result, Err(OutputError::NotUtf8 { .. })));
    }

    #[test]
    fn test_write_secret_file_exact_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keys/tls.key");
        let payload = [0u8, 159, 146, 150, b'\n', b'\r'];

        write_secret_file(&path, &payload).unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), payload);

        // Rewrites replace the previous content
        write_secret_file(&path, b"short").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"short");
    }

    #[test]
    #[cfg(unix)]
    fn test_secret_file_mode() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("secret.txt");
        write_secret_file(&path, b"s3cr3t").unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_create_parent_dirs_for_bare_file_name() {
        assert!(create_parent_dirs(Path::new("just-a-file.txt")).is_ok());
    }

    #[test]
    fn test_permission_denied_mapping() {
        let err = OutputError::io(
            Path::new("/root/x"),
            io::Error::from(io::ErrorKind::PermissionDenied),
        );
        assert!(err.is_permission_denied());
        assert_eq!(err.to_string(), "Permission denied: /root/x");
    }
}
