//! Manifest schema checks
//!
//! Validation runs on the raw YAML document so that every offending field is
//! reported at once, keyed by its path (`secrets[1].type`).

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use serde_yaml::{Mapping, Value};

use crate::manifest::SecretKind;

const TOP_LEVEL_FIELDS: [&str; 3] = ["gcp_project_id", "environment_file", "secrets"];
const SECRET_FIELDS: [&str; 3] = ["name", "type", "destination"];

/// Longest secret id accepted by Secret Manager
const MAX_SECRET_NAME_LEN: usize = 255;

/// Project ids are 6 to 30 characters
const PROJECT_ID_LEN: std::ops::RangeInclusive<usize> = 6..=30;

/// Field-level validation errors, keyed by field path
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<String, Vec<String>>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an error against a field
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of offending fields
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Paths of all offending fields, sorted
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Messages recorded for one field
    pub fn messages(&self, field: &str) -> &[String] {
        self.0.get(field).map(Vec::as_slice).unwrap_or_default()
    }

    /// `Ok(())` when nothing was recorded
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let yaml = serde_yaml::to_string(&self.0).map_err(|_| fmt::Error)?;
        f.write_str(yaml.trim_end())
    }
}

/// Check a parsed YAML document against the manifest schema
pub fn validate(doc: &Value) -> ValidationErrors {
    let mut errors = ValidationErrors::new();

    let Some(map) = doc.as_mapping() else {
        errors.add("manifest", "must be of dict type");
        return errors;
    };

    reject_unknown_fields(map, &TOP_LEVEL_FIELDS, "", &mut errors);

    if let Some(project) = required_str(map, "gcp_project_id", "gcp_project_id", &mut errors) {
        if !is_valid_project_id(project) {
            errors.add(
                "gcp_project_id",
                "must be a project id ([domain:]lowercase letters, digits and '-', 6-30 chars)",
            );
        }
    }

    if let Some(path) = required_str(map, "environment_file", "environment_file", &mut errors) {
        check_file_path(path, "environment_file", &mut errors);
    }

    match map.get("secrets") {
        None => {}
        Some(Value::Sequence(secrets)) => {
            for (index, secret) in secrets.iter().enumerate() {
                validate_secret(secret, &format!("secrets[{}]", index), &mut errors);
            }
        }
        Some(Value::Null) => errors.add("secrets", "null value not allowed"),
        Some(_) => errors.add("secrets", "must be of list type"),
    }

    errors
}

fn validate_secret(secret: &Value, path: &str, errors: &mut ValidationErrors) {
    let Some(map) = secret.as_mapping() else {
        errors.add(path, "must be of dict type");
        return;
    };

    reject_unknown_fields(map, &SECRET_FIELDS, path, errors);

    let name_path = format!("{}.name", path);
    if let Some(name) = required_str(map, "name", &name_path, errors) {
        if !is_valid_secret_name(name) {
            errors.add(
                name_path,
                format!("must match [A-Za-z0-9_-]{{1,{}}}", MAX_SECRET_NAME_LEN),
            );
        }
    }

    let type_path = format!("{}.type", path);
    let kind = required_str(map, "type", &type_path, errors).and_then(|value| {
        let kind = SecretKind::parse(value);
        if kind.is_none() {
            errors.add(&type_path, format!("unallowed value {}", value));
        }
        kind
    });

    let destination_path = format!("{}.destination", path);
    if let Some(destination) = required_str(map, "destination", &destination_path, errors) {
        match kind {
            Some(SecretKind::EnvironmentVariable) if !is_valid_env_name(destination) => {
                errors.add(
                    destination_path,
                    "must be a valid environment variable name ([A-Za-z_][A-Za-z0-9_]*)",
                );
            }
            Some(SecretKind::File) => check_file_path(destination, &destination_path, errors),
            _ => {}
        }
    }
}

fn reject_unknown_fields(map: &Mapping, known: &[&str], path: &str, errors: &mut ValidationErrors) {
    for key in map.keys() {
        let name = match key.as_str() {
            Some(name) if known.contains(&name) => continue,
            Some(name) => name.to_string(),
            None => serde_yaml::to_string(key)
                .map(|s| s.trim().to_string())
                .unwrap_or_else(|_| "?".to_string()),
        };

        let field = if path.is_empty() {
            name
        } else {
            format!("{}.{}", path, name)
        };
        errors.add(field, "unknown field");
    }
}

/// Fetch a required, non-empty string field
fn required_str<'a>(
    map: &'a Mapping,
    key: &str,
    path: &str,
    errors: &mut ValidationErrors,
) -> Option<&'a str> {
    match map.get(key) {
        None => {
            errors.add(path, "required field");
            None
        }
        Some(Value::Null) => {
            errors.add(path, "null value not allowed");
            None
        }
        Some(Value::String(value)) if value.trim().is_empty() => {
            errors.add(path, "empty values not allowed");
            None
        }
        Some(Value::String(value)) => Some(value.as_str()),
        Some(_) => {
            errors.add(path, "must be of string type");
            None
        }
    }
}

fn check_file_path(path: &str, field: &str, errors: &mut ValidationErrors) {
    if path.ends_with('/') || path.ends_with(std::path::MAIN_SEPARATOR) {
        errors.add(field, "must name a file, not a directory");
    }
    if path.contains('\0') {
        errors.add(field, "must not contain NUL bytes");
    }
}

fn is_valid_secret_name(name: &str) -> bool {
    name.len() <= MAX_SECRET_NAME_LEN
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// `[a-z][a-z0-9-]{4,28}[a-z0-9]`, optionally behind a `domain.tld:` prefix
fn is_valid_project_id(project: &str) -> bool {
    let id = match project.rsplit_once(':') {
        Some((domain, id)) => {
            let domain_ok = !domain.is_empty()
                && domain.split('.').all(|label| {
                    !label.is_empty()
                        && label
                            .chars()
                            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
                });
            if !domain_ok {
                return false;
            }
            id
        }
        None => project,
    };

    let bytes = id.as_bytes();
    PROJECT_ID_LEN.contains(&bytes.len())
        && bytes[0].is_ascii_lowercase()
        && !bytes.ends_with(b"-")
        && bytes
            .iter()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || *b == b'-')
}

fn is_valid_env_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}
