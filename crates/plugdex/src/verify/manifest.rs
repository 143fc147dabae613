//! Plugin manifest schema.
//!
//! Manifests deserialize into a permissive [`RawManifest`] whose fields accept
//! any JSON value, so [`RawManifest::validate`] can report every missing or
//! mistyped field together. Only a manifest with no issues becomes a typed
//! [`Manifest`].

use std::fmt;

use serde::Deserialize;
use serde_json::Value;

/// Accepted spellings of the minimum host version field, preferred first.
pub const MIN_HOST_VERSION_KEYS: [&str; 3] = ["minimumHostVersion", "minVersion", "minimumVersion"];

/// A schema-valid plugin manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    pub id: Option<String>,
    pub name: String,
    pub version: String,
    pub minimum_host_version: String,
    pub description: Option<String>,
    pub category: Option<String>,
}

/// One schema problem found in a manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestIssue {
    InvalidJson(String),
    NotAnObject,
    Missing { field: &'static str },
    WrongType { field: String, found: &'static str },
}

impl fmt::Display for ManifestIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidJson(e) => write!(f, "manifest is not valid JSON: {e}"),
            Self::NotAnObject => f.write_str("manifest must be a JSON object"),
            Self::Missing { field } => write!(f, "manifest is missing required field '{field}'"),
            Self::WrongType { field, found } => {
                write!(f, "manifest field '{field}' must be a string, found {found}")
            }
        }
    }
}

/// A manifest field as written, before its type is checked.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Field {
    Text(String),
    Other(Value),
}

/// A manifest as found on the default branch. Unknown keys are ignored.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawManifest {
    #[serde(default)]
    id: Option<Field>,
    #[serde(default)]
    name: Option<Field>,
    #[serde(default)]
    version: Option<Field>,
    #[serde(default)]
    minimum_host_version: Option<Field>,
    #[serde(default)]
    min_version: Option<Field>,
    #[serde(default)]
    minimum_version: Option<Field>,
    #[serde(default)]
    description: Option<Field>,
    #[serde(default)]
    category: Option<Field>,
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Take the string out of a present field, recording a type issue otherwise.
fn text(field: Option<Field>, key: &str, issues: &mut Vec<ManifestIssue>) -> Option<String> {
    match field? {
        Field::Text(s) => Some(s),
        Field::Other(other) => {
            issues.push(ManifestIssue::WrongType {
                field: key.to_string(),
                found: type_name(&other),
            });
            None
        }
    }
}

fn required(
    field: Option<Field>,
    key: &'static str,
    issues: &mut Vec<ManifestIssue>,
) -> Option<String> {
    if field.is_none() {
        issues.push(ManifestIssue::Missing { field: key });
    }
    text(field, key, issues)
}

impl RawManifest {
    /// Check field presence and types, collecting every issue.
    fn validate(self) -> Result<Manifest, Vec<ManifestIssue>> {
        let mut issues = Vec::new();

        let name = required(self.name, "name", &mut issues);
        let version = required(self.version, "version", &mut issues);

        let [preferred, short, long] = MIN_HOST_VERSION_KEYS;
        let minimum_host_version = match (
            self.minimum_host_version,
            self.min_version,
            self.minimum_version,
        ) {
            (Some(field), _, _) => text(Some(field), preferred, &mut issues),
            (None, Some(field), _) => text(Some(field), short, &mut issues),
            (None, None, Some(field)) => text(Some(field), long, &mut issues),
            (None, None, None) => required(None, preferred, &mut issues),
        };

        let id = text(self.id, "id", &mut issues);
        let description = text(self.description, "description", &mut issues);
        let category = text(self.category, "category", &mut issues);

        match (name, version, minimum_host_version) {
            (Some(name), Some(version), Some(minimum_host_version)) if issues.is_empty() => {
                Ok(Manifest {
                    id,
                    name,
                    version,
                    minimum_host_version,
                    description,
                    category,
                })
            }
            _ => Err(issues),
        }
    }
}

/// Validate raw manifest bytes.
pub fn parse_manifest(bytes: &[u8]) -> Result<Manifest, Vec<ManifestIssue>> {
    let value: Value = serde_json::from_slice(bytes)
        .map_err(|e| vec![ManifestIssue::InvalidJson(e.to_string())])?;
    if !value.is_object() {
        return Err(vec![ManifestIssue::NotAnObject]);
    }
    let raw = RawManifest::deserialize(value)
        .map_err(|e| vec![ManifestIssue::InvalidJson(e.to_string())])?;
    raw.validate()
}
