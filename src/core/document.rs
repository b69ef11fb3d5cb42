//! Document loading: raw bytes to an environment-scoped key/value mapping.

use crate::error::{ConfigError, Result};
use serde_yaml::{Mapping, Value};
use std::io::ErrorKind;
use std::path::Path;

/// Read and parse the document at `path`.
///
/// Returns `Ok(None)` when the file does not exist or is empty.
///
/// # Errors
///
/// Returns [`ConfigError::Format`] when the content is not a mapping at the
/// top level, and [`ConfigError::Io`] for read failures other than not-found.
pub fn load_document(path: &Path, environment: &str) -> Result<Option<Mapping>> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "config file not found, skipping");
            return Ok(None);
        }
        Err(e) => return Err(e.into()),
    };
    parse_document(&bytes, &path.display().to_string(), environment)
}

/// Parse document bytes and scope them to the active environment.
///
/// If the top-level mapping has a key equal to the upper-cased environment
/// name, that sub-mapping replaces the whole document.
pub fn parse_document(bytes: &[u8], origin: &str, environment: &str) -> Result<Option<Mapping>> {
    let mut doc: Value =
        serde_yaml::from_slice(bytes).map_err(|e| ConfigError::format(origin, e.to_string()))?;
    doc.apply_merge()
        .map_err(|e| ConfigError::format(origin, e.to_string()))?;

    let mut root = match doc {
        Value::Null => return Ok(None),
        Value::Mapping(map) => map,
        other => {
            return Err(ConfigError::format(
                origin,
                format!("top level is {}", describe(&other)),
            ));
        }
    };

    match root.remove(environment.to_uppercase().as_str()) {
        Some(Value::Mapping(scoped)) => Ok(Some(scoped)),
        Some(Value::Null) => Ok(None),
        Some(other) => Err(ConfigError::format(
            origin,
            format!(
                "{} section is {}",
                environment.to_uppercase(),
                describe(&other)
            ),
        )),
        None => Ok(Some(root)),
    }
}

/// Decode one environment variable value with the document scalar rules.
///
/// `"True"` becomes a boolean, `"42"` an integer, anything else that is not
/// valid YAML structure stays the string it was.
pub fn parse_env_value(name: &str, raw: &str) -> Result<Value> {
    serde_yaml::from_str(raw).map_err(|e| ConfigError::format(name, e.to_string()))
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a sequence",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}
