//! The configuration value tree and the rules applied to its keys and values.

use serde_yaml::Value;
use std::collections::BTreeMap;

/// The resolved key/value mapping shared by every source during a load.
pub type ConfigMap = BTreeMap<String, Value>;

/// Reserved key holding the active environment name (lower-case).
pub const ENVIRONMENT_KEY: &str = "ENVIRONMENT";

/// A top-level document value, classified before the merge pass consumes it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Entry<'v> {
    /// A string naming another source as the place this key's value comes from.
    Reference(&'v str),
    /// Anything else: written into the mapping as-is.
    Value(&'v Value),
}

impl<'v> Entry<'v> {
    /// Classify a value against the active namespace.
    ///
    /// Only string scalars beginning with the namespace are references. Which
    /// source they point at is decided later by keyword prefix matching.
    pub fn classify(value: &'v Value, namespace: &str) -> Self {
        match value {
            Value::String(s) if s.starts_with(namespace) => Entry::Reference(s.as_str()),
            other => Entry::Value(other),
        }
    }
}

/// Whether a key is upper-case: at least one cased character and no
/// lower-case ones (`SECRET_KEY` passes, `Secret_Key` and `_1` do not).
pub fn is_upper_key(key: &str) -> bool {
    let mut cased = false;
    for c in key.chars() {
        if c.is_lowercase() {
            return false;
        }
        if c.is_uppercase() {
            cased = true;
        }
    }
    cased
}

/// Find the first string nested anywhere inside `value` that satisfies `matches`.
///
/// The value itself is not tested, only its descendants.
pub(crate) fn find_nested_string<'v, F>(value: &'v Value, matches: &F) -> Option<&'v str>
where
    F: Fn(&str) -> bool,
{
    match value {
        Value::Mapping(map) => map.values().find_map(|v| find_string(v, matches)),
        Value::Sequence(seq) => seq.iter().find_map(|v| find_string(v, matches)),
        Value::Tagged(tagged) => find_string(&tagged.value, matches),
        _ => None,
    }
}

fn find_string<'v, F>(value: &'v Value, matches: &F) -> Option<&'v str>
where
    F: Fn(&str) -> bool,
{
    match value {
        Value::String(s) if matches(s.as_str()) => Some(s.as_str()),
        _ => find_nested_string(value, matches),
    }
}

/// Render a document key as a string, if it is a scalar.
pub(crate) fn key_to_string(key: &Value) -> Option<String> {
    match key {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
