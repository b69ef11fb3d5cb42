//! State handed to sources while they are initialized and loaded.

use crate::error::{ConfigError, Result};
use crate::value::ConfigMap;
use secrecy::SecretString;
use serde_yaml::Value;
use std::collections::BTreeMap;
use std::path::Path;

/// A snapshot of environment variables.
///
/// The store captures the process environment once per load so every source
/// sees the same variables. Tests and embedders can supply their own.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvSnapshot {
    vars: BTreeMap<String, String>,
}

impl EnvSnapshot {
    /// Capture the current process environment.
    ///
    /// Variables whose name or value is not valid unicode are skipped.
    pub fn capture() -> Self {
        let vars = std::env::vars_os()
            .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
            .collect();
        Self { vars }
    }

    /// Build a snapshot from explicit pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Look up one variable by exact name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    /// Iterate over `(name, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Context handed to a source when it is bound to a store.
#[derive(Debug, Clone, Copy)]
pub struct SourceContext<'a> {
    /// Active namespace, as configured (e.g. `ordbok`)
    pub namespace: &'a str,
    /// Directory file names are resolved against
    pub config_dir: &'a Path,
}

/// Per-load handle on the shared mapping.
///
/// Sources receive it as a parameter of `load` and must not keep it.
pub struct LoadContext<'a> {
    pub(crate) mapping: &'a mut ConfigMap,
    pub(crate) namespace: &'a str,
    pub(crate) environment: &'a str,
    pub(crate) env: &'a EnvSnapshot,
}

impl<'a> LoadContext<'a> {
    pub(crate) fn new(
        mapping: &'a mut ConfigMap,
        namespace: &'a str,
        environment: &'a str,
        env: &'a EnvSnapshot,
    ) -> Self {
        Self {
            mapping,
            namespace,
            environment,
            env,
        }
    }

    /// The active namespace.
    pub fn namespace(&self) -> &str {
        self.namespace
    }

    /// The active environment name, lower-case.
    pub fn environment(&self) -> &str {
        self.environment
    }

    /// The environment variables visible to this load.
    pub fn env(&self) -> &EnvSnapshot {
        self.env
    }

    /// Read a value already resolved into the mapping.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.mapping.get(key)
    }

    /// Write a value unless an earlier writer already set the key.
    ///
    /// Returns `false` when the key was kept as it was.
    pub fn write(&mut self, key: &str, value: Value, source_name: &str) -> bool {
        if let Some(existing) = self.mapping.get(key) {
            if !existing.is_null() {
                tracing::warn!(
                    key,
                    source = source_name,
                    "key already resolved by an earlier source, keeping the first value"
                );
                return false;
            }
        }
        tracing::trace!(key, source = source_name, "resolved key");
        self.mapping.insert(key.to_string(), value);
        true
    }

    /// Resolve the passphrase for encrypted sources.
    pub fn private_key(&self) -> Result<SecretString> {
        resolve_private_key(&*self.mapping, self.env, self.namespace)
    }
}

/// Name of the reserved key holding the passphrase for encrypted sources.
pub fn private_key_name(namespace: &str) -> String {
    format!("PRIVATE_KEY_{}", namespace.to_uppercase())
}

/// Look the passphrase up in the mapping, then in `{NS}_PRIVATE_KEY_{NS}`,
/// then in `PRIVATE_KEY_{NS}`.
pub(crate) fn resolve_private_key(
    mapping: &ConfigMap,
    env: &EnvSnapshot,
    namespace: &str,
) -> Result<SecretString> {
    let key_name = private_key_name(namespace);
    let namespaced = format!("{}_{}", namespace.to_uppercase(), key_name);

    // YAML may decode a passphrase such as `123456` as a number.
    let from_mapping = match mapping.get(&key_name) {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        Some(_) => {
            return Err(ConfigError::format(
                key_name,
                "private key must be a scalar value",
            ));
        }
    };
    from_mapping
        .or_else(|| env.get(&namespaced).map(str::to_string))
        .or_else(|| env.get(&key_name).map(str::to_string))
        .filter(|key| !key.is_empty())
        .map(|key| SecretString::new(key.into()))
        .ok_or(ConfigError::MissingPrivateKey { key_name })
}
