//! The configuration store: the resolved mapping plus the metadata needed to
//! load it.

use crate::core::context::resolve_private_key;
use crate::core::{ConfigLoader, ConfigStoreBuilder, EnvSnapshot, LoadContext, SourceContext};
use crate::error::{ConfigError, Result};
use crate::sources::{ConfigSource, SourceEntry};
use crate::value::{ConfigMap, ENVIRONMENT_KEY, is_upper_key};
use secrecy::SecretString;
use serde::de::DeserializeOwned;
use serde_yaml::Value;
use std::fmt;
use std::path::{Path, PathBuf};

/// Resolved configuration and the sources it came from.
///
/// A store is built once, loaded once, then read for the life of the process.
///
/// # Examples
///
/// ```rust,no_run
/// use ordbok::prelude::*;
///
/// # fn example() -> Result<()> {
/// let mut config = ConfigStore::builder()
///     .with_config_dir("config")
///     .with_file("config.yml")
///     .with_file("local_config.yml")
///     .build();
/// config.load()?;
///
/// let debug = config.get_bool("DEBUG").unwrap_or(false);
/// println!("environment: {:?}, debug: {}", config.environment(), debug);
/// # Ok(())
/// # }
/// ```
pub struct ConfigStore {
    mapping: ConfigMap,
    namespace: String,
    config_dir: PathBuf,
    entries: Vec<SourceEntry>,
    include_env: bool,
    default_environment: String,
    env: Option<EnvSnapshot>,
    loader: ConfigLoader,
    loaded: bool,
}

impl ConfigStore {
    /// Create a new builder for constructing a store.
    pub fn builder() -> ConfigStoreBuilder {
        ConfigStoreBuilder::new()
    }

    /// Create a store with the default settings: `config/config.yml`,
    /// `config/local_config.yml`, then the environment, under the `ordbok`
    /// namespace.
    pub fn new() -> Self {
        ConfigStoreBuilder::new().build()
    }

    pub(crate) fn from_parts(
        mapping: ConfigMap,
        namespace: String,
        config_dir: PathBuf,
        entries: Vec<SourceEntry>,
        include_env: bool,
        default_environment: String,
        env: Option<EnvSnapshot>,
    ) -> Self {
        Self {
            mapping,
            namespace,
            config_dir,
            entries,
            include_env,
            default_environment,
            env,
            loader: ConfigLoader::default(),
            loaded: false,
        }
    }

    /// Resolve every source into the mapping.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Reuse`] if the store was already loaded (even if
    /// that load failed), otherwise the first error raised while resolving.
    pub fn load(&mut self) -> Result<()> {
        if self.loaded {
            return Err(ConfigError::Reuse);
        }
        self.loaded = true;

        if let Some(key) = self.mapping.keys().find(|k| !is_upper_key(k)) {
            return Err(ConfigError::LowercaseKey {
                key: key.clone(),
                source_name: "preset values".to_string(),
            });
        }

        let env = self.env.get_or_insert_with(EnvSnapshot::capture);
        let environment = match self.mapping.get(ENVIRONMENT_KEY).and_then(Value::as_str) {
            Some(preset) if !preset.is_empty() => preset.to_lowercase(),
            _ => {
                let variable = format!("{}_{}", self.namespace.to_uppercase(), ENVIRONMENT_KEY);
                env.get(&variable)
                    .filter(|e| !e.is_empty())
                    .unwrap_or(self.default_environment.as_str())
                    .to_lowercase()
            }
        };
        self.mapping
            .insert(ENVIRONMENT_KEY.to_string(), Value::String(environment.clone()));

        tracing::info!(
            namespace = %self.namespace,
            environment = %environment,
            config_dir = %self.config_dir.display(),
            "loading configuration"
        );

        let source_ctx = SourceContext {
            namespace: &self.namespace,
            config_dir: &self.config_dir,
        };
        let entries = std::mem::take(&mut self.entries);
        self.loader = ConfigLoader::new(entries, self.include_env, &source_ctx);

        let mut ctx = LoadContext::new(&mut self.mapping, &self.namespace, &environment, env);
        self.loader.load(&mut ctx)?;

        tracing::info!(
            sources = self.loader.sources().len(),
            keys = self.mapping.len(),
            "configuration loaded"
        );
        Ok(())
    }

    /// Whether `load` has been called.
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Get a value by key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.mapping.get(key)
    }

    /// Get a string value by key.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    /// Get a boolean value by key.
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(Value::as_bool)
    }

    /// Get an integer value by key.
    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(Value::as_i64)
    }

    /// Deserialize one value into `T`.
    ///
    /// Returns `Ok(None)` if the key is absent.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        self.get(key)
            .map(|value| {
                serde_yaml::from_value(value.clone()).map_err(|e| {
                    ConfigError::Deserialization(format!("{}: {}", key, e))
                })
            })
            .transpose()
    }

    /// Deserialize the whole mapping into `T`.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T> {
        let mapping = self
            .mapping
            .iter()
            .map(|(k, v)| (Value::String(k.clone()), v.clone()))
            .collect();
        serde_yaml::from_value(Value::Mapping(mapping))
            .map_err(|e| ConfigError::Deserialization(e.to_string()))
    }

    /// Whether a key has a value.
    pub fn contains_key(&self, key: &str) -> bool {
        self.mapping.contains_key(key)
    }

    /// Set a value explicitly.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::LowercaseKey`] if `key` is not upper-case.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Result<Option<Value>> {
        let key = key.into();
        if !is_upper_key(&key) {
            return Err(ConfigError::LowercaseKey {
                key,
                source_name: "caller".to_string(),
            });
        }
        Ok(self.mapping.insert(key, value.into()))
    }

    /// Iterate over every resolved key and value.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.mapping.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// The resolved mapping.
    pub fn mapping(&self) -> &ConfigMap {
        &self.mapping
    }

    /// Number of resolved keys.
    pub fn len(&self) -> usize {
        self.mapping.len()
    }

    /// Whether nothing has been resolved.
    pub fn is_empty(&self) -> bool {
        self.mapping.is_empty()
    }

    /// The active environment name, once loaded or preset.
    pub fn environment(&self) -> Option<&str> {
        self.get_str(ENVIRONMENT_KEY)
    }

    /// The namespace prefixing environment variables and deferral keywords.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Directory file sources are resolved against.
    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Keywords of the loaded sources, in load order.
    pub fn source_keywords(&self) -> Vec<&str> {
        self.loader.sources().iter().map(|s| s.keyword()).collect()
    }

    /// Paths of every file-backed source, in load order.
    ///
    /// Empty until the store is loaded. Encrypted sources report their
    /// ciphertext path.
    pub fn source_file_paths(&self) -> Vec<PathBuf> {
        self.loader.source_file_paths()
    }

    /// The passphrase for encrypted sources.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingPrivateKey`] if neither the mapping nor
    /// the environment provides one.
    pub fn private_key(&self) -> Result<SecretString> {
        let captured;
        let env = match &self.env {
            Some(env) => env,
            None => {
                captured = EnvSnapshot::capture();
                &captured
            }
        };
        resolve_private_key(&self.mapping, env, &self.namespace)
    }
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ConfigStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Values may hold secrets; show keys only.
        f.debug_struct("ConfigStore")
            .field("namespace", &self.namespace)
            .field("config_dir", &self.config_dir)
            .field("loaded", &self.loaded)
            .field("keys", &self.mapping.keys().collect::<Vec<_>>())
            .finish()
    }
}
