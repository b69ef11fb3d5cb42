//! Builder for constructing ConfigStore instances.

use crate::core::{ConfigStore, EnvSnapshot};
use crate::error::Result;
use crate::sources::SourceEntry;
use crate::value::{ConfigMap, ENVIRONMENT_KEY};
use serde_yaml::Value;
use std::path::PathBuf;

/// Default namespace for environment variables and deferral keywords.
pub const DEFAULT_NAMESPACE: &str = "ordbok";

/// Default environment when neither the caller nor the environment sets one.
pub const DEFAULT_ENVIRONMENT: &str = "development";

/// Default config directory, relative to the root path.
pub const DEFAULT_CONFIG_DIR: &str = "config";

/// Default file sources, in load order.
pub const DEFAULT_FILES: [&str; 2] = ["config.yml", "local_config.yml"];

/// Builder for constructing a [`ConfigStore`].
///
/// # Examples
///
/// ```rust,no_run
/// use ordbok::prelude::*;
/// use ordbok::sources::EncryptedFileSource;
///
/// # fn example() -> Result<()> {
/// let config = ConfigStore::builder()
///     .with_namespace("myapp")
///     .with_file("config.yml")
///     .with_file("local_config.yml")
///     .with_source(EncryptedFileSource::new("private_config.yml"))
///     .load()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ConfigStoreBuilder {
    namespace: String,
    root_path: Option<PathBuf>,
    config_dir: PathBuf,
    entries: Option<Vec<SourceEntry>>,
    include_env: bool,
    default_environment: String,
    env: Option<EnvSnapshot>,
    presets: ConfigMap,
}

impl ConfigStoreBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            root_path: None,
            config_dir: PathBuf::from(DEFAULT_CONFIG_DIR),
            entries: None,
            include_env: true,
            default_environment: DEFAULT_ENVIRONMENT.to_string(),
            env: None,
            presets: ConfigMap::new(),
        }
    }

    /// Set the namespace.
    ///
    /// Environment variables are read as `{NAMESPACE}_{KEY}` and source
    /// keywords become `{namespace}_{file stem}`.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Set the directory the config directory is relative to.
    ///
    /// Defaults to the process working directory.
    pub fn with_root_path(mut self, root: impl Into<PathBuf>) -> Self {
        self.root_path = Some(root.into());
        self
    }

    /// Set the config directory, relative to the root path (or absolute).
    pub fn with_config_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config_dir = dir.into();
        self
    }

    /// Add a file source by name.
    ///
    /// The first source added replaces the default file list. Sources load in
    /// the order they are added: earlier files win, and a file may only
    /// defer keys to files added after it.
    pub fn with_file(self, name: impl Into<String>) -> Self {
        self.with_entry(SourceEntry::Name(name.into()))
    }

    /// Add a pre-built source.
    pub fn with_source(self, source: impl Into<SourceEntry>) -> Self {
        self.with_entry(source.into())
    }

    /// Add a source entry.
    pub fn with_entry(mut self, entry: SourceEntry) -> Self {
        self.entries.get_or_insert_with(Vec::new).push(entry);
        self
    }

    /// Add entries from a document value, such as a `SOURCES:` list.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::ConfigError::InvalidSourceEntry`] for any
    /// element that is not a file name.
    pub fn with_entries_from(mut self, list: &[Value]) -> Result<Self> {
        for value in list {
            self = self.with_entry(SourceEntry::try_from(value)?);
        }
        Ok(self)
    }

    /// Whether to append the environment source after the file sources.
    pub fn with_env(mut self, include: bool) -> Self {
        self.include_env = include;
        self
    }

    /// Environment used when neither a preset nor `{NAMESPACE}_ENVIRONMENT` sets one.
    pub fn with_default_environment(mut self, environment: impl Into<String>) -> Self {
        self.default_environment = environment.into();
        self
    }

    /// Fix the environment, ignoring `{NAMESPACE}_ENVIRONMENT`.
    pub fn with_environment(self, environment: impl AsRef<str>) -> Self {
        let environment = environment.as_ref().to_lowercase();
        self.with_value(ENVIRONMENT_KEY, environment)
    }

    /// Use an explicit environment snapshot instead of the process environment.
    pub fn with_env_vars(mut self, env: EnvSnapshot) -> Self {
        self.env = Some(env);
        self
    }

    /// Preset a value before any source loads.
    ///
    /// Presets count as the first writer: sources cannot replace them.
    pub fn with_value(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.presets.insert(key.into(), value.into());
        self
    }

    /// Build the store without loading it.
    pub fn build(self) -> ConfigStore {
        let root = self
            .root_path
            .unwrap_or_else(|| std::env::current_dir().unwrap_or_default());
        let entries = self.entries.unwrap_or_else(|| {
            DEFAULT_FILES
                .iter()
                .map(|name| SourceEntry::from(*name))
                .collect()
        });

        ConfigStore::from_parts(
            self.presets,
            self.namespace,
            root.join(self.config_dir),
            entries,
            self.include_env,
            self.default_environment,
            self.env,
        )
    }

    /// Build the store and load it.
    ///
    /// # Errors
    ///
    /// Returns any error raised by [`ConfigStore::load`].
    pub fn load(self) -> Result<ConfigStore> {
        let mut store = self.build();
        store.load()?;
        Ok(store)
    }
}

impl Default for ConfigStoreBuilder {
    fn default() -> Self {
        Self::new()
    }
}
