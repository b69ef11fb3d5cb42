//! Error types for ordbok.

use std::path::PathBuf;

/// Result type alias for ordbok operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors that can occur while resolving configuration.
///
/// Every error is fatal to the `load()` that raised it. There is no partial
/// success mode: either the whole mapping resolves or the caller should stop.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A document parsed, but its content is not a mapping at the top level.
    #[error("{origin} did not load as a mapping: {reason}. Please check its formatting.")]
    Format {
        /// File path or environment variable the content came from
        origin: String,
        /// What was wrong with it
        reason: String,
    },

    /// A key in a source is not entirely upper-case.
    #[error("{key} config key in {source_name} must be uppercase.")]
    LowercaseKey {
        /// The offending key
        key: String,
        /// Name of the source that declared it
        source_name: String,
    },

    /// A deferral string matches no registered source keyword.
    #[error("{key} is required to be specified in {reference} but {reference} was not registered (declared in {source_name})")]
    MissingSource {
        /// Key whose value was deferred
        key: String,
        /// The deferral string
        reference: String,
        /// Name of the source that declared the deferral
        source_name: String,
    },

    /// A deferral string matches more than one registered source keyword.
    #[error("Config source names are ambiguous for {reference}. Please make them distinct: {candidates:?}")]
    AmbiguousSource {
        /// The deferral string (or duplicated keyword)
        reference: String,
        /// Every keyword it matched
        candidates: Vec<String>,
    },

    /// A source deferred a key to itself.
    #[error("Cannot require {key} to be specified in its own source ({source_name}).")]
    SelfReference {
        /// Key whose value was deferred
        key: String,
        /// Name of the source that declared the deferral
        source_name: String,
    },

    /// A source deferred a key to a source that already finished loading.
    #[error("Cannot require {key} from {referenced} in {current}, {referenced} is loaded before {current}.")]
    AlreadyLoaded {
        /// Key whose value was deferred
        key: String,
        /// Name of the source the key was deferred to
        referenced: String,
        /// Name of the source that declared the deferral
        current: String,
    },

    /// A deferral-looking string appears inside a nested value.
    #[error("Cannot require {value} for {key} in a nested config value; deferrals are only allowed at the top level")]
    NestedDeferral {
        /// Top-level key holding the nested value
        key: String,
        /// The deferral string found inside it
        value: String,
    },

    /// A key deferred to a file-like source is still absent after it loaded.
    #[error("{key} config key should be specified in {source_name} but was not found.")]
    MissingKey {
        /// The missing key
        key: String,
        /// Name of the source that should have provided it
        source_name: String,
    },

    /// A key deferred to the environment is still absent after it loaded.
    #[error("{key} config key should be specified in the environment but was not found.")]
    MissingEnvKey {
        /// The missing key
        key: String,
    },

    /// A targeted environment deferral names a variable that is not set.
    #[error("{key} config key should be specified in the environment as {env_key} but was not found.")]
    TargetedKeyMissing {
        /// Key whose value was deferred
        key: String,
        /// Environment variable expected to hold the value
        env_key: String,
    },

    /// An encrypted source needs a decryption key and none is configured.
    #[error("{key_name} config variable not found. Please set it in configuration loaded before the encrypted source or in the OS environment as {key_name}.")]
    MissingPrivateKey {
        /// Reserved key name that was looked up
        key_name: String,
    },

    /// The plaintext of an encrypted source exists but its ciphertext does not.
    #[error("Encrypted version of private config file '{}' not found. Please encrypt it first.", .path.display())]
    MissingEncryptedFile {
        /// Plaintext path
        path: PathBuf,
    },

    /// Neither half of an encrypted source file pair exists.
    #[error("Private config file '{}' not found. Please create and encrypt it.", .path.display())]
    MissingPlaintextFile {
        /// Plaintext path
        path: PathBuf,
    },

    /// Ciphertext failed authentication or is malformed.
    #[error("Failed to decrypt {origin}: {reason}")]
    Decryption {
        /// What was being decrypted
        origin: String,
        /// Why it failed
        reason: String,
    },

    /// Encryption failed.
    #[error("Failed to encrypt: {0}")]
    Encryption(String),

    /// `load()` invoked more than once on the same store.
    #[error("Configuration store has already been loaded; create a new store to load again")]
    Reuse,

    /// A configured source entry is neither a file name nor a source.
    #[error("Config sources can only be a source instance or the file name of a config file, got {0}")]
    InvalidSourceEntry(String),

    /// Failed to deserialize a value into a caller type.
    #[error("Failed to deserialize configuration: {0}")]
    Deserialization(String),

    /// File watching is not supported or failed to initialize.
    #[cfg(feature = "file-watch")]
    #[error("File watching error: {0}")]
    Watch(String),

    /// IO error occurred.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConfigError {
    /// Build a format error for a given origin.
    pub(crate) fn format(origin: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Format {
            origin: origin.into(),
            reason: reason.into(),
        }
    }
}
