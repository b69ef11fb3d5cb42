//! # ordbok
//!
//! Layered configuration loading from YAML files, encrypted YAML files and
//! environment variables.
//!
//! ## Overview
//!
//! `ordbok` resolves one flat, upper-case keyed mapping from an ordered list of
//! sources:
//! - YAML files under a config directory (`config.yml`, `local_config.yml`)
//! - Encrypted YAML files (`private_config.yml.private`), decrypted with a
//!   private key from the mapping or the environment
//! - `{NAMESPACE}_{KEY}` environment variables, always last
//!
//! A file may defer a key to a later source instead of giving its value:
//!
//! ```yaml
//! # config/config.yml
//! DEBUG: false
//! DATABASE_URL: ordbok_local_config   # must come from local_config.yml
//! SECRET_KEY: ordbok_env_config       # must come from ORDBOK_SECRET_KEY
//! ```
//!
//! Loading fails with a descriptive [`error::ConfigError`] if a deferred key is
//! never supplied, so misconfigured deployments stop at startup instead of at
//! first use.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ordbok::prelude::*;
//!
//! # fn example() -> ordbok::error::Result<()> {
//! let config = ConfigStore::builder()
//!     .with_namespace("ordbok")
//!     .with_file("config.yml")
//!     .with_file("local_config.yml")
//!     .load()?;
//!
//! println!("environment: {:?}", config.environment());
//! let debug = config.get_bool("DEBUG").unwrap_or(false);
//! # Ok(())
//! # }
//! ```
//!
//! ## Environments
//!
//! The active environment comes from `{NAMESPACE}_ENVIRONMENT` (default
//! `development`). A document with a top-level block named after it in
//! upper case, e.g. `PRODUCTION:`, uses only that block. YAML merge keys let
//! environment blocks share a common base.
//!
//! ## Feature Flags
//!
//! - `file-watch` (default): [`notify::ConfigWatcher`] signals when source
//!   files change.

#![warn(missing_docs, rust_2024_compatibility)]
#![deny(unsafe_code)]

pub mod core;
pub mod crypto;
pub mod error;
pub mod sources;
pub mod value;

#[cfg(feature = "file-watch")]
pub mod notify;

/// Convenient re-exports for common usage patterns.
pub mod prelude {
    pub use crate::core::{ConfigStore, ConfigStoreBuilder, EnvSnapshot};
    pub use crate::error::{ConfigError, Result};
    pub use crate::sources::{ConfigSource, EncryptedFileSource, EnvSource, FileSource, SourceEntry};
}
