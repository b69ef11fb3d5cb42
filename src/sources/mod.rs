//! Configuration source implementations.

mod config_source;
mod encrypted;
mod env;
mod file;

pub use config_source::{ConfigSource, Deferral, SourceState};
pub use encrypted::{EncryptedFileSource, decrypt_file, encrypt_file, encrypted_path_for, seal, unseal};
pub use env::EnvSource;
pub use file::FileSource;

use crate::core::{KeywordLookup, LoadContext, SourceContext};
use crate::error::{ConfigError, Result};
use serde_yaml::Value;
use std::path::Path;

/// One configured source: the closed set of source kinds a store can load.
#[derive(Debug)]
pub enum Source {
    /// A plain YAML document
    File(FileSource),
    /// A YAML document stored encrypted next to its plaintext name
    Encrypted(EncryptedFileSource),
    /// The process environment
    Env(EnvSource),
}

macro_rules! forward {
    ($self:ident, $s:ident => $body:expr) => {
        match $self {
            Source::File($s) => $body,
            Source::Encrypted($s) => $body,
            Source::Env($s) => $body,
        }
    };
}

impl ConfigSource for Source {
    fn name(&self) -> &str {
        forward!(self, s => s.name())
    }

    fn state(&self) -> &SourceState {
        forward!(self, s => s.state())
    }

    fn state_mut(&mut self) -> &mut SourceState {
        forward!(self, s => s.state_mut())
    }

    fn initialize(&mut self, ctx: &SourceContext<'_>) {
        forward!(self, s => s.initialize(ctx))
    }

    fn load(&mut self, lookup: &KeywordLookup, ctx: &mut LoadContext<'_>) -> Result<Vec<Deferral>> {
        forward!(self, s => s.load(lookup, ctx))
    }

    fn path(&self) -> Option<&Path> {
        forward!(self, s => s.path())
    }

    fn add_required_key(&mut self, key: &str, reference: &str) {
        forward!(self, s => s.add_required_key(key, reference))
    }

    fn missing_key_error(&self, key: &str) -> ConfigError {
        forward!(self, s => s.missing_key_error(key))
    }
}

impl From<FileSource> for Source {
    fn from(source: FileSource) -> Self {
        Source::File(source)
    }
}

impl From<EncryptedFileSource> for Source {
    fn from(source: EncryptedFileSource) -> Self {
        Source::Encrypted(source)
    }
}

impl From<EnvSource> for Source {
    fn from(source: EnvSource) -> Self {
        Source::Env(source)
    }
}

/// A configured source before instantiation: a file name or a ready source.
#[derive(Debug)]
pub enum SourceEntry {
    /// File name, resolved against the config directory
    Name(String),
    /// A pre-built source, used as-is
    Source(Source),
}

impl SourceEntry {
    /// Turn the entry into a source; names become plain file sources.
    pub fn into_source(self) -> Source {
        match self {
            SourceEntry::Name(name) => Source::File(FileSource::new(name)),
            SourceEntry::Source(source) => source,
        }
    }
}

impl From<&str> for SourceEntry {
    fn from(name: &str) -> Self {
        SourceEntry::Name(name.to_string())
    }
}

impl From<String> for SourceEntry {
    fn from(name: String) -> Self {
        SourceEntry::Name(name)
    }
}

impl From<Source> for SourceEntry {
    fn from(source: Source) -> Self {
        SourceEntry::Source(source)
    }
}

impl From<FileSource> for SourceEntry {
    fn from(source: FileSource) -> Self {
        SourceEntry::Source(source.into())
    }
}

impl From<EncryptedFileSource> for SourceEntry {
    fn from(source: EncryptedFileSource) -> Self {
        SourceEntry::Source(source.into())
    }
}

impl From<EnvSource> for SourceEntry {
    fn from(source: EnvSource) -> Self {
        SourceEntry::Source(source.into())
    }
}

impl TryFrom<&Value> for SourceEntry {
    type Error = ConfigError;

    /// Accept a source list entry read from a document; only strings qualify.
    fn try_from(value: &Value) -> Result<Self> {
        match value {
            Value::String(name) => Ok(SourceEntry::Name(name.clone())),
            other => Err(ConfigError::InvalidSourceEntry(
                serde_yaml::to_string(other)
                    .map(|s| s.trim_end().to_string())
                    .unwrap_or_else(|_| format!("{:?}", other)),
            )),
        }
    }
}
