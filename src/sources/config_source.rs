//! Configuration source trait and the merge pass every document-backed
//! source shares.

use crate::core::{KeywordLookup, LoadContext, SourceContext};
use crate::error::{ConfigError, Result};
use crate::value::{Entry, find_nested_string, is_upper_key, key_to_string};
use serde_yaml::{Mapping, Value};
use std::path::Path;

/// Bookkeeping common to every source.
#[derive(Debug, Clone, Default)]
pub struct SourceState {
    keyword: String,
    required_keys: Vec<String>,
    loaded: bool,
}

impl SourceState {
    /// Bind to a keyword and forget any previous bookkeeping.
    pub(crate) fn reset(&mut self, keyword: String) {
        self.keyword = keyword;
        self.required_keys.clear();
        self.loaded = false;
    }

    /// The source's unique keyword (`{namespace}_{short name}`).
    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    /// Keys other sources deferred onto this one.
    pub fn required_keys(&self) -> &[String] {
        &self.required_keys
    }

    /// Whether this source finished loading.
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub(crate) fn require(&mut self, key: &str) {
        if !self.required_keys.iter().any(|k| k == key) {
            self.required_keys.push(key.to_string());
        }
    }

    pub(crate) fn mark_loaded(&mut self) {
        self.loaded = true;
    }
}

/// A key whose value a source left for another source to supply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deferral {
    /// The deferred key
    pub key: String,
    /// The raw deferral string, e.g. `ordbok_env_config_external_api_key`
    pub reference: String,
    /// Position of the source that must supply it
    pub target: usize,
}

/// Trait for configuration sources.
///
/// A source is initialized once against a store, then loaded exactly once in
/// declaration order. Loading writes the source's own keys into the shared
/// mapping and reports the keys it deferred to later sources.
pub trait ConfigSource {
    /// Human-readable name used in errors and logs.
    fn name(&self) -> &str;

    /// Shared bookkeeping.
    fn state(&self) -> &SourceState;

    /// Mutable shared bookkeeping.
    fn state_mut(&mut self) -> &mut SourceState;

    /// Bind the source to a store: compute its keyword and reset its state.
    fn initialize(&mut self, ctx: &SourceContext<'_>);

    /// Load the source into `ctx`, returning the keys it deferred elsewhere.
    ///
    /// # Errors
    ///
    /// Returns an error if the source content is malformed, a deferral is
    /// invalid, or a key deferred onto this source is still missing.
    fn load(&mut self, lookup: &KeywordLookup, ctx: &mut LoadContext<'_>) -> Result<Vec<Deferral>>;

    /// Filesystem path this source reads, if any.
    fn path(&self) -> Option<&Path> {
        None
    }

    /// The source's keyword.
    fn keyword(&self) -> &str {
        self.state().keyword()
    }

    /// Whether the source finished loading.
    fn is_loaded(&self) -> bool {
        self.state().is_loaded()
    }

    /// Record that an earlier source deferred `key` to this one.
    fn add_required_key(&mut self, key: &str, _reference: &str) {
        self.state_mut().require(key);
    }

    /// The error raised when a deferred key is still missing.
    fn missing_key_error(&self, key: &str) -> ConfigError {
        ConfigError::MissingKey {
            key: key.to_string(),
            source_name: self.name().to_string(),
        }
    }

    /// Verify every key deferred onto this source now has a value.
    fn check_required_keys(&self, ctx: &LoadContext<'_>) -> Result<()> {
        for key in self.state().required_keys() {
            if ctx.get(key).is_none_or(Value::is_null) {
                return Err(self.missing_key_error(key));
            }
        }
        Ok(())
    }
}

/// Merge one parsed document into the shared mapping.
///
/// Plain values are written directly. Values naming another source are
/// validated against `lookup` and returned as deferrals instead.
pub(crate) fn merge_document(
    doc: Mapping,
    source_name: &str,
    keyword: &str,
    lookup: &KeywordLookup,
    ctx: &mut LoadContext<'_>,
) -> Result<Vec<Deferral>> {
    let mut deferrals = Vec::new();
    let mut written = 0usize;

    for (raw_key, value) in doc {
        let key = key_to_string(&raw_key)
            .ok_or_else(|| ConfigError::format(source_name, "keys must be scalars"))?;
        if !is_upper_key(&key) {
            return Err(ConfigError::LowercaseKey {
                key,
                source_name: source_name.to_string(),
            });
        }

        let reference = match Entry::classify(&value, ctx.namespace()) {
            Entry::Reference(reference) => Some(reference.to_string()),
            Entry::Value(_) => None,
        };

        match reference {
            Some(reference) => {
                let target = lookup.resolve(&key, &reference, keyword, source_name)?;
                deferrals.push(Deferral {
                    key,
                    reference,
                    target,
                });
            }
            None => {
                if let Some(nested) = find_nested_string(&value, &|s: &str| lookup.is_reference(s)) {
                    return Err(ConfigError::NestedDeferral {
                        key,
                        value: nested.to_string(),
                    });
                }
                if ctx.write(&key, value, source_name) {
                    written += 1;
                }
            }
        }
    }

    tracing::debug!(
        source = source_name,
        written,
        deferred = deferrals.len(),
        "merged document"
    );
    Ok(deferrals)
}
