//! File-based configuration source.

use super::config_source::{ConfigSource, Deferral, SourceState, merge_document};
use crate::core::{KeywordLookup, LoadContext, SourceContext, load_document};
use crate::error::Result;
use serde_yaml::Mapping;
use std::path::{Path, PathBuf};

/// File-based configuration source.
///
/// Loads a YAML document from `{config dir}/{name}`. A missing file
/// contributes nothing.
///
/// # Examples
///
/// ```rust
/// use ordbok::sources::FileSource;
///
/// let source = FileSource::new("production_config.yml").with_environments(["production"]);
/// ```
#[derive(Debug, Clone)]
pub struct FileSource {
    name: String,
    path: Option<PathBuf>,
    environments: Option<Vec<String>>,
    state: SourceState,
}

impl FileSource {
    /// Create a new file source from a file name relative to the config directory.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: None,
            environments: None,
            state: SourceState::default(),
        }
    }

    /// Only load this file when the active environment is one of `environments`.
    ///
    /// In any other environment the source contributes nothing, though keys
    /// deferred onto it are still checked.
    pub fn with_environments<I, S>(mut self, environments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.environments = Some(
            environments
                .into_iter()
                .map(|e| e.as_ref().to_lowercase())
                .collect(),
        );
        self
    }

    /// Keyword for a file name: the namespace joined to the name minus its extension.
    pub(crate) fn keyword_for(namespace: &str, name: &str) -> String {
        let stem = Path::new(name).with_extension("");
        format!("{}_{}", namespace, stem.to_string_lossy())
    }

    pub(crate) fn resolved_path(&self) -> PathBuf {
        self.path
            .clone()
            .unwrap_or_else(|| PathBuf::from(&self.name))
    }

    fn is_active(&self, environment: &str) -> bool {
        match &self.environments {
            Some(allowed) => allowed.iter().any(|e| e == environment),
            None => true,
        }
    }

    /// Run the load protocol with a custom document reader.
    pub(crate) fn load_with<F>(
        &mut self,
        lookup: &KeywordLookup,
        ctx: &mut LoadContext<'_>,
        read: F,
    ) -> Result<Vec<Deferral>>
    where
        F: FnOnce(&Self, &LoadContext<'_>) -> Result<Option<Mapping>>,
    {
        let mut deferrals = Vec::new();

        if !self.is_active(ctx.environment()) {
            tracing::debug!(
                source = %self.name,
                environment = ctx.environment(),
                "source not enabled for this environment, skipping"
            );
        } else if let Some(doc) = read(&*self, &*ctx)? {
            deferrals = merge_document(doc, &self.name, self.state.keyword(), lookup, ctx)?;
        }

        self.check_required_keys(ctx)?;
        self.state.mark_loaded();
        Ok(deferrals)
    }
}

impl ConfigSource for FileSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn state(&self) -> &SourceState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut SourceState {
        &mut self.state
    }

    fn initialize(&mut self, ctx: &SourceContext<'_>) {
        self.path = Some(ctx.config_dir.join(&self.name));
        self.state
            .reset(Self::keyword_for(ctx.namespace, &self.name));
    }

    fn load(&mut self, lookup: &KeywordLookup, ctx: &mut LoadContext<'_>) -> Result<Vec<Deferral>> {
        self.load_with(lookup, ctx, |source, ctx| {
            load_document(&source.resolved_path(), ctx.environment())
        })
    }

    fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}
