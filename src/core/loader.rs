//! Resolution engine: loads an ordered list of sources into one mapping.

use crate::core::{LoadContext, SourceContext};
use crate::error::{ConfigError, Result};
use crate::sources::{ConfigSource, EnvSource, Source, SourceEntry};
use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(Debug, Clone)]
struct LookupEntry {
    index: usize,
    name: String,
    loaded: bool,
}

/// Keyword to source table used to validate deferrals.
#[derive(Debug, Clone, Default)]
pub struct KeywordLookup {
    entries: BTreeMap<String, LookupEntry>,
}

impl KeywordLookup {
    /// Build a lookup from `(keyword, position, name)` triples.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::AmbiguousSource`] if two sources share a keyword.
    pub(crate) fn from_entries<I>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, usize, String)>,
    {
        let mut lookup = Self::default();
        for (keyword, index, name) in entries {
            if let Some(existing) = lookup.entries.get(&keyword) {
                return Err(ConfigError::AmbiguousSource {
                    reference: keyword.clone(),
                    candidates: vec![existing.name.clone(), name],
                });
            }
            lookup.entries.insert(
                keyword,
                LookupEntry {
                    index,
                    name,
                    loaded: false,
                },
            );
        }
        Ok(lookup)
    }

    fn from_sources(sources: &[Source]) -> Result<Self> {
        Self::from_entries(
            sources
                .iter()
                .enumerate()
                .map(|(i, s)| (s.keyword().to_string(), i, s.name().to_string())),
        )
    }

    /// Registered keywords that are a prefix of `reference`.
    pub fn candidates<'a>(&'a self, reference: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.entries
            .keys()
            .map(String::as_str)
            .filter(move |keyword| reference.starts_with(keyword))
    }

    /// Whether `value` names any registered source.
    pub fn is_reference(&self, value: &str) -> bool {
        self.candidates(value).next().is_some()
    }

    /// Resolve a deferral declared by `current` to the position of its target.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::MissingSource`] if no keyword matches
    /// - [`ConfigError::AmbiguousSource`] if several keywords match
    /// - [`ConfigError::SelfReference`] if the target is `current` itself
    /// - [`ConfigError::AlreadyLoaded`] if the target has already loaded
    pub fn resolve(
        &self,
        key: &str,
        reference: &str,
        current_keyword: &str,
        current_name: &str,
    ) -> Result<usize> {
        let candidates: Vec<&str> = self.candidates(reference).collect();
        let keyword = match candidates.as_slice() {
            [] => {
                return Err(ConfigError::MissingSource {
                    key: key.to_string(),
                    reference: reference.to_string(),
                    source_name: current_name.to_string(),
                });
            }
            [keyword] => *keyword,
            _ => {
                return Err(ConfigError::AmbiguousSource {
                    reference: reference.to_string(),
                    candidates: candidates.iter().map(|c| c.to_string()).collect(),
                });
            }
        };

        if keyword == current_keyword {
            return Err(ConfigError::SelfReference {
                key: key.to_string(),
                source_name: current_name.to_string(),
            });
        }

        let entry = &self.entries[keyword];
        if entry.loaded {
            return Err(ConfigError::AlreadyLoaded {
                key: key.to_string(),
                referenced: entry.name.clone(),
                current: current_name.to_string(),
            });
        }
        Ok(entry.index)
    }

    pub(crate) fn mark_loaded(&mut self, keyword: &str) {
        if let Some(entry) = self.entries.get_mut(keyword) {
            entry.loaded = true;
        }
    }

    /// Number of registered sources.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no sources are registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Loads sources strictly in declaration order.
///
/// Declaration order is both the merge order (earlier sources write first)
/// and the dependency order for deferrals (a source may only defer keys to
/// sources after it).
#[derive(Debug, Default)]
pub(crate) struct ConfigLoader {
    sources: Vec<Source>,
}

impl ConfigLoader {
    /// Instantiate and initialize every entry, appending the environment
    /// source last when `include_env` is set.
    pub(crate) fn new(entries: Vec<SourceEntry>, include_env: bool, ctx: &SourceContext<'_>) -> Self {
        let mut sources: Vec<Source> = entries.into_iter().map(SourceEntry::into_source).collect();
        if include_env {
            sources.push(Source::Env(EnvSource::new()));
        }
        for source in &mut sources {
            source.initialize(ctx);
        }
        Self { sources }
    }

    /// Load every source into `ctx`.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by any source; nothing after it loads.
    pub(crate) fn load(&mut self, ctx: &mut LoadContext<'_>) -> Result<()> {
        let mut lookup = KeywordLookup::from_sources(&self.sources)?;

        for index in 0..self.sources.len() {
            let source = &mut self.sources[index];
            tracing::debug!(
                source = source.name(),
                keyword = source.keyword(),
                required = source.state().required_keys().len(),
                "loading source"
            );
            let deferrals = source.load(&lookup, ctx)?;
            lookup.mark_loaded(source.keyword());

            for deferral in deferrals {
                let target = &mut self.sources[deferral.target];
                tracing::debug!(
                    key = %deferral.key,
                    from = index,
                    to = target.name(),
                    "deferred key"
                );
                target.add_required_key(&deferral.key, &deferral.reference);
            }
        }

        // Every source checked its own keys as it loaded; confirm nothing
        // changed afterwards.
        for source in &self.sources {
            source.check_required_keys(ctx)?;
        }
        Ok(())
    }

    pub(crate) fn sources(&self) -> &[Source] {
        &self.sources
    }

    /// Paths of every file-backed source, in load order.
    pub(crate) fn source_file_paths(&self) -> Vec<PathBuf> {
        self.sources
            .iter()
            .filter_map(|source| match source {
                Source::File(file) => file.path().map(PathBuf::from),
                Source::Encrypted(encrypted) => Some(encrypted.encrypted_path()),
                Source::Env(_) => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::EnvSnapshot;
    use crate::sources::FileSource;
    use crate::value::ConfigMap;
    use serde_yaml::Value;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn lookup(keywords: &[&str]) -> KeywordLookup {
        KeywordLookup::from_entries(
            keywords
                .iter()
                .enumerate()
                .map(|(i, k)| (k.to_string(), i, format!("{}.yml", k))),
        )
        .unwrap()
    }

    fn loader(dir: &Path, names: &[&str], include_env: bool) -> ConfigLoader {
        let entries = names.iter().map(|n| SourceEntry::from(*n)).collect();
        ConfigLoader::new(
            entries,
            include_env,
            &SourceContext {
                namespace: "ordbok",
                config_dir: dir,
            },
        )
    }

    #[test]
    fn test_resolve_single_match() {
        let lookup = lookup(&["ordbok_config", "ordbok_local_config"]);
        let target = lookup
            .resolve("FOO", "ordbok_local_config", "ordbok_config", "config.yml")
            .unwrap();
        assert_eq!(target, 1);
    }

    #[test]
    fn test_resolve_missing_source() {
        let lookup = lookup(&["ordbok_config"]);
        let result = lookup.resolve("FOO", "ordbok_remote", "ordbok_config", "config.yml");
        assert!(matches!(result, Err(ConfigError::MissingSource { .. })));
    }

    #[test]
    fn test_resolve_ambiguous() {
        let lookup = lookup(&["ordbok_config", "ordbok_local", "ordbok_local_config"]);
        let result = lookup.resolve("FOO", "ordbok_local_config", "ordbok_config", "config.yml");
        assert!(matches!(
            result,
            Err(ConfigError::AmbiguousSource { candidates, .. }) if candidates.len() == 2
        ));
    }

    #[test]
    fn test_resolve_self_reference() {
        let lookup = lookup(&["ordbok_config", "ordbok_local_config"]);
        let result = lookup.resolve("FOO", "ordbok_config", "ordbok_config", "config.yml");
        assert!(matches!(result, Err(ConfigError::SelfReference { .. })));
    }

    #[test]
    fn test_resolve_already_loaded() {
        let mut lookup = lookup(&["ordbok_config", "ordbok_local_config"]);
        lookup.mark_loaded("ordbok_config");
        let result = lookup.resolve(
            "FOO",
            "ordbok_config",
            "ordbok_local_config",
            "local_config.yml",
        );
        assert!(matches!(
            result,
            Err(ConfigError::AlreadyLoaded { referenced, current, .. })
                if referenced == "ordbok_config.yml" && current == "local_config.yml"
        ));
    }

    #[test]
    fn test_duplicate_keywords_rejected() {
        let result = KeywordLookup::from_entries([
            ("ordbok_config".to_string(), 0, "config.yml".to_string()),
            ("ordbok_config".to_string(), 1, "config.yaml".to_string()),
        ]);
        assert!(matches!(result, Err(ConfigError::AmbiguousSource { .. })));
    }

    #[test]
    fn test_env_source_appended_last() {
        let loader = loader(Path::new("config"), &["config.yml", "local_config.yml"], true);
        let keywords: Vec<&str> = loader.sources().iter().map(|s| s.keyword()).collect();
        assert_eq!(
            keywords,
            vec!["ordbok_config", "ordbok_local_config", "ordbok_env_config"]
        );
        assert_eq!(
            loader.source_file_paths(),
            vec![
                PathBuf::from("config/config.yml"),
                PathBuf::from("config/local_config.yml")
            ]
        );
    }

    #[test]
    fn test_deferral_satisfied_by_later_source() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(
            temp_dir.path().join("config.yml"),
            "DATABASE_URL: ordbok_local_config\nDEBUG: true\n",
        )
        .unwrap();
        fs::write(
            temp_dir.path().join("local_config.yml"),
            "DATABASE_URL: 'sqlite:///tmp/database.db'\nDEBUG: false\n",
        )
        .unwrap();

        let mut loader = loader(temp_dir.path(), &["config.yml", "local_config.yml"], false);
        let mut mapping = ConfigMap::new();
        let env = EnvSnapshot::default();
        let mut ctx = LoadContext::new(&mut mapping, "ordbok", "development", &env);
        loader.load(&mut ctx).unwrap();

        assert_eq!(
            mapping.get("DATABASE_URL"),
            Some(&Value::String("sqlite:///tmp/database.db".to_string()))
        );
        // First writer wins
        assert_eq!(mapping.get("DEBUG"), Some(&Value::Bool(true)));
        assert!(loader.sources().iter().all(|s| s.is_loaded()));
        assert_eq!(
            loader.sources()[1].state().required_keys(),
            ["DATABASE_URL"]
        );
    }

    #[test]
    fn test_nested_deferral_rejected() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(
            temp_dir.path().join("config.yml"),
            "DATABASE:\n  URL: ordbok_local_config\n",
        )
        .unwrap();

        let mut loader = loader(temp_dir.path(), &["config.yml", "local_config.yml"], false);
        let mut mapping = ConfigMap::new();
        let env = EnvSnapshot::default();
        let mut ctx = LoadContext::new(&mut mapping, "ordbok", "development", &env);
        let result = loader.load(&mut ctx);

        assert!(matches!(
            result,
            Err(ConfigError::NestedDeferral { key, value })
                if key == "DATABASE" && value == "ordbok_local_config"
        ));
    }

    #[test]
    fn test_file_sources_from_prebuilt_entries() {
        let entries = vec![
            SourceEntry::from(FileSource::new("config.yml")),
            SourceEntry::from("local_config.yml"),
        ];
        let loader = ConfigLoader::new(
            entries,
            false,
            &SourceContext {
                namespace: "app",
                config_dir: Path::new("etc"),
            },
        );
        assert_eq!(loader.sources().len(), 2);
        assert_eq!(loader.sources()[0].keyword(), "app_config");
    }
}
