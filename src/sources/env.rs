//! Environment variable configuration source.

use super::config_source::{ConfigSource, Deferral, SourceState};
use crate::core::{KeywordLookup, LoadContext, SourceContext, parse_env_value};
use crate::error::{ConfigError, Result};
use crate::value::{ENVIRONMENT_KEY, is_upper_key};
use serde_yaml::Value;
use std::collections::BTreeMap;

const SOURCE_NAME: &str = "environment";

/// Environment variable configuration source.
///
/// Reads every `{NAMESPACE}_{KEY}` variable, decoding values with the same
/// scalar rules as documents (`"True"` is a boolean, `"42"` an integer).
///
/// Keys may be deferred to it in two ways:
/// - bare, `ordbok_env_config`: the key must arrive as `ORDBOK_{KEY}`;
/// - targeted, `ordbok_env_config_redis_url`: the key is read verbatim from
///   the un-namespaced variable `REDIS_URL`.
///
/// # Examples
///
/// ```rust
/// use ordbok::sources::EnvSource;
///
/// let source = EnvSource::new();
/// ```
#[derive(Debug, Clone, Default)]
pub struct EnvSource {
    state: SourceState,
    namespace: String,
    targets: BTreeMap<String, String>,
}

impl EnvSource {
    /// Create a new environment variable source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Keyword of the environment source for a namespace.
    pub(crate) fn keyword_for(namespace: &str) -> String {
        format!("{}_env_config", namespace)
    }

    /// Targeted deferrals: key to the variable name it must be read from.
    pub fn targets(&self) -> &BTreeMap<String, String> {
        &self.targets
    }
}

impl ConfigSource for EnvSource {
    fn name(&self) -> &str {
        SOURCE_NAME
    }

    fn state(&self) -> &SourceState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut SourceState {
        &mut self.state
    }

    fn initialize(&mut self, ctx: &SourceContext<'_>) {
        self.namespace = ctx.namespace.to_uppercase();
        self.targets.clear();
        self.state.reset(Self::keyword_for(ctx.namespace));
    }

    fn add_required_key(&mut self, key: &str, reference: &str) {
        let target = reference
            .strip_prefix(self.state.keyword())
            .and_then(|rest| rest.strip_prefix('_'))
            .filter(|target| !target.is_empty());
        if let Some(target) = target {
            self.targets.insert(key.to_string(), target.to_string());
        }
        self.state.require(key);
    }

    fn load(&mut self, _lookup: &KeywordLookup, ctx: &mut LoadContext<'_>) -> Result<Vec<Deferral>> {
        let env = ctx.env;

        // Targeted deferrals name their variable explicitly, so they win over
        // a namespaced variable of the same key.
        for (key, target) in &self.targets {
            let env_key = target.to_uppercase();
            let value = env
                .get(&env_key)
                .ok_or_else(|| ConfigError::TargetedKeyMissing {
                    key: key.clone(),
                    env_key: env_key.clone(),
                })?;
            ctx.write(key, Value::String(value.to_string()), SOURCE_NAME);
        }

        let prefix = format!("{}_", self.namespace);
        let mut count = 0usize;
        for (name, raw) in env.iter() {
            let Some(key) = name.strip_prefix(&prefix) else {
                continue;
            };
            if raw.is_empty() || key == ENVIRONMENT_KEY {
                continue;
            }
            if !is_upper_key(key) {
                tracing::debug!(variable = name, "ignoring variable with a non upper-case key");
                continue;
            }
            let value = parse_env_value(name, raw)?;
            if ctx.write(key, value, SOURCE_NAME) {
                count += 1;
            }
        }
        tracing::debug!(
            prefix = %prefix,
            count,
            targeted = self.targets.len(),
            "loaded environment variables"
        );

        self.check_required_keys(ctx)?;
        self.state.mark_loaded();
        Ok(Vec::new())
    }

    fn missing_key_error(&self, key: &str) -> ConfigError {
        ConfigError::MissingEnvKey {
            key: key.to_string(),
        }
    }
}
