//! Core configuration management types.

mod builder;
mod context;
mod document;
mod loader;
mod store;

pub use builder::{
    ConfigStoreBuilder, DEFAULT_CONFIG_DIR, DEFAULT_ENVIRONMENT, DEFAULT_FILES, DEFAULT_NAMESPACE,
};
pub use context::{EnvSnapshot, LoadContext, SourceContext, private_key_name};
pub use document::{load_document, parse_document, parse_env_value};
pub use loader::KeywordLookup;
pub use store::ConfigStore;

pub(crate) use loader::ConfigLoader;
