//! Property tests for deferral validation and load order.

use ordbok::prelude::{ConfigError, ConfigStore, EnvSnapshot};
use proptest::prelude::*;
use std::fs;
use tempfile::TempDir;

/// Lays out `docs.len()` sources named `s0.yml`, `s1.yml`, ... and loads them
/// in order.
fn load_sources(docs: &[String]) -> ordbok::error::Result<ConfigStore> {
    let temp_dir = TempDir::new().unwrap();
    let config_dir = temp_dir.path().join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let mut builder = ConfigStore::builder()
        .with_root_path(temp_dir.path())
        .with_env_vars(EnvSnapshot::default());
    for (i, doc) in docs.iter().enumerate() {
        let name = format!("s{}.yml", i);
        fs::write(config_dir.join(&name), doc).unwrap();
        builder = builder.with_file(name);
    }
    builder.load()
}

fn plain_docs(count: usize) -> Vec<String> {
    (0..count).map(|i| format!("KEY_{}: {}\n", i, i)).collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_self_reference_always_fails(count in 1usize..8, pick in 0usize..8) {
        let current = pick % count;
        let mut docs = plain_docs(count);
        docs[current].push_str(&format!("LOOP: ordbok_s{}\n", current));

        let result = load_sources(&docs);
        prop_assert!(
            matches!(&result, Err(ConfigError::SelfReference { key, .. }) if key == "LOOP"),
            "unexpected result: {:?}",
            result
        );
    }

    #[test]
    fn prop_reference_to_earlier_source_fails(count in 2usize..8, a in 0usize..8, b in 0usize..8) {
        let earlier = a % (count - 1);
        let current = earlier + 1 + b % (count - earlier - 1);
        let mut docs = plain_docs(count);
        docs[current].push_str(&format!("BACK: ordbok_s{}\n", earlier));

        let result = load_sources(&docs);
        prop_assert!(
            matches!(&result, Err(ConfigError::AlreadyLoaded { key, .. }) if key == "BACK"),
            "unexpected result: {:?}",
            result
        );
    }

    #[test]
    fn prop_forward_deferral_resolves(count in 2usize..8, a in 0usize..8, b in 0usize..8) {
        let current = a % (count - 1);
        let target = current + 1 + b % (count - current - 1);
        let mut docs = plain_docs(count);
        docs[current].push_str(&format!("FORWARD: ordbok_s{}\n", target));
        docs[target].push_str(&format!("FORWARD: from-{}\n", target));

        let config = load_sources(&docs).unwrap();
        let expected = format!("from-{}", target);
        prop_assert_eq!(config.get_str("FORWARD"), Some(expected.as_str()));
        for i in 0..count {
            prop_assert_eq!(config.get_i64(&format!("KEY_{}", i)), Some(i as i64));
        }
    }

    #[test]
    fn prop_first_writer_wins(count in 2usize..8) {
        let docs: Vec<String> = (0..count).map(|i| format!("SHARED: {}\n", i)).collect();

        let config = load_sources(&docs).unwrap();
        prop_assert_eq!(config.get_i64("SHARED"), Some(0));
    }

    #[test]
    fn prop_unregistered_reference_fails(count in 1usize..8, suffix in "[a-z]{1,8}") {
        let mut docs = plain_docs(count);
        docs[0].push_str(&format!("MISSING: ordbok_x{}\n", suffix));

        let result = load_sources(&docs);
        prop_assert!(
            matches!(&result, Err(ConfigError::MissingSource { key, .. }) if key == "MISSING"),
            "unexpected result: {:?}",
            result
        );
    }

    #[test]
    fn prop_prefix_matching_several_sources_is_ambiguous(suffix in "[a-z]{0,8}") {
        let temp_dir = TempDir::new().unwrap();
        let config_dir = temp_dir.path().join("config");
        fs::create_dir_all(&config_dir).unwrap();
        fs::write(
            config_dir.join("config.yml"),
            format!("TOKEN: ordbok_local_settings{}\n", suffix),
        )
        .unwrap();

        let result = ConfigStore::builder()
            .with_root_path(temp_dir.path())
            .with_env_vars(EnvSnapshot::default())
            .with_file("config.yml")
            .with_file("local.yml")
            .with_file("local_settings.yml")
            .load();
        prop_assert!(
            matches!(&result, Err(ConfigError::AmbiguousSource { candidates, .. }) if candidates.len() == 2),
            "unexpected result: {:?}",
            result
        );
    }
}
