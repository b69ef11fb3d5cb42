//! Integration tests for encrypted configuration sources.

use ordbok::prelude::*;
use ordbok::sources::{encrypted_path_for, seal, unseal};
use secrecy::SecretString;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const PASSPHRASE: &str = "correct horse battery staple";

fn secret(s: &str) -> SecretString {
    SecretString::new(s.to_string().into())
}

/// Writes `config.yml` and a sealed `private_config.yml`, returning the
/// plaintext path.
fn sealed_fixture(root: &Path, config: &str, private: &str) -> PathBuf {
    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();
    fs::write(config_dir.join("config.yml"), config).unwrap();

    let plaintext = config_dir.join("private_config.yml");
    fs::write(&plaintext, private).unwrap();
    seal(&plaintext, &secret(PASSPHRASE)).unwrap();
    plaintext
}

fn builder(root: &Path, env: &[(&str, &str)]) -> ConfigStoreBuilder {
    ConfigStore::builder()
        .with_root_path(root)
        .with_env_vars(EnvSnapshot::from_pairs(env.iter().copied()))
        .with_file("config.yml")
        .with_source(EncryptedFileSource::new("private_config.yml"))
}

#[test]
fn test_key_from_environment() {
    let temp_dir = TempDir::new().unwrap();
    let plaintext = sealed_fixture(
        temp_dir.path(),
        "DEBUG: true\nDB_PASSWORD: ordbok_private_config\n",
        "DB_PASSWORD: hunter2\n",
    );
    assert!(!plaintext.exists());

    let config = builder(temp_dir.path(), &[("PRIVATE_KEY_ORDBOK", PASSPHRASE)])
        .load()
        .unwrap();

    assert_eq!(config.get_str("DB_PASSWORD"), Some("hunter2"));
    assert_eq!(config.get_bool("DEBUG"), Some(true));
    assert_eq!(
        config.source_file_paths()[1],
        encrypted_path_for(&plaintext)
    );
}

#[test]
fn test_key_from_namespaced_variable() {
    let temp_dir = TempDir::new().unwrap();
    sealed_fixture(temp_dir.path(), "DEBUG: true\n", "DB_PASSWORD: hunter2\n");

    let config = builder(
        temp_dir.path(),
        &[
            ("ORDBOK_PRIVATE_KEY_ORDBOK", PASSPHRASE),
            ("PRIVATE_KEY_ORDBOK", "not the key"),
        ],
    )
    .load()
    .unwrap();

    assert_eq!(config.get_str("DB_PASSWORD"), Some("hunter2"));
}

#[test]
fn test_key_from_earlier_source() {
    let temp_dir = TempDir::new().unwrap();
    let config = format!("PRIVATE_KEY_ORDBOK: '{}'\n", PASSPHRASE);
    sealed_fixture(temp_dir.path(), &config, "DB_PASSWORD: hunter2\n");

    let config = builder(temp_dir.path(), &[]).load().unwrap();
    assert_eq!(config.get_str("DB_PASSWORD"), Some("hunter2"));
}

#[test]
fn test_numeric_key_from_earlier_source() {
    let temp_dir = TempDir::new().unwrap();
    let config_dir = temp_dir.path().join("config");
    fs::create_dir_all(&config_dir).unwrap();
    fs::write(config_dir.join("config.yml"), "PRIVATE_KEY_ORDBOK: 123456\n").unwrap();
    let plaintext = config_dir.join("private_config.yml");
    fs::write(&plaintext, "DB_PASSWORD: hunter2\n").unwrap();
    seal(&plaintext, &secret("123456")).unwrap();

    let config = builder(temp_dir.path(), &[]).load().unwrap();
    assert_eq!(config.get_str("DB_PASSWORD"), Some("hunter2"));
}

#[test]
fn test_structured_key_is_format_error() {
    let temp_dir = TempDir::new().unwrap();
    sealed_fixture(
        temp_dir.path(),
        "PRIVATE_KEY_ORDBOK:\n  VALUE: nope\n",
        "DB_PASSWORD: hunter2\n",
    );

    let result = builder(temp_dir.path(), &[("PRIVATE_KEY_ORDBOK", PASSPHRASE)]).load();
    assert!(matches!(
        result,
        Err(ConfigError::Format { origin, .. }) if origin == "PRIVATE_KEY_ORDBOK"
    ));
}

#[test]
fn test_environment_block_inside_ciphertext() {
    let temp_dir = TempDir::new().unwrap();
    sealed_fixture(
        temp_dir.path(),
        "DEBUG: true\n",
        "DEVELOPMENT:\n  DB_PASSWORD: dev\nPRODUCTION:\n  DB_PASSWORD: prod\n",
    );

    let config = builder(
        temp_dir.path(),
        &[
            ("PRIVATE_KEY_ORDBOK", PASSPHRASE),
            ("ORDBOK_ENVIRONMENT", "production"),
        ],
    )
    .load()
    .unwrap();

    assert_eq!(config.get_str("DB_PASSWORD"), Some("prod"));
}

#[test]
fn test_wrong_key_fails() {
    let temp_dir = TempDir::new().unwrap();
    sealed_fixture(temp_dir.path(), "DEBUG: true\n", "DB_PASSWORD: hunter2\n");

    let result = builder(temp_dir.path(), &[("PRIVATE_KEY_ORDBOK", "wrong")]).load();
    assert!(matches!(result, Err(ConfigError::Decryption { .. })));
}

#[test]
fn test_missing_key_fails() {
    let temp_dir = TempDir::new().unwrap();
    sealed_fixture(temp_dir.path(), "DEBUG: true\n", "DB_PASSWORD: hunter2\n");

    let result = builder(temp_dir.path(), &[]).load();
    assert!(matches!(
        result,
        Err(ConfigError::MissingPrivateKey { key_name }) if key_name == "PRIVATE_KEY_ORDBOK"
    ));
}

#[test]
fn test_unsealed_plaintext_is_not_read() {
    let temp_dir = TempDir::new().unwrap();
    let config_dir = temp_dir.path().join("config");
    fs::create_dir_all(&config_dir).unwrap();
    fs::write(config_dir.join("config.yml"), "DEBUG: true\n").unwrap();
    fs::write(config_dir.join("private_config.yml"), "DB_PASSWORD: hunter2\n").unwrap();

    let result = builder(temp_dir.path(), &[("PRIVATE_KEY_ORDBOK", PASSPHRASE)]).load();
    assert!(matches!(result, Err(ConfigError::MissingEncryptedFile { .. })));
}

#[test]
fn test_missing_pair_fails() {
    let temp_dir = TempDir::new().unwrap();
    fs::create_dir_all(temp_dir.path().join("config")).unwrap();

    let result = builder(temp_dir.path(), &[("PRIVATE_KEY_ORDBOK", PASSPHRASE)]).load();
    assert!(matches!(result, Err(ConfigError::MissingPlaintextFile { .. })));
}

#[test]
fn test_unseal_then_edit_then_seal() {
    let temp_dir = TempDir::new().unwrap();
    let plaintext = sealed_fixture(temp_dir.path(), "DEBUG: true\n", "DB_PASSWORD: hunter2\n");
    let key = secret(PASSPHRASE);

    unseal(&encrypted_path_for(&plaintext), &key).unwrap();
    fs::write(&plaintext, "DB_PASSWORD: swordfish\n").unwrap();
    seal(&plaintext, &key).unwrap();

    let config = builder(temp_dir.path(), &[("PRIVATE_KEY_ORDBOK", PASSPHRASE)])
        .load()
        .unwrap();
    assert_eq!(config.get_str("DB_PASSWORD"), Some("swordfish"));
}
