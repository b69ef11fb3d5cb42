//! Layered sources end to end: a shared base file, a local override file,
//! an encrypted secrets file and the environment.
//!
//! Run with: cargo run --example layered_sources

use ordbok::prelude::*;
use ordbok::sources::seal;
use secrecy::SecretString;
use std::fs;
use std::time::Duration;

const CONFIG_YML: &str = r#"
COMMON: &common
  APP_NAME: inventory
  DEBUG: false
  WORKERS: 4

DEVELOPMENT:
  <<: *common
  DEBUG: true
  DATABASE_URL: ordbok_local_config
  DB_PASSWORD: ordbok_private_config

PRODUCTION:
  <<: *common
  DATABASE_URL: postgres://db.internal:5432/inventory
  DB_PASSWORD: ordbok_private_config
  SENTRY_DSN: ordbok_env_config_sentry_dsn
"#;

const LOCAL_CONFIG_YML: &str = "DATABASE_URL: sqlite:///tmp/inventory.db\n";

const PRIVATE_CONFIG_YML: &str = r#"
DEVELOPMENT:
  DB_PASSWORD: dev-password
PRODUCTION:
  DB_PASSWORD: correct-horse-battery-staple
"#;

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let root = tempfile::tempdir()?;
    let config_dir = root.path().join("config");
    fs::create_dir_all(&config_dir)?;
    fs::write(config_dir.join("config.yml"), CONFIG_YML)?;
    fs::write(config_dir.join("local_config.yml"), LOCAL_CONFIG_YML)?;

    let passphrase = SecretString::new("demo passphrase".to_string().into());
    let plaintext = config_dir.join("private_config.yml");
    fs::write(&plaintext, PRIVATE_CONFIG_YML)?;
    let sealed = seal(&plaintext, &passphrase)?;
    println!("sealed secrets into {}", sealed.display());

    for (environment, extra) in [
        ("development", vec![]),
        ("production", vec![("SENTRY_DSN", "https://key@sentry.example/1")]),
    ] {
        let mut vars = vec![
            ("ORDBOK_ENVIRONMENT", environment),
            ("ORDBOK_WORKERS", "16"),
            ("ORDBOK_FEATURE_SEARCH", "True"),
            ("PRIVATE_KEY_ORDBOK", "demo passphrase"),
        ];
        vars.extend(extra);

        let config = ConfigStore::builder()
            .with_root_path(root.path())
            .with_file("config.yml")
            .with_file("local_config.yml")
            .with_source(EncryptedFileSource::new("private_config.yml"))
            .with_env_vars(EnvSnapshot::from_pairs(vars))
            .load()?;

        println!("\n[{}]", config.environment().unwrap_or_default());
        for (key, value) in config.iter() {
            let shown = if key == "DB_PASSWORD" {
                "********".to_string()
            } else {
                serde_yaml::to_string(value)?.trim_end().to_string()
            };
            println!("  {} = {}", key, shown);
        }
        println!("  sources: {:?}", config.source_keywords());
    }

    // A missing deferred key stops the load.
    let result = ConfigStore::builder()
        .with_root_path(root.path())
        .with_file("config.yml")
        .with_env_vars(EnvSnapshot::from_pairs([("ORDBOK_ENVIRONMENT", "development")]))
        .load();
    if let Err(e) = result {
        println!("\nwithout local_config.yml: {}", e);
    }

    let config = ConfigStore::builder()
        .with_root_path(root.path())
        .with_file("config.yml")
        .with_file("local_config.yml")
        .with_source(EncryptedFileSource::new("private_config.yml"))
        .with_env_vars(EnvSnapshot::from_pairs([("PRIVATE_KEY_ORDBOK", "demo passphrase")]))
        .load()?;
    let (watcher, mut rx) = ordbok::notify::ConfigWatcher::new(Duration::from_millis(200))?;
    let watched = watcher.watch_store(&config).await?;
    println!("\nwatching {} files", watched);

    fs::write(config_dir.join("local_config.yml"), "DATABASE_URL: sqlite:///tmp/other.db\n")?;
    match tokio::time::timeout(Duration::from_secs(2), rx.recv()).await {
        Ok(Some(())) => println!("local_config.yml changed; build a new store to pick it up"),
        _ => println!("no change signal received"),
    }

    Ok(())
}
