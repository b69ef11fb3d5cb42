//! Encrypted file source and the helpers that manage its file pair.
//!
//! A source named `private_config.yml` reads its ciphertext from
//! `private_config.yml.private`. The plaintext exists only while it is being
//! edited: [`seal`] encrypts it and removes it, [`unseal`] restores it.

use super::config_source::{ConfigSource, Deferral, SourceState};
use super::file::FileSource;
use crate::core::{KeywordLookup, LoadContext, SourceContext, parse_document};
use crate::crypto;
use crate::error::{ConfigError, Result};
use secrecy::SecretString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

const ENCRYPTED_SUFFIX: &str = ".private";

/// Path of the ciphertext belonging to a plaintext config path.
pub fn encrypted_path_for(plaintext: &Path) -> PathBuf {
    let mut path = plaintext.as_os_str().to_owned();
    path.push(ENCRYPTED_SUFFIX);
    PathBuf::from(path)
}

fn plaintext_path_for(path: &Path) -> PathBuf {
    match path.to_str().and_then(|p| p.strip_suffix(ENCRYPTED_SUFFIX)) {
        Some(stripped) => PathBuf::from(stripped),
        None => path.to_path_buf(),
    }
}

fn read_plaintext(plaintext: &Path) -> Result<Vec<u8>> {
    std::fs::read(plaintext).map_err(|e| match e.kind() {
        ErrorKind::NotFound => ConfigError::MissingPlaintextFile {
            path: plaintext.to_path_buf(),
        },
        _ => e.into(),
    })
}

fn read_ciphertext(plaintext: &Path) -> Result<Vec<u8>> {
    std::fs::read(encrypted_path_for(plaintext)).map_err(|e| match e.kind() {
        ErrorKind::NotFound if plaintext.exists() => ConfigError::MissingEncryptedFile {
            path: plaintext.to_path_buf(),
        },
        ErrorKind::NotFound => ConfigError::MissingPlaintextFile {
            path: plaintext.to_path_buf(),
        },
        _ => e.into(),
    })
}

/// Encrypt `plaintext` into its `.private` companion, keeping the plaintext.
///
/// Returns the path of the written ciphertext.
pub fn encrypt_file(plaintext: &Path, key: &SecretString) -> Result<PathBuf> {
    let content = read_plaintext(plaintext)?;
    let encrypted = crypto::encrypt(key, &content)?;
    let target = encrypted_path_for(plaintext);
    std::fs::write(&target, encrypted)?;
    tracing::info!(path = %target.display(), "wrote encrypted config file");
    Ok(target)
}

/// Decrypt the `.private` companion of `plaintext` back into `plaintext`.
///
/// Returns the path of the written plaintext.
pub fn decrypt_file(plaintext: &Path, key: &SecretString) -> Result<PathBuf> {
    let content = read_ciphertext(plaintext)?;
    let origin = encrypted_path_for(plaintext).display().to_string();
    let decrypted = crypto::decrypt(key, &content, &origin)?;
    std::fs::write(plaintext, decrypted)?;
    tracing::info!(path = %plaintext.display(), "wrote decrypted config file");
    Ok(plaintext.to_path_buf())
}

/// Encrypt a config file and delete its plaintext.
pub fn seal(plaintext: &Path, key: &SecretString) -> Result<PathBuf> {
    let target = encrypt_file(plaintext, key)?;
    std::fs::remove_file(plaintext)?;
    Ok(target)
}

/// Decrypt a config file and delete its ciphertext.
///
/// `path` may name either the plaintext or the `.private` file.
pub fn unseal(path: &Path, key: &SecretString) -> Result<PathBuf> {
    let plaintext = plaintext_path_for(path);
    let target = decrypt_file(&plaintext, key)?;
    std::fs::remove_file(encrypted_path_for(&plaintext))?;
    Ok(target)
}

/// Encrypted configuration source.
///
/// Behaves like a [`FileSource`] whose content is decrypted with the store's
/// private key before parsing. Unlike a plain file, a missing file pair is an
/// error.
///
/// # Examples
///
/// ```rust
/// use ordbok::sources::EncryptedFileSource;
///
/// let source = EncryptedFileSource::new("private_config.yml");
/// ```
#[derive(Debug, Clone)]
pub struct EncryptedFileSource {
    file: FileSource,
}

impl EncryptedFileSource {
    /// Create a new encrypted source from a plaintext file name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            file: FileSource::new(name),
        }
    }

    /// Only load this file when the active environment is one of `environments`.
    pub fn with_environments<I, S>(mut self, environments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.file = self.file.with_environments(environments);
        self
    }

    /// Plaintext path (resolved once initialized).
    pub fn plaintext_path(&self) -> PathBuf {
        self.file.resolved_path()
    }

    /// Ciphertext path (resolved once initialized).
    pub fn encrypted_path(&self) -> PathBuf {
        encrypted_path_for(&self.plaintext_path())
    }

    /// Write the ciphertext from the plaintext.
    pub fn save_encrypted_file(&self, key: &SecretString) -> Result<PathBuf> {
        encrypt_file(&self.plaintext_path(), key)
    }

    /// Write the plaintext from the ciphertext.
    pub fn save_decrypted_file(&self, key: &SecretString) -> Result<PathBuf> {
        decrypt_file(&self.plaintext_path(), key)
    }
}

impl ConfigSource for EncryptedFileSource {
    fn name(&self) -> &str {
        self.file.name()
    }

    fn state(&self) -> &SourceState {
        self.file.state()
    }

    fn state_mut(&mut self) -> &mut SourceState {
        self.file.state_mut()
    }

    fn initialize(&mut self, ctx: &SourceContext<'_>) {
        self.file.initialize(ctx);
    }

    fn load(&mut self, lookup: &KeywordLookup, ctx: &mut LoadContext<'_>) -> Result<Vec<Deferral>> {
        self.file.load_with(lookup, ctx, |file, ctx| {
            let plaintext = file.resolved_path();
            let content = read_ciphertext(&plaintext)?;
            let key = ctx.private_key()?;
            let origin = encrypted_path_for(&plaintext).display().to_string();
            let decrypted = crypto::decrypt(&key, &content, &origin)?;
            parse_document(&decrypted, &origin, ctx.environment())
        })
    }

    fn path(&self) -> Option<&Path> {
        self.file.path()
    }
}
