//! Symmetric encryption of a source's raw content.
//!
//! Ciphertext layout: `ORDB` magic, one version byte, a 16-byte Argon2id salt,
//! a 12-byte AES-256-GCM nonce, then the ciphertext with its tag. The key is
//! derived from the caller's passphrase and the salt, so encrypting the same
//! plaintext twice never yields the same bytes.

use crate::error::{ConfigError, Result};
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use argon2::Argon2;
use rand::Rng;
use secrecy::{ExposeSecret, SecretString};

const MAGIC: &[u8; 4] = b"ORDB";
const VERSION: u8 = 1;
const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 12;
const HEADER_LEN: usize = MAGIC.len() + 1 + SALT_LEN + NONCE_LEN;

/// Encrypt `plaintext` with a key derived from `passphrase`.
pub fn encrypt(passphrase: &SecretString, plaintext: &[u8]) -> Result<Vec<u8>> {
    let mut salt = [0u8; SALT_LEN];
    let mut nonce_bytes = [0u8; NONCE_LEN];
    let mut rng = rand::rng();
    rng.fill(&mut salt);
    rng.fill(&mut nonce_bytes);

    let key = derive_key(passphrase, &salt).map_err(ConfigError::Encryption)?;
    let cipher = Aes256Gcm::new((&key).into());
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce_bytes), plaintext)
        .map_err(|e| ConfigError::Encryption(e.to_string()))?;

    let mut out = Vec::with_capacity(HEADER_LEN + ciphertext.len());
    out.extend_from_slice(MAGIC);
    out.push(VERSION);
    out.extend_from_slice(&salt);
    out.extend_from_slice(&nonce_bytes);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

/// Decrypt bytes produced by [`encrypt`].
///
/// A wrong passphrase or tampered content fails authentication and is
/// reported as [`ConfigError::Decryption`]; it never yields garbage.
pub fn decrypt(passphrase: &SecretString, data: &[u8], origin: &str) -> Result<Vec<u8>> {
    let fail = |reason: &str| ConfigError::Decryption {
        origin: origin.to_string(),
        reason: reason.to_string(),
    };

    if data.len() < HEADER_LEN || &data[..MAGIC.len()] != MAGIC {
        return Err(fail("not an ordbok encrypted file"));
    }
    if data[MAGIC.len()] != VERSION {
        return Err(fail("unsupported format version"));
    }

    let salt_start = MAGIC.len() + 1;
    let nonce_start = salt_start + SALT_LEN;
    let salt = &data[salt_start..nonce_start];
    let nonce = Nonce::from_slice(&data[nonce_start..HEADER_LEN]);

    let key = derive_key(passphrase, salt).map_err(|e| fail(&e))?;
    let cipher = Aes256Gcm::new((&key).into());
    cipher
        .decrypt(nonce, &data[HEADER_LEN..])
        .map_err(|_| fail("authentication failed (wrong key or corrupted file)"))
}

fn derive_key(passphrase: &SecretString, salt: &[u8]) -> std::result::Result<[u8; 32], String> {
    let mut key = [0u8; 32];
    Argon2::default()
        .hash_password_into(passphrase.expose_secret().as_bytes(), salt, &mut key)
        .map_err(|e| e.to_string())?;
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secret(s: &str) -> SecretString {
        SecretString::new(s.to_string().into())
    }

    #[test]
    fn test_encryption_roundtrip() {
        let key = secret("correct horse");
        let plaintext = b"SECRET_KEY: 'keep out!'\n";

        let ciphertext = encrypt(&key, plaintext).unwrap();
        assert_ne!(&ciphertext[HEADER_LEN..], plaintext.as_slice());

        let decrypted = decrypt(&key, &ciphertext, "test").unwrap();
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn test_wrong_key_fails() {
        let ciphertext = encrypt(&secret("right"), b"DEBUG: true").unwrap();
        let result = decrypt(&secret("wrong"), &ciphertext, "test");
        assert!(matches!(result, Err(ConfigError::Decryption { .. })));
    }

    #[test]
    fn test_salted_output_differs() {
        let key = secret("k");
        let a = encrypt(&key, b"same").unwrap();
        let b = encrypt(&key, b"same").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_rejects_garbage() {
        let result = decrypt(&secret("k"), b"plain yaml, not encrypted", "test");
        assert!(matches!(result, Err(ConfigError::Decryption { .. })));
    }

    #[test]
    fn test_rejects_tampered_ciphertext() {
        let key = secret("k");
        let mut ciphertext = encrypt(&key, b"DEBUG: false").unwrap();
        let last = ciphertext.len() - 1;
        ciphertext[last] ^= 0xff;
        assert!(decrypt(&key, &ciphertext, "test").is_err());
    }
}
