// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Field-level encryption for sensitive stored values.
//!
//! Values are sealed with AES-256-GCM under a 16-byte random IV and stored as
//! `hex(iv):hex(tag):hex(ciphertext)`. A fresh IV is drawn on every call.

use aes_gcm::aead::consts::U16;
use aes_gcm::aead::{AeadInPlace, KeyInit};
use aes_gcm::aes::Aes256;
use aes_gcm::{AesGcm, Nonce, Tag};
use rand::rngs::OsRng;
use rand::RngCore;
use std::fmt;

/// AES-256-GCM with a 128-bit nonce, matching the stored package layout.
type FieldAead = AesGcm<Aes256, U16>;

pub const KEY_LEN: usize = 32;
pub const IV_LEN: usize = 16;
pub const TAG_LEN: usize = 16;

/// Encryption failure kinds.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncryptionError {
    #[error("Invalid input: {0}")]
    Input(&'static str),

    #[error("Encryption key must be 32 bytes (64 hex characters)")]
    KeyConfiguration,

    #[error("Invalid encrypted field format: {0}")]
    Format(&'static str),

    #[error("Encrypted field failed authentication (possible tampering)")]
    Authentication,
}

/// A validated 256-bit field encryption key.
#[derive(Clone, PartialEq, Eq)]
pub struct EncryptionKey([u8; KEY_LEN]);

impl EncryptionKey {
    /// Decode a key from exactly 64 hex characters.
    pub fn from_hex(hex_key: &str) -> Result<Self, EncryptionError> {
        let bytes = hex::decode(hex_key.trim()).map_err(|_| EncryptionError::KeyConfiguration)?;
        let key: [u8; KEY_LEN] = bytes
            .try_into()
            .map_err(|_| EncryptionError::KeyConfiguration)?;
        Ok(Self(key))
    }

    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EncryptionKey(<redacted>)")
    }
}

/// Encrypts and decrypts string fields under a single key.
#[derive(Clone, Debug)]
pub struct FieldCipher {
    key: EncryptionKey,
}

impl FieldCipher {
    pub fn new(key: EncryptionKey) -> Self {
        Self { key }
    }

    /// Build a cipher from a hex key, validating its length.
    pub fn from_hex(hex_key: &str) -> Result<Self, EncryptionError> {
        EncryptionKey::from_hex(hex_key).map(Self::new)
    }

    fn aead(&self) -> Result<FieldAead, EncryptionError> {
        FieldAead::new_from_slice(self.key.as_bytes()).map_err(|_| EncryptionError::KeyConfiguration)
    }

    /// Encrypt a non-empty plaintext into an `iv:tag:ciphertext` package.
    pub fn encrypt(&self, plaintext: &str) -> Result<String, EncryptionError> {
        if plaintext.is_empty() {
            return Err(EncryptionError::Input("plaintext must not be empty"));
        }

        let mut iv = [0u8; IV_LEN];
        OsRng.fill_bytes(&mut iv);

        let mut buffer = plaintext.as_bytes().to_vec();
        let tag = self
            .aead()?
            .encrypt_in_place_detached(Nonce::<U16>::from_slice(&iv), b"", &mut buffer)
            .map_err(|_| EncryptionError::Input("plaintext too large to encrypt"))?;

        Ok(format!(
            "{}:{}:{}",
            hex::encode(iv),
            hex::encode(tag),
            hex::encode(buffer)
        ))
    }

    /// Decrypt a package produced by [`FieldCipher::encrypt`].
    ///
    /// Returns the plaintext only if the authentication tag verifies.
    pub fn decrypt(&self, package: &str) -> Result<String, EncryptionError> {
        if package.is_empty() {
            return Err(EncryptionError::Input("encrypted value must not be empty"));
        }

        let parts: Vec<&str> = package.split(':').collect();
        let [iv_hex, tag_hex, ciphertext_hex] = parts.as_slice() else {
            return Err(EncryptionError::Format("expected 3 colon-separated segments"));
        };

        let iv = hex::decode(iv_hex).map_err(|_| EncryptionError::Format("IV is not hex"))?;
        let tag = hex::decode(tag_hex).map_err(|_| EncryptionError::Format("tag is not hex"))?;
        let mut buffer = hex::decode(ciphertext_hex)
            .map_err(|_| EncryptionError::Format("ciphertext is not hex"))?;

        if iv.len() != IV_LEN {
            return Err(EncryptionError::Format("IV must be 16 bytes"));
        }
        if tag.len() != TAG_LEN {
            return Err(EncryptionError::Format("tag must be 16 bytes"));
        }

        self.aead()?
            .decrypt_in_place_detached(
                Nonce::<U16>::from_slice(&iv),
                b"",
                &mut buffer,
                Tag::from_slice(&tag),
            )
            .map_err(|_| EncryptionError::Authentication)?;

        String::from_utf8(buffer).map_err(|_| EncryptionError::Format("plaintext is not UTF-8"))
    }

    /// Decrypt a value that may still be legacy plaintext.
    ///
    /// Values that do not look like an encrypted package are returned as-is;
    /// values that do must decrypt successfully.
    pub fn decrypt_or_legacy(&self, value: &str) -> Result<String, EncryptionError> {
        if is_encrypted_format(value) {
            self.decrypt(value)
        } else {
            tracing::debug!("Field is not in encrypted format, treating as legacy plaintext");
            Ok(value.to_string())
        }
    }
}

/// Encrypt with a hex key supplied per call.
pub fn encrypt(plaintext: &str, hex_key: &str) -> Result<String, EncryptionError> {
    if plaintext.is_empty() {
        return Err(EncryptionError::Input("plaintext must not be empty"));
    }
    FieldCipher::from_hex(hex_key)?.encrypt(plaintext)
}

/// Decrypt with a hex key supplied per call.
pub fn decrypt(package: &str, hex_key: &str) -> Result<String, EncryptionError> {
    if package.is_empty() {
        return Err(EncryptionError::Input("encrypted value must not be empty"));
    }
    FieldCipher::from_hex(hex_key)?.decrypt(package)
}

/// Structural check for the `iv:tag:ciphertext` layout.
///
/// Not a cryptographic check; only used to tell legacy plaintext apart.
pub fn is_encrypted_format(value: &str) -> bool {
    let parts: Vec<&str> = value.split(':').collect();
    let is_hex_32 = |s: &str| s.len() == 32 && s.bytes().all(|b| b.is_ascii_hexdigit());
    parts.len() == 3 && is_hex_32(parts[0]) && is_hex_32(parts[1])
}

/// Generate a new random key as 64 hex characters.
pub fn generate_key() -> String {
    let mut key = [0u8; KEY_LEN];
    OsRng.fill_bytes(&mut key);
    hex::encode(key)
}
