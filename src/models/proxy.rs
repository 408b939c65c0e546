// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Connection secrets for a sold proxy, kept encrypted at rest.
//!
//! Nothing in this crate persists proxies. These helpers are the library
//! surface for the order/inventory store, which seals before writing and
//! opens only when serving the buyer.

use crate::services::encryption::{EncryptionError, FieldCipher};
use serde::{Deserialize, Serialize};

/// Plaintext proxy credentials, only materialized for the buyer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxySecrets {
    pub host: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

/// Proxy credentials as persisted (each present field is an encrypted package).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedProxySecrets {
    pub host_encrypted: String,
    pub username_encrypted: Option<String>,
    pub password_encrypted: Option<String>,
}

/// Encrypt proxy credentials before storing.
pub fn seal_proxy_secrets(
    cipher: &FieldCipher,
    secrets: &ProxySecrets,
) -> Result<SealedProxySecrets, EncryptionError> {
    Ok(SealedProxySecrets {
        host_encrypted: cipher.encrypt(&secrets.host)?,
        username_encrypted: seal_optional(cipher, secrets.username.as_deref())?,
        password_encrypted: seal_optional(cipher, secrets.password.as_deref())?,
    })
}

/// Decrypt proxy credentials after retrieval.
pub fn open_proxy_secrets(
    cipher: &FieldCipher,
    sealed: &SealedProxySecrets,
) -> Result<ProxySecrets, EncryptionError> {
    Ok(ProxySecrets {
        host: cipher.decrypt(&sealed.host_encrypted)?,
        username: sealed
            .username_encrypted
            .as_deref()
            .map(|v| cipher.decrypt(v))
            .transpose()?,
        password: sealed
            .password_encrypted
            .as_deref()
            .map(|v| cipher.decrypt(v))
            .transpose()?,
    })
}

/// Empty optional values are stored as absent rather than rejected.
fn seal_optional(
    cipher: &FieldCipher,
    value: Option<&str>,
) -> Result<Option<String>, EncryptionError> {
    match value {
        Some(v) if !v.is_empty() => cipher.encrypt(v).map(Some),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::encryption::EncryptionKey;

    fn cipher() -> FieldCipher {
        FieldCipher::new(EncryptionKey::from_bytes([3u8; 32]))
    }

    #[test]
    fn test_seal_and_open() {
        let cipher = cipher();
        let secrets = ProxySecrets {
            host: "203.0.113.7:8080".to_string(),
            username: Some("buyer".to_string()),
            password: Some("hunter2!".to_string()),
        };

        let sealed = seal_proxy_secrets(&cipher, &secrets).unwrap();
        assert_ne!(sealed.host_encrypted, secrets.host);
        assert_eq!(open_proxy_secrets(&cipher, &sealed).unwrap(), secrets);
    }

    #[test]
    fn test_empty_optional_fields_stay_absent() {
        let sealed = seal_proxy_secrets(
            &cipher(),
            &ProxySecrets {
                host: "203.0.113.7:8080".to_string(),
                username: Some(String::new()),
                password: None,
            },
        )
        .unwrap();

        assert_eq!(sealed.username_encrypted, None);
        assert_eq!(sealed.password_encrypted, None);
    }

    #[test]
    fn test_tampered_field_fails_whole_record() {
        let cipher = cipher();
        let mut sealed = seal_proxy_secrets(
            &cipher,
            &ProxySecrets {
                host: "203.0.113.7:8080".to_string(),
                username: None,
                password: Some("hunter2!".to_string()),
            },
        )
        .unwrap();

        let password = sealed.password_encrypted.take().unwrap();
        let (rest, last) = password.split_at(password.len() - 1);
        let flipped = if last == "0" { "1" } else { "0" };
        sealed.password_encrypted = Some(format!("{rest}{flipped}"));

        assert_eq!(
            open_proxy_secrets(&cipher, &sealed),
            Err(EncryptionError::Authentication)
        );
    }
}
