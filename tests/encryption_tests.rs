// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Field encryption tests.
//!
//! These tests verify that:
//! 1. Packages decrypt back to the original plaintext
//! 2. Any flipped bit in the tag or ciphertext is detected
//! 3. Every encryption draws a fresh IV

use storefront_auth::services::encryption::{self, is_encrypted_format};
use storefront_auth::services::{EncryptionError, FieldCipher};

const KEY: &str = "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f";

fn cipher() -> FieldCipher {
    FieldCipher::from_hex(KEY).expect("valid key")
}

/// Flip the low bit of byte `index` within colon-separated segment `segment`.
fn flip_bit(package: &str, segment: usize, index: usize) -> String {
    let mut parts: Vec<String> = package.split(':').map(str::to_string).collect();
    let mut bytes = hex::decode(&parts[segment]).unwrap();
    bytes[index] ^= 0x01;
    parts[segment] = hex::encode(bytes);
    parts.join(":")
}

#[test]
fn test_roundtrip() {
    let cipher = cipher();
    for plaintext in ["+1 650 555 0100", "x", "proxy-user", "päßwörd ✓", "a".repeat(4096).as_str()] {
        let package = cipher.encrypt(plaintext).unwrap();
        assert_eq!(cipher.decrypt(&package).unwrap(), plaintext);
    }
}

#[test]
fn test_package_shape() {
    let package = cipher().encrypt("hello").unwrap();
    let parts: Vec<&str> = package.split(':').collect();

    assert_eq!(parts.len(), 3);
    assert_eq!(parts[0].len(), 32, "16-byte IV");
    assert_eq!(parts[1].len(), 32, "16-byte tag");
    assert_eq!(parts[2].len(), "hello".len() * 2);
    assert!(is_encrypted_format(&package));
}

#[test]
fn test_same_plaintext_gives_different_packages() {
    let cipher = cipher();
    let a = cipher.encrypt("same value").unwrap();
    let b = cipher.encrypt("same value").unwrap();

    assert_ne!(a, b);
    assert_ne!(a.split(':').next(), b.split(':').next());
}

#[test]
fn test_tampered_tag_is_rejected() {
    let cipher = cipher();
    let package = cipher.encrypt("secret").unwrap();

    for byte in 0..16 {
        let tampered = flip_bit(&package, 1, byte);
        assert_eq!(
            cipher.decrypt(&tampered),
            Err(EncryptionError::Authentication)
        );
    }
}

#[test]
fn test_tampered_ciphertext_is_rejected() {
    let cipher = cipher();
    let package = cipher.encrypt("secret value").unwrap();

    for byte in 0.."secret value".len() {
        let tampered = flip_bit(&package, 2, byte);
        assert_eq!(
            cipher.decrypt(&tampered),
            Err(EncryptionError::Authentication)
        );
    }
}

#[test]
fn test_tampered_iv_is_rejected() {
    let cipher = cipher();
    let package = cipher.encrypt("secret").unwrap();
    assert_eq!(
        cipher.decrypt(&flip_bit(&package, 0, 3)),
        Err(EncryptionError::Authentication)
    );
}

#[test]
fn test_wrong_key_is_rejected() {
    let package = cipher().encrypt("secret").unwrap();
    let other = FieldCipher::from_hex(&encryption::generate_key()).unwrap();
    assert_eq!(other.decrypt(&package), Err(EncryptionError::Authentication));
}

#[test]
fn test_two_segments_is_format_error() {
    assert!(matches!(
        cipher().decrypt("abcd:ef"),
        Err(EncryptionError::Format(_))
    ));
}

#[test]
fn test_malformed_packages() {
    let cipher = cipher();
    let iv = "00".repeat(16);
    let tag = "11".repeat(16);

    for bad in [
        format!("{iv}:{tag}:zz"),
        format!("{iv}:{tag}:abc"),
        format!("abcd:{tag}:00"),
        format!("{iv}:abcd:00"),
        format!("{iv}:{tag}:00:00"),
    ] {
        assert!(
            matches!(cipher.decrypt(&bad), Err(EncryptionError::Format(_))),
            "expected format error for {bad}"
        );
    }
}

#[test]
fn test_empty_inputs() {
    let cipher = cipher();
    assert!(matches!(cipher.encrypt(""), Err(EncryptionError::Input(_))));
    assert!(matches!(cipher.decrypt(""), Err(EncryptionError::Input(_))));
}

#[test]
fn test_key_must_be_32_bytes() {
    for bad in ["", "abcd", &KEY[..62], format!("{KEY}00").as_str(), "zz".repeat(32).as_str()] {
        assert_eq!(
            encryption::encrypt("secret", bad),
            Err(EncryptionError::KeyConfiguration)
        );
        assert_eq!(
            encryption::decrypt("a:b:c", bad),
            Err(EncryptionError::KeyConfiguration)
        );
    }
}

#[test]
fn test_free_functions_interoperate_with_cipher() {
    let package = encryption::encrypt("shared", KEY).unwrap();
    assert_eq!(cipher().decrypt(&package).unwrap(), "shared");
    assert_eq!(encryption::decrypt(&package, KEY).unwrap(), "shared");
}

#[test]
fn test_legacy_plaintext_passthrough() {
    let cipher = cipher();
    assert_eq!(cipher.decrypt_or_legacy("+1 650 555 0100").unwrap(), "+1 650 555 0100");

    let package = cipher.encrypt("+1 650 555 0100").unwrap();
    assert_eq!(cipher.decrypt_or_legacy(&package).unwrap(), "+1 650 555 0100");
}

#[test]
fn test_generate_key() {
    let a = encryption::generate_key();
    let b = encryption::generate_key();
    assert_eq!(a.len(), 64);
    assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    assert_ne!(a, b);
    assert!(FieldCipher::from_hex(&a).is_ok());
}
