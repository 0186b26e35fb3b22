// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reversible stand-in cipher for tests. Not encryption.
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{CryptoError, EncryptionVariant, Encryptor};

/// XORs with a one-byte key behind a key tag, so decrypting with the wrong
/// key fails the same way a real AEAD would.
#[derive(Debug, Clone, Copy)]
pub struct FakeEncryptor {
    key: u8,
}

impl FakeEncryptor {
    pub fn new(key: u8) -> Self {
        Self { key }
    }
}

impl Default for FakeEncryptor {
    fn default() -> Self {
        Self::new(0x5a)
    }
}

impl Encryptor for FakeEncryptor {
    fn variant(&self) -> EncryptionVariant {
        EncryptionVariant::Legacy
    }

    fn encrypt(&self, plaintext: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(plaintext.len() + 1);
        out.push(self.key);
        out.extend(plaintext.iter().map(|b| b ^ self.key));
        out
    }

    fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        match ciphertext.split_first() {
            Some((tag, body)) if *tag == self.key => Ok(body.iter().map(|b| b ^ self.key).collect()),
            _ => Err(CryptoError::DecryptFailed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn wrong_key_fails_to_decrypt() {
        let sealed = FakeEncryptor::new(1).encrypt(b"hello");
        assert!(FakeEncryptor::new(2).decrypt(&sealed).is_err());
        assert_eq!(FakeEncryptor::new(1).decrypt(&sealed).unwrap(), b"hello");
    }

    #[test]
    fn json_helpers() {
        let enc = FakeEncryptor::default();
        let sealed = enc.encrypt_json(&json!({"a": 1})).unwrap();
        assert_eq!(enc.decrypt_json(&sealed).unwrap(), json!({"a": 1}));
    }
}
