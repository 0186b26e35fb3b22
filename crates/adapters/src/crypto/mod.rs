// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Symmetric encryption seam.
//!
//! Primitives live outside this workspace; the daemon and session processes
//! only see `encrypt(plaintext) -> bytes` / `decrypt(bytes) -> plaintext`
//! bound to one key and variant.

#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeEncryptor;

use serde_json::Value;
use thiserror::Error;

/// Key format negotiated with the relay account
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncryptionVariant {
    /// Shared secret key
    Legacy,
    /// Per-entity data key wrapped by the account key
    DataKey,
}

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("decryption failed")]
    DecryptFailed,
    #[error("invalid JSON payload: {0}")]
    Json(#[from] serde_json::Error),
}

/// One key, one variant.
pub trait Encryptor: Send + Sync + 'static {
    fn variant(&self) -> EncryptionVariant;

    fn encrypt(&self, plaintext: &[u8]) -> Vec<u8>;

    fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError>;

    fn encrypt_json(&self, value: &Value) -> Result<Vec<u8>, CryptoError> {
        Ok(self.encrypt(&serde_json::to_vec(value)?))
    }

    fn decrypt_json(&self, ciphertext: &[u8]) -> Result<Value, CryptoError> {
        Ok(serde_json::from_slice(&self.decrypt(ciphertext)?)?)
    }
}
