// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Encrypted JSON blobs as they travel over the relay: base64 of ciphertext.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use hp_adapters::{CryptoError, Encryptor};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error(transparent)]
    Crypto(#[from] CryptoError),
}

pub fn seal(encryptor: &dyn Encryptor, value: &Value) -> String {
    STANDARD.encode(encryptor.encrypt(value.to_string().as_bytes()))
}

pub fn open(encryptor: &dyn Encryptor, sealed: &str) -> Result<Value, CodecError> {
    let bytes = STANDARD.decode(sealed)?;
    Ok(encryptor.decrypt_json(&bytes)?)
}
