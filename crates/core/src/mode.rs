// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-prompt execution mode and its batching fingerprint.
//!
//! Two prompts may share a turn only if their fingerprints are equal; a
//! fingerprint change forces the agent session to restart before the turn.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PermissionMode {
    #[default]
    Default,
    AcceptEdits,
    BypassPermissions,
    Plan,
    ReadOnly,
    SafeYolo,
    Yolo,
}

/// Configuration attached to every user prompt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnhancedMode {
    pub permission_mode: PermissionMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_system_prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub append_system_prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_tools: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disallowed_tools: Option<Vec<String>>,
    /// Display-only hint, not part of the fingerprint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning_effort_label: Option<String>,
}

/// Hex SHA-256 over the backend-affecting subset of an [`EnhancedMode`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModeFingerprint(String);

impl ModeFingerprint {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModeFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Canonical projection hashed for the fingerprint. Field order is fixed by
/// declaration order; tool lists are hashed as given since order can matter
/// to the backend.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FingerprintInput<'a> {
    permission_mode: PermissionMode,
    model: Option<&'a str>,
    fallback_model: Option<&'a str>,
    custom_system_prompt: Option<&'a str>,
    append_system_prompt: Option<&'a str>,
    allowed_tools: Option<&'a [String]>,
    disallowed_tools: Option<&'a [String]>,
}

impl EnhancedMode {
    pub fn fingerprint(&self) -> ModeFingerprint {
        let input = FingerprintInput {
            permission_mode: self.permission_mode,
            model: self.model.as_deref(),
            fallback_model: self.fallback_model.as_deref(),
            custom_system_prompt: self.custom_system_prompt.as_deref(),
            append_system_prompt: self.append_system_prompt.as_deref(),
            allowed_tools: self.allowed_tools.as_deref(),
            disallowed_tools: self.disallowed_tools.as_deref(),
        };
        // Serializing a struct of strings and enums cannot fail
        let canonical = serde_json::to_string(&input).unwrap_or_default();
        ModeFingerprint(format!("{:x}", Sha256::digest(canonical.as_bytes())))
    }
}

#[cfg(test)]
#[path = "mode_tests.rs"]
mod tests;
