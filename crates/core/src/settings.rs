// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! User settings shared between the CLI, the daemon and the mobile app.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

pub const SETTINGS_SCHEMA_VERSION: u32 = 2;

/// Environment profile selectable from the app or the CLI.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiBackendProfile {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub environment_variables: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub machine_id: Option<String>,
    #[serde(default)]
    pub machine_id_confirmed_by_server: bool,
    #[serde(default)]
    pub profiles: Vec<AiBackendProfile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_profile_id: Option<String>,
    /// Keys this version does not know about, preserved on write
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_schema_version() -> u32 {
    SETTINGS_SCHEMA_VERSION
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            schema_version: SETTINGS_SCHEMA_VERSION,
            machine_id: None,
            machine_id_confirmed_by_server: false,
            profiles: Vec::new(),
            active_profile_id: None,
            extra: Map::new(),
        }
    }
}

impl Settings {
    pub fn active_profile(&self) -> Option<&AiBackendProfile> {
        let id = self.active_profile_id.as_deref()?;
        self.profiles.iter().find(|p| p.id == id)
    }

    /// Apply a partial JSON delta with [`apply_settings`] semantics.
    pub fn with_delta(&self, delta: &Value) -> Result<Settings, serde_json::Error> {
        let base = serde_json::to_value(self)?;
        serde_json::from_value(apply_settings(&base, delta))
    }
}

/// Field-overwrite merge: every top-level key of `delta` replaces the key in
/// `base` wholesale (arrays and nested objects included); keys absent from
/// `delta` survive. A non-object `delta` leaves `base` untouched.
pub fn apply_settings(base: &Value, delta: &Value) -> Value {
    let Some(delta) = delta.as_object() else {
        return base.clone();
    };
    let mut merged = base.as_object().cloned().unwrap_or_default();
    for (key, value) in delta {
        merged.insert(key.clone(), value.clone());
    }
    Value::Object(merged)
}

#[cfg(test)]
#[path = "settings_tests.rs"]
mod tests;
