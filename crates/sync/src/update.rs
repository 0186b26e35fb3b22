// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Optimistic-concurrency updates against the relay.
//!
//! Every synced entity (machine metadata, daemon state, session metadata,
//! agent state) goes through [`VersionedSync::update`]. The mutation is a
//! function of the current value, so on a version mismatch it is re-applied
//! on top of the server's newer value rather than resending stale output.

use hp_adapters::{Encryptor, RelayChannel, RelayError};
use hp_core::{with_retry, Attempt, RetryError, RetryPolicy, Versioned};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use thiserror::Error;

use crate::codec::{open, seal, CodecError};

#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Relay(#[from] RelayError),
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error("{event} rejected by server")]
    Rejected { event: String },
    #[error("malformed {event} response: {reason}")]
    InvalidResponse { event: String, reason: String },
    #[error("version mismatch: sent {expected}, server at {server}")]
    VersionMismatch { expected: u64, server: u64 },
    #[error("update failed after {attempts} retries")]
    UpdateFailedAfterRetries { attempts: u32 },
    #[error("value does not round-trip through JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Where a versioned entity lives on the relay.
///
/// The request is `{<id_field>: id, <value_field>: sealed, expectedVersion}`
/// and the reply carries the server value under the same `value_field`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateTarget {
    pub event: &'static str,
    pub id_field: &'static str,
    pub id: String,
    pub value_field: &'static str,
}

impl UpdateTarget {
    pub fn machine_metadata(machine_id: &str) -> Self {
        Self::new("machine-update-metadata", "machineId", machine_id, "metadata")
    }

    pub fn machine_state(machine_id: &str) -> Self {
        Self::new("machine-update-state", "machineId", machine_id, "daemonState")
    }

    pub fn session_metadata(session_id: &str) -> Self {
        Self::new("update-metadata", "sid", session_id, "metadata")
    }

    pub fn session_state(session_id: &str) -> Self {
        Self::new("update-state", "sid", session_id, "agentState")
    }

    fn new(event: &'static str, id_field: &'static str, id: &str, value_field: &'static str) -> Self {
        Self {
            event,
            id_field,
            id: id.to_string(),
            value_field,
        }
    }

    fn request(&self, sealed: String, expected_version: u64) -> Value {
        let mut body = Map::new();
        body.insert(self.id_field.to_string(), Value::String(self.id.clone()));
        body.insert(self.value_field.to_string(), Value::String(sealed));
        body.insert("expectedVersion".to_string(), json!(expected_version));
        Value::Object(body)
    }
}

/// Decoded server reply. Values are still sealed JSON at this point.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateResponse {
    Success { version: u64, value: Option<Value> },
    VersionMismatch { version: u64, value: Option<Value> },
    Error,
}

impl UpdateResponse {
    pub fn parse(
        target: &UpdateTarget,
        encryptor: &dyn Encryptor,
        ack: &Value,
    ) -> Result<Self, SyncError> {
        let invalid = |reason: &str| SyncError::InvalidResponse {
            event: target.event.to_string(),
            reason: reason.to_string(),
        };
        let result = ack
            .get("result")
            .and_then(Value::as_str)
            .ok_or_else(|| invalid("missing result"))?;
        if result == "error" {
            return Ok(UpdateResponse::Error);
        }
        let version = ack
            .get("version")
            .and_then(Value::as_u64)
            .ok_or_else(|| invalid("missing version"))?;
        let value = match ack.get(target.value_field) {
            Some(Value::String(sealed)) => Some(open(encryptor, sealed)?),
            Some(Value::Null) | None => None,
            Some(_) => return Err(invalid("value is not a sealed string")),
        };
        match result {
            "success" => Ok(UpdateResponse::Success { version, value }),
            "version-mismatch" => Ok(UpdateResponse::VersionMismatch { version, value }),
            other => Err(invalid(&format!("unknown result {other:?}"))),
        }
    }
}

/// Versioned update driver bound to one relay connection and key.
#[derive(Clone)]
pub struct VersionedSync {
    relay: Arc<dyn RelayChannel>,
    encryptor: Arc<dyn Encryptor>,
    policy: RetryPolicy,
}

impl VersionedSync {
    pub fn new(relay: Arc<dyn RelayChannel>, encryptor: Arc<dyn Encryptor>) -> Self {
        Self {
            relay,
            encryptor,
            policy: RetryPolicy::versioned_update(),
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    pub fn relay(&self) -> &Arc<dyn RelayChannel> {
        &self.relay
    }

    pub fn encryptor(&self) -> &Arc<dyn Encryptor> {
        &self.encryptor
    }

    /// Apply `mutate` to `current` and push it, rebasing on mismatch.
    ///
    /// Relay errors and server `error` replies abort without retrying.
    pub async fn update<T, F>(
        &self,
        target: &UpdateTarget,
        current: Versioned<T>,
        mutate: F,
    ) -> Result<Versioned<T>, SyncError>
    where
        T: Serialize + DeserializeOwned + Clone + Send,
        F: Fn(T) -> T + Send + Sync,
    {
        let base = Mutex::new(current);
        let (base, mutate) = (&base, &mutate);
        let outcome = with_retry(self.policy, move |attempt| {
            self.attempt(target, base, mutate, attempt)
        })
        .await;

        match outcome {
            Ok(updated) => Ok(updated),
            Err(RetryError::Aborted(e)) => Err(e),
            Err(RetryError::Exhausted { attempts, last }) => {
                tracing::warn!(event = target.event, id = %target.id, attempts, error = %last, "versioned update gave up");
                Err(SyncError::UpdateFailedAfterRetries { attempts })
            }
        }
    }

    async fn attempt<T, F>(
        &self,
        target: &UpdateTarget,
        base: &Mutex<Versioned<T>>,
        mutate: &F,
        attempt: u32,
    ) -> Result<Versioned<T>, Attempt<SyncError>>
    where
        T: Serialize + DeserializeOwned + Clone + Send,
        F: Fn(T) -> T + Send + Sync,
    {
        let snapshot = base.lock().clone();
        let proposed = mutate(snapshot.value);
        let plain = serde_json::to_value(&proposed).map_err(|e| Attempt::Abort(e.into()))?;
        let request = target.request(seal(self.encryptor.as_ref(), &plain), snapshot.version);
        let ack = self
            .relay
            .emit_with_ack(target.event, request)
            .await
            .map_err(|e| Attempt::Abort(e.into()))?;

        match UpdateResponse::parse(target, self.encryptor.as_ref(), &ack).map_err(Attempt::Abort)? {
            UpdateResponse::Success { version, value } => {
                let value = match value {
                    Some(value) => decode(value)?,
                    None => proposed,
                };
                Ok(Versioned::new(value, version))
            }
            UpdateResponse::VersionMismatch { version, value } => {
                tracing::debug!(
                    event = target.event,
                    id = %target.id,
                    attempt,
                    sent = snapshot.version,
                    server = version,
                    "version mismatch, rebasing"
                );
                let Some(value) = value else {
                    return Err(Attempt::Abort(SyncError::InvalidResponse {
                        event: target.event.to_string(),
                        reason: "version-mismatch without value".to_string(),
                    }));
                };
                base.lock().rebase(decode(value)?, version);
                Err(Attempt::Retry(SyncError::VersionMismatch {
                    expected: snapshot.version,
                    server: version,
                }))
            }
            UpdateResponse::Error => Err(Attempt::Abort(SyncError::Rejected {
                event: target.event.to_string(),
            })),
        }
    }
}

fn decode<T: DeserializeOwned>(value: Value) -> Result<T, Attempt<SyncError>> {
    serde_json::from_value(value).map_err(|e| Attempt::Abort(e.into()))
}

#[cfg(test)]
#[path = "update_tests.rs"]
mod tests;
