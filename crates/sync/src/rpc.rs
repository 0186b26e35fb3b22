// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scoped RPC handler registry.
//!
//! Methods are announced to the relay as `<scope id>:<method>`. The relay
//! forgets announcements when the socket drops, so every registration is
//! replayed on reconnect. Requests always get exactly one sealed reply:
//! handler failures become an `{error, method}` envelope.

use async_trait::async_trait;
use hp_adapters::{Encryptor, RelayChannel};
use hp_core::{MachineId, SessionId};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;

use crate::codec::{open, seal, CodecError};

#[derive(Debug, Error)]
pub enum RpcError {
    #[error("unregistered method: {0}")]
    UnregisteredMethod(String),
    #[error("cannot decode params: {0}")]
    Params(#[from] CodecError),
    #[error("{0}")]
    Handler(String),
}

impl RpcError {
    pub fn handler(message: impl fmt::Display) -> Self {
        RpcError::Handler(message.to_string())
    }
}

/// Which entity a registry serves
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RpcScope {
    Machine(MachineId),
    Session(SessionId),
}

impl RpcScope {
    /// Prefix of wire method names for this scope
    pub fn prefix(&self) -> &str {
        match self {
            RpcScope::Machine(id) => id.as_str(),
            RpcScope::Session(id) => id.as_str(),
        }
    }
}

impl fmt::Display for RpcScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RpcScope::Machine(id) => write!(f, "machine:{id}"),
            RpcScope::Session(id) => write!(f, "session:{id}"),
        }
    }
}

/// Inbound `rpc-request` as delivered by the relay
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcRequest {
    pub method: String,
    /// Sealed JSON params
    pub params: String,
}

#[async_trait]
pub trait RpcHandler: Send + Sync + 'static {
    async fn call(&self, params: Value) -> Result<Value, RpcError>;
}

#[async_trait]
impl<F, Fut> RpcHandler for F
where
    F: Fn(Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, RpcError>> + Send + 'static,
{
    async fn call(&self, params: Value) -> Result<Value, RpcError> {
        (self)(params).await
    }
}

pub struct RpcHandlerManager {
    scope: RpcScope,
    encryptor: Arc<dyn Encryptor>,
    handlers: RwLock<BTreeMap<String, Arc<dyn RpcHandler>>>,
    channel: Mutex<Option<Arc<dyn RelayChannel>>>,
}

impl RpcHandlerManager {
    pub fn new(scope: RpcScope, encryptor: Arc<dyn Encryptor>) -> Self {
        Self {
            scope,
            encryptor,
            handlers: RwLock::new(BTreeMap::new()),
            channel: Mutex::new(None),
        }
    }

    pub fn scope(&self) -> &RpcScope {
        &self.scope
    }

    fn scoped(&self, method: &str) -> String {
        format!("{}:{}", self.scope.prefix(), method)
    }

    pub fn registered_methods(&self) -> Vec<String> {
        self.handlers.read().keys().cloned().collect()
    }

    /// Register (or replace) a handler, announcing it if connected.
    pub async fn register_handler(&self, method: &str, handler: impl RpcHandler) {
        self.handlers
            .write()
            .insert(method.to_string(), Arc::new(handler));
        if let Some(channel) = self.connected_channel() {
            self.announce(&channel, "rpc-register", method).await;
        }
    }

    pub async fn unregister_handler(&self, method: &str) {
        if self.handlers.write().remove(method).is_none() {
            return;
        }
        if let Some(channel) = self.connected_channel() {
            self.announce(&channel, "rpc-unregister", method).await;
        }
    }

    /// Attach to a (re)connected socket and replay every registration.
    pub async fn on_socket_connect(&self, channel: Arc<dyn RelayChannel>) {
        *self.channel.lock() = Some(Arc::clone(&channel));
        let methods = self.registered_methods();
        tracing::info!(scope = %self.scope, count = methods.len(), "replaying rpc registrations");
        for method in methods {
            self.announce(&channel, "rpc-register", &method).await;
        }
    }

    /// Announcements die with the socket; forget the channel until reconnect.
    pub fn on_socket_disconnect(&self) {
        *self.channel.lock() = None;
    }

    /// Decrypt, dispatch and seal the reply. Never fails.
    pub async fn handle_request(&self, request: &RpcRequest) -> String {
        let reply = match self.dispatch(request).await {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(scope = %self.scope, method = %request.method, error = %e, "rpc failed");
                json!({ "error": e.to_string(), "method": request.method })
            }
        };
        seal(self.encryptor.as_ref(), &reply)
    }

    async fn dispatch(&self, request: &RpcRequest) -> Result<Value, RpcError> {
        let handler = request
            .method
            .strip_prefix(self.scope.prefix())
            .and_then(|rest| rest.strip_prefix(':'))
            .and_then(|method| self.handlers.read().get(method).cloned())
            .ok_or_else(|| RpcError::UnregisteredMethod(request.method.clone()))?;
        let params = open(self.encryptor.as_ref(), &request.params)?;
        tracing::debug!(scope = %self.scope, method = %request.method, "rpc request");
        handler.call(params).await
    }

    fn connected_channel(&self) -> Option<Arc<dyn RelayChannel>> {
        self.channel
            .lock()
            .as_ref()
            .filter(|c| c.is_connected())
            .cloned()
    }

    async fn announce(&self, channel: &Arc<dyn RelayChannel>, event: &str, method: &str) {
        let scoped = self.scoped(method);
        if let Err(e) = channel.emit(event, json!({ "method": scoped })).await {
            tracing::warn!(scope = %self.scope, method = %scoped, error = %e, "rpc announcement failed");
        }
    }
}

#[cfg(test)]
#[path = "rpc_tests.rs"]
mod tests;
