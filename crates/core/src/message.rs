// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Normalized agent output.
//!
//! Per-agent adapters (Claude SDK, Codex MCP, Gemini ACP) translate their
//! native events into this type; everything downstream matches on it.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageReport {
    pub input_tokens: u64,
    pub output_tokens: u64,
    #[serde(default)]
    pub cache_read_tokens: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum AgentMessage {
    /// Assistant text
    Text { text: String },
    Reasoning { text: String },
    ToolCall {
        call_id: String,
        name: String,
        input: serde_json::Value,
    },
    ToolResult {
        call_id: String,
        output: serde_json::Value,
        is_error: bool,
    },
    /// Permission prompt the remote client must answer
    PermissionRequest {
        request_id: String,
        tool: String,
        input: serde_json::Value,
    },
    FileDiff { path: String, diff: String },
    Usage(UsageReport),
    /// Agent reported a resumable session handle
    SessionHandle { handle: String },
    Error { message: String },
    /// The turn is over; no more messages until the next prompt
    TurnComplete,
}

impl AgentMessage {
    pub fn is_turn_complete(&self) -> bool {
        matches!(self, AgentMessage::TurnComplete)
    }
}
