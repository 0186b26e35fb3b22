// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Prompt queue feeding the turn loop.
//!
//! Consecutive prompts with the same mode fingerprint are merged into one
//! batch. A fingerprint change or an isolate entry ends the batch and stays
//! queued for the next wait.

use hp_core::{EnhancedMode, ModeFingerprint};
use parking_lot::Mutex;
use std::collections::VecDeque;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

/// Joins merged prompts
pub const BATCH_SEPARATOR: &str = "\n";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueEntry {
    pub prompt: String,
    pub mode: EnhancedMode,
    pub isolate: bool,
    pub fingerprint: ModeFingerprint,
}

impl QueueEntry {
    fn new(prompt: impl Into<String>, mode: EnhancedMode, isolate: bool) -> Self {
        let fingerprint = mode.fingerprint();
        Self {
            prompt: prompt.into(),
            mode,
            isolate,
            fingerprint,
        }
    }
}

/// One or more merged entries, executed as a single turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    pub prompt: String,
    pub mode: EnhancedMode,
    pub fingerprint: ModeFingerprint,
    pub isolate: bool,
    /// Number of entries merged
    pub size: usize,
}

#[derive(Debug, Default)]
pub struct MessageQueue {
    entries: Mutex<VecDeque<QueueEntry>>,
    notify: Notify,
}

impl MessageQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, prompt: impl Into<String>, mode: EnhancedMode) {
        self.entries
            .lock()
            .push_back(QueueEntry::new(prompt, mode, false));
        self.notify.notify_one();
    }

    /// Drop everything queued and enqueue a lone isolate entry.
    pub fn push_isolate_and_clear(&self, prompt: impl Into<String>, mode: EnhancedMode) {
        {
            let mut entries = self.entries.lock();
            let dropped = entries.len();
            entries.clear();
            entries.push_back(QueueEntry::new(prompt, mode, true));
            if dropped > 0 {
                tracing::debug!(dropped, "queue cleared for isolated prompt");
            }
        }
        self.notify.notify_one();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Dequeue the next batch without waiting.
    pub fn try_take_batch(&self) -> Option<Batch> {
        let mut entries = self.entries.lock();
        let first = entries.pop_front()?;
        let mut batch = Batch {
            prompt: first.prompt,
            mode: first.mode,
            fingerprint: first.fingerprint,
            isolate: first.isolate,
            size: 1,
        };
        if batch.isolate {
            return Some(batch);
        }
        while let Some(next) = entries.front() {
            if next.isolate || next.fingerprint != batch.fingerprint {
                break;
            }
            if let Some(next) = entries.pop_front() {
                batch.prompt.push_str(BATCH_SEPARATOR);
                batch.prompt.push_str(&next.prompt);
                batch.size += 1;
            }
        }
        Some(batch)
    }

    /// Wait until something is queued, then take a batch.
    ///
    /// Returns `None` if `cancel` fires first; nothing is dequeued then.
    pub async fn wait_for_messages(&self, cancel: &CancellationToken) -> Option<Batch> {
        loop {
            let notified = self.notify.notified();
            if let Some(batch) = self.try_take_batch() {
                return Some(batch);
            }
            tokio::select! {
                _ = cancel.cancelled() => return None,
                _ = notified => {}
            }
        }
    }

    /// Merged prompt text and its mode, as handed to the agent.
    pub async fn wait_for_messages_and_get_as_string(
        &self,
        cancel: &CancellationToken,
    ) -> Option<(String, EnhancedMode)> {
        self.wait_for_messages(cancel)
            .await
            .map(|batch| (batch.prompt, batch.mode))
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
