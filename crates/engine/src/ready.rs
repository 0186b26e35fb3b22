// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Sole authority for "waiting for input" notifications.

use parking_lot::Mutex;

use crate::queue::MessageQueue;

#[derive(Debug, Default)]
struct GateState {
    shutting_down: bool,
    in_flight: bool,
    /// Ready already emitted since the last turn began
    announced: bool,
}

type ReadyCallback = Box<dyn Fn() + Send + Sync>;

pub struct ReadyGate {
    state: Mutex<GateState>,
    on_ready: ReadyCallback,
}

impl ReadyGate {
    pub fn new(on_ready: impl Fn() + Send + Sync + 'static) -> Self {
        Self {
            state: Mutex::new(GateState::default()),
            on_ready: Box::new(on_ready),
        }
    }

    pub fn begin_turn(&self) {
        let mut state = self.state.lock();
        state.in_flight = true;
        state.announced = false;
    }

    pub fn end_turn(&self) {
        self.state.lock().in_flight = false;
    }

    pub fn shutdown(&self) {
        self.state.lock().shutting_down = true;
    }

    /// Emit ready if not shutting down, no turn is running and the queue is
    /// empty. Emits at most once per idle period.
    pub fn emit_ready_if_idle(&self, queue: &MessageQueue) -> bool {
        {
            let mut state = self.state.lock();
            if state.shutting_down || state.in_flight || state.announced || !queue.is_empty() {
                return false;
            }
            state.announced = true;
        }
        (self.on_ready)();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hp_core::EnhancedMode;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counting_gate() -> (ReadyGate, Arc<AtomicUsize>) {
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        let gate = ReadyGate::new(move || {
            c.fetch_add(1, Ordering::SeqCst);
        });
        (gate, count)
    }

    #[test]
    fn emits_once_per_idle_period() {
        let (gate, count) = counting_gate();
        let queue = MessageQueue::new();

        assert!(gate.emit_ready_if_idle(&queue));
        assert!(!gate.emit_ready_if_idle(&queue));

        gate.begin_turn();
        assert!(!gate.emit_ready_if_idle(&queue));
        gate.end_turn();
        assert!(gate.emit_ready_if_idle(&queue));

        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn queued_work_blocks_ready() {
        let (gate, count) = counting_gate();
        let queue = MessageQueue::new();
        queue.push("pending", EnhancedMode::default());

        assert!(!gate.emit_ready_if_idle(&queue));
        queue.try_take_batch();
        assert!(gate.emit_ready_if_idle(&queue));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn shutdown_silences_ready() {
        let (gate, count) = counting_gate();
        gate.shutdown();
        assert!(!gate.emit_ready_if_idle(&MessageQueue::new()));
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }
}
