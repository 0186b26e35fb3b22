// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! hp-engine: per-session prompt queue and turn loop

pub mod queue;
mod ready;
mod turn_loop;
pub mod turn_state;

pub use queue::{Batch, MessageQueue, QueueEntry, BATCH_SEPARATOR};
pub use ready::ReadyGate;
pub use turn_loop::{AgentBackend, BackendError, EngineError, MessageSink, TurnCommand, TurnControl, TurnLoop};
pub use turn_state::{Transition, TurnEvent, TurnState, TurnStateError};
