// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Turn state machine.
//!
//! A session-handle swap requested mid-turn is parked in `SwapPending` and
//! released only when the turn ends, so swaps never interrupt a turn.

use thiserror::Error;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TurnState {
    #[default]
    Idle,
    Processing,
    /// Turn in flight with a swap to apply when it ends
    SwapPending { handle: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnEvent {
    Begin,
    Finish,
    /// Turn dropped before completion
    Abort,
    RequestSwap { handle: String },
}

/// Result of a transition: the next state and a swap to apply now, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub next: TurnState,
    pub apply_swap: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid turn transition: {event:?} in {state:?}")]
pub struct TurnStateError {
    pub state: TurnState,
    pub event: TurnEvent,
}

impl TurnState {
    pub fn is_idle(&self) -> bool {
        matches!(self, TurnState::Idle)
    }

    pub fn transition(&self, event: TurnEvent) -> Result<Transition, TurnStateError> {
        let (next, apply_swap) = match (self, event) {
            (TurnState::Idle, TurnEvent::Begin) => (TurnState::Processing, None),
            (TurnState::Idle, TurnEvent::RequestSwap { handle }) => (TurnState::Idle, Some(handle)),
            (TurnState::Idle, TurnEvent::Abort) => (TurnState::Idle, None),
            (TurnState::Processing, TurnEvent::Finish | TurnEvent::Abort) => (TurnState::Idle, None),
            (
                TurnState::Processing | TurnState::SwapPending { .. },
                TurnEvent::RequestSwap { handle },
            ) => (TurnState::SwapPending { handle }, None),
            (TurnState::SwapPending { handle }, TurnEvent::Finish | TurnEvent::Abort) => {
                (TurnState::Idle, Some(handle.clone()))
            }
            (state, event) => {
                return Err(TurnStateError {
                    state: state.clone(),
                    event,
                })
            }
        };
        Ok(Transition { next, apply_swap })
    }
}

#[cfg(test)]
#[path = "turn_state_tests.rs"]
mod tests;
