// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Turn loop: queue in, agent backend out.
//!
//! The backend session is bound to one mode fingerprint. A batch with a
//! different fingerprint (or an isolate batch) tears the session down and
//! starts a new one before the prompt is sent.

use async_trait::async_trait;
use hp_core::{AgentMessage, EnhancedMode, ModeFingerprint};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::queue::{Batch, MessageQueue};
use crate::ready::ReadyGate;
use crate::turn_state::{TurnEvent, TurnState, TurnStateError};

pub type MessageSink = mpsc::UnboundedSender<AgentMessage>;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("agent failed to start: {0}")]
    Start(String),
    #[error("agent turn failed: {0}")]
    Turn(String),
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error(transparent)]
    State(#[from] TurnStateError),
}

/// One agent CLI session, driven turn by turn.
#[async_trait]
pub trait AgentBackend: Send + 'static {
    async fn start(&mut self, mode: &EnhancedMode, resume: Option<String>) -> Result<(), BackendError>;

    /// Send one prompt and stream normalized messages until the turn ends.
    async fn run_turn(&mut self, prompt: &str, sink: &MessageSink) -> Result<(), BackendError>;

    /// Tear the session down, returning a handle that can resume it.
    async fn stop(&mut self) -> Option<String>;

    /// Clear permission, reasoning and diff tracking for a fresh session.
    fn reset_processors(&mut self);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnCommand {
    SwapSession { handle: String },
    AbortTurn,
}

/// Handle for steering a running [`TurnLoop`] from other tasks.
#[derive(Debug, Clone)]
pub struct TurnControl {
    tx: mpsc::UnboundedSender<TurnCommand>,
}

impl TurnControl {
    pub fn request_swap(&self, handle: impl Into<String>) {
        let _ = self.tx.send(TurnCommand::SwapSession {
            handle: handle.into(),
        });
    }

    pub fn abort_turn(&self) {
        let _ = self.tx.send(TurnCommand::AbortTurn);
    }
}

#[derive(Debug, Clone)]
struct ActiveSession {
    fingerprint: ModeFingerprint,
    mode: EnhancedMode,
}

enum TurnOutcome {
    Done(Result<(), BackendError>),
    Aborted,
}

enum Next {
    Batch(Batch),
    Command(TurnCommand),
    Stop,
}

pub struct TurnLoop<B: AgentBackend> {
    backend: B,
    queue: Arc<MessageQueue>,
    gate: Arc<ReadyGate>,
    sink: MessageSink,
    commands: mpsc::UnboundedReceiver<TurnCommand>,
    state: TurnState,
    active: Option<ActiveSession>,
    resume: Option<String>,
}

impl<B: AgentBackend> TurnLoop<B> {
    pub fn new(
        backend: B,
        queue: Arc<MessageQueue>,
        gate: Arc<ReadyGate>,
        sink: MessageSink,
    ) -> (Self, TurnControl) {
        let (tx, commands) = mpsc::unbounded_channel();
        let turn_loop = Self {
            backend,
            queue,
            gate,
            sink,
            commands,
            state: TurnState::Idle,
            active: None,
            resume: None,
        };
        (turn_loop, TurnControl { tx })
    }

    /// Resume an earlier conversation on the first start.
    pub fn with_resume(mut self, handle: Option<String>) -> Self {
        self.resume = handle;
        self
    }

    pub fn state(&self) -> &TurnState {
        &self.state
    }

    /// Process batches until cancelled. Returns the resumable handle of the
    /// last session, if any.
    pub async fn run(mut self, cancel: CancellationToken) -> Result<Option<String>, EngineError> {
        loop {
            self.gate.emit_ready_if_idle(&self.queue);
            let next = tokio::select! {
                batch = self.queue.wait_for_messages(&cancel) => match batch {
                    Some(batch) => Next::Batch(batch),
                    None => Next::Stop,
                },
                Some(command) = self.commands.recv() => Next::Command(command),
            };
            match next {
                Next::Batch(batch) => self.run_batch(batch, &cancel).await?,
                Next::Command(command) => self.handle_idle_command(command).await?,
                Next::Stop => break,
            }
            if cancel.is_cancelled() {
                break;
            }
        }

        self.gate.shutdown();
        let handle = match self.active.take() {
            Some(_) => self.backend.stop().await,
            None => self.resume.take(),
        };
        tracing::info!(resumable = handle.is_some(), "turn loop stopped");
        Ok(handle)
    }

    async fn handle_idle_command(&mut self, command: TurnCommand) -> Result<(), EngineError> {
        let event = match command {
            TurnCommand::SwapSession { handle } => TurnEvent::RequestSwap { handle },
            TurnCommand::AbortTurn => TurnEvent::Abort,
        };
        let transition = self.state.transition(event)?;
        self.state = transition.next;
        if let Some(handle) = transition.apply_swap {
            self.apply_swap(handle).await?;
        }
        Ok(())
    }

    pub(crate) async fn run_batch(&mut self, batch: Batch, cancel: &CancellationToken) -> Result<(), EngineError> {
        self.ensure_session(&batch).await?;
        self.state = self.state.transition(TurnEvent::Begin)?.next;
        self.gate.begin_turn();
        tracing::debug!(size = batch.size, fingerprint = %batch.fingerprint, "turn started");

        let outcome = {
            let turn = self.backend.run_turn(&batch.prompt, &self.sink);
            tokio::pin!(turn);
            loop {
                tokio::select! {
                    biased;
                    result = &mut turn => break TurnOutcome::Done(result),
                    _ = cancel.cancelled() => break TurnOutcome::Aborted,
                    Some(command) = self.commands.recv() => match command {
                        TurnCommand::AbortTurn => break TurnOutcome::Aborted,
                        TurnCommand::SwapSession { handle } => {
                            match self.state.transition(TurnEvent::RequestSwap { handle }) {
                                Ok(t) => self.state = t.next,
                                Err(e) => tracing::warn!(error = %e, "swap request dropped"),
                            }
                        }
                    },
                }
            }
        };
        self.gate.end_turn();

        let event = match outcome {
            TurnOutcome::Done(Ok(())) => TurnEvent::Finish,
            TurnOutcome::Done(Err(e)) => {
                tracing::warn!(error = %e, "turn failed");
                let _ = self.sink.send(AgentMessage::Error {
                    message: e.to_string(),
                });
                self.discard_session().await;
                TurnEvent::Finish
            }
            TurnOutcome::Aborted => {
                tracing::info!("turn aborted");
                self.discard_session().await;
                TurnEvent::Abort
            }
        };
        let transition = self.state.transition(event)?;
        self.state = transition.next;
        if let Some(handle) = transition.apply_swap {
            self.apply_swap(handle).await?;
        }
        Ok(())
    }

    async fn ensure_session(&mut self, batch: &Batch) -> Result<(), EngineError> {
        let same = self
            .active
            .as_ref()
            .is_some_and(|a| a.fingerprint == batch.fingerprint);
        if same && !batch.isolate {
            return Ok(());
        }
        self.discard_session().await;
        if batch.isolate {
            self.resume = None;
        }
        self.start_session(&batch.mode).await
    }

    async fn start_session(&mut self, mode: &EnhancedMode) -> Result<(), EngineError> {
        let resume = self.resume.take();
        tracing::info!(fingerprint = %mode.fingerprint(), resume = resume.is_some(), "starting agent session");
        self.backend.start(mode, resume).await?;
        self.active = Some(ActiveSession {
            fingerprint: mode.fingerprint(),
            mode: mode.clone(),
        });
        Ok(())
    }

    /// Stop the current session, keeping its handle for the next start.
    async fn discard_session(&mut self) {
        if self.active.take().is_some() {
            self.resume = self.backend.stop().await;
            self.backend.reset_processors();
        }
    }

    async fn apply_swap(&mut self, handle: String) -> Result<(), EngineError> {
        tracing::info!(handle = %handle, "swapping agent session");
        match self.active.clone() {
            Some(active) => {
                self.discard_session().await;
                self.resume = Some(handle);
                self.start_session(&active.mode).await
            }
            None => {
                self.resume = Some(handle);
                Ok(())
            }
        }
    }
}

#[cfg(test)]
#[path = "turn_loop_tests.rs"]
mod tests;
