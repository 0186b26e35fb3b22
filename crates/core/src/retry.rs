// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded retry with backoff.
//!
//! Shared by the versioned update protocol and daemon lock acquisition.

use std::future::Future;
use std::time::Duration;
use thiserror::Error;

/// Delay schedule between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    Fixed(Duration),
    /// `step * attempt`
    Linear { step: Duration },
    /// `base * 2^(attempt-1)`, capped at `max`
    Exponential { base: Duration, max: Duration },
}

impl Backoff {
    /// Delay after the given (1-based) failed attempt.
    pub fn delay(&self, attempt: u32) -> Duration {
        match *self {
            Backoff::Fixed(d) => d,
            Backoff::Linear { step } => step.saturating_mul(attempt),
            Backoff::Exponential { base, max } => {
                let shift = attempt.saturating_sub(1).min(16);
                base.saturating_mul(1u32 << shift).min(max)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Backoff,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Backoff) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    /// Policy for versioned updates: 3 attempts, exponential from 100ms.
    pub fn versioned_update() -> Self {
        Self::new(
            3,
            Backoff::Exponential {
                base: Duration::from_millis(100),
                max: Duration::from_secs(2),
            },
        )
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::versioned_update()
    }
}

/// Outcome of a single failed attempt.
#[derive(Debug)]
pub enum Attempt<E> {
    /// Try again after the backoff delay
    Retry(E),
    /// Stop immediately and surface the error
    Abort(E),
}

#[derive(Debug, Error)]
pub enum RetryError<E: std::fmt::Display> {
    #[error("{0}")]
    Aborted(E),
    #[error("failed after {attempts} retries: {last}")]
    Exhausted { attempts: u32, last: E },
}

/// Run `op` until it succeeds, aborts, or the policy's attempts run out.
///
/// `op` receives the 1-based attempt number.
pub async fn with_retry<T, E, F, Fut>(policy: RetryPolicy, mut op: F) -> Result<T, RetryError<E>>
where
    E: std::fmt::Display,
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, Attempt<E>>>,
{
    let mut attempt = 1;
    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(Attempt::Abort(e)) => return Err(RetryError::Aborted(e)),
            Err(Attempt::Retry(e)) => {
                if attempt >= policy.max_attempts {
                    return Err(RetryError::Exhausted {
                        attempts: attempt,
                        last: e,
                    });
                }
                let delay = policy.backoff.delay(attempt);
                tracing::debug!(attempt, delay_ms = delay.as_millis() as u64, error = %e, "retrying");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

/// Blocking twin of [`with_retry`] for synchronous file-lock callers.
pub fn retry_blocking<T, E, F>(policy: RetryPolicy, mut op: F) -> Result<T, RetryError<E>>
where
    E: std::fmt::Display,
    F: FnMut(u32) -> Result<T, Attempt<E>>,
{
    let mut attempt = 1;
    loop {
        match op(attempt) {
            Ok(value) => return Ok(value),
            Err(Attempt::Abort(e)) => return Err(RetryError::Aborted(e)),
            Err(Attempt::Retry(e)) => {
                if attempt >= policy.max_attempts {
                    return Err(RetryError::Exhausted {
                        attempts: attempt,
                        last: e,
                    });
                }
                std::thread::sleep(policy.backoff.delay(attempt));
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod tests;
