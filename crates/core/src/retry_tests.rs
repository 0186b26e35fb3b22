// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::cell::Cell;

fn fast(max_attempts: u32) -> RetryPolicy {
    RetryPolicy::new(max_attempts, Backoff::Fixed(Duration::from_millis(1)))
}

#[yare::parameterized(
    fixed_first   = { Backoff::Fixed(Duration::from_millis(50)), 1, 50 },
    fixed_later   = { Backoff::Fixed(Duration::from_millis(50)), 4, 50 },
    linear_first  = { Backoff::Linear { step: Duration::from_millis(100) }, 1, 100 },
    linear_third  = { Backoff::Linear { step: Duration::from_millis(100) }, 3, 300 },
    expo_first    = { Backoff::Exponential { base: Duration::from_millis(100), max: Duration::from_secs(1) }, 1, 100 },
    expo_third    = { Backoff::Exponential { base: Duration::from_millis(100), max: Duration::from_secs(1) }, 3, 400 },
    expo_capped   = { Backoff::Exponential { base: Duration::from_millis(100), max: Duration::from_secs(1) }, 10, 1000 },
)]
fn backoff_delay(backoff: Backoff, attempt: u32, expected_ms: u64) {
    assert_eq!(backoff.delay(attempt), Duration::from_millis(expected_ms));
}

#[test]
fn zero_attempts_is_clamped_to_one() {
    assert_eq!(RetryPolicy::new(0, Backoff::Fixed(Duration::ZERO)).max_attempts, 1);
}

#[tokio::test]
async fn succeeds_after_transient_failures() {
    let calls = Cell::new(0);
    let result: Result<u32, RetryError<String>> = with_retry(fast(5), |attempt| {
        calls.set(calls.get() + 1);
        async move {
            if attempt < 3 {
                Err(Attempt::Retry(format!("attempt {attempt}")))
            } else {
                Ok(attempt)
            }
        }
    })
    .await;

    assert_eq!(result.unwrap(), 3);
    assert_eq!(calls.get(), 3);
}

#[tokio::test]
async fn exhausts_after_max_attempts() {
    let calls = Cell::new(0);
    let result: Result<(), RetryError<String>> = with_retry(fast(3), |_| {
        calls.set(calls.get() + 1);
        async { Err(Attempt::Retry("busy".to_string())) }
    })
    .await;

    match result {
        Err(RetryError::Exhausted { attempts, last }) => {
            assert_eq!(attempts, 3);
            assert_eq!(last, "busy");
        }
        other => panic!("expected exhaustion, got {:?}", other),
    }
    assert_eq!(calls.get(), 3);
}

#[tokio::test]
async fn abort_stops_immediately() {
    let calls = Cell::new(0);
    let result: Result<(), RetryError<String>> = with_retry(fast(5), |_| {
        calls.set(calls.get() + 1);
        async { Err(Attempt::Abort("fatal".to_string())) }
    })
    .await;

    assert!(matches!(result, Err(RetryError::Aborted(ref e)) if e == "fatal"));
    assert_eq!(calls.get(), 1);
}

#[tokio::test]
async fn exhausted_error_message_names_retry_count() {
    let result: Result<(), RetryError<String>> =
        with_retry(fast(2), |_| async { Err(Attempt::Retry("x".to_string())) }).await;
    let message = result.unwrap_err().to_string();
    assert!(message.contains("failed after 2 retries"), "got: {message}");
}

#[test]
fn blocking_variant_shares_semantics() {
    let mut calls = 0;
    let result: Result<u32, RetryError<&str>> = retry_blocking(fast(4), |attempt| {
        calls += 1;
        if attempt < 2 {
            Err(Attempt::Retry("locked"))
        } else {
            Ok(attempt)
        }
    });
    assert_eq!(result.unwrap(), 2);
    assert_eq!(calls, 2);

    let exhausted: Result<(), RetryError<&str>> =
        retry_blocking(fast(2), |_| Err(Attempt::Retry("locked")));
    assert!(matches!(exhausted, Err(RetryError::Exhausted { attempts: 2, .. })));
}
