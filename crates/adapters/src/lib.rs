// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
// Enable coverage(off) attribute for excluding test infrastructure
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Adapters for external I/O

pub mod crypto;
mod env;
pub mod process;
pub mod relay;
pub mod session;
pub mod subprocess;
pub mod traced;

pub use crypto::{CryptoError, EncryptionVariant, Encryptor};
pub use process::{ProcessInspector, SignalError, SystemProcessInspector};
pub use relay::{RelayChannel, RelayError};
pub use session::{MultiplexerProcess, SessionAdapter, SessionError, TmuxAdapter};
pub use traced::TracedSession;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub use crypto::FakeEncryptor;
#[cfg(any(test, feature = "test-support"))]
pub use process::{FakeProcessInspector, SignalCall};
#[cfg(any(test, feature = "test-support"))]
pub use relay::{FakeRelay, RelayCall};
#[cfg(any(test, feature = "test-support"))]
pub use session::{FakeSessionAdapter, SessionCall};
