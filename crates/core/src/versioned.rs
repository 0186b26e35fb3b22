// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Optimistic-concurrency envelope for state synced with the relay.
//!
//! The relay holds the authoritative version. A writer presents the version
//! it believes current; the relay accepts only on an exact match.

use serde::{Deserialize, Serialize};

/// A value paired with the relay version it was observed at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Versioned<T> {
    pub value: T,
    pub version: u64,
}

impl<T> Versioned<T> {
    pub fn new(value: T, version: u64) -> Self {
        Self { value, version }
    }

    /// Adopt a newer server view. Versions never move backwards.
    pub fn rebase(&mut self, value: T, version: u64) -> bool {
        if version > self.version {
            self.value = value;
            self.version = version;
            true
        } else {
            false
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Versioned<U> {
        Versioned {
            value: f(self.value),
            version: self.version,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rebase_only_moves_forward() {
        let mut current = Versioned::new("a", 3);
        assert!(!current.rebase("stale", 2));
        assert!(!current.rebase("same", 3));
        assert_eq!(current, Versioned::new("a", 3));

        assert!(current.rebase("b", 5));
        assert_eq!(current, Versioned::new("b", 5));
    }
}
