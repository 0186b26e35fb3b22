// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Who launched a session process

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StartedBy {
    /// Spawned by the daemon in response to a spawn request
    Daemon,
    /// Started by the user from a terminal and reported to the daemon
    External,
}

impl StartedBy {
    /// Value of the `--started-by` flag on the session command line
    pub fn as_flag(&self) -> &'static str {
        match self {
            StartedBy::Daemon => "daemon",
            StartedBy::External => "terminal",
        }
    }

    pub fn from_flag(flag: &str) -> Self {
        if flag == "daemon" {
            StartedBy::Daemon
        } else {
            StartedBy::External
        }
    }
}

impl fmt::Display for StartedBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StartedBy::Daemon => f.write_str("daemon"),
            StartedBy::External => f.write_str("external"),
        }
    }
}
