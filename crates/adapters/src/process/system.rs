// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! sysinfo/nix-backed process inspector

use super::{ProcessInspector, SignalError};
use nix::errno::Errno;
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid as NixPid;
use sysinfo::{Pid, ProcessRefreshKind, System, UpdateKind};

#[derive(Clone, Copy, Default)]
pub struct SystemProcessInspector;

impl SystemProcessInspector {
    pub fn new() -> Self {
        Self
    }
}

fn nix_pid(pid: u32) -> Option<NixPid> {
    // pid 0 and negative values address process groups
    i32::try_from(pid).ok().filter(|p| *p > 0).map(NixPid::from_raw)
}

impl ProcessInspector for SystemProcessInspector {
    fn is_alive(&self, pid: u32) -> bool {
        let Some(target) = nix_pid(pid) else {
            return false;
        };
        match kill(target, None) {
            Ok(()) => true,
            // Exists but owned by someone else
            Err(Errno::EPERM) => true,
            Err(_) => false,
        }
    }

    fn command_line(&self, pid: u32) -> Option<String> {
        nix_pid(pid)?;
        // Fresh System per lookup: a cached table can hold a dead pid's
        // entry, which is exactly the PID-reuse case we must not trust
        let mut sys = System::new();
        let sys_pid = Pid::from(pid as usize);
        sys.refresh_process_specifics(
            sys_pid,
            ProcessRefreshKind::new().with_cmd(UpdateKind::Always),
        );
        let process = sys.process(sys_pid)?;
        let cmd = process.cmd();
        if cmd.is_empty() {
            // Kernel threads and zombies have no argv
            return Some(process.name().to_string());
        }
        Some(cmd.join(" "))
    }

    fn terminate(&self, pid: u32) -> Result<(), SignalError> {
        let target = nix_pid(pid).ok_or(SignalError::NoSuchProcess(pid))?;
        kill(target, Signal::SIGTERM).map_err(|errno| match errno {
            Errno::ESRCH => SignalError::NoSuchProcess(pid),
            Errno::EPERM => SignalError::PermissionDenied(pid),
            other => SignalError::Failed {
                pid,
                message: other.desc().to_string(),
            },
        })
    }
}

#[cfg(test)]
#[path = "system_tests.rs"]
mod tests;
