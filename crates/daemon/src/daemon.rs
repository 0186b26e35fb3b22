// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The daemon instance: owns the registry and every on-disk store.
//!
//! Behaviour is split across modules by concern (`spawn`, `webhook`,
//! `stop`, `lifecycle::reattach`, `lifecycle::heartbeat`), each adding an
//! `impl` block here.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use hp_adapters::{ProcessInspector, SessionAdapter};
use hp_storage::{DaemonStateFile, MarkerStore, SettingsStore};
use hp_sync::ShutdownSource;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::config::DaemonConfig;
use crate::registry::{ChildSummary, DaemonRegistry};

/// First shutdown request wins; later ones are logged and ignored.
#[derive(Default)]
pub struct ShutdownSignal {
    token: CancellationToken,
    source: Mutex<Option<ShutdownSource>>,
}

impl ShutdownSignal {
    pub fn request(&self, source: ShutdownSource) -> bool {
        let mut current = self.source.lock();
        if let Some(first) = *current {
            tracing::debug!(?source, ?first, "shutdown already requested");
            return false;
        }
        tracing::info!(?source, "shutdown requested");
        *current = Some(source);
        self.token.cancel();
        true
    }

    pub fn source(&self) -> Option<ShutdownSource> {
        *self.source.lock()
    }

    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn is_requested(&self) -> bool {
        self.token.is_cancelled()
    }
}

pub struct Daemon<S, P> {
    pub(crate) config: DaemonConfig,
    pub(crate) pid: u32,
    pub(crate) registry: Arc<DaemonRegistry>,
    pub(crate) markers: MarkerStore,
    pub(crate) settings: SettingsStore,
    pub(crate) state_file: DaemonStateFile,
    pub(crate) sessions: S,
    pub(crate) inspector: Arc<P>,
    pub(crate) shutdown: ShutdownSignal,
    pub(crate) heartbeat_running: AtomicBool,
}

impl<S, P> Daemon<S, P>
where
    S: SessionAdapter,
    P: ProcessInspector,
{
    pub fn new(config: DaemonConfig, sessions: S, inspector: Arc<P>) -> Self {
        let home = config.happy_home_dir.clone();
        Self {
            pid: std::process::id(),
            registry: Arc::new(DaemonRegistry::new()),
            markers: MarkerStore::new(&home),
            settings: SettingsStore::new(&home),
            state_file: DaemonStateFile::new(&home),
            config,
            sessions,
            inspector,
            shutdown: ShutdownSignal::default(),
            heartbeat_running: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &DaemonConfig {
        &self.config
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn registry(&self) -> &DaemonRegistry {
        &self.registry
    }

    pub fn markers(&self) -> &MarkerStore {
        &self.markers
    }

    pub fn state_file(&self) -> &DaemonStateFile {
        &self.state_file
    }

    pub fn inspector(&self) -> &P {
        &self.inspector
    }

    pub fn request_shutdown(&self, source: ShutdownSource) -> bool {
        self.shutdown.request(source)
    }

    pub fn shutdown_signal(&self) -> &ShutdownSignal {
        &self.shutdown
    }

    pub fn list_children(&self) -> Vec<ChildSummary> {
        self.registry
            .list()
            .iter()
            .map(|s| s.summary())
            .collect()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use hp_adapters::{FakeProcessInspector, FakeSessionAdapter};
    use std::time::Duration;
    use tempfile::TempDir;

    pub(crate) type TestDaemon = Daemon<FakeSessionAdapter, FakeProcessInspector>;

    pub(crate) struct Harness {
        pub daemon: Arc<TestDaemon>,
        pub sessions: FakeSessionAdapter,
        pub inspector: FakeProcessInspector,
        pub dir: TempDir,
    }

    /// Daemon over fakes, spawning into a fake tmux session.
    pub(crate) fn harness() -> Harness {
        harness_with(|_| {})
    }

    pub(crate) fn harness_with(configure: impl FnOnce(&mut DaemonConfig)) -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let mut config = DaemonConfig::for_home(dir.path());
        config.tmux_session = Some("happy".to_string());
        config.webhook_timeout = Duration::from_millis(200);
        configure(&mut config);
        let sessions = FakeSessionAdapter::new();
        let inspector = FakeProcessInspector::new();
        let daemon = Arc::new(Daemon::new(
            config,
            sessions.clone(),
            Arc::new(inspector.clone()),
        ));
        Harness {
            daemon,
            sessions,
            inspector,
            dir,
        }
    }
}

#[cfg(test)]
#[path = "daemon_tests.rs"]
mod tests;
