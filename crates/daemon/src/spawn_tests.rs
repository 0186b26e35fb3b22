// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::daemon::test_support::{harness, Harness};
use hp_adapters::SessionCall;
use hp_core::AiBackendProfile;
use serde_json::json;
use yare::parameterized;

const SPAWNED_CMD: &str = "happy claude --happy-starting-mode remote --started-by daemon";

fn tmux_spawns(h: &Harness) -> Vec<(Vec<String>, Vec<(String, String)>)> {
    h.sessions
        .calls()
        .into_iter()
        .filter_map(|c| match c {
            SessionCall::Spawn { argv, env, .. } => Some((argv, env)),
            _ => None,
        })
        .collect()
}

/// Spawn while a concurrent task plays the session reporting in.
async fn spawn_and_report(h: &Harness, request: &SpawnRequest) -> SpawnOutcome {
    let daemon = Arc::clone(&h.daemon);
    let home = h.dir.path().to_path_buf();
    let report = async move {
        while !daemon.registry().contains(50_000) {
            tokio::task::yield_now().await;
        }
        daemon.on_session_webhook(
            SessionId::new("s-new"),
            json!({"hostPid": 50_000, "happyHomeDir": home, "startedBy": "daemon"}),
        )
    };
    let (outcome, reported) = tokio::join!(h.daemon.spawn_session(request), report);
    assert!(reported.is_some());
    outcome
}

fn codex_homes(h: &Harness) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(h.dir.path().join("tmp")) else {
        return Vec::new();
    };
    entries
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with("codex-home-"))
        })
        .collect()
}

fn codex_request(h: &Harness) -> SpawnRequest {
    SpawnRequest {
        agent: Agent::Codex,
        token: Some("{\"tokens\":{}}".to_string()),
        ..SpawnRequest::new(h.dir.path())
    }
}

#[tokio::test]
async fn missing_directory_requires_approval_without_side_effects() {
    let h = harness();
    let missing = h.dir.path().join("does/not/exist");

    let outcome = h.daemon.spawn_session(&SpawnRequest::new(&missing)).await;

    assert_eq!(
        outcome,
        SpawnOutcome::RequestToApproveDirectoryCreation {
            directory: missing.clone()
        }
    );
    assert!(!missing.exists());
    assert!(h.sessions.calls().is_empty());
    assert!(h.daemon.registry().is_empty());
    assert!(h.daemon.markers().list().is_empty());
}

#[tokio::test]
async fn spawn_succeeds_when_session_reports_in() {
    let h = harness();
    h.inspector.insert(50_000, SPAWNED_CMD);
    let request = SpawnRequest {
        token: Some("tok".to_string()),
        ..SpawnRequest::new(h.dir.path())
    };

    let outcome = spawn_and_report(&h, &request).await;

    assert_eq!(
        outcome,
        SpawnOutcome::Success {
            session_id: SessionId::new("s-new")
        }
    );
    let tracked = h.daemon.registry().get(50_000).unwrap();
    assert_eq!(tracked.phase, crate::registry::SessionPhase::Running);
    assert_eq!(tracked.started_by, StartedBy::Daemon);
    assert!(tracked.tmux_target.is_some());
    assert!(!tracked.owned_child);

    let marker = h.daemon.markers().read(50_000).unwrap();
    assert_eq!(marker.session_id, "s-new");
    assert_eq!(
        marker.process_command_hash.as_deref(),
        Some(hp_storage::hash_process_command(SPAWNED_CMD).as_str())
    );
    assert_eq!(h.daemon.registry().awaiter_count(), 0);

    let spawns = tmux_spawns(&h);
    assert_eq!(spawns.len(), 1);
    let (argv, env) = &spawns[0];
    assert_eq!(argv.join(" "), SPAWNED_CMD);
    assert!(env.contains(&("CLAUDE_CODE_OAUTH_TOKEN".to_string(), "tok".to_string())));
}

#[tokio::test]
async fn resume_passes_session_id() {
    let h = harness();
    let request = SpawnRequest {
        session_id: Some(SessionId::new("old")),
        ..SpawnRequest::new(h.dir.path())
    };

    spawn_and_report(&h, &request).await;

    let (argv, _) = &tmux_spawns(&h)[0];
    assert_eq!(&argv[argv.len() - 2..], ["--resume", "old"]);
}

#[tokio::test]
async fn webhook_timeout_leaves_pid_tracked() {
    let h = harness();
    let request = SpawnRequest {
        approved_new_directory_creation: true,
        ..SpawnRequest::new(h.dir.path().join("new-project"))
    };

    let outcome = h.daemon.spawn_session(&request).await;

    let SpawnOutcome::Error { error_message } = outcome else {
        panic!("expected error, got {outcome:?}");
    };
    assert!(error_message.contains("50000"), "{error_message}");
    assert!(h.dir.path().join("new-project").is_dir());

    let tracked = h.daemon.registry().get(50_000).unwrap();
    assert!(tracked.session_id.is_none());
    assert!(tracked.error.is_some());
    assert_eq!(h.daemon.registry().awaiter_count(), 0);
}

#[tokio::test]
async fn late_report_still_upgrades_timed_out_session() {
    let h = harness();
    h.daemon.spawn_session(&SpawnRequest::new(h.dir.path())).await;

    let session = h
        .daemon
        .on_session_webhook(
            SessionId::new("late"),
            json!({"hostPid": 50_000, "happyHomeDir": h.dir.path()}),
        )
        .unwrap();

    assert_eq!(session.started_by, StartedBy::Daemon);
    assert!(session.error.is_none());
    assert_eq!(h.daemon.registry().find("late").map(|s| s.pid), Some(50_000));
}

#[tokio::test]
async fn directory_under_a_file_is_classified() {
    let h = harness();
    let file = h.dir.path().join("plain-file");
    std::fs::write(&file, "x").unwrap();

    let request = SpawnRequest {
        approved_new_directory_creation: true,
        ..SpawnRequest::new(file.join("sub"))
    };
    let outcome = h.daemon.spawn_session(&request).await;

    let SpawnOutcome::Error { error_message } = outcome else {
        panic!("expected error, got {outcome:?}");
    };
    assert!(error_message.contains("is a file"), "{error_message}");
    assert!(h.sessions.calls().is_empty());
}

#[tokio::test]
async fn tmux_failure_is_reported() {
    let h = harness();
    h.sessions.fail_spawn("no server");

    let outcome = h.daemon.spawn_session(&SpawnRequest::new(h.dir.path())).await;

    assert!(matches!(outcome, SpawnOutcome::Error { .. }));
    assert!(h.daemon.registry().is_empty());
}

#[tokio::test]
async fn active_profile_is_used_when_request_has_none() {
    let h = harness();
    h.daemon
        .settings
        .update(|mut s| {
            s.profiles.push(AiBackendProfile {
                id: "p1".to_string(),
                name: "Custom".to_string(),
                environment_variables: [(
                    "ANTHROPIC_BASE_URL".to_string(),
                    "${HP_SPAWN_TEST_UNSET:-https://proxy.local}".to_string(),
                )]
                .into(),
            });
            s.active_profile_id = Some("p1".to_string());
            s
        })
        .unwrap();

    spawn_and_report(&h, &SpawnRequest::new(h.dir.path())).await;

    let (_, env) = &tmux_spawns(&h)[0];
    assert!(env.contains(&(
        "ANTHROPIC_BASE_URL".to_string(),
        "https://proxy.local".to_string()
    )));
}

#[tokio::test]
async fn unexpanded_auth_variable_fails_before_spawning() {
    let h = harness();
    let request = SpawnRequest {
        environment_variables: [(
            "ANTHROPIC_API_KEY".to_string(),
            "${HP_SPAWN_TEST_MISSING_KEY}".to_string(),
        )]
        .into(),
        ..SpawnRequest::new(h.dir.path())
    };

    let outcome = h.daemon.spawn_session(&request).await;

    let SpawnOutcome::Error { error_message } = outcome else {
        panic!("expected error, got {outcome:?}");
    };
    assert!(error_message.contains("ANTHROPIC_API_KEY"));
    assert!(h.sessions.calls().is_empty());
}

#[tokio::test]
async fn codex_token_lands_in_private_home() {
    let h = harness();

    spawn_and_report(&h, &codex_request(&h)).await;

    let (argv, env) = &tmux_spawns(&h)[0];
    assert_eq!(argv[1], "codex");
    let codex_home = env
        .iter()
        .find(|(k, _)| k == "CODEX_HOME")
        .map(|(_, v)| PathBuf::from(v))
        .unwrap();
    assert_eq!(
        std::fs::read_to_string(codex_home.join("auth.json")).unwrap(),
        "{\"tokens\":{}}"
    );
}

#[tokio::test]
async fn tmux_codex_session_tracks_its_home() {
    let h = harness();

    spawn_and_report(&h, &codex_request(&h)).await;

    let homes = codex_homes(&h);
    assert_eq!(homes.len(), 1);
    let tracked = h.daemon.registry().get(50_000).unwrap();
    assert_eq!(tracked.codex_home.as_ref(), Some(&homes[0]));
}

#[tokio::test]
async fn failed_codex_spawn_leaves_no_credentials() {
    let h = harness();
    h.sessions.fail_spawn("no server");

    let outcome = h.daemon.spawn_session(&codex_request(&h)).await;

    assert!(matches!(outcome, SpawnOutcome::Error { .. }), "{outcome:?}");
    assert!(codex_homes(&h).is_empty());
}

#[tokio::test]
async fn rejected_codex_environment_leaves_no_credentials() {
    let h = harness();
    let request = SpawnRequest {
        environment_variables: [(
            "OPENAI_API_KEY".to_string(),
            "${HP_SPAWN_TEST_MISSING_KEY}".to_string(),
        )]
        .into(),
        ..codex_request(&h)
    };

    let outcome = h.daemon.spawn_session(&request).await;

    let SpawnOutcome::Error { error_message } = outcome else {
        panic!("expected error, got {outcome:?}");
    };
    assert!(error_message.contains("OPENAI_API_KEY"));
    assert!(codex_homes(&h).is_empty());
}

#[tokio::test]
async fn early_self_report_is_kept_when_spawn_returns() {
    let h = harness();
    // The pane reports in before the multiplexer call has returned
    h.daemon.on_session_webhook(
        SessionId::new("s-early"),
        json!({"hostPid": 50_000, "happyHomeDir": h.dir.path(), "startedBy": "daemon"}),
    );

    let outcome = h.daemon.spawn_session(&SpawnRequest::new(h.dir.path())).await;

    assert_eq!(
        outcome,
        SpawnOutcome::Success {
            session_id: SessionId::new("s-early")
        }
    );
    let tracked = h.daemon.registry().get(50_000).unwrap();
    assert_eq!(tracked.session_id, Some(SessionId::new("s-early")));
    assert_eq!(tracked.phase, crate::registry::SessionPhase::Running);
    assert_eq!(tracked.started_by, StartedBy::Daemon);
    assert!(tracked.tmux_target.is_some());
    assert_eq!(h.daemon.registry().awaiter_count(), 0);
    assert_eq!(
        h.daemon.list_children()[0].happy_session_id,
        Some(SessionId::new("s-early"))
    );
}

fn map(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[test]
fn auth_tokens_cannot_be_shadowed_by_profile() {
    let auth = map(&[("CLAUDE_CODE_OAUTH_TOKEN", "real")]);
    let profile = map(&[("CLAUDE_CODE_OAUTH_TOKEN", "profile"), ("MODEL", "opus")]);

    let env = resolve_environment(&auth, &profile, |_| None).unwrap();

    assert_eq!(env["CLAUDE_CODE_OAUTH_TOKEN"], "real");
    assert_eq!(env["MODEL"], "opus");
}

#[test]
fn profile_placeholders_expand_against_lookup() {
    let profile = map(&[("OPENAI_API_KEY", "${KEY}"), ("URL", "${BASE:-http://x}/v1")]);
    let lookup = |name: &str| (name == "KEY").then(|| "sk-1".to_string());

    let env = resolve_environment(&BTreeMap::new(), &profile, lookup).unwrap();

    assert_eq!(env["OPENAI_API_KEY"], "sk-1");
    assert_eq!(env["URL"], "http://x/v1");
}

#[test]
fn unexpanded_non_auth_variables_are_allowed() {
    let profile = map(&[("CUSTOM", "${NOPE}")]);
    let env = resolve_environment(&BTreeMap::new(), &profile, |_| None).unwrap();
    assert_eq!(env["CUSTOM"], "${NOPE}");
}

#[parameterized(
    eacces = { Errno::EACCES, "permission denied" },
    eperm = { Errno::EPERM, "permission denied" },
    enospc = { Errno::ENOSPC, "no space left" },
    erofs = { Errno::EROFS, "read-only" },
    enotdir = { Errno::ENOTDIR, "is a file" },
    other = { Errno::EIO, "system error" },
)]
fn directory_errors_are_actionable(errno: Errno, expected: &str) {
    let err = io::Error::from_raw_os_error(errno as i32);
    let message = classify_directory_error(Path::new("/x"), &err).to_string();
    assert!(message.contains(expected), "{message}");
    assert!(message.contains("/x"), "{message}");
}

#[test]
fn outcome_wire_shapes() {
    let cases = [
        (
            SpawnOutcome::Success {
                session_id: SessionId::new("s"),
            },
            json!({"type": "success", "sessionId": "s"}),
        ),
        (
            SpawnOutcome::RequestToApproveDirectoryCreation {
                directory: PathBuf::from("/d"),
            },
            json!({"type": "requestToApproveDirectoryCreation", "directory": "/d"}),
        ),
        (
            SpawnOutcome::Error {
                error_message: "boom".to_string(),
            },
            json!({"type": "error", "errorMessage": "boom"}),
        ),
    ];
    for (outcome, expected) in cases {
        assert_eq!(serde_json::to_value(&outcome).unwrap(), expected);
    }
}

#[test]
fn request_accepts_minimal_body() {
    let request: SpawnRequest = serde_json::from_value(json!({"directory": "/p"})).unwrap();
    assert_eq!(request, SpawnRequest::new("/p"));
}

#[tokio::test]
async fn falls_back_to_direct_spawn_and_reaps_the_child() {
    let h = crate::daemon::test_support::harness_with(|config| {
        config.session_command = vec!["sh".to_string(), "-c".to_string(), "exit 0".to_string()];
    });
    h.sessions.set_available(false);

    let outcome = h.daemon.spawn_session(&SpawnRequest::new(h.dir.path())).await;

    assert!(matches!(outcome, SpawnOutcome::Error { .. }), "{outcome:?}");
    assert!(tmux_spawns(&h).is_empty());
    tokio::time::timeout(Duration::from_secs(5), async {
        while !h.daemon.registry().is_empty() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();
}
