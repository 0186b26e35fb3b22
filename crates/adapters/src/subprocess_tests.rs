// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tokio::process::Command;

#[tokio::test]
async fn run_with_timeout_success() {
    let mut cmd = Command::new("echo");
    cmd.arg("hello");
    let output = run_with_timeout(cmd, Duration::from_secs(5), "echo")
        .await
        .unwrap();
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "hello");
}

#[tokio::test]
async fn run_with_timeout_nonzero_exit_is_not_an_error() {
    let cmd = Command::new("false");
    let output = run_with_timeout(cmd, Duration::from_secs(5), "false")
        .await
        .unwrap();
    assert!(!output.status.success());
}

#[tokio::test]
async fn run_with_timeout_io_error() {
    let cmd = Command::new("/nonexistent/binary");
    let err = run_with_timeout(cmd, Duration::from_secs(5), "nonexistent")
        .await
        .unwrap_err();
    assert!(err.starts_with("nonexistent failed:"), "got: {}", err);
}

#[tokio::test]
async fn run_with_timeout_timeout_elapsed() {
    let mut cmd = Command::new("sleep");
    cmd.arg("10");
    let err = run_with_timeout(cmd, Duration::from_millis(100), "test sleep")
        .await
        .unwrap_err();
    assert!(err.contains("timed out"), "got: {}", err);
    assert!(err.contains("test sleep"), "got: {}", err);
}

#[yare::parameterized(
    plain        = { "claude", "claude" },
    flag         = { "--started-by", "--started-by" },
    path         = { "/usr/bin/happy", "/usr/bin/happy" },
    space        = { "my dir", "'my dir'" },
    single_quote = { "it's", r#"'it'\''s'"# },
    empty        = { "", "''" },
    dollar       = { "$HOME", "'$HOME'" },
)]
fn quote(input: &str, expected: &str) {
    assert_eq!(shell_quote(input), expected);
}

#[tokio::test]
async fn shell_join_round_trips_through_sh() {
    let argv = vec![
        "printf".to_string(),
        "%s|".to_string(),
        "a b".to_string(),
        "it's".to_string(),
    ];
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(shell_join(&argv));
    let output = run_with_timeout(cmd, Duration::from_secs(5), "sh").await.unwrap();
    assert_eq!(String::from_utf8_lossy(&output.stdout), "a b|it's|");
}
