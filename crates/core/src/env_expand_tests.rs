// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn lookup(name: &str) -> Option<String> {
    match name {
        "HOME" => Some("/home/dev".to_string()),
        "TOKEN" => Some("secret".to_string()),
        "EMPTY" => Some(String::new()),
        _ => None,
    }
}

#[yare::parameterized(
    no_placeholder        = { "plain", "plain" },
    simple                = { "${HOME}/bin", "/home/dev/bin" },
    twice                 = { "${TOKEN}-${TOKEN}", "secret-secret" },
    default_unused        = { "${TOKEN:-fallback}", "secret" },
    default_used          = { "${MISSING:-fallback}", "fallback" },
    default_on_empty      = { "${EMPTY:-fallback}", "fallback" },
    empty_without_default = { "x${EMPTY}y", "xy" },
    unknown_kept          = { "Bearer ${MISSING}", "Bearer ${MISSING}" },
    unterminated          = { "abc ${HOME", "abc ${HOME" },
    empty_default         = { "${MISSING:-}", "" },
)]
fn expand(input: &str, expected: &str) {
    assert_eq!(expand_env_value(input, lookup), expected);
}

#[yare::parameterized(
    plain        = { "abc", false },
    placeholder  = { "${X}", true },
    embedded     = { "pre-${X}-post", true },
    unterminated = { "${X", false },
    dollar_only  = { "$X", false },
)]
fn detects_placeholders(input: &str, expected: bool) {
    assert_eq!(has_unexpanded_placeholder(input), expected);
}

#[test]
fn expand_map_expands_every_value() {
    let vars = BTreeMap::from([
        ("A".to_string(), "${HOME}".to_string()),
        ("B".to_string(), "${NOPE}".to_string()),
    ]);
    let expanded = expand_env_map(&vars, lookup);
    assert_eq!(expanded["A"], "/home/dev");
    assert_eq!(expanded["B"], "${NOPE}");
}
