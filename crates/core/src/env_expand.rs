// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `${VAR}` / `${VAR:-default}` placeholder expansion for profile variables.
//!
//! Unknown variables without a default are left verbatim so callers can
//! detect them with [`has_unexpanded_placeholder`].

use std::collections::BTreeMap;

/// Expand every placeholder in `value` using `lookup`.
pub fn expand_env_value(value: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            // Unterminated, keep the tail as-is
            out.push_str(&rest[start..]);
            return out;
        };
        let expr = &after[..end];
        let (name, default) = match expr.split_once(":-") {
            Some((name, default)) => (name, Some(default)),
            None => (expr, None),
        };

        match (lookup(name), default) {
            (Some(v), _) if !v.is_empty() || default.is_none() => out.push_str(&v),
            (_, Some(default)) => out.push_str(default),
            (None, None) => {
                out.push_str("${");
                out.push_str(expr);
                out.push('}');
            }
            // The guarded first arm always matches when there is no default
            (Some(_), None) => {}
        }
        rest = &after[end + 1..];
    }

    out.push_str(rest);
    out
}

/// Expand all values of an env map.
pub fn expand_env_map(
    vars: &BTreeMap<String, String>,
    lookup: impl Fn(&str) -> Option<String>,
) -> BTreeMap<String, String> {
    vars.iter()
        .map(|(k, v)| (k.clone(), expand_env_value(v, &lookup)))
        .collect()
}

/// True if `value` still contains a `${...}` placeholder.
pub fn has_unexpanded_placeholder(value: &str) -> bool {
    value
        .find("${")
        .is_some_and(|start| value[start..].contains('}'))
}

#[cfg(test)]
#[path = "env_expand_tests.rs"]
mod tests;
