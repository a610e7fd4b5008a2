// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dangerous-value pattern detection (spec.md §4.2, §4.4).
//!
//! Grounded on `shell_security::ShellSecurityValidator`'s injection-pattern
//! regex set, narrowed to the specific list spec.md names: shell
//! metacharacters (`; && || | $(...) `` ` `` redirects) and the command
//! tokens `rm`, `dd`, `mkfs`, `exec`, `eval`. A value's quoted substrings
//! are stripped before matching, so a metacharacter that only ever
//! appears inside a quoted string (and is therefore inert to the shell)
//! does not trip detection (spec.md §8 boundary case).

use regex::Regex;
use std::sync::OnceLock;

#[allow(clippy::expect_used)]
fn metacharacter_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            r";",
            r"&&",
            r"\|\|",
            r"\|",
            r"\$\([^)]*\)",
            r"`[^`]*`",
            r">",
            r"<",
        ]
        .iter()
        .map(|p| Regex::new(p).expect("static pattern compiles"))
        .collect()
    })
}

#[allow(clippy::expect_used)]
fn command_token_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [r"\brm\b", r"\bdd\b", r"\bmkfs\b", r"\bexec\b", r"\beval\b"]
            .iter()
            .map(|p| Regex::new(p).expect("static pattern compiles"))
            .collect()
    })
}

/// Removes single- and double-quoted substrings (including their
/// delimiters) from `value`, so characters that are inert to a shell
/// inside quotes don't trigger detection.
fn strip_quoted_substrings(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\'' || c == '"' {
            let mut inner = String::new();
            let mut closed = false;
            for next in chars.by_ref() {
                if next == c {
                    closed = true;
                    break;
                }
                inner.push(next);
            }
            if !closed {
                // Unterminated quote: nothing was actually quoted, so keep
                // the opening character and everything after it literal
                // rather than silently dropping it from the scan.
                out.push(c);
                out.push_str(&inner);
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Scans `value` for any dangerous pattern, returning the pattern text
/// that matched (for the error's `pattern` field) or `None` if clean.
pub fn scan_dangerous(value: &str) -> Option<String> {
    let stripped = strip_quoted_substrings(value);
    for pattern in metacharacter_patterns().iter().chain(command_token_patterns()) {
        if pattern.is_match(&stripped) {
            return Some(pattern.as_str().to_string());
        }
    }
    None
}
