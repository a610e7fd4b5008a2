// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Variable expansion (spec.md §4.1).
//!
//! Substitution syntax is `%{name}`. Resolution order within a scope:
//! `from_env` entries, then `vars` (may reference earlier `vars` and
//! `from_env`), then `env` (may reference `vars`), then `verify_files`.
//! Grounded on `oj-runbook::template`'s regex-based placeholder
//! substitution, generalized to the stricter "undefined is an error"
//! contract spec.md calls for (the teacher leaves unknown variables
//! as-is; this system cannot afford to leak a literal `%{secret}` into a
//! command line).

use std::collections::{HashMap, HashSet};
use warden_core::{Error, Result};

/// Bounded iteration depth for fixed-point resolution (spec.md §4.1).
pub const MAX_EXPANSION_DEPTH: usize = 100;

/// One pass of `%{name}` substitution over `input`, given the set of names
/// that are *ever* going to be defined in this scope (`known_names`) and
/// the values resolved so far (`available`). Returns the substituted
/// string and whether anything in it actually changed this pass.
fn substitute_once(
    input: &str,
    known_names: &HashSet<&str>,
    available: &HashMap<String, String>,
    context: &str,
) -> Result<(String, bool)> {
    let chars: Vec<char> = input.chars().collect();
    let mut result = String::with_capacity(input.len());
    let mut changed = false;
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == '%' && i + 1 < chars.len() && chars[i + 1] == '{' {
            let mut j = i + 2;
            while j < chars.len() && chars[j] != '}' {
                j += 1;
            }
            if j >= chars.len() {
                return Err(Error::UnclosedReference {
                    context: context.to_string(),
                    text: input.to_string(),
                });
            }
            let name: String = chars[i + 2..j].iter().collect();
            match available.get(&name) {
                Some(value) => {
                    result.push_str(value);
                    changed = true;
                }
                None if known_names.contains(name.as_str()) => {
                    // Not resolved yet this pass; leave as-is for the next pass.
                    result.push_str(&chars[i..=j].iter().collect::<String>());
                }
                None => {
                    return Err(Error::UndefinedVariable {
                        context: context.to_string(),
                        name,
                    });
                }
            }
            i = j + 1;
        } else {
            result.push(chars[i]);
            i += 1;
        }
    }
    Ok((result, changed))
}

fn contains_reference(input: &str) -> bool {
    input
        .as_bytes()
        .windows(2)
        .any(|w| w[0] == b'%' && w[1] == b'{')
}

/// Resolves every entry of `raw` against `base` (already-fully-resolved
/// bindings from an earlier scope) plus the entries of `raw` itself,
/// which may reference one another in any order. Jacobi-style fixed-point
/// iteration: every pass reads last pass's snapshot, so the result does
/// not depend on `HashMap` iteration order.
pub fn resolve_map(
    raw: &HashMap<String, String>,
    base: &HashMap<String, String>,
    context: &str,
) -> Result<HashMap<String, String>> {
    let known_names: HashSet<&str> = base.keys().map(String::as_str).chain(raw.keys().map(String::as_str)).collect();

    let mut current: HashMap<String, String> = raw.clone();
    for _ in 0..MAX_EXPANSION_DEPTH {
        let mut available = base.clone();
        available.extend(current.iter().map(|(k, v)| (k.clone(), v.clone())));

        let mut next = HashMap::with_capacity(current.len());
        let mut any_changed = false;
        for (key, value) in &current {
            let (expanded, changed) = substitute_once(value, &known_names, &available, context)?;
            any_changed |= changed;
            next.insert(key.clone(), expanded);
        }
        current = next;
        if !any_changed {
            break;
        }
    }

    for value in current.values() {
        if contains_reference(value) {
            return Err(Error::CircularReference {
                context: context.to_string(),
            });
        }
    }

    Ok(current)
}

/// Resolves a list of strings (e.g. `verify_files`) against a fully
/// resolved scope — list entries never reference each other.
pub fn resolve_list(
    raw: &[String],
    base: &HashMap<String, String>,
    context: &str,
) -> Result<Vec<String>> {
    let known_names: HashSet<&str> = base.keys().map(String::as_str).collect();
    raw.iter()
        .map(|entry| {
            let mut value = entry.clone();
            for _ in 0..MAX_EXPANSION_DEPTH {
                let (expanded, changed) = substitute_once(&value, &known_names, base, context)?;
                value = expanded;
                if !changed {
                    break;
                }
            }
            if contains_reference(&value) {
                return Err(Error::CircularReference {
                    context: context.to_string(),
                });
            }
            Ok(value)
        })
        .collect()
}
