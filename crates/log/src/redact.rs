// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Redacting handler (spec.md §4.11): rewrites record attributes and the
//! message, replacing matches of a configured sensitivity rule-set —
//! value patterns and sensitive key names — with the literal `[REDACTED]`.
//! If redaction itself fails, the *unredacted* record is forwarded to a
//! failure logger that must never include the webhook sink.

use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::warn;
use warden_core::{Error, Handler, HandlerError, Level, LogRecord, Result};

const PLACEHOLDER: &str = "[REDACTED]";

/// A compiled sensitivity rule-set: regexes matched against values, and
/// key names (case-insensitive) whose value is always replaced outright.
pub struct RedactionRules {
    value_patterns: Vec<Regex>,
    sensitive_keys: Vec<String>,
}

impl RedactionRules {
    pub fn new(value_patterns: &[String], sensitive_keys: &[String]) -> Result<Self> {
        let compiled = value_patterns
            .iter()
            .map(|p| Regex::new(p).map_err(|e| Error::ConfigInvalid(format!("invalid redaction pattern {p:?}: {e}"))))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            value_patterns: compiled,
            sensitive_keys: sensitive_keys.iter().map(|k| k.to_lowercase()).collect(),
        })
    }

    /// The default rule-set: common secret-bearing key names, matched
    /// case-insensitively, plus no built-in value patterns (those are
    /// configuration-specific and supplied by the caller).
    pub fn defaults() -> Self {
        Self {
            value_patterns: Vec::new(),
            sensitive_keys: vec!["password".to_string(), "token".to_string(), "api_key".to_string(), "secret".to_string()],
        }
    }

    fn is_sensitive_key(&self, key: &str) -> bool {
        let lower = key.to_lowercase();
        self.sensitive_keys.iter().any(|k| lower.contains(k.as_str()))
    }

    fn redact_text(&self, text: &str) -> String {
        let mut out = text.to_string();
        for pattern in &self.value_patterns {
            out = pattern.replace_all(&out, PLACEHOLDER).into_owned();
        }
        out
    }
}

/// Wraps one downstream handler (typically a [`crate::fanout::MultiSinkHandler`])
/// with redaction, and a separate failure logger used only when redaction
/// itself cannot proceed.
pub struct RedactingHandler {
    inner: Box<dyn Handler>,
    failure_logger: Box<dyn Handler>,
    rules: RedactionRules,
}

impl RedactingHandler {
    pub fn new(inner: Box<dyn Handler>, failure_logger: Box<dyn Handler>, rules: RedactionRules) -> Self {
        Self {
            inner,
            failure_logger,
            rules,
        }
    }

    /// Rewrites `record`'s message and attributes. Fails if an attribute
    /// value is a nested object or array: the rule-set only scans scalar
    /// values, so a nested structure cannot be guaranteed scrubbed.
    fn redact(&self, record: &LogRecord) -> std::result::Result<LogRecord, String> {
        let message = self.redact_text(&record.message);

        let mut attrs = BTreeMap::new();
        for (key, value) in &record.attrs {
            let redacted = if self.rules.is_sensitive_key(key) {
                Value::String(PLACEHOLDER.to_string())
            } else {
                match value {
                    Value::String(s) => Value::String(self.redact_text(s)),
                    Value::Object(_) | Value::Array(_) => {
                        return Err(format!("attribute {key:?} is a nested structure; redaction cannot scan it"));
                    }
                    other => other.clone(),
                }
            };
            attrs.insert(key.clone(), redacted);
        }

        Ok(LogRecord {
            level: record.level,
            message,
            recorded_at: record.recorded_at,
            attrs,
        })
    }

    fn redact_text(&self, text: &str) -> String {
        self.rules.redact_text(text)
    }
}

#[async_trait]
impl Handler for RedactingHandler {
    fn enabled(&self, level: Level) -> bool {
        self.inner.enabled(level)
    }

    async fn handle(&self, record: &LogRecord) -> std::result::Result<(), HandlerError> {
        match self.redact(record) {
            Ok(redacted) => self.inner.handle(&redacted).await,
            Err(reason) => {
                warn!(reason = reason.as_str(), "redaction failed; forwarding unredacted record to the failure logger");
                self.failure_logger.handle(record).await
            }
        }
    }
}
