// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The logging pipeline's capability set (spec.md §4.11, §9 "Dynamic
//! dispatch over sinks/handlers"). Composition only, no inheritance
//! hierarchy: a `MultiSinkHandler` owns a `Vec<Box<dyn Handler>>`, a
//! `RedactingHandler` owns one `Box<dyn Handler>` plus a rule set.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Level {
    Debug,
    Info,
    Warn,
    Error,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
        };
        write!(f, "{s}")
    }
}

/// A single structured log record flowing through the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogRecord {
    pub level: Level,
    pub message: String,
    pub recorded_at: DateTime<Utc>,
    pub attrs: BTreeMap<String, Value>,
}

impl LogRecord {
    pub fn new(level: Level, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            recorded_at: Utc::now(),
            attrs: BTreeMap::new(),
        }
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attrs.insert(key.into(), value.into());
        self
    }

    pub fn with_attrs(mut self, attrs: impl IntoIterator<Item = (String, Value)>) -> Self {
        self.attrs.extend(attrs);
        self
    }
}

/// A sink or wrapper in the logging pipeline. `Handle` is fallible and
/// async because sinks may perform I/O (file append, outbound HTTP).
#[async_trait]
pub trait Handler: Send + Sync {
    fn enabled(&self, level: Level) -> bool;

    async fn handle(&self, record: &LogRecord) -> Result<(), HandlerError>;

    /// Returns a new handler with `attrs` merged into every record it
    /// handles from here on. Default impl is a no-op passthrough wrapper
    /// for handlers that don't need persistent attrs.
    fn with_attrs(self: Box<Self>, _attrs: BTreeMap<String, Value>) -> Box<dyn Handler>
    where
        Self: 'static,
    {
        self
    }
}

#[derive(Debug, thiserror::Error)]
#[error("{sink}: {message}")]
pub struct HandlerError {
    pub sink: String,
    pub message: String,
}

impl HandlerError {
    pub fn new(sink: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            sink: sink.into(),
            message: message.into(),
        }
    }
}
