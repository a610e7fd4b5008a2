// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Multi-sink fan-out (spec.md §4.11): delivers a record to every sink
//! that has it enabled; one sink's error never prevents delivery to the
//! others. Grounded on `oj-adapters::notify`'s multiple-adapter
//! composition style.

use async_trait::async_trait;
use warden_core::{Handler, HandlerError, Level, LogRecord};

pub struct MultiSinkHandler {
    sinks: Vec<Box<dyn Handler>>,
}

impl MultiSinkHandler {
    pub fn new(sinks: Vec<Box<dyn Handler>>) -> Self {
        Self { sinks }
    }
}

#[async_trait]
impl Handler for MultiSinkHandler {
    fn enabled(&self, level: Level) -> bool {
        self.sinks.iter().any(|s| s.enabled(level))
    }

    async fn handle(&self, record: &LogRecord) -> Result<(), HandlerError> {
        let mut failures = Vec::new();
        for sink in &self.sinks {
            if !sink.enabled(record.level) {
                continue;
            }
            if let Err(e) = sink.handle(record).await {
                failures.push(e.to_string());
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(HandlerError::new("fanout", failures.join("; ")))
        }
    }
}
