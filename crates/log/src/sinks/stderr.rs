// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Plain-text stderr sink.

use async_trait::async_trait;
use warden_core::{Handler, HandlerError, Level, LogRecord};

pub struct StderrSink {
    min_level: Level,
}

impl StderrSink {
    pub fn new(min_level: Level) -> Self {
        Self { min_level }
    }
}

#[async_trait]
impl Handler for StderrSink {
    fn enabled(&self, level: Level) -> bool {
        level >= self.min_level
    }

    async fn handle(&self, record: &LogRecord) -> Result<(), HandlerError> {
        eprintln!("{} {} {}", record.recorded_at.to_rfc3339(), record.level, record.message);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filters_below_min_level() {
        let sink = StderrSink::new(Level::Warn);
        assert!(!sink.enabled(Level::Info));
        assert!(sink.enabled(Level::Warn));
        assert!(sink.enabled(Level::Error));
    }

    #[tokio::test]
    async fn handle_never_errors() {
        let sink = StderrSink::new(Level::Debug);
        let record = LogRecord::new(Level::Info, "hello");
        assert!(sink.handle(&record).await.is_ok());
    }
}
