// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Newline-delimited-JSON file sink, append-only (grounded on
//! `oj-engine::pipeline_logger`'s open-write-close-per-call style: safe
//! for the low write frequency of group summary records).

use async_trait::async_trait;
use parking_lot::Mutex;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use warden_core::{Handler, HandlerError, Level, LogRecord};

pub struct FileSink {
    path: PathBuf,
    min_level: Level,
    lock: Mutex<()>,
}

impl FileSink {
    pub fn new(path: impl Into<PathBuf>, min_level: Level) -> Self {
        Self {
            path: path.into(),
            min_level,
            lock: Mutex::new(()),
        }
    }

    fn append_line(path: &Path, line: &str) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        writeln!(file, "{line}")
    }
}

#[async_trait]
impl Handler for FileSink {
    fn enabled(&self, level: Level) -> bool {
        level >= self.min_level
    }

    async fn handle(&self, record: &LogRecord) -> Result<(), HandlerError> {
        let line = serde_json::to_string(record).map_err(|e| HandlerError::new("file", e.to_string()))?;
        let _guard = self.lock.lock();
        Self::append_line(&self.path, &line).map_err(|e| HandlerError::new("file", e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn appends_one_json_line_per_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary.ndjson");
        let sink = FileSink::new(&path, Level::Debug);

        sink.handle(&LogRecord::new(Level::Info, "one")).await.unwrap();
        sink.handle(&LogRecord::new(Level::Info, "two")).await.unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 2);
        assert!(contents.contains("\"message\":\"one\""));
    }
}
