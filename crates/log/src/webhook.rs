// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Webhook notifier (spec.md §4.11, §6 "Webhook wire format"). Grounded
//! on `oj-adapters::notify`'s fire-via-a-dedicated-async-path style,
//! using `reqwest` as the pack's outbound HTTPS JSON client instead of
//! desktop notifications or a local subprocess.

use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, warn};
use warden_core::{Handler, HandlerError, Level, LogRecord};

/// Which levels the webhook delivers, independent of the sink's own
/// `min_level` gating used by stderr/file (spec.md §4.11).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelMode {
    /// Deliver INFO and below only.
    ExactInfo,
    /// Deliver WARN and ERROR only.
    WarnAndAbove,
}

impl LevelMode {
    fn admits(self, level: Level) -> bool {
        match self {
            LevelMode::ExactInfo => level <= Level::Info,
            LevelMode::WarnAndAbove => level >= Level::Warn,
        }
    }
}

pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
    mode: LevelMode,
    dry_run: bool,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>, mode: LevelMode, dry_run: bool) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
            mode,
            dry_run,
        }
    }

    fn status_of(record: &LogRecord) -> &'static str {
        match record.attrs.get("status").and_then(|v| v.as_str()) {
            Some("ERROR") => "ERROR",
            _ => {
                if record.level >= Level::Warn {
                    "ERROR"
                } else {
                    "SUCCESS"
                }
            }
        }
    }

    fn string_attr(record: &LogRecord, key: &str) -> String {
        record.attrs.get(key).and_then(|v| v.as_str()).unwrap_or_default().to_string()
    }
}

#[async_trait]
impl Handler for WebhookNotifier {
    fn enabled(&self, level: Level) -> bool {
        self.mode.admits(level)
    }

    async fn handle(&self, record: &LogRecord) -> Result<(), HandlerError> {
        let payload = json!({
            "text": record.message,
            "level": record.level.to_string(),
            "run_id": Self::string_attr(record, "run_id"),
            "group": Self::string_attr(record, "group"),
            "status": Self::status_of(record),
            "attrs": record.attrs,
        });

        if self.dry_run {
            debug!(url = self.url.as_str(), "dry-run: webhook notification recorded, not sent");
            return Ok(());
        }

        let response = self
            .client
            .post(&self.url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| HandlerError::new("webhook", e.to_string()))?;

        if response.status().is_success() {
            Ok(())
        } else {
            let status = response.status();
            warn!(url = self.url.as_str(), %status, "webhook delivery rejected");
            Err(HandlerError::new("webhook", format!("server responded {status}")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_info_admits_info_and_below() {
        assert!(LevelMode::ExactInfo.admits(Level::Debug));
        assert!(LevelMode::ExactInfo.admits(Level::Info));
        assert!(!LevelMode::ExactInfo.admits(Level::Warn));
    }

    #[test]
    fn warn_and_above_admits_warn_and_error_only() {
        assert!(!LevelMode::WarnAndAbove.admits(Level::Info));
        assert!(LevelMode::WarnAndAbove.admits(Level::Warn));
        assert!(LevelMode::WarnAndAbove.admits(Level::Error));
    }

    #[tokio::test]
    async fn dry_run_never_performs_io() {
        let notifier = WebhookNotifier::new("http://127.0.0.1:1/unreachable", LevelMode::ExactInfo, true);
        let record = LogRecord::new(Level::Info, "summary").with_attr("status", "SUCCESS");
        assert!(notifier.handle(&record).await.is_ok());
    }
}
