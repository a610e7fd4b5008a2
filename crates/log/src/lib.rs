// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

//! warden-log: the logging pipeline (spec.md §4.11) — a redacting
//! handler wrapping a multi-sink fan-out over stderr, file, and webhook
//! sinks.

mod fanout;
mod redact;
mod sinks;
mod webhook;

pub use fanout::MultiSinkHandler;
pub use redact::{RedactingHandler, RedactionRules};
pub use sinks::{FileSink, StderrSink};
pub use webhook::{LevelMode, WebhookNotifier};
