// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process monitor (spec.md §4.7): a thread-safe PID → ProcessInfo map
//! plus one background periodic task that warns about processes older
//! than a threshold. Grounded on `oj-daemon::main.rs`'s periodic-task
//! pattern (a single `tokio::time::interval` loop spawned once, stopped
//! via a flag) and spec.md §5's RW-lock guidance for the PID map.
//!
//! spec.md §9's "open question" (simple vs. fuller monitor) is resolved
//! in favor of this explicit-lifecycle form; there is no simpler legacy
//! variant carried alongside it.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::warn;
use warden_core::ProcessInfo;

const DEFAULT_SCAN_INTERVAL: Duration = Duration::from_secs(5 * 60);
const DEFAULT_WARN_THRESHOLD: Duration = Duration::from_secs(30 * 60);

pub struct ProcessMonitor {
    processes: RwLock<HashMap<u32, ProcessInfo>>,
    scan_interval: Duration,
    warn_threshold: Duration,
    running: AtomicBool,
    stop: Arc<Notify>,
    task: parking_lot::Mutex<Option<JoinHandle<()>>>,
}

impl ProcessMonitor {
    pub fn new() -> Arc<Self> {
        Self::with_thresholds(DEFAULT_SCAN_INTERVAL, DEFAULT_WARN_THRESHOLD)
    }

    pub fn with_thresholds(scan_interval: Duration, warn_threshold: Duration) -> Arc<Self> {
        Arc::new(Self {
            processes: RwLock::new(HashMap::new()),
            scan_interval,
            warn_threshold,
            running: AtomicBool::new(false),
            stop: Arc::new(Notify::new()),
            task: parking_lot::Mutex::new(None),
        })
    }

    pub fn register(&self, pid: u32, command_name: &str, started_at: DateTime<Utc>) {
        self.processes.write().insert(
            pid,
            ProcessInfo {
                pid,
                command_name: command_name.to_string(),
                started_at,
            },
        );
    }

    pub fn unregister(&self, pid: u32) {
        self.processes.write().remove(&pid);
    }

    /// Returns a mutation-safe snapshot copy (spec.md §4.7).
    pub fn running_processes(&self) -> Vec<ProcessInfo> {
        self.processes.read().values().cloned().collect()
    }

    /// Idempotent: starting an already-running monitor is a no-op.
    pub fn start(self: &Arc<Self>) {
        if self.running.swap(true, Ordering::SeqCst) {
            return;
        }
        let monitor = Arc::clone(self);
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(monitor.scan_interval);
            loop {
                tokio::select! {
                    _ = interval.tick() => monitor.scan_once(),
                    _ = monitor.stop.notified() => break,
                }
            }
        });
        *self.task.lock() = Some(handle);
    }

    /// Idempotent: stopping an already-stopped monitor is a no-op.
    pub async fn stop(self: &Arc<Self>) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }
        self.stop.notify_waiters();
        if let Some(handle) = self.task.lock().take() {
            let _ = handle.await;
        }
    }

    fn scan_once(&self) {
        let now = Utc::now();
        for info in self.processes.read().values() {
            let age = now.signed_duration_since(info.started_at);
            if age.to_std().map(|d| d > self.warn_threshold).unwrap_or(false) {
                warn!(
                    pid = info.pid,
                    command = info.command_name.as_str(),
                    age_secs = age.num_seconds(),
                    "long-running process exceeded warn threshold"
                );
            }
        }
    }
}
