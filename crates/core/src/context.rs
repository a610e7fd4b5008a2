// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Execution context: the run identifier plus cooperative cancellation
//! propagated from the runner down through the group executor and
//! resource manager (spec.md §5 "Cancellation & timeouts").

use crate::ids::RunId;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

#[derive(Clone)]
pub struct ExecutionContext {
    run_id: RunId,
    canceled: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl ExecutionContext {
    pub fn new(run_id: RunId) -> Self {
        Self {
            run_id,
            canceled: Arc::new(AtomicBool::new(false)),
            notify: Arc::new(Notify::new()),
        }
    }

    pub fn run_id(&self) -> &RunId {
        &self.run_id
    }

    /// Marks the context canceled and wakes anyone awaiting [`Self::canceled`].
    pub fn cancel(&self) {
        self.canceled.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    /// Best-effort poll, used by the runner's pre-group gate (spec.md §5).
    pub fn is_canceled(&self) -> bool {
        self.canceled.load(Ordering::SeqCst)
    }

    /// Resolves once the context has been canceled. Used inside
    /// `ExecuteCommand` to race against the child process.
    ///
    /// The `Notified` future is constructed before the `is_canceled` check
    /// so a `cancel()` landing in between is still observed — `notify_waiters`
    /// only wakes futures already registered, it stores no permit for one
    /// created afterward.
    pub async fn canceled(&self) {
        let notified = self.notify.notified();
        if self.is_canceled() {
            return;
        }
        notified.await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn cancel_wakes_pending_waiters() {
        let ctx = ExecutionContext::new(RunId::new("r1"));
        assert!(!ctx.is_canceled());

        let waiter = ctx.clone();
        let handle = tokio::spawn(async move {
            waiter.canceled().await;
        });

        ctx.cancel();
        handle.await.unwrap();
        assert!(ctx.is_canceled());
    }
}
