//! Retention Manager
//!
//! Holds the ordered registry of retention policies and runs them on an
//! interval. Each tick runs every policy's `enforce` sequentially; a
//! policy's error is logged and never aborts the tick or the manager.
//!
//! The next tick's deadline is captured before a pass runs, so a pass that
//! overruns the interval makes the following tick fire immediately after
//! it returns; ticks that would have fired during the pass coalesce into
//! that single firing. Cancellation is honored between passes only; an
//! in-flight pass runs to completion.

use crate::error::{Result, RetentionError};
use crate::policy::PolicyEntry;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone)]
pub struct RetentionManagerConfig {
    /// Interval between enforcement ticks.
    pub interval: Duration,
}

pub struct RetentionManager {
    config: RetentionManagerConfig,
    policies: Mutex<Vec<PolicyEntry>>,
    started: AtomicBool,
}

impl RetentionManager {
    pub fn new(config: RetentionManagerConfig) -> Self {
        Self {
            config,
            policies: Mutex::new(Vec::new()),
            started: AtomicBool::new(false),
        }
    }

    /// Append a policy to the registry. Policies run in registration
    /// order; registration after `start` is an error.
    pub fn register_policy(&self, entry: PolicyEntry) -> Result<()> {
        if self.started.load(Ordering::SeqCst) {
            return Err(RetentionError::AlreadyStarted);
        }
        info!(policy = %entry.name, "Registered retention policy");
        self.policies.lock().unwrap().push(entry);
        Ok(())
    }

    /// Spawn the tick loop. It stops when `ctx` is cancelled, finishing
    /// any in-flight pass first.
    pub fn start(self: std::sync::Arc<Self>, ctx: CancellationToken) -> Result<JoinHandle<()>> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(RetentionError::AlreadyStarted);
        }
        if self.policies.lock().unwrap().is_empty() {
            warn!("No retention policies registered");
        }
        info!(interval_secs = self.config.interval.as_secs(), "Retention manager started");

        Ok(tokio::spawn(async move {
            let mut next_tick = Instant::now() + self.config.interval;
            loop {
                tokio::select! {
                    _ = ctx.cancelled() => break,
                    _ = sleep_until(next_tick) => {}
                }
                // Captured before the pass: an overlong pass fires the next
                // tick immediately after returning instead of piling up.
                next_tick = Instant::now() + self.config.interval;
                self.run_once().await;
            }
            info!("Retention manager stopped");
        }))
    }

    /// Run every registered policy once, in order.
    async fn run_once(&self) {
        debug!("Running retention policies");
        let policies: Vec<_> = {
            let guard = self.policies.lock().unwrap();
            guard
                .iter()
                .map(|entry| (entry.name.clone(), entry.rule.clone()))
                .collect()
        };
        for (name, rule) in policies {
            if let Err(e) = rule.enforce().await {
                error!(policy = %name, error = %e, "Failed to enforce retention policy");
            }
        }
    }
}
