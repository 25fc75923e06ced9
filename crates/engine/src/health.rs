// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker health monitoring.
//!
//! Pings every live worker on an interval; three consecutive failures
//! quarantine the worker (error status, process stopped). The counter
//! resets on any successful ping.

use crate::pool::WorkerPool;
use maestro_adapters::WorkerBackend;
use maestro_core::{Clock, ErrorBody, ErrorKind};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Interval between health check sweeps.
pub const HEALTH_CHECK_INTERVAL: Duration = Duration::from_secs(30);

/// Consecutive ping failures before a worker is quarantined.
pub const HEALTH_STRIKE_LIMIT: u32 = 3;

/// Periodic liveness checker for the pool's workers.
pub struct HealthMonitor<B: WorkerBackend, C: Clock> {
    pool: Arc<WorkerPool<B, C>>,
    interval: Duration,
    strikes: HashMap<String, u32>,
}

impl<B: WorkerBackend, C: Clock> HealthMonitor<B, C> {
    pub fn new(pool: Arc<WorkerPool<B, C>>) -> Self {
        Self::with_interval(pool, HEALTH_CHECK_INTERVAL)
    }

    pub fn with_interval(pool: Arc<WorkerPool<B, C>>, interval: Duration) -> Self {
        Self {
            pool,
            interval,
            strikes: HashMap::new(),
        }
    }

    /// Run one sweep over all live workers.
    ///
    /// Returns the profiles quarantined in this sweep.
    pub async fn check_once(&mut self) -> Vec<String> {
        let mut quarantined = Vec::new();
        for handle in self.pool.live_handles() {
            let profile_id = handle.profile_id.to_string();
            match self.pool.backend().ping(&handle).await {
                Ok(()) => {
                    self.strikes.remove(&profile_id);
                }
                Err(err) => {
                    let strikes = self.strikes.entry(profile_id.clone()).or_insert(0);
                    *strikes += 1;
                    tracing::warn!(
                        profile_id = %profile_id,
                        strikes = *strikes,
                        error = %err,
                        "worker health check failed"
                    );
                    if *strikes >= HEALTH_STRIKE_LIMIT {
                        self.strikes.remove(&profile_id);
                        self.pool
                            .quarantine(
                                &profile_id,
                                ErrorBody::new(
                                    ErrorKind::WorkerUnreachable,
                                    format!(
                                        "{} consecutive health checks failed",
                                        HEALTH_STRIKE_LIMIT
                                    ),
                                ),
                            )
                            .await;
                        quarantined.push(profile_id);
                    }
                }
            }
        }
        quarantined
    }

    /// Sweep forever at the configured interval.
    pub async fn run(mut self) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            self.check_once().await;
        }
    }
}

#[cfg(test)]
#[path = "health_tests.rs"]
mod tests;
