//! Seam traits and the per-configuration cycle runner.
//!
//! The runner owns the overall shape of a run: configurations are
//! processed strictly one after another, each failure is contained in its
//! own cycle, and a tunnel is always released before the next one is
//! acquired.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::config::{Settings, TunnelConfig};
use crate::error::TunnelError;
use crate::outcome::{ActionOutcome, CycleRecord, RunReport};

/// Brings tunnels up, one acquire call per configuration.
#[async_trait]
pub trait TunnelProvider: Send + Sync {
    async fn acquire(&self, config: &TunnelConfig) -> Result<Box<dyn TunnelGuard>, TunnelError>;
}

/// A live tunnel.
///
/// Dropping the guard kills the underlying process. [`release`] is the
/// graceful path and must be awaited once the tunnel is no longer needed.
///
/// [`release`]: TunnelGuard::release
#[async_trait]
pub trait TunnelGuard: Send {
    async fn release(self: Box<Self>);
}

/// The page-side work performed once per connected tunnel.
#[async_trait]
pub trait PageAction: Send + Sync {
    async fn execute(&self) -> ActionOutcome;
}

/// Drives a full run: connect, act, tear down, repeat.
pub struct Runner {
    tunnels: Box<dyn TunnelProvider>,
    action: Box<dyn PageAction>,
    route_settle: Duration,
}

impl Runner {
    pub fn new(
        settings: &Settings,
        tunnels: Box<dyn TunnelProvider>,
        action: Box<dyn PageAction>,
    ) -> Self {
        Self {
            tunnels,
            action,
            route_settle: settings.route_settle,
        }
    }

    /// Process every configuration in order and collect one record each.
    pub async fn run(&self, configs: &[TunnelConfig]) -> RunReport {
        let mut records = Vec::with_capacity(configs.len());

        for config in configs {
            info!("=== Processing {} ===", config.name());
            records.push(self.cycle(config).await);
        }

        let report = RunReport::new(records);
        info!(
            "Processed {} configurations ({} tunnel failures, {} successful votes)",
            report.attempted(),
            report.tunnel_failures(),
            report.action_successes()
        );
        report
    }

    /// One configuration: failures land in the record, never in the caller.
    async fn cycle(&self, config: &TunnelConfig) -> CycleRecord {
        let guard = match self.tunnels.acquire(config).await {
            Ok(guard) => guard,
            Err(e) => {
                warn!("Skipping {}: {}", config.name(), e);
                return CycleRecord::tunnel_failed(config.clone(), e);
            }
        };

        // Give the fresh default route a moment before generating traffic.
        tokio::time::sleep(self.route_settle).await;

        let outcome = self.action.execute().await;
        match &outcome {
            ActionOutcome::Success {
                votes_before,
                votes_after,
            } => {
                info!(
                    "Vote recorded on {} ({} -> {})",
                    config.name(),
                    votes_before,
                    votes_after
                );
            }
            ActionOutcome::Failure(reason) => {
                warn!("No vote on {}: {}", config.name(), reason);
            }
        }

        guard.release().await;

        CycleRecord::completed(config.clone(), outcome)
    }
}

#[cfg(test)]
#[path = "runner_tests.rs"]
mod tests;
