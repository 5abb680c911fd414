//! Cycle outcomes and the end-of-run report.

use thiserror::Error;

use crate::config::TunnelConfig;
use crate::error::TunnelError;

/// Where a vote attempt stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ActionFailure {
    /// The page never finished loading.
    #[error("page navigation timed out")]
    NavigationTimeout,

    /// The consent dialog never became clickable.
    #[error("consent dialog did not appear")]
    ConsentTimeout,

    /// No answer section matches the configured anchor text.
    #[error("target answer section not found")]
    TargetNotFound,

    /// The vote button was located but could not be clicked in time.
    #[error("vote click timed out")]
    ClickTimeout,
}

/// Result of one vote attempt on a connected tunnel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    /// The click went through. Vote counts as displayed before and after.
    Success {
        votes_before: String,
        votes_after: String,
    },
    Failure(ActionFailure),
}

/// Everything that happened for one configuration.
///
/// `action` is `None` exactly when the tunnel never connected.
#[derive(Debug)]
pub struct CycleRecord {
    pub config: TunnelConfig,
    pub tunnel: Result<(), TunnelError>,
    pub action: Option<ActionOutcome>,
}

impl CycleRecord {
    pub fn tunnel_failed(config: TunnelConfig, error: TunnelError) -> Self {
        Self {
            config,
            tunnel: Err(error),
            action: None,
        }
    }

    pub fn completed(config: TunnelConfig, outcome: ActionOutcome) -> Self {
        Self {
            config,
            tunnel: Ok(()),
            action: Some(outcome),
        }
    }

    /// True when the tunnel reached its connected state.
    pub fn connected(&self) -> bool {
        self.tunnel.is_ok()
    }

    /// True when the vote click was confirmed.
    pub fn action_succeeded(&self) -> bool {
        matches!(self.action, Some(ActionOutcome::Success { .. }))
    }
}

/// Summary of a full run: one record per configuration, in input order.
#[derive(Debug, Default)]
pub struct RunReport {
    records: Vec<CycleRecord>,
}

impl RunReport {
    pub fn new(records: Vec<CycleRecord>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[CycleRecord] {
        &self.records
    }

    pub fn attempted(&self) -> usize {
        self.records.len()
    }

    pub fn tunnel_failures(&self) -> usize {
        self.records.iter().filter(|r| !r.connected()).count()
    }

    pub fn action_successes(&self) -> usize {
        self.records.iter().filter(|r| r.action_succeeded()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_tunnel_record() {
        let record = CycleRecord::tunnel_failed(
            TunnelConfig::new("a.ovpn"),
            TunnelError::ConnectTimeout(30),
        );
        assert!(!record.connected());
        assert!(!record.action_succeeded());
        assert!(record.action.is_none());
    }

    #[test]
    fn test_completed_record() {
        let record = CycleRecord::completed(
            TunnelConfig::new("a.ovpn"),
            ActionOutcome::Success {
                votes_before: "12".to_string(),
                votes_after: "13".to_string(),
            },
        );
        assert!(record.connected());
        assert!(record.action_succeeded());
    }

    #[test]
    fn test_failure_outcome_is_not_a_success() {
        let record = CycleRecord::completed(
            TunnelConfig::new("a.ovpn"),
            ActionOutcome::Failure(ActionFailure::TargetNotFound),
        );
        assert!(record.connected());
        assert!(!record.action_succeeded());
    }

    #[test]
    fn test_report_counts() {
        let report = RunReport::new(vec![
            CycleRecord::tunnel_failed(
                TunnelConfig::new("a.ovpn"),
                TunnelError::ConnectTimeout(30),
            ),
            CycleRecord::completed(
                TunnelConfig::new("b.ovpn"),
                ActionOutcome::Failure(ActionFailure::NavigationTimeout),
            ),
            CycleRecord::completed(
                TunnelConfig::new("c.ovpn"),
                ActionOutcome::Success {
                    votes_before: "7".to_string(),
                    votes_after: "8".to_string(),
                },
            ),
        ]);
        assert_eq!(report.attempted(), 3);
        assert_eq!(report.tunnel_failures(), 1);
        assert_eq!(report.action_successes(), 1);
    }
}
