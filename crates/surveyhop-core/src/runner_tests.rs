use super::*;

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;

use crate::outcome::ActionFailure;

/// Counters shared between the fakes so tests can assert how many tunnels
/// were live at any point in the run.
#[derive(Default)]
struct TunnelStats {
    live: AtomicUsize,
    peak: AtomicUsize,
    acquired: AtomicUsize,
    released: AtomicUsize,
}

struct FakeTunnels {
    stats: Arc<TunnelStats>,
    fail: Vec<String>,
}

#[async_trait]
impl TunnelProvider for FakeTunnels {
    async fn acquire(&self, config: &TunnelConfig) -> Result<Box<dyn TunnelGuard>, TunnelError> {
        self.stats.acquired.fetch_add(1, Ordering::SeqCst);
        if self.fail.iter().any(|name| name == config.name()) {
            return Err(TunnelError::ConnectTimeout(1));
        }
        let live = self.stats.live.fetch_add(1, Ordering::SeqCst) + 1;
        self.stats.peak.fetch_max(live, Ordering::SeqCst);
        Ok(Box::new(FakeGuard {
            stats: self.stats.clone(),
        }))
    }
}

struct FakeGuard {
    stats: Arc<TunnelStats>,
}

#[async_trait]
impl TunnelGuard for FakeGuard {
    async fn release(self: Box<Self>) {
        self.stats.live.fetch_sub(1, Ordering::SeqCst);
        self.stats.released.fetch_add(1, Ordering::SeqCst);
    }
}

struct FakeAction {
    stats: Arc<TunnelStats>,
    outcomes: Mutex<VecDeque<ActionOutcome>>,
}

#[async_trait]
impl PageAction for FakeAction {
    async fn execute(&self) -> ActionOutcome {
        // The action only ever runs with exactly one tunnel live.
        assert_eq!(self.stats.live.load(Ordering::SeqCst), 1);
        self.outcomes
            .lock()
            .pop_front()
            .unwrap_or(ActionOutcome::Failure(ActionFailure::TargetNotFound))
    }
}

fn quick_settings() -> Settings {
    Settings {
        route_settle: Duration::from_millis(0),
        ..Settings::default()
    }
}

fn configs(names: &[&str]) -> Vec<TunnelConfig> {
    names
        .iter()
        .map(|name| TunnelConfig::new(format!("/tmp/{}.ovpn", name)))
        .collect()
}

fn runner(
    stats: &Arc<TunnelStats>,
    fail: &[&str],
    outcomes: Vec<ActionOutcome>,
) -> Runner {
    let tunnels = FakeTunnels {
        stats: stats.clone(),
        fail: fail.iter().map(|s| s.to_string()).collect(),
    };
    let action = FakeAction {
        stats: stats.clone(),
        outcomes: Mutex::new(outcomes.into()),
    };
    Runner::new(&quick_settings(), Box::new(tunnels), Box::new(action))
}

#[tokio::test]
async fn test_one_record_per_config_in_order() {
    let stats = Arc::new(TunnelStats::default());
    let runner = runner(&stats, &["alpha", "bravo", "charlie"], vec![]);

    let report = runner.run(&configs(&["alpha", "bravo", "charlie"])).await;

    assert_eq!(report.attempted(), 3);
    let names: Vec<_> = report.records().iter().map(|r| r.config.name()).collect();
    assert_eq!(names, vec!["alpha", "bravo", "charlie"]);
    for record in report.records() {
        assert!(!record.connected());
        assert!(record.action.is_none());
    }
    assert_eq!(stats.acquired.load(Ordering::SeqCst), 3);
    assert_eq!(stats.released.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_tunnel_failure_skips_action_and_continues() {
    let stats = Arc::new(TunnelStats::default());
    let runner = runner(
        &stats,
        &["bravo"],
        vec![
            ActionOutcome::Failure(ActionFailure::TargetNotFound),
            ActionOutcome::Failure(ActionFailure::TargetNotFound),
        ],
    );

    let report = runner.run(&configs(&["alpha", "bravo", "charlie"])).await;

    assert_eq!(report.attempted(), 3);
    assert!(report.records()[0].connected());
    assert!(!report.records()[1].connected());
    assert!(report.records()[2].connected());
    assert_eq!(report.tunnel_failures(), 1);
    // Every acquired tunnel was released, even after failed actions.
    assert_eq!(stats.released.load(Ordering::SeqCst), 2);
    assert_eq!(stats.live.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_never_more_than_one_tunnel_live() {
    let stats = Arc::new(TunnelStats::default());
    let outcomes = vec![
        ActionOutcome::Failure(ActionFailure::NavigationTimeout),
        ActionOutcome::Failure(ActionFailure::ClickTimeout),
        ActionOutcome::Failure(ActionFailure::TargetNotFound),
    ];
    let runner = runner(&stats, &[], outcomes);

    let report = runner
        .run(&configs(&["alpha", "bravo", "charlie"]))
        .await;

    assert_eq!(report.attempted(), 3);
    assert_eq!(report.action_successes(), 0);
    assert_eq!(stats.peak.load(Ordering::SeqCst), 1);
    assert_eq!(stats.released.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_full_run_with_mixed_outcomes() {
    let stats = Arc::new(TunnelStats::default());
    let runner = runner(
        &stats,
        &["alpha", "bravo"],
        vec![ActionOutcome::Success {
            votes_before: "12".to_string(),
            votes_after: "13".to_string(),
        }],
    );

    let report = runner.run(&configs(&["alpha", "bravo", "charlie"])).await;

    assert_eq!(report.attempted(), 3);
    assert_eq!(report.tunnel_failures(), 2);
    assert_eq!(report.action_successes(), 1);
    assert_eq!(
        report.records()[2].action,
        Some(ActionOutcome::Success {
            votes_before: "12".to_string(),
            votes_after: "13".to_string(),
        })
    );
    assert_eq!(stats.released.load(Ordering::SeqCst), 1);
}
