//! Poller timing on the virtual clock.

use dispatch_core::{Session, StatusPoller};
use dispatch_env::{BackendError, BackendOp, SimulationBackend, SimulationConfig};
use dispatch_sim::{advance_by, settle, SimBackend, SimBackendController, SimContext};
use std::sync::Arc;
use std::time::Duration;

const INTERVAL: Duration = Duration::from_millis(2000);
const STEP: Duration = Duration::from_millis(100);

struct Rig {
    context: Arc<SimContext>,
    backend: SimBackendController,
    session: Arc<Session>,
    poller: StatusPoller<SimContext, SimBackend>,
}

async fn rig() -> Rig {
    let context = SimContext::shared(42);
    let backend = Arc::new(SimBackend::new(42));
    backend
        .start(&SimulationConfig::new(10, 2, 4).unwrap())
        .await
        .unwrap();
    let handle = backend.controller();
    let session = Session::shared();
    let poller = StatusPoller::new(Arc::clone(&context), backend, Arc::clone(&session), INTERVAL);
    Rig {
        context,
        backend: handle,
        session,
        poller,
    }
}

impl Rig {
    fn fetches(&self) -> usize {
        self.backend.call_count(BackendOp::Status)
    }

    fn time(&self) -> Option<f64> {
        self.poller.snapshot().map(|s| s.time)
    }

    async fn advance(&self, total: Duration) {
        advance_by(&self.context, total, STEP).await;
    }
}

#[tokio::test]
async fn first_fetch_is_immediate_and_next_waits_one_interval() {
    let rig = rig().await;
    rig.poller.begin();
    settle().await;
    assert_eq!(rig.fetches(), 1);

    rig.advance(Duration::from_millis(1900)).await;
    assert_eq!(rig.fetches(), 1, "fetched before the interval elapsed");

    rig.advance(Duration::from_millis(100)).await;
    assert_eq!(rig.fetches(), 2);
    assert_eq!(rig.time(), Some(2.0));
}

#[tokio::test]
async fn begin_twice_does_not_double_the_cadence() {
    let rig = rig().await;
    rig.poller.begin();
    rig.poller.begin();
    settle().await;

    rig.advance(INTERVAL * 3).await;
    assert_eq!(rig.fetches(), 4);
}

#[tokio::test]
async fn response_arriving_after_halt_is_ignored() {
    let rig = rig().await;
    rig.backend.hold_status(true);
    rig.poller.begin();
    settle().await;
    assert_eq!(rig.backend.held_count(), 1);

    rig.poller.halt();
    assert!(rig.backend.release_oldest());
    settle().await;

    assert_eq!(rig.time(), None);
    assert_eq!(rig.poller.stats().discarded, 1);

    // No ticks while halted
    rig.advance(INTERVAL * 2).await;
    assert_eq!(rig.fetches(), 1);
}

#[tokio::test]
async fn halt_when_never_started_is_a_no_op() {
    let rig = rig().await;
    rig.poller.halt();
    rig.advance(INTERVAL).await;
    assert_eq!(rig.fetches(), 0);
    assert!(!rig.poller.is_active());
}

#[tokio::test]
async fn failed_fetch_keeps_snapshot_and_logs() {
    let rig = rig().await;
    rig.poller.begin();
    settle().await;
    assert_eq!(rig.time(), Some(1.0));
    let revision = rig.session.log().revision();

    rig.backend
        .fail_next(BackendOp::Status, BackendError::Timeout(10_000));
    rig.advance(INTERVAL).await;

    assert_eq!(rig.time(), Some(1.0));
    assert_eq!(rig.poller.stats().failed, 1);
    assert!(rig.session.log().revision() > revision);
    assert_eq!(
        rig.session.log().latest().as_deref(),
        Some("Failed to fetch status: Timeout after 10000ms")
    );
    assert!(rig.poller.is_active());
}

#[tokio::test]
async fn late_older_response_never_overwrites_newer() {
    let rig = rig().await;
    rig.backend.hold_status(true);
    rig.poller.begin();
    settle().await;
    rig.advance(INTERVAL).await;
    assert_eq!(rig.backend.held_count(), 2);

    rig.backend.release_newest();
    settle().await;
    assert_eq!(rig.time(), Some(2.0));

    rig.backend.release_oldest();
    settle().await;
    assert_eq!(rig.time(), Some(2.0));
    assert_eq!(rig.poller.stats().applied, 1);
    assert_eq!(rig.poller.stats().discarded, 1);
}

#[tokio::test]
async fn in_order_overlapping_responses_are_both_applied() {
    let rig = rig().await;
    rig.backend.hold_status(true);
    rig.poller.begin();
    settle().await;
    rig.advance(INTERVAL).await;

    rig.backend.release_oldest();
    settle().await;
    assert_eq!(rig.time(), Some(1.0));

    rig.backend.release_oldest();
    settle().await;
    assert_eq!(rig.time(), Some(2.0));
    assert_eq!(rig.poller.stats().applied, 2);
}

#[tokio::test]
async fn restart_discards_previous_snapshot_and_late_responses() {
    let rig = rig().await;
    rig.poller.begin();
    settle().await;
    rig.advance(INTERVAL).await;
    assert_eq!(rig.time(), Some(2.0));

    // A response from the old run is still in flight at restart
    rig.backend.hold_status(true);
    rig.advance(INTERVAL).await;
    assert_eq!(rig.backend.held_count(), 1);
    rig.backend.hold_status(false);

    rig.poller.restart();
    assert_eq!(rig.time(), None);
    settle().await;
    assert_eq!(rig.time(), Some(4.0));

    rig.backend.release_oldest();
    settle().await;
    assert_eq!(rig.time(), Some(4.0));
}

#[tokio::test]
async fn dropping_the_poller_stops_ticking() {
    let rig = rig().await;
    rig.poller.begin();
    settle().await;

    let Rig {
        context, backend, poller, ..
    } = rig;
    drop(poller);

    advance_by(&context, INTERVAL * 2, STEP).await;
    assert_eq!(backend.call_count(BackendOp::Status), 1);
}
