//! Simulation context implementing DispatchContext for deterministic testing.

use async_trait::async_trait;
use dispatch_env::DispatchContext;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::trace;

/// Simulation context backed by a manually advanced virtual clock.
///
/// This implements `DispatchContext` using:
/// - A virtual clock published on a watch channel
/// - `sleep` that completes once the clock passes its deadline
/// - `tokio::spawn` for tasks (run them on a current-thread runtime for
///   a fully deterministic interleaving)
///
/// Virtual time only moves when the harness calls [`advance_time`] or
/// [`set_time`], so a poll interval of two seconds costs nothing in wall time.
///
/// [`advance_time`]: SimContext::advance_time
/// [`set_time`]: SimContext::set_time
pub struct SimContext {
    /// Master seed for this simulation
    seed: u64,

    /// Current virtual time since simulation start
    clock: Arc<watch::Sender<Duration>>,
}

impl SimContext {
    /// Creates a new SimContext with the given seed, clock at zero.
    pub fn new(seed: u64) -> Self {
        let (clock, _) = watch::channel(Duration::ZERO);
        Self {
            seed,
            clock: Arc::new(clock),
        }
    }

    /// Creates an Arc-wrapped context for sharing.
    pub fn shared(seed: u64) -> Arc<Self> {
        Arc::new(Self::new(seed))
    }

    /// Advances virtual time by the given duration, waking due sleepers.
    pub fn advance_time(&self, duration: Duration) {
        self.clock.send_modify(|now| *now += duration);
    }

    /// Sets the virtual time to a specific value.
    pub fn set_time(&self, time: Duration) {
        self.clock.send_replace(time);
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }
}

impl Clone for SimContext {
    fn clone(&self) -> Self {
        Self {
            seed: self.seed,
            clock: Arc::clone(&self.clock),
        }
    }
}

#[async_trait]
impl DispatchContext for SimContext {
    fn now(&self) -> Duration {
        *self.clock.borrow()
    }

    async fn sleep(&self, duration: Duration) {
        let deadline = self.now() + duration;
        let mut rx = self.clock.subscribe();
        loop {
            let now = *rx.borrow_and_update();
            if now >= deadline {
                return;
            }
            if rx.changed().await.is_err() {
                return;
            }
        }
    }

    fn spawn<F>(&self, name: &str, future: F)
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        trace!(task = name, "spawning simulated task");
        tokio::spawn(future);
    }
}

/// Yields enough times for every ready task on a current-thread runtime to
/// run to its next await point.
pub async fn settle() {
    for _ in 0..32 {
        tokio::task::yield_now().await;
    }
}

/// Advances `context` by `total` in `step` increments, settling after each.
pub async fn advance_by(context: &SimContext, total: Duration, step: Duration) {
    let mut elapsed = Duration::ZERO;
    while elapsed < total {
        let tick = step.min(total - elapsed);
        context.advance_time(tick);
        elapsed += tick;
        settle().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[test]
    fn test_sim_context_time() {
        let ctx = SimContext::new(42);
        assert_eq!(ctx.now(), Duration::ZERO);

        ctx.advance_time(Duration::from_secs(1));
        assert_eq!(ctx.now(), Duration::from_secs(1));

        ctx.advance_time(Duration::from_millis(500));
        assert_eq!(ctx.now(), Duration::from_millis(1500));

        ctx.set_time(Duration::from_millis(10));
        assert_eq!(ctx.now(), Duration::from_millis(10));
    }

    #[test]
    fn test_sim_context_clone_shares_time() {
        let ctx1 = SimContext::new(42);
        let ctx2 = ctx1.clone();

        ctx1.advance_time(Duration::from_secs(5));

        // Both should see the same time
        assert_eq!(ctx1.now(), ctx2.now());
        assert_eq!(ctx2.seed(), 42);
    }

    #[tokio::test]
    async fn test_sleep_waits_for_virtual_deadline() {
        let ctx = SimContext::shared(7);
        let woke = Arc::new(AtomicBool::new(false));

        let sleeper = Arc::clone(&ctx);
        let flag = Arc::clone(&woke);
        ctx.spawn("sleeper", async move {
            sleeper.sleep(Duration::from_millis(2000)).await;
            flag.store(true, Ordering::SeqCst);
        });

        settle().await;
        ctx.advance_time(Duration::from_millis(1999));
        settle().await;
        assert!(!woke.load(Ordering::SeqCst));

        ctx.advance_time(Duration::from_millis(1));
        settle().await;
        assert!(woke.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_zero_sleep_returns_immediately() {
        let ctx = SimContext::new(1);
        ctx.sleep(Duration::ZERO).await;
        assert_eq!(ctx.now(), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_advance_by_steps() {
        let ctx = SimContext::new(1);
        advance_by(&ctx, Duration::from_millis(250), Duration::from_millis(100)).await;
        assert_eq!(ctx.now(), Duration::from_millis(250));
    }
}
