//! Countdown controller and tick scheduling.
//!
//! [`Countdown`] is pure state: one call to [`Countdown::tick`] is one second.
//! Where ticks come from is a [`TickScheduler`] owned by each session, so two
//! sessions never share a clock. Missed ticks are not applied retroactively;
//! a suspended host undercounts elapsed time.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::time::{Instant, Interval, MissedTickBehavior};

/// What a single tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownEvent {
    /// Not running (never started, stopped, or already expired).
    Idle,
    /// One second elapsed.
    Tick { time_left: u32 },
    /// Time reached zero. Delivered exactly once.
    Expired,
}

/// Single-threaded countdown over whole seconds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Countdown {
    total: u32,
    time_left: u32,
    elapsed: u32,
    running: bool,
    expired: bool,
}

impl Countdown {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&mut self, total_seconds: u32) {
        self.total = total_seconds;
        self.time_left = total_seconds;
        self.elapsed = 0;
        self.running = true;
        self.expired = false;
    }

    /// Continue from persisted values. `time_left` is clamped to `total`.
    pub fn resume(&mut self, total_seconds: u32, time_left: u32, elapsed: u32) {
        self.total = total_seconds;
        self.time_left = time_left.min(total_seconds);
        self.elapsed = elapsed;
        self.running = true;
        self.expired = false;
    }

    pub fn tick(&mut self) -> CountdownEvent {
        if !self.running || self.expired {
            return CountdownEvent::Idle;
        }

        self.time_left = self.time_left.saturating_sub(1);
        self.elapsed = self.elapsed.saturating_add(1);

        if self.time_left == 0 {
            self.expired = true;
            self.running = false;
            tracing::debug!(elapsed = self.elapsed, "countdown expired");
            CountdownEvent::Expired
        } else {
            CountdownEvent::Tick {
                time_left: self.time_left,
            }
        }
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    pub fn total(&self) -> u32 {
        self.total
    }

    pub fn time_left(&self) -> u32 {
        self.time_left
    }

    pub fn elapsed(&self) -> u32 {
        self.elapsed
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn has_expired(&self) -> bool {
        self.expired
    }
}

// ---------------------------------------------------------------------------
// Schedulers
// ---------------------------------------------------------------------------

/// Source of tick events for one session.
#[async_trait]
pub trait TickScheduler: Send {
    /// Begin delivering ticks.
    fn arm(&mut self);

    /// Stop delivering ticks.
    fn disarm(&mut self);

    fn is_armed(&self) -> bool;

    /// Wait for the next tick. Never resolves while disarmed.
    async fn next_tick(&mut self);
}

/// Tokio interval-backed scheduler. Missed ticks are skipped, not replayed.
pub struct IntervalScheduler {
    period: Duration,
    interval: Option<Interval>,
}

impl IntervalScheduler {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            interval: None,
        }
    }

    pub fn every_second() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

#[async_trait]
impl TickScheduler for IntervalScheduler {
    fn arm(&mut self) {
        if self.interval.is_none() {
            let mut interval = tokio::time::interval_at(Instant::now() + self.period, self.period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            self.interval = Some(interval);
        }
    }

    fn disarm(&mut self) {
        self.interval = None;
    }

    fn is_armed(&self) -> bool {
        self.interval.is_some()
    }

    async fn next_tick(&mut self) {
        match self.interval.as_mut() {
            Some(interval) => {
                interval.tick().await;
            }
            None => std::future::pending::<()>().await,
        }
    }
}

/// Scheduler driven by hand through a [`ManualTicker`].
pub struct ManualScheduler {
    armed: Arc<AtomicBool>,
    rx: mpsc::UnboundedReceiver<()>,
}

/// Handle that feeds ticks into a [`ManualScheduler`].
#[derive(Clone)]
pub struct ManualTicker {
    armed: Arc<AtomicBool>,
    tx: mpsc::UnboundedSender<()>,
}

impl ManualTicker {
    /// Queue one tick. Returns `false` if the scheduler was dropped.
    pub fn tick(&self) -> bool {
        self.tx.send(()).is_ok()
    }

    pub fn is_armed(&self) -> bool {
        self.armed.load(Ordering::SeqCst)
    }
}

/// Create a manual scheduler and the ticker that drives it.
pub fn manual_scheduler() -> (ManualScheduler, ManualTicker) {
    let armed = Arc::new(AtomicBool::new(false));
    let (tx, rx) = mpsc::unbounded_channel();
    (
        ManualScheduler {
            armed: Arc::clone(&armed),
            rx,
        },
        ManualTicker { armed, tx },
    )
}

#[async_trait]
impl TickScheduler for ManualScheduler {
    fn arm(&mut self) {
        self.armed.store(true, Ordering::SeqCst);
    }

    fn disarm(&mut self) {
        self.armed.store(false, Ordering::SeqCst);
    }

    fn is_armed(&self) -> bool {
        self.armed.load(Ordering::SeqCst)
    }

    async fn next_tick(&mut self) {
        if !self.is_armed() {
            return std::future::pending::<()>().await;
        }
        if self.rx.recv().await.is_none() {
            std::future::pending::<()>().await
        }
    }
}
