//! # AutoRefresh
//!
//! ## Responsibility
//! Re-runs a caller-supplied async callback every `interval` and drives an
//! independent one-second countdown readout. It never looks at what the
//! callback does.
//!
//! ## Guarantees
//! - At most one refresh timer and one countdown timer per instance:
//!   `start` on a running instance stops first.
//! - The active callback is stored, so `set_interval` and `resume` can
//!   restart the cycle without the caller passing it again.
//! - With [`OverlapPolicy::Skip`] a timer tick is skipped while an earlier
//!   invocation is still in flight.
//!
//! ## NOT Responsible For
//! - Cancelling in-flight callbacks: `stop` and `pause` only clear timers.
//! - Timeouts: a hung callback is bounded by the HTTP client, not here.
//!
//! Must be driven from inside a tokio runtime; timers are spawned tasks.

use std::future::Future;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::future::BoxFuture;
use serde::Deserialize;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, trace};

/// Period of the countdown readout.
pub const COUNTDOWN_TICK: Duration = Duration::from_secs(1);

pub type RefreshCallback = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;
pub type CountdownListener = Arc<dyn Fn(u64) + Send + Sync>;

/// Wrap an async closure as a [`RefreshCallback`].
pub fn callback<F, Fut>(f: F) -> RefreshCallback
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    Arc::new(move || -> BoxFuture<'static, ()> { Box::pin(f()) })
}

/// What a timer tick does when the previous invocation has not finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverlapPolicy {
    #[default]
    Skip,
    Allow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshState {
    Idle,
    Running,
    Paused,
}

impl std::fmt::Display for RefreshState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RefreshState::Idle => write!(f, "idle"),
            RefreshState::Running => write!(f, "running"),
            RefreshState::Paused => write!(f, "paused"),
        }
    }
}

/// Whole seconds shown by the countdown for `interval`, never below one.
pub fn countdown_seconds(interval: Duration) -> u64 {
    (interval.as_millis() / 1000).max(1) as u64
}

pub struct AutoRefresh {
    interval: Duration,
    overlap: OverlapPolicy,
    state: RefreshState,
    callback: Option<RefreshCallback>,
    listeners: Arc<Mutex<Vec<CountdownListener>>>,
    countdown: Arc<AtomicU64>,
    in_flight: Arc<AtomicUsize>,
    refresh_task: Option<JoinHandle<()>>,
    countdown_task: Option<JoinHandle<()>>,
}

impl AutoRefresh {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            overlap: OverlapPolicy::default(),
            state: RefreshState::Idle,
            callback: None,
            listeners: Arc::new(Mutex::new(Vec::new())),
            countdown: Arc::new(AtomicU64::new(countdown_seconds(interval))),
            in_flight: Arc::new(AtomicUsize::new(0)),
            refresh_task: None,
            countdown_task: None,
        }
    }

    pub fn with_overlap(mut self, overlap: OverlapPolicy) -> Self {
        self.overlap = overlap;
        self
    }

    pub fn state(&self) -> RefreshState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == RefreshState::Running
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Seconds until the next scheduled refresh, as last shown.
    pub fn countdown(&self) -> u64 {
        self.countdown.load(Ordering::Relaxed)
    }

    /// Number of callback invocations currently running.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Subscribe to countdown values. Listeners run on the timer task and
    /// must not block.
    pub fn on_countdown<F>(&self, listener: F)
    where
        F: Fn(u64) + Send + Sync + 'static,
    {
        lock_listeners(&self.listeners).push(Arc::new(listener));
    }

    /// Invoke `callback` now, then every interval. Restarts cleanly when
    /// already running or paused.
    pub fn start(&mut self, callback: RefreshCallback) {
        if self.state != RefreshState::Idle {
            self.stop();
        }
        debug!(interval_ms = self.interval.as_millis() as u64, "auto-refresh starting");
        self.callback = Some(Arc::clone(&callback));
        invoke(&callback, &self.in_flight);
        self.spawn_timers(callback);
        self.state = RefreshState::Running;
    }

    pub fn stop(&mut self) {
        self.clear_timers();
        if self.state != RefreshState::Idle {
            debug!("auto-refresh stopped");
        }
        self.state = RefreshState::Idle;
    }

    /// Clear timers but remember that the cycle should resume.
    pub fn pause(&mut self) {
        if self.state == RefreshState::Running {
            self.clear_timers();
            self.state = RefreshState::Paused;
            debug!("auto-refresh paused");
        }
    }

    /// Recreate both timers after [`pause`](Self::pause) without invoking
    /// the callback immediately. Returns `false` unless paused.
    pub fn resume(&mut self, callback: RefreshCallback) -> bool {
        if self.state != RefreshState::Paused {
            return false;
        }
        self.callback = Some(Arc::clone(&callback));
        self.spawn_timers(callback);
        self.state = RefreshState::Running;
        debug!("auto-refresh resumed");
        true
    }

    /// Change the period. A running cycle restarts with the stored callback,
    /// which includes the immediate invocation `start` performs.
    pub fn set_interval(&mut self, interval: Duration) {
        self.interval = interval;
        if self.state == RefreshState::Running {
            if let Some(cb) = self.callback.clone() {
                self.start(cb);
            }
        }
    }

    /// Invoke `callback` out of band. When running, timers restart so the
    /// countdown shows the full interval again.
    pub fn refresh_now(&mut self, callback: RefreshCallback) {
        invoke(&callback, &self.in_flight);
        if self.state == RefreshState::Running {
            self.clear_timers();
            self.callback = Some(Arc::clone(&callback));
            self.spawn_timers(callback);
        }
    }

    fn spawn_timers(&mut self, callback: RefreshCallback) {
        let period = self.interval.max(Duration::from_millis(1));
        let full = countdown_seconds(period);

        self.countdown.store(full, Ordering::Relaxed);
        notify(&self.listeners, full);

        let in_flight = Arc::clone(&self.in_flight);
        let overlap = self.overlap;
        self.refresh_task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                if overlap == OverlapPolicy::Skip && in_flight.load(Ordering::Acquire) > 0 {
                    debug!("previous refresh still in flight, skipping tick");
                    continue;
                }
                trace!("auto-refresh tick");
                invoke(&callback, &in_flight);
            }
        }));

        let listeners = Arc::clone(&self.listeners);
        let countdown = Arc::clone(&self.countdown);
        self.countdown_task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + COUNTDOWN_TICK, COUNTDOWN_TICK);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let next = match countdown.load(Ordering::Relaxed) {
                    0 | 1 => full,
                    n => n - 1,
                };
                countdown.store(next, Ordering::Relaxed);
                notify(&listeners, next);
            }
        }));
    }

    fn clear_timers(&mut self) {
        if let Some(task) = self.refresh_task.take() {
            task.abort();
        }
        if let Some(task) = self.countdown_task.take() {
            task.abort();
        }
    }
}

impl Drop for AutoRefresh {
    fn drop(&mut self) {
        self.clear_timers();
    }
}

impl std::fmt::Debug for AutoRefresh {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AutoRefresh")
            .field("interval", &self.interval)
            .field("overlap", &self.overlap)
            .field("state", &self.state)
            .field("countdown", &self.countdown())
            .finish()
    }
}

/// Decrements the in-flight count even if the callback panics.
struct InFlightGuard(Arc<AtomicUsize>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

fn invoke(callback: &RefreshCallback, in_flight: &Arc<AtomicUsize>) {
    in_flight.fetch_add(1, Ordering::AcqRel);
    let guard = InFlightGuard(Arc::clone(in_flight));
    let fut = callback();
    tokio::spawn(async move {
        let _guard = guard;
        fut.await;
    });
}

fn lock_listeners(listeners: &Mutex<Vec<CountdownListener>>) -> std::sync::MutexGuard<'_, Vec<CountdownListener>> {
    listeners.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn notify(listeners: &Mutex<Vec<CountdownListener>>, seconds: u64) {
    let snapshot: Vec<CountdownListener> = lock_listeners(listeners).clone();
    for listener in snapshot {
        listener(seconds);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counting() -> (Arc<AtomicUsize>, RefreshCallback) {
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        let cb = callback(move || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
            }
        });
        (count, cb)
    }

    fn recording(r: &AutoRefresh) -> Arc<Mutex<Vec<u64>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = Arc::clone(&seen);
        r.on_countdown(move |v| s.lock().unwrap().push(v));
        seen
    }

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    async fn advance_ms(ms: u64) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
        settle().await;
    }

    #[test]
    fn countdown_seconds_never_zero() {
        assert_eq!(countdown_seconds(Duration::from_millis(1000)), 1);
        assert_eq!(countdown_seconds(Duration::from_millis(30_000)), 30);
        assert_eq!(countdown_seconds(Duration::from_millis(200)), 1);
    }

    #[test]
    fn overlap_policy_deserializes_lowercase() {
        #[derive(Deserialize)]
        struct Wrap {
            overlap: OverlapPolicy,
        }
        let w: Wrap = toml::from_str("overlap = \"allow\"").unwrap();
        assert_eq!(w.overlap, OverlapPolicy::Allow);
    }

    #[tokio::test(start_paused = true)]
    async fn start_invokes_immediately_then_every_interval() {
        let (count, cb) = counting();
        let mut r = AutoRefresh::new(Duration::from_millis(1000));
        r.start(cb);
        settle().await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(r.is_running());

        advance_ms(1050).await;
        assert_eq!(count.load(Ordering::SeqCst), 2);
        advance_ms(1000).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn double_start_keeps_single_timer() {
        let (count, cb) = counting();
        let mut r = AutoRefresh::new(Duration::from_millis(1000));
        r.start(Arc::clone(&cb));
        r.start(cb);
        settle().await;
        // Two kick-off invocations, one per start.
        assert_eq!(count.load(Ordering::SeqCst), 2);

        advance_ms(1050).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);
        advance_ms(1000).await;
        assert_eq!(count.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_prevents_further_invocations() {
        let (count, cb) = counting();
        let mut r = AutoRefresh::new(Duration::from_millis(1000));
        r.start(cb);
        settle().await;
        r.stop();
        assert_eq!(r.state(), RefreshState::Idle);

        advance_ms(5_000).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn first_countdown_value_is_interval_in_seconds() {
        let (_count, cb) = counting();
        let mut r = AutoRefresh::new(Duration::from_millis(1000));
        let seen = recording(&r);
        r.start(cb);
        assert_eq!(seen.lock().unwrap().first().copied(), Some(1));
        assert_eq!(r.countdown(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn countdown_decrements_and_wraps() {
        let (_count, cb) = counting();
        let mut r = AutoRefresh::new(Duration::from_millis(3000));
        let seen = recording(&r);
        r.start(cb);
        advance_ms(1050).await;
        advance_ms(1000).await;
        advance_ms(1000).await;
        assert_eq!(*seen.lock().unwrap(), vec![3, 2, 1, 3]);
    }

    #[tokio::test(start_paused = true)]
    async fn pause_and_resume_without_immediate_invocation() {
        let (count, cb) = counting();
        let mut r = AutoRefresh::new(Duration::from_millis(1000));
        r.start(Arc::clone(&cb));
        settle().await;
        r.pause();
        assert_eq!(r.state(), RefreshState::Paused);

        advance_ms(3_000).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);

        assert!(r.resume(cb));
        settle().await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
        advance_ms(1050).await;
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn resume_when_idle_is_noop() {
        let (count, cb) = counting();
        let mut r = AutoRefresh::new(Duration::from_millis(1000));
        assert!(!r.resume(cb));
        advance_ms(2_000).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert_eq!(r.state(), RefreshState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn set_interval_restarts_with_stored_callback() {
        let (count, cb) = counting();
        let mut r = AutoRefresh::new(Duration::from_secs(60));
        r.start(cb);
        settle().await;
        r.set_interval(Duration::from_millis(1000));
        settle().await;
        assert_eq!(count.load(Ordering::SeqCst), 2);
        assert_eq!(r.interval(), Duration::from_millis(1000));

        advance_ms(1050).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn set_interval_while_idle_only_stores() {
        let (count, _cb) = counting();
        let mut r = AutoRefresh::new(Duration::from_secs(60));
        r.set_interval(Duration::from_secs(5));
        settle().await;
        assert_eq!(r.interval(), Duration::from_secs(5));
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert!(!r.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_now_resets_countdown() {
        let (count, cb) = counting();
        let mut r = AutoRefresh::new(Duration::from_millis(3000));
        let seen = recording(&r);
        r.start(Arc::clone(&cb));
        advance_ms(1050).await;
        assert_eq!(r.countdown(), 2);

        r.refresh_now(cb);
        settle().await;
        assert_eq!(r.countdown(), 3);
        assert_eq!(count.load(Ordering::SeqCst), 2);
        assert_eq!(seen.lock().unwrap().last().copied(), Some(3));
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_now_when_idle_does_not_start_timers() {
        let (count, cb) = counting();
        let mut r = AutoRefresh::new(Duration::from_millis(1000));
        r.refresh_now(cb);
        advance_ms(3_000).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(!r.is_running());
    }

    fn slow_callback(started: Arc<AtomicUsize>, hold: Duration) -> RefreshCallback {
        callback(move || {
            let started = Arc::clone(&started);
            async move {
                started.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(hold).await;
            }
        })
    }

    #[tokio::test(start_paused = true)]
    async fn skip_policy_drops_overlapping_ticks() {
        let started = Arc::new(AtomicUsize::new(0));
        let mut r = AutoRefresh::new(Duration::from_millis(1000)).with_overlap(OverlapPolicy::Skip);
        r.start(slow_callback(Arc::clone(&started), Duration::from_millis(2500)));
        // Ticks at 1 s and 2 s are skipped; the 3 s tick runs.
        advance_ms(3_050).await;
        assert_eq!(started.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn allow_policy_overlaps() {
        let started = Arc::new(AtomicUsize::new(0));
        let mut r = AutoRefresh::new(Duration::from_millis(1000)).with_overlap(OverlapPolicy::Allow);
        r.start(slow_callback(Arc::clone(&started), Duration::from_millis(2500)));
        advance_ms(3_050).await;
        assert_eq!(started.load(Ordering::SeqCst), 4);
        assert!(r.in_flight() >= 2);
    }

    #[tokio::test(start_paused = true)]
    async fn drop_aborts_timers() {
        let (count, cb) = counting();
        {
            let mut r = AutoRefresh::new(Duration::from_millis(1000));
            r.start(cb);
            settle().await;
        }
        advance_ms(5_000).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
