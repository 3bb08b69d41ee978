//! Poll scheduler that slows down when the user stops interacting.
//!
//! The scheduler is `Active` after start and switches to `Idle` when no
//! activity has been seen for longer than the threshold. That check happens at
//! the top of each tick. Any activity flips it back to `Active` right away; the
//! faster interval applies from the next timer that gets armed. The callback
//! runs on every tick and the next timer is armed only after it returns.

use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use huddle_shared::constants::{
    ACTIVE_POLL_INTERVAL_MS, IDLE_POLL_INTERVAL_MS, IDLE_THRESHOLD_MS,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityEvent {
    PointerMove,
    KeyPress,
    Click,
    Scroll,
    Focus,
}

/// Fan-out of user interaction events. Cloning shares the same channel.
#[derive(Clone)]
pub struct ActivitySource {
    tx: broadcast::Sender<ActivityEvent>,
}

impl ActivitySource {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(64);
        Self { tx }
    }

    pub fn record(&self, event: ActivityEvent) {
        // No listeners is fine
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ActivityEvent> {
        self.tx.subscribe()
    }

    pub fn listener_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for ActivitySource {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    Active,
    Idle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdleConfig {
    pub active_interval: Duration,
    pub idle_interval: Duration,
    pub idle_threshold: Duration,
}

impl Default for IdleConfig {
    fn default() -> Self {
        Self {
            active_interval: Duration::from_millis(ACTIVE_POLL_INTERVAL_MS),
            idle_interval: Duration::from_millis(IDLE_POLL_INTERVAL_MS),
            idle_threshold: Duration::from_millis(IDLE_THRESHOLD_MS),
        }
    }
}

impl IdleConfig {
    fn interval(&self, state: PollState) -> Duration {
        match state {
            PollState::Active => self.active_interval,
            PollState::Idle => self.idle_interval,
        }
    }
}

struct Tracker {
    state: PollState,
    last_activity: Instant,
}

pub struct IdleScheduler;

impl IdleScheduler {
    pub fn start<F, Fut>(
        config: IdleConfig,
        activity: &ActivitySource,
        callback: F,
    ) -> SchedulerHandle
    where
        F: FnMut(PollState) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let tracker = Arc::new(Mutex::new(Tracker {
            state: PollState::Active,
            last_activity: Instant::now(),
        }));

        let listener = tokio::spawn(listen(activity.subscribe(), tracker.clone()));
        let ticker = tokio::spawn(tick_loop(config, tracker.clone(), callback));

        SchedulerHandle {
            tracker,
            listener,
            ticker,
        }
    }
}

async fn listen(mut rx: broadcast::Receiver<ActivityEvent>, tracker: Arc<Mutex<Tracker>>) {
    loop {
        match rx.recv().await {
            // A lagged receiver still means the user did something.
            Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {
                let mut t = lock(&tracker);
                t.last_activity = Instant::now();
                if t.state == PollState::Idle {
                    t.state = PollState::Active;
                    tracing::debug!("Activity detected, polling resumes at the active rate");
                }
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

async fn tick_loop<F, Fut>(config: IdleConfig, tracker: Arc<Mutex<Tracker>>, mut callback: F)
where
    F: FnMut(PollState) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    loop {
        let state = {
            let mut t = lock(&tracker);
            if t.state == PollState::Active && t.last_activity.elapsed() > config.idle_threshold {
                t.state = PollState::Idle;
                tracing::debug!("No activity for {:?}, switching to idle polling", config.idle_threshold);
            }
            t.state
        };

        callback(state).await;

        let next = config.interval(lock(&tracker).state);
        tokio::time::sleep(next).await;
    }
}

fn lock(tracker: &Mutex<Tracker>) -> std::sync::MutexGuard<'_, Tracker> {
    // The guarded data stays consistent even if a holder panicked.
    tracker.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Running scheduler. Stopping (or dropping) it detaches the activity
/// listener and cancels the pending timer.
pub struct SchedulerHandle {
    tracker: Arc<Mutex<Tracker>>,
    listener: JoinHandle<()>,
    ticker: JoinHandle<()>,
}

impl SchedulerHandle {
    pub fn state(&self) -> PollState {
        lock(&self.tracker).state
    }

    pub fn stop(&self) {
        self.listener.abort();
        self.ticker.abort();
    }

    pub fn is_stopped(&self) -> bool {
        self.listener.is_finished() && self.ticker.is_finished()
    }
}

impl Drop for SchedulerHandle {
    fn drop(&mut self) {
        self.stop();
    }
}
