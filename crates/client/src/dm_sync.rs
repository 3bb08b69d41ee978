//! Polling subscription for new direct messages between two users.
//!
//! A background task asks the source for the newest message of the pair on a
//! fixed interval. Fetches never overlap: the next sleep starts only after the
//! previous fetch returned. The first result is the baseline and is not
//! delivered; afterwards the callback fires once per change of the newest
//! message id.

use futures::future::BoxFuture;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

use huddle_shared::constants::DM_POLL_INTERVAL_MS;

use crate::error::ClientResult;
use crate::models::DirectMessage;

/// Where the poller reads the newest message of a conversation from.
pub trait LatestMessageSource: Send + Sync + 'static {
    /// `Ok(None)` means the pair has not exchanged any message yet.
    fn latest_message<'a>(
        &'a self,
        user_a: &'a str,
        user_b: &'a str,
    ) -> BoxFuture<'a, ClientResult<Option<DirectMessage>>>;
}

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(DM_POLL_INTERVAL_MS);

pub struct DmSubscription {
    cancelled: Arc<AtomicBool>,
    wake: Arc<Notify>,
    task: JoinHandle<()>,
}

impl DmSubscription {
    /// Stop polling. A fetch already in flight finishes but is not delivered.
    pub fn unsubscribe(&self) {
        if !self.cancelled.swap(true, Ordering::SeqCst) {
            tracing::debug!("DM subscription cancelled");
        }
        self.wake.notify_one();
    }

    pub fn is_active(&self) -> bool {
        !self.cancelled.load(Ordering::SeqCst)
    }

    /// True once the polling task has exited.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for DmSubscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

pub fn subscribe<S, F>(
    source: Arc<S>,
    user_a: impl Into<String>,
    user_b: impl Into<String>,
    callback: F,
) -> DmSubscription
where
    S: LatestMessageSource + ?Sized,
    F: FnMut(DirectMessage) + Send + 'static,
{
    subscribe_with_interval(source, user_a, user_b, DEFAULT_POLL_INTERVAL, callback)
}

pub fn subscribe_with_interval<S, F>(
    source: Arc<S>,
    user_a: impl Into<String>,
    user_b: impl Into<String>,
    interval: Duration,
    callback: F,
) -> DmSubscription
where
    S: LatestMessageSource + ?Sized,
    F: FnMut(DirectMessage) + Send + 'static,
{
    let cancelled = Arc::new(AtomicBool::new(false));
    let wake = Arc::new(Notify::new());

    let task = tokio::spawn(poll_loop(
        source,
        user_a.into(),
        user_b.into(),
        interval,
        cancelled.clone(),
        wake.clone(),
        callback,
    ));

    DmSubscription {
        cancelled,
        wake,
        task,
    }
}

async fn poll_loop<S, F>(
    source: Arc<S>,
    user_a: String,
    user_b: String,
    interval: Duration,
    cancelled: Arc<AtomicBool>,
    wake: Arc<Notify>,
    mut callback: F,
) where
    S: LatestMessageSource + ?Sized,
    F: FnMut(DirectMessage) + Send + 'static,
{
    // Outer None until the first successful fetch.
    let mut last_seen: Option<Option<String>> = None;

    loop {
        if cancelled.load(Ordering::SeqCst) {
            break;
        }

        match source.latest_message(&user_a, &user_b).await {
            Ok(latest) => {
                let latest_id = latest.as_ref().map(|m| m.id.clone());
                match last_seen.as_ref().map(|seen| *seen != latest_id) {
                    None => last_seen = Some(latest_id),
                    Some(true) => {
                        if cancelled.load(Ordering::SeqCst) {
                            break;
                        }
                        last_seen = Some(latest_id);
                        if let Some(message) = latest {
                            callback(message);
                        }
                    }
                    Some(false) => {}
                }
            }
            Err(e) => {
                tracing::warn!("Polling direct messages {} <-> {} failed: {}", user_a, user_b, e);
            }
        }

        if cancelled.load(Ordering::SeqCst) {
            break;
        }

        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = wake.notified() => {}
        }
    }
}
