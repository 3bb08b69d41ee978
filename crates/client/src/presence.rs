//! Periodic "I'm online" heartbeat for the signed-in user.

use futures::future::BoxFuture;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use huddle_shared::constants::PRESENCE_HEARTBEAT_INTERVAL_MS;

use crate::error::ClientResult;

pub trait PresenceSink: Send + Sync + 'static {
    fn heartbeat(&self) -> BoxFuture<'_, ClientResult<()>>;
    fn go_offline(&self) -> BoxFuture<'_, ClientResult<()>>;
}

pub const DEFAULT_HEARTBEAT_INTERVAL: Duration =
    Duration::from_millis(PRESENCE_HEARTBEAT_INTERVAL_MS);

pub struct PresenceHeartbeat<S: PresenceSink + ?Sized> {
    sink: Arc<S>,
    task: Option<JoinHandle<()>>,
}

impl<S: PresenceSink + ?Sized> PresenceHeartbeat<S> {
    /// Sends the first heartbeat right away, then one per `interval`.
    pub fn start(sink: Arc<S>, interval: Duration) -> Self {
        let task = tokio::spawn({
            let sink = sink.clone();
            async move {
                loop {
                    if let Err(e) = sink.heartbeat().await {
                        tracing::warn!("Presence heartbeat failed: {}", e);
                    }
                    tokio::time::sleep(interval).await;
                }
            }
        });

        Self {
            sink,
            task: Some(task),
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Cancel the loop and report the user offline. Failure to do the latter is only logged.
    pub async fn stop(mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        if let Err(e) = self.sink.go_offline().await {
            tracing::warn!("Failed to report offline presence: {}", e);
        }
    }
}

impl<S: PresenceSink + ?Sized> Drop for PresenceHeartbeat<S> {
    fn drop(&mut self) {
        let Some(task) = self.task.take() else {
            return;
        };
        task.abort();

        // Dropped without `stop`: still try to go offline if a runtime is around.
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let sink = self.sink.clone();
            handle.spawn(async move {
                if let Err(e) = sink.go_offline().await {
                    tracing::debug!("Offline report on drop failed: {}", e);
                }
            });
        }
    }
}
