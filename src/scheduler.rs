//! Refresh Scheduler
//!
//! Background actor that rebuilds the merged cache at a fixed interval and
//! publishes each new snapshot to the shared store.

use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

use crate::merge::{self, CacheStore};

/// Message types for RefreshActor
enum Message {
    Shutdown,
}

/// Handle for communicating with RefreshActor
#[derive(Clone)]
pub struct SchedulerHandle {
    sender: mpsc::Sender<Message>,
}

impl SchedulerHandle {
    /// Signal the actor to shutdown
    pub async fn shutdown(&self) {
        let _ = self.sender.send(Message::Shutdown).await;
    }
}

/// Refresh Actor
///
/// Runs a background task that re-fetches all sources at regular intervals.
/// There is exactly one of these per process, so refresh cycles can never
/// overlap; a cycle that outlasts the interval simply delays the next one
/// (missed ticks are skipped, not queued).
struct RefreshActor {
    client: reqwest::Client,
    sources: Vec<String>,
    store: CacheStore,
    interval: Duration,
    receiver: mpsc::Receiver<Message>,
}

impl RefreshActor {
    async fn run(mut self) {
        let mut timer = tokio::time::interval(self.interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

        // Skip first tick (immediate); startup does an eager refresh before
        // the actor is spawned
        timer.tick().await;

        loop {
            tokio::select! {
                _ = timer.tick() => {
                    self.execute().await;
                }
                msg = self.receiver.recv() => {
                    match msg {
                        Some(Message::Shutdown) | None => {
                            tracing::info!("refresh actor stopped");
                            break;
                        }
                    }
                }
            }
        }
    }

    async fn execute(&self) {
        tracing::debug!("scheduled refresh started");
        let cache = merge::refresh(&self.client, &self.sources).await;
        self.store.replace(cache).await;
        tracing::debug!("scheduled refresh completed");
    }
}

/// Create and start the refresh actor
pub fn spawn(
    client: reqwest::Client,
    sources: Vec<String>,
    store: CacheStore,
    interval: Duration,
) -> SchedulerHandle {
    let (sender, receiver) = mpsc::channel(8);

    let actor = RefreshActor {
        client,
        sources,
        store,
        interval,
        receiver,
    };
    tokio::spawn(actor.run());

    SchedulerHandle { sender }
}
