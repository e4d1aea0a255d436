//! Async driver for the download lifecycle.
//!
//! The runner owns one [`DownloadLifecycle`] and spawns a driver task per
//! attempt. The driver sleeps on the injected [`Clock`], then commits the due
//! step under the lock before arming the next wake-up, so stages are
//! published strictly in order. Dropping the runner aborts its driver.

use std::sync::Arc;

use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use tubefetch_models::{download_option, DownloadSnapshot, DownloadStatus, WsMessage};

use crate::clock::Clock;
use crate::config::LifecycleConfig;
use crate::error::LifecycleResult;
use crate::increment::ProgressIncrement;
use crate::machine::{DownloadLifecycle, Transition};

struct Inner {
    machine: DownloadLifecycle,
    increments: Box<dyn ProgressIncrement>,
}

/// Runs download lifecycles and publishes their events.
pub struct LifecycleRunner {
    inner: Arc<Mutex<Inner>>,
    clock: Arc<dyn Clock>,
    events: broadcast::Sender<WsMessage>,
    driver: std::sync::Mutex<Option<JoinHandle<()>>>,
}

impl LifecycleRunner {
    /// Create a runner using the config's random increment source.
    pub fn new(
        config: LifecycleConfig,
        clock: Arc<dyn Clock>,
        events: broadcast::Sender<WsMessage>,
    ) -> Self {
        let increments = Box::new(config.increment_source());
        Self::with_increments(config, clock, events, increments)
    }

    /// Create a runner with an explicit increment source.
    pub fn with_increments(
        config: LifecycleConfig,
        clock: Arc<dyn Clock>,
        events: broadcast::Sender<WsMessage>,
        increments: Box<dyn ProgressIncrement>,
    ) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                machine: DownloadLifecycle::new(config),
                increments,
            })),
            clock,
            events,
            driver: std::sync::Mutex::new(None),
        }
    }

    /// Subscribe to lifecycle events.
    pub fn subscribe(&self) -> broadcast::Receiver<WsMessage> {
        self.events.subscribe()
    }

    pub async fn snapshot(&self) -> DownloadSnapshot {
        self.inner.lock().await.machine.snapshot()
    }

    /// Choose a download option from the catalog.
    pub async fn select_option(&self, index: usize) -> LifecycleResult<DownloadSnapshot> {
        let mut inner = self.inner.lock().await;
        inner.machine.select_option(index)?;
        Ok(inner.machine.snapshot())
    }

    /// Start a new attempt and spawn its driver.
    pub async fn start(&self) -> LifecycleResult<DownloadSnapshot> {
        let mut inner = self.inner.lock().await;
        let transition = inner.machine.start()?;
        publish(&self.events, &transition);

        let attempt = transition.snapshot.attempt;
        info!(
            attempt,
            option = transition.snapshot.selected_option,
            "Simulated download started"
        );

        let handle = tokio::spawn(drive(
            Arc::clone(&self.inner),
            Arc::clone(&self.clock),
            self.events.clone(),
            attempt,
            transition,
        ));
        self.replace_driver(Some(handle));

        Ok(transition.snapshot)
    }

    /// Return a settled lifecycle to idle.
    pub async fn reset(&self) -> LifecycleResult<DownloadSnapshot> {
        let mut inner = self.inner.lock().await;
        let transition = inner.machine.reset()?;
        publish(&self.events, &transition);
        Ok(transition.snapshot)
    }

    /// Wait for the current driver, if any, to finish.
    pub async fn join_driver(&self) {
        let handle = match self.driver.lock() {
            Ok(mut guard) => guard.take(),
            Err(_) => None,
        };
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                if !e.is_cancelled() {
                    warn!("Lifecycle driver panicked: {}", e);
                }
            }
        }
    }

    /// Abort the current driver, leaving the lifecycle where it stopped.
    pub fn shutdown(&self) {
        self.replace_driver(None);
    }

    fn replace_driver(&self, handle: Option<JoinHandle<()>>) {
        if let Ok(mut guard) = self.driver.lock() {
            if let Some(previous) = std::mem::replace(&mut *guard, handle) {
                previous.abort();
            }
        }
    }
}

impl Drop for LifecycleRunner {
    fn drop(&mut self) {
        self.replace_driver(None);
    }
}

async fn drive(
    inner: Arc<Mutex<Inner>>,
    clock: Arc<dyn Clock>,
    events: broadcast::Sender<WsMessage>,
    attempt: u64,
    first: Transition,
) {
    let mut next = first.next_wakeup;

    while let Some(delay) = next {
        clock.sleep(delay).await;

        let mut guard = inner.lock().await;
        if guard.machine.attempt() != attempt {
            debug!(attempt, "Lifecycle driver superseded");
            return;
        }

        let Inner { machine, increments } = &mut *guard;
        match machine.advance(increments.as_mut()) {
            Ok(transition) => {
                publish(&events, &transition);
                next = transition.next_wakeup;
            }
            Err(e) => {
                warn!(attempt, "Lifecycle driver stopped: {}", e);
                let _ = events.send(WsMessage::error(format!("Download stopped: {}", e)));
                return;
            }
        }
    }

    info!(attempt, "Simulated download completed");
}

/// Translate a transition into stream messages.
pub fn transition_messages(transition: &Transition) -> Vec<WsMessage> {
    let snapshot = &transition.snapshot;
    let mut messages = Vec::with_capacity(2);

    if transition.is_status_change() {
        messages.push(WsMessage::status(transition.to, snapshot.attempt));
    }

    match transition.to {
        DownloadStatus::Preparing | DownloadStatus::Downloading | DownloadStatus::Converting => {
            if !transition.is_status_change() || transition.to != DownloadStatus::Downloading {
                messages.push(WsMessage::progress(snapshot.percent(), snapshot.attempt));
            }
        }
        DownloadStatus::Completed => {
            let file_label = download_option(snapshot.selected_option)
                .map(|o| o.file_label())
                .unwrap_or_else(|| "video".to_string());
            messages.push(WsMessage::Done {
                file_label,
                attempt: snapshot.attempt,
            });
        }
        DownloadStatus::Idle | DownloadStatus::Error => {}
    }

    messages
}

fn publish(events: &broadcast::Sender<WsMessage>, transition: &Transition) {
    for message in transition_messages(transition) {
        // No subscribers is fine; the snapshot remains queryable.
        let _ = events.send(message);
    }
}
