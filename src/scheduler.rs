//! Per-page refresh scheduler.
//!
//! DESIGN
//! ======
//! One timer per page. Each tick fans out to every registered [`Refresh`]
//! callback in registration order. The first tick fires immediately, so
//! starting (or becoming visible again) refreshes at once.
//!
//! Lifecycle is explicit: `Hidden` pauses the timer, `Visible` resumes it,
//! `Unload` stops it for good. Dropping the scheduler aborts its task.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::error::ClientError;

/// A widget or controller refreshed on every tick.
#[async_trait::async_trait]
pub trait Refresh: Send + Sync {
    fn name(&self) -> &str;

    /// # Errors
    ///
    /// A failure is logged by the scheduler; it does not stop other callbacks.
    async fn refresh(&self) -> Result<(), ClientError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageEvent {
    Hidden,
    Visible,
    Unload,
}

type Callbacks = Arc<Mutex<Vec<Arc<dyn Refresh>>>>;

pub struct RefreshScheduler {
    period: Duration,
    callbacks: Callbacks,
    task: Option<JoinHandle<()>>,
    unloaded: bool,
}

impl RefreshScheduler {
    #[must_use]
    pub fn new(period: Duration) -> Self {
        Self { period, callbacks: Arc::new(Mutex::new(Vec::new())), task: None, unloaded: false }
    }

    /// Add a callback. Takes effect from the next tick.
    pub fn register(&self, callback: Arc<dyn Refresh>) {
        info!(name = callback.name(), "refresh callback registered");
        self.callbacks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(callback);
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Start ticking. No-op when already running or after `Unload`.
    pub fn start(&mut self) {
        if self.unloaded || self.is_running() {
            return;
        }
        let callbacks = Arc::clone(&self.callbacks);
        let period = self.period;
        debug!(period_secs = period.as_secs(), "refresh timer started");
        self.task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                run_once(&callbacks).await;
            }
        }));
    }

    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            debug!("refresh timer stopped");
        }
    }

    pub fn on_lifecycle(&mut self, event: PageEvent) {
        match event {
            PageEvent::Hidden => self.stop(),
            PageEvent::Visible => self.start(),
            PageEvent::Unload => {
                self.unloaded = true;
                self.stop();
            }
        }
    }
}

impl Drop for RefreshScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn run_once(callbacks: &Callbacks) {
    let snapshot: Vec<Arc<dyn Refresh>> = callbacks
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .clone();
    for callback in snapshot {
        if let Err(e) = callback.refresh().await {
            warn!(name = callback.name(), error = %e, code = e.error_code(), "refresh failed");
        }
    }
}

#[cfg(test)]
#[path = "scheduler_test.rs"]
mod tests;
