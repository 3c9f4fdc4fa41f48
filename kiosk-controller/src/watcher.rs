//! Robot position watcher
//!
//! Polls the position service on a fixed interval and notifies the staging
//! coordinator when the robot is parked at the staging point. The task is
//! owned through a cancellation token — no ambient timers — and a fetch
//! failure just skips the tick.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use kiosk_client::PositionApi;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

/// Default poll interval
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(3000);

/// Notified on every tick that finds the robot at the staging point
#[async_trait]
pub trait StagingPointListener: Send + Sync {
    async fn staging_point_reached(&self);
}

/// Cancellable position poller
pub struct PositionWatcher {
    positions: Arc<dyn PositionApi>,
    interval: Duration,
    cancel: Mutex<Option<CancellationToken>>,
}

impl PositionWatcher {
    pub fn new(positions: Arc<dyn PositionApi>, interval: Duration) -> Self {
        Self {
            positions,
            interval,
            cancel: Mutex::new(None),
        }
    }

    /// Start polling. No-op when already running.
    pub fn start(&self, listener: Arc<dyn StagingPointListener>) {
        let mut cancel = self.cancel.lock();
        if cancel.is_some() {
            return;
        }

        let token = CancellationToken::new();
        tokio::spawn(watch_loop(
            self.positions.clone(),
            self.interval,
            listener,
            token.clone(),
        ));
        *cancel = Some(token);
        tracing::debug!(interval_ms = self.interval.as_millis() as u64, "Position watcher started");
    }

    /// Stop polling and release the timer. No-op when not running.
    ///
    /// Cancellation is observed between ticks: a listener call already in
    /// flight runs to completion, so a door marked opened always has its
    /// command sent.
    pub fn stop(&self) {
        if let Some(token) = self.cancel.lock().take() {
            token.cancel();
            tracing::debug!("Position watcher stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.cancel.lock().is_some()
    }
}

impl Drop for PositionWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn watch_loop(
    positions: Arc<dyn PositionApi>,
    interval: Duration,
    listener: Arc<dyn StagingPointListener>,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.tick().await; // first poll one interval from now

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                match positions.current_position().await {
                    Ok(sample) if sample.is_staging_point() => {
                        listener.staging_point_reached().await;
                    }
                    Ok(sample) => {
                        tracing::trace!(key = %sample.key, "Robot not at staging point");
                    }
                    // Skip the tick, keep polling
                    Err(e) => {
                        tracing::debug!(error = %e, "Position poll failed, skipping tick");
                    }
                }
            }
        }
    }
}
