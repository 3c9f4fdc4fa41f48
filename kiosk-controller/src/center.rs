//! Pickup center
//!
//! Session glue over the staging coordinator: keeps the position watcher
//! running exactly while a pickup session is open and entries exist,
//! debounces payment-triggered board refreshes, and hosts the daemon's
//! event loop.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use kiosk_client::Gateway;
use shared::models::Order;
use shared::{DateFilter, WireMessage, message::TableEventKind};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::board::OrderBoard;
use crate::dispatch::{DispatchError, Dispatcher};
use crate::staging::{PickupStaging, StageError};
use crate::watcher::PositionWatcher;

/// Default debounce window for payment-triggered refreshes
pub const DEFAULT_REFRESH_DEBOUNCE: Duration = Duration::from_secs(3);

pub struct PickupCenter {
    board: Arc<OrderBoard>,
    staging: Arc<PickupStaging>,
    watcher: Arc<PositionWatcher>,
    dispatcher: Dispatcher,
    gateway: Gateway,
    refresh_debounce: Duration,
    session_open: AtomicBool,
}

impl PickupCenter {
    pub fn new(
        board: Arc<OrderBoard>,
        staging: Arc<PickupStaging>,
        watcher: Arc<PositionWatcher>,
        dispatcher: Dispatcher,
        gateway: Gateway,
        refresh_debounce: Duration,
    ) -> Self {
        Self {
            board,
            staging,
            watcher,
            dispatcher,
            gateway,
            refresh_debounce,
            session_open: AtomicBool::new(false),
        }
    }

    /// Stage an order for pickup and open the session
    pub async fn mark_as_done(&self, order: &Order) -> Result<(), StageError> {
        self.staging.stage(order).await?;
        self.session_open.store(true, Ordering::Release);
        self.sync_watcher();
        Ok(())
    }

    /// Manually un-stage a table; closes the session when it empties
    pub fn remove_staged(&self, table: u32) -> bool {
        let removed = self.staging.remove(table);
        if self.staging.is_empty() {
            self.close_session();
        }
        removed
    }

    /// Dispatch all staged orders; closes the session once the set clears
    pub async fn dispatch_all(&self) -> Result<(), DispatchError> {
        let result = self.dispatcher.dispatch_all().await;
        if self.staging.is_empty() {
            self.close_session();
        } else {
            self.sync_watcher();
        }
        result
    }

    pub fn is_session_open(&self) -> bool {
        self.session_open.load(Ordering::Acquire)
    }

    /// Close the pickup session without touching staged entries
    pub fn close_session(&self) {
        self.session_open.store(false, Ordering::Release);
        self.watcher.stop();
    }

    /// Watcher runs exactly while the session is open and entries exist
    fn sync_watcher(&self) {
        if self.session_open.load(Ordering::Acquire) && !self.staging.is_empty() {
            self.watcher.start(self.staging.clone());
        } else {
            self.watcher.stop();
        }
    }

    /// React to one inbound hub message; returns the refresh delay to
    /// schedule, if any. The run loop replaces any pending deadline with
    /// the returned one, so bursts collapse into a single refresh.
    pub fn on_gateway_message(&self, msg: &WireMessage) -> Option<Duration> {
        match msg {
            m if m.is_payment_complete() => {
                tracing::debug!("Payment complete, scheduling order refresh");
                Some(self.refresh_debounce)
            }
            WireMessage::TableEvent { event, table } => {
                if matches!(
                    event,
                    TableEventKind::OrderDelivered | TableEventKind::DonePickup
                ) {
                    // Status is committed by the dispatch flow, not here
                    tracing::debug!(?event, ?table, "Delivery progress event");
                }
                None
            }
            _ => None,
        }
    }

    /// Daemon loop: pump gateway events and debounced refreshes until
    /// shutdown. Teardown stops the watcher and closes the gateway so no
    /// callback fires after this returns.
    pub async fn run(&self, shutdown: CancellationToken) {
        let mut events = self.gateway.subscribe();
        self.board.load(DateFilter::Today).await;

        let mut refresh_deadline: Option<Instant> = None;
        loop {
            let sleep_until =
                refresh_deadline.unwrap_or_else(|| Instant::now() + Duration::from_secs(3600));

            tokio::select! {
                _ = shutdown.cancelled() => break,

                _ = tokio::time::sleep_until(sleep_until), if refresh_deadline.is_some() => {
                    refresh_deadline = None;
                    self.board.refresh().await;
                }

                event = events.recv() => {
                    match event {
                        Ok(msg) => {
                            if let Some(delay) = self.on_gateway_message(&msg) {
                                refresh_deadline = Some(Instant::now() + delay);
                            }
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                            tracing::warn!(missed = n, "Gateway events lagged, refreshing");
                            refresh_deadline = Some(Instant::now());
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                    }
                }
            }
        }

        self.close_session();
        self.gateway.close();
        tracing::info!("Pickup center stopped");
    }
}
