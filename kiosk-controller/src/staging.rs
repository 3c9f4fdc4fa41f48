//! Pickup staging coordinator
//!
//! Holds the set of orders staged for robot pickup (at most 3, one per
//! table) and drives each entry through its door lifecycle:
//!
//! ```text
//! Staged ──ready sent──▶ ReadySent ──door opened──▶ DoorOpened ──▶ removed
//! ```
//!
//! Doors open either immediately at staging time (robot already parked at
//! the staging point) or later when the position watcher reports arrival.
//! All mutations of the staged set happen under one lock acquisition so
//! capacity and duplicate checks hold under concurrent triggers.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use kiosk_client::{CommandSink, PositionApi};
use parking_lot::Mutex;
use shared::WireMessage;
use shared::models::Order;
use thiserror::Error;

use crate::doors::DoorPolicy;
use crate::notify::Notifier;
use crate::watcher::StagingPointListener;

/// Staging capacity — the robot has three doored compartments
pub const MAX_STAGED: usize = 3;

/// Door lifecycle of a staged entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageState {
    /// Entry created, ready command not yet transmitted
    Staged,
    /// Ready command transmitted, door still shut
    ReadySent,
    /// Door-open command transmitted; never reverts except by removal
    DoorOpened,
}

/// One order staged for pickup
#[derive(Debug, Clone, PartialEq)]
pub struct StagedEntry {
    pub order_id: String,
    pub order_no: i64,
    pub table: u32,
    pub door: u32,
    pub state: StageState,
}

/// Why a stage request was rejected (no side effect in every case)
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StageError {
    #[error("No table. Cannot stage.")]
    NoTable,
    #[error("Table {0} is already staged.")]
    DuplicateTable(u32),
    #[error("Max {MAX_STAGED} staged.")]
    Full,
    #[error("Dispatch in progress. Try again shortly.")]
    DispatchInFlight,
}

/// Staging coordinator
pub struct PickupStaging {
    entries: Mutex<Vec<StagedEntry>>,
    /// Set for the duration of a dispatch; stage requests are rejected
    /// while it holds.
    dispatching: AtomicBool,
    commands: Arc<dyn CommandSink>,
    positions: Arc<dyn PositionApi>,
    doors: Arc<dyn DoorPolicy>,
    notifier: Arc<dyn Notifier>,
}

impl PickupStaging {
    pub fn new(
        commands: Arc<dyn CommandSink>,
        positions: Arc<dyn PositionApi>,
        doors: Arc<dyn DoorPolicy>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            dispatching: AtomicBool::new(false),
            commands,
            positions,
            doors,
            notifier,
        }
    }

    /// Stage an order for pickup.
    ///
    /// On success the entry is created, the table's READY commands are sent,
    /// and the door opens now if the robot is already at the staging point
    /// (otherwise the watcher opens it on a later tick). Rejections surface
    /// a warning and leave the staged set untouched. No order status is
    /// committed here — that happens at dispatch.
    pub async fn stage(&self, order: &Order) -> Result<(), StageError> {
        let (table, door) = match self.try_insert(order) {
            Ok(slot) => slot,
            Err(e) => {
                tracing::warn!(order_no = order.order_no, error = %e, "Stage rejected");
                self.notifier.warning(&e.to_string());
                return Err(e);
            }
        };

        // Ready commands first; the entry only advances once they are on
        // their way to the hub.
        let ready_sent = self
            .commands
            .send(WireMessage::table_ready(table))
            .await
            .is_ok()
            && self
                .commands
                .send(WireMessage::order_ready(table))
                .await
                .is_ok();
        if ready_sent {
            self.advance(table, StageState::Staged, StageState::ReadySent);
        } else {
            tracing::warn!(table, "Ready command not sent, entry left in Staged");
        }

        // If the robot is already parked, open now; a fetch failure just
        // defers to the watcher.
        match self.positions.current_position().await {
            Ok(sample) if sample.is_staging_point() => {
                self.open_ready_doors().await;
            }
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(error = %e, "Position check at staging time failed");
            }
        }

        self.notifier.success(&format!(
            "Staged Order #{} for Table {table}",
            order.order_no
        ));
        Ok(())
    }

    /// Validate and insert under a single lock acquisition
    fn try_insert(&self, order: &Order) -> Result<(u32, u32), StageError> {
        if self.dispatching.load(Ordering::Acquire) {
            return Err(StageError::DispatchInFlight);
        }
        let table = order.table_number.ok_or(StageError::NoTable)?;
        let door = self.doors.door_for(table);

        let mut entries = self.entries.lock();
        if entries.iter().any(|e| e.table == table) {
            return Err(StageError::DuplicateTable(table));
        }
        if entries.len() >= MAX_STAGED {
            return Err(StageError::Full);
        }
        entries.push(StagedEntry {
            order_id: order.id.clone(),
            order_no: order.order_no,
            table,
            door,
            state: StageState::Staged,
        });
        Ok((table, door))
    }

    /// Open the door of every entry whose ready command has gone out.
    ///
    /// Entries are marked `DoorOpened` in the same lock acquisition that
    /// selects them, so concurrent triggers (watcher tick racing a stage
    /// call) can never send a second open for the same table. Entries still
    /// in `Staged` are left for their own stage call to finish.
    pub async fn open_ready_doors(&self) {
        let to_open: Vec<(u32, u32)> = {
            let mut entries = self.entries.lock();
            entries
                .iter_mut()
                .filter(|e| e.state == StageState::ReadySent)
                .map(|e| {
                    e.state = StageState::DoorOpened;
                    (e.table, e.door)
                })
                .collect()
        };

        for (table, door) in to_open {
            if let Err(e) = self.commands.send(WireMessage::open_door(table, door)).await {
                tracing::warn!(table, error = %e, "Door-open command not sent");
            }
        }
    }

    /// Manual removal of a staged entry, no status change in the backend
    pub fn remove(&self, table: u32) -> bool {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|e| e.table != table);
        entries.len() < before
    }

    /// Manual door override: send only, entry state untouched
    pub async fn open_door(&self, table: u32) {
        let door = self.doors.door_for(table);
        let _ = self.commands.send(WireMessage::open_door(table, door)).await;
    }

    /// Manual door override: send only, entry state untouched
    pub async fn close_door(&self, table: u32) {
        let _ = self.commands.send(WireMessage::close_door(table)).await;
    }

    pub fn snapshot(&self) -> Vec<StagedEntry> {
        self.entries.lock().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether any staged door is still waiting to open
    pub fn has_pending_doors(&self) -> bool {
        self.entries
            .lock()
            .iter()
            .any(|e| e.state != StageState::DoorOpened)
    }

    /// Take the dispatch guard. Returns false when a dispatch is already in
    /// flight.
    pub(crate) fn begin_dispatch(&self) -> bool {
        self.dispatching
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub(crate) fn finish_dispatch(&self) {
        self.dispatching.store(false, Ordering::Release);
    }

    fn advance(&self, table: u32, from: StageState, to: StageState) {
        let mut entries = self.entries.lock();
        if let Some(entry) = entries.iter_mut().find(|e| e.table == table)
            && entry.state == from
        {
            entry.state = to;
        }
    }
}

#[async_trait]
impl StagingPointListener for PickupStaging {
    async fn staging_point_reached(&self) {
        self.open_ready_doors().await;
    }
}
