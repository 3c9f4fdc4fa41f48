//! Dispatch committer
//!
//! The batch action that sends the robot on its way: close every staged
//! door, emit one aggregate dispatch command, then commit DONE statuses
//! order by order. Status commits are sequential so the audit trail in the
//! order service matches the table dispatch order.

use std::sync::Arc;

use kiosk_client::{ClientError, CommandSink, OrderApi};
use shared::WireMessage;
use shared::models::OrderStatus;
use thiserror::Error;

use crate::board::OrderBoard;
use crate::notify::{CONTACT_ADMIN, Notifier};
use crate::staging::{PickupStaging, StagedEntry};

#[derive(Debug, Error)]
pub enum DispatchError {
    /// A DONE commit failed; earlier entries are already committed and
    /// retired, this and later entries remain staged.
    #[error("Failed to mark order #{order_no} as DONE: {source}")]
    Commit {
        order_no: i64,
        #[source]
        source: ClientError,
    },
}

pub struct Dispatcher {
    staging: Arc<PickupStaging>,
    board: Arc<OrderBoard>,
    orders: Arc<dyn OrderApi>,
    commands: Arc<dyn CommandSink>,
    notifier: Arc<dyn Notifier>,
}

impl Dispatcher {
    pub fn new(
        staging: Arc<PickupStaging>,
        board: Arc<OrderBoard>,
        orders: Arc<dyn OrderApi>,
        commands: Arc<dyn CommandSink>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            staging,
            board,
            orders,
            commands,
            notifier,
        }
    }

    /// Dispatch every staged order and commit its DONE status.
    ///
    /// A no-op (zero commands, zero REST calls) when nothing is staged or
    /// when another dispatch is already in flight. A commit failure aborts
    /// the remainder: committed entries are retired, the failed entry and
    /// everything after it stay staged for the operator to retry.
    pub async fn dispatch_all(&self) -> Result<(), DispatchError> {
        if self.staging.is_empty() {
            return Ok(());
        }
        if !self.staging.begin_dispatch() {
            tracing::debug!("Dispatch already in flight, ignoring");
            return Ok(());
        }

        let staged = self.staging.snapshot();
        let result = self.run(&staged).await;
        self.staging.finish_dispatch();

        match &result {
            Ok(()) => {
                // Refresh failures only notify; the dispatch itself is done.
                self.board.refresh().await;
                self.notifier.success("Dispatched. Orders marked DONE.");
            }
            Err(e) => {
                tracing::error!(error = %e, "Dispatch aborted");
                self.notifier.error(CONTACT_ADMIN);
            }
        }
        result
    }

    async fn run(&self, staged: &[StagedEntry]) -> Result<(), DispatchError> {
        // Close every staged door, opened or not — closing a shut door is a
        // harmless no-op downstream.
        for entry in staged {
            if let Err(e) = self
                .commands
                .send(WireMessage::close_door(entry.table))
                .await
            {
                tracing::warn!(table = entry.table, error = %e, "Door-close command not sent");
            }
        }

        let tables: Vec<u32> = staged.iter().map(|e| e.table).collect();
        if let Err(e) = self.commands.send(WireMessage::dispatch(tables)).await {
            tracing::warn!(error = %e, "Dispatch command not sent");
        }

        // Commit DONE after dispatch, in table order. Retire each entry as
        // its commit lands so an abort leaves exactly the unresolved ones.
        for entry in staged {
            match self
                .orders
                .update_order_status(&entry.order_id, OrderStatus::Done)
                .await
            {
                Ok(()) => {
                    self.staging.remove(entry.table);
                    tracing::info!(
                        order_no = entry.order_no,
                        table = entry.table,
                        "Order dispatched and marked DONE"
                    );
                }
                Err(source) => {
                    return Err(DispatchError::Commit {
                        order_no: entry.order_no,
                        source,
                    });
                }
            }
        }

        Ok(())
    }
}
