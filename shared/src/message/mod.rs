//! Gateway wire protocol
//!
//! JSON messages exchanged with the venue hub over the WebSocket channel.
//! Outbound messages drive the table displays, pickup doors and the robot
//! dispatcher; inbound messages notify payment completion and delivery
//! progress. Shapes are fixed by the hub firmware — the serde attributes
//! here pin the exact field and tag spelling on the wire.

use serde::{Deserialize, Serialize};

/// Table display command
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TableCmd {
    Ready,
}

/// Table lifecycle events
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TableEventKind {
    OrderReady,
    OrderDelivered,
    DonePickup,
    #[serde(other)]
    Unknown,
}

/// Pickup door command
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PickupCmd {
    Open,
    Close,
}

/// Payment notification status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Complete,
    #[serde(other)]
    Unknown,
}

/// Controller hello status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ControllerStatus {
    Connected,
}

/// A message on the gateway channel, tagged by `type`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WireMessage {
    Table {
        id: u32,
        cmd: TableCmd,
    },
    TableEvent {
        event: TableEventKind,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        table: Option<u32>,
    },
    Pickup {
        cmd: PickupCmd,
        table: u32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        door: Option<u32>,
    },
    Dispatch {
        tables: Vec<u32>,
    },
    Controller {
        status: ControllerStatus,
        #[serde(rename = "branchId")]
        branch_id: String,
    },
    Payment {
        status: PaymentStatus,
    },
}

impl WireMessage {
    /// `{"type":"table","id":N,"cmd":"READY"}`
    pub fn table_ready(table: u32) -> Self {
        WireMessage::Table {
            id: table,
            cmd: TableCmd::Ready,
        }
    }

    /// `{"type":"table_event","event":"ORDER_READY","table":N}`
    pub fn order_ready(table: u32) -> Self {
        WireMessage::TableEvent {
            event: TableEventKind::OrderReady,
            table: Some(table),
        }
    }

    /// `{"type":"pickup","cmd":"open","table":N,"door":M}`
    pub fn open_door(table: u32, door: u32) -> Self {
        WireMessage::Pickup {
            cmd: PickupCmd::Open,
            table,
            door: Some(door),
        }
    }

    /// `{"type":"pickup","cmd":"close","table":N}`
    ///
    /// Close carries no door: the hub closes whatever door is assigned to
    /// the table, and closing a never-opened door is a no-op downstream.
    pub fn close_door(table: u32) -> Self {
        WireMessage::Pickup {
            cmd: PickupCmd::Close,
            table,
            door: None,
        }
    }

    /// `{"type":"dispatch","tables":[...]}`
    pub fn dispatch(tables: Vec<u32>) -> Self {
        WireMessage::Dispatch { tables }
    }

    /// `{"type":"controller","status":"connected","branchId":"..."}`
    pub fn controller_hello(branch_id: impl Into<String>) -> Self {
        WireMessage::Controller {
            status: ControllerStatus::Connected,
            branch_id: branch_id.into(),
        }
    }

    /// Parse an inbound text frame. Unknown or malformed frames are dropped
    /// with a debug log; the channel never errors on foreign traffic.
    pub fn parse(text: &str) -> Option<Self> {
        match serde_json::from_str(text) {
            Ok(msg) => Some(msg),
            Err(e) => {
                tracing::debug!(error = %e, frame = text, "Ignoring unknown gateway frame");
                None
            }
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Payment-complete notifications trigger an order-list refresh
    pub fn is_payment_complete(&self) -> bool {
        matches!(
            self,
            WireMessage::Payment {
                status: PaymentStatus::Complete
            }
        )
    }
}
