//! Shared types for the kiosk workspace
//!
//! Domain models, date-filter math, robot position samples and the gateway
//! wire protocol. Used by both the network client and the controller.

pub mod dates;
pub mod message;
pub mod models;
pub mod position;

pub use dates::{DateFilter, FilterRange};
pub use message::WireMessage;
pub use models::{Order, OrderItem, OrderStatus, OrderType};
pub use position::PositionSample;
