//! Order domain models
//!
//! These mirror the order service's REST payloads. The kiosk only reads
//! orders and requests status transitions; it never owns the data.

mod order;

pub use order::*;
