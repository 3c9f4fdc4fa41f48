//! Kiosk Client - network edge for the pickup controller
//!
//! HTTP calls to the order and robot-position REST APIs, and the event
//! gateway over WebSocket for door/table/dispatch commands.

pub mod api;
pub mod config;
pub mod error;
pub mod gateway;
pub mod http;

pub use api::{CommandSink, OrderApi, OrderQuery, PositionApi};
pub use config::ClientConfig;
pub use error::{ClientError, ClientResult, GatewayError};
pub use gateway::Gateway;
pub use http::HttpClient;
