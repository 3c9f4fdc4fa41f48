//! API seams consumed by the controller
//!
//! The pickup workflow is written against these traits; `HttpClient` and
//! `Gateway` are the production implementations, tests substitute recorders.

use async_trait::async_trait;
use shared::models::{Order, OrderStatus};
use shared::position::PositionSample;
use shared::{DateFilter, WireMessage};

use crate::error::{ClientResult, GatewayError};

/// Query parameters for the order list
#[derive(Debug, Clone)]
pub struct OrderQuery {
    pub start_date: String,
    pub end_date: String,
    pub sort_by: String,
    pub sort_direction: String,
}

impl OrderQuery {
    /// Standard query: a resolved filter window, ascending by order time
    pub fn for_filter(filter: DateFilter) -> Self {
        let range = filter.range();
        Self {
            start_date: range.start_param(),
            end_date: range.end_param(),
            sort_by: "orderTime".to_string(),
            sort_direction: "ASC".to_string(),
        }
    }
}

/// Order REST API
#[async_trait]
pub trait OrderApi: Send + Sync {
    async fn fetch_orders(&self, query: &OrderQuery) -> ClientResult<Vec<Order>>;
    async fn update_order_status(&self, order_id: &str, status: OrderStatus) -> ClientResult<()>;
    async fn delete_order(&self, order_id: &str) -> ClientResult<()>;
    async fn update_order(&self, order_id: &str, order: &Order) -> ClientResult<()>;
}

/// Robot position REST API
#[async_trait]
pub trait PositionApi: Send + Sync {
    async fn current_position(&self) -> ClientResult<PositionSample>;
    async fn update_position(&self, position: &str) -> ClientResult<()>;
}

/// Outbound command channel to the venue hub
///
/// `send` is best-effort: the message is queued for at least one local
/// delivery attempt, but there is no acknowledgment and no retry beyond the
/// reconnect outbox — a command can be lost if the remote peer itself is
/// unreachable.
#[async_trait]
pub trait CommandSink: Send + Sync {
    async fn send(&self, msg: WireMessage) -> Result<(), GatewayError>;
}
