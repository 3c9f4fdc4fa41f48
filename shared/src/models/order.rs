use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Order lifecycle status
///
/// Unknown statuses from newer backend versions deserialize as `Unknown`
/// so a list load never fails on a single order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    #[default]
    Pending,
    Done,
    Cancelled,
    #[serde(other)]
    Unknown,
}

/// Service type
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderType {
    #[default]
    DineIn,
    TakeOut,
    #[serde(other)]
    Unknown,
}

/// Single line item on an order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderItem {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variation: Option<String>,
    pub quantity: i32,
}

/// Order as served by the order REST API
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,
    pub order_no: i64,
    /// Table the order was placed from. Orders without a table cannot be
    /// staged for robot pickup.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_number: Option<u32>,
    pub order_status: OrderStatus,
    #[serde(default)]
    pub order_type: OrderType,
    pub total_price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cash: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change_amount: Option<f64>,
    #[serde(default)]
    pub items: Vec<OrderItem>,
    pub order_time: NaiveDateTime,
}

/// PATCH body for `/orders/{id}/status`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderStatusUpdate {
    pub order_status: OrderStatus,
}

/// Order list responses come either paged (`{"content": [...]}`) or as a
/// bare array depending on the deployment.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum OrderListResponse {
    Page { content: Vec<Order> },
    Plain(Vec<Order>),
}

impl OrderListResponse {
    pub fn into_orders(self) -> Vec<Order> {
        match self {
            OrderListResponse::Page { content } => content,
            OrderListResponse::Plain(orders) => orders,
        }
    }
}

/// Dashboard summary over a window of orders
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct OrderSummary {
    pub total_orders: usize,
    pub total_income: f64,
    pub done_orders: usize,
}

impl OrderSummary {
    pub fn of(orders: &[Order]) -> Self {
        Self {
            total_orders: orders.len(),
            total_income: orders.iter().map(|o| o.total_price).sum(),
            done_orders: orders
                .iter()
                .filter(|o| o.order_status == OrderStatus::Done)
                .count(),
        }
    }
}
