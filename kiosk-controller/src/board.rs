//! Order board
//!
//! Read model of the order list for the currently selected date window.
//! A failed reload keeps the previous list — and never touches staging
//! state — so the counter keeps working through a flaky backend.

use std::sync::Arc;

use kiosk_client::{OrderApi, OrderQuery};
use parking_lot::Mutex;
use shared::DateFilter;
use shared::models::{Order, OrderSummary};

use crate::notify::{CONTACT_ADMIN, Notifier};

pub struct OrderBoard {
    api: Arc<dyn OrderApi>,
    notifier: Arc<dyn Notifier>,
    filter: Mutex<DateFilter>,
    orders: Mutex<Vec<Order>>,
}

impl OrderBoard {
    pub fn new(api: Arc<dyn OrderApi>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            api,
            notifier,
            filter: Mutex::new(DateFilter::default()),
            orders: Mutex::new(Vec::new()),
        }
    }

    /// Switch the date window and reload
    pub async fn load(&self, filter: DateFilter) {
        *self.filter.lock() = filter;
        self.refresh().await;
    }

    /// Reload the current window, ascending by order time
    pub async fn refresh(&self) {
        let filter = *self.filter.lock();
        match self.api.fetch_orders(&OrderQuery::for_filter(filter)).await {
            Ok(orders) => {
                tracing::debug!(count = orders.len(), ?filter, "Order board refreshed");
                *self.orders.lock() = orders;
            }
            Err(e) => {
                tracing::warn!(error = %e, ?filter, "Order board refresh failed");
                self.notifier.error(CONTACT_ADMIN);
            }
        }
    }

    pub fn filter(&self) -> DateFilter {
        *self.filter.lock()
    }

    pub fn orders(&self) -> Vec<Order> {
        self.orders.lock().clone()
    }

    pub fn summary(&self) -> OrderSummary {
        OrderSummary::of(&self.orders.lock())
    }
}
