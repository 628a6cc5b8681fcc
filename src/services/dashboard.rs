//! Admin dashboard figures.

use std::cmp::Reverse;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::domain::aggregates::{Order, OrderStatus};
use crate::domain::value_objects::Money;
use crate::services::{CatalogService, OrderService};

const RECENT_ORDERS: usize = 5;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub product_count: usize,
    pub order_count: usize,
    pub today_orders: usize,
    pub pending_orders: usize,
    /// Sum of every order's recorded total, two decimals.
    pub revenue: String,
    pub currency: String,
    pub recent_orders: Vec<Order>,
    pub product_source: Option<&'static str>,
    pub order_source: Option<&'static str>,
}

impl DashboardStats {
    /// Figures for a product count and an order list, with "today" being `today`.
    pub fn compute(product_count: usize, mut orders: Vec<Order>, currency: &str, today: NaiveDate) -> Self {
        let today_orders = orders.iter().filter(|o| o.placed_at().is_some_and(|t| t.date_naive() == today)).count();
        let pending_orders = orders.iter().filter(|o| o.status == OrderStatus::New).count();
        let revenue = Money::new(orders.iter().map(Order::recorded_total).sum::<Decimal>(), currency);
        let order_count = orders.len();

        orders.sort_by_key(|o| Reverse(o.placed_at()));
        orders.truncate(RECENT_ORDERS);

        Self {
            product_count,
            order_count,
            today_orders,
            pending_orders,
            revenue: revenue.to_fixed(),
            currency: revenue.currency().to_string(),
            recent_orders: orders,
            product_source: None,
            order_source: None,
        }
    }
}

#[derive(Debug)]
pub struct DashboardService {
    catalog: Arc<CatalogService>,
    orders: Arc<OrderService>,
}

impl DashboardService {
    pub fn new(catalog: Arc<CatalogService>, orders: Arc<OrderService>) -> Self { Self { catalog, orders } }

    pub async fn stats(&self) -> DashboardStats {
        let (products, orders) = tokio::join!(self.catalog.list_products(None), self.orders.list_orders(None));
        let mut stats = DashboardStats::compute(products.items.len(), orders.items, self.orders.currency(), Utc::now().date_naive());
        stats.product_source = products.source;
        stats.order_source = orders.source;
        stats
    }
}
