//! Domain events
use rust_decimal::Decimal;

#[derive(Clone, Debug, PartialEq)]
pub enum DomainEvent {
    Product(ProductEvent),
    Order(OrderEvent),
}

#[derive(Clone, Debug, PartialEq)]
pub enum ProductEvent {
    Created { product_id: String, name: String },
}

#[derive(Clone, Debug, PartialEq)]
pub enum OrderEvent {
    Placed { order_id: String, customer_name: String, total: Decimal },
    StatusChanged { order_id: String, from: String, to: String },
}

impl DomainEvent {
    /// Emit the event as a structured log line.
    pub fn log(&self) {
        match self {
            Self::Product(ProductEvent::Created { product_id, name }) => {
                tracing::info!(product_id = %product_id, name = %name, "product created");
            }
            Self::Order(OrderEvent::Placed { order_id, customer_name, total }) => {
                tracing::info!(order_id = %order_id, customer = %customer_name, total = %total, "order placed");
            }
            Self::Order(OrderEvent::StatusChanged { order_id, from, to }) => {
                tracing::info!(order_id = %order_id, from = %from, to = %to, "order status changed");
            }
        }
    }
}
