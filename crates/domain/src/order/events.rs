//! Order events published towards the other services.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{OrderId, ProductId, StoreId};
use serde::{Deserialize, Serialize};

use super::model::Order;

/// Stock movement caused by one order line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderedStock {
    pub product_id: ProductId,
    pub ordered_quantity: u32,
}

/// Published after an order has been committed, so the products service
/// can learn about the new stock levels.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderCreatedEvent {
    pub order_id: OrderId,
    pub store_id: StoreId,
    pub order_date: DateTime<Utc>,
    pub total_price_cents: i64,
    pub items: Vec<OrderedStock>,
}

impl OrderCreatedEvent {
    /// Builds the event payload from a committed order.
    pub fn from_order(order: &Order) -> Self {
        Self {
            order_id: order.id,
            store_id: order.store_id,
            order_date: order.order_date,
            total_price_cents: order.total_price.cents(),
            items: order
                .items
                .iter()
                .map(|item| OrderedStock {
                    product_id: item.product_id,
                    ordered_quantity: item.ordered_quantity,
                })
                .collect(),
        }
    }
}

/// Best-effort event publication.
///
/// Called after the order transaction has committed; implementations must
/// not fail the order on publication problems.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn order_created(&self, event: OrderCreatedEvent);
}

/// Publisher that writes events to the log, for deployments without a
/// message broker.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingPublisher;

#[async_trait]
impl EventPublisher for TracingPublisher {
    async fn order_created(&self, event: OrderCreatedEvent) {
        tracing::info!(
            order_id = %event.order_id,
            store_id = %event.store_id,
            total_price_cents = event.total_price_cents,
            items = event.items.len(),
            "order created"
        );
    }
}
