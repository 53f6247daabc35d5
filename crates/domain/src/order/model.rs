//! The order aggregate.

use chrono::{DateTime, Utc};
use common::{ClientId, OrderId, ProductId, StoreId, Version};
use serde::{Deserialize, Serialize};

use crate::client::Client;
use crate::error::OrderError;
use crate::money::Money;

use super::{PaymentMethod, status::OrderStatus};

/// One line of an order: a product reference with the ordered quantity and
/// the unit price snapshotted at validation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub product_id: ProductId,
    pub ordered_quantity: u32,
    pub unit_price: Money,
}

impl LineItem {
    /// Returns the total price for this line (unit price * quantity).
    pub fn total_price(&self) -> Money {
        self.unit_price.multiply(self.ordered_quantity)
    }
}

/// An order placed by a client against one store.
///
/// The order exclusively owns its line-item snapshot; client and store are
/// referenced by identifier. Orders are never deleted: cancellation is a
/// status, not a removal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub order_date: DateTime<Utc>,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub total_price: Money,
    pub store_id: StoreId,
    pub client_id: ClientId,
    pub items: Vec<LineItem>,

    /// Bumped on every persisted mutation; stale writes are rejected.
    #[serde(default)]
    pub version: Version,
}

/// Outcome of a status transition request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusChange {
    /// The status changed; the order must be persisted.
    Applied,
    /// The requested status equals the current one; nothing to persist.
    Unchanged,
}

impl Order {
    /// Builds a new PENDING order from validated line items. The total is
    /// derived from the snapshotted unit prices and never recomputed.
    pub fn place(
        store_id: StoreId,
        client_id: ClientId,
        payment_method: PaymentMethod,
        items: Vec<LineItem>,
        order_date: DateTime<Utc>,
    ) -> Self {
        let total_price = items.iter().map(LineItem::total_price).sum();
        Self {
            id: OrderId::new(),
            order_date,
            status: OrderStatus::Pending,
            payment_method,
            total_price,
            store_id,
            client_id,
            items,
            version: Version::initial(),
        }
    }

    /// Applies a requested status change, matching exhaustively over the
    /// (current, requested) pair so that unhandled combinations are a
    /// compile error rather than a silent fall-through.
    pub fn transition_status(&mut self, requested: OrderStatus) -> Result<StatusChange, OrderError> {
        use OrderStatus::*;

        match (self.status, requested) {
            // Cancelled orders are filtered out of update lookups; answer
            // with the same not-found the lookup would have produced.
            (Cancelled, _) => Err(OrderError::OrderNotUpdatable),
            (Pending, Confirmed) | (Pending, Cancelled) => {
                self.status = requested;
                Ok(StatusChange::Applied)
            }
            (Pending, Pending) | (Confirmed, Confirmed) => Ok(StatusChange::Unchanged),
            (Confirmed, requested) => Err(OrderError::InvalidStatusTransition {
                from: Confirmed,
                to: requested,
            }),
        }
    }
}

/// An order paired with its client record, as returned by the store-scoped
/// read operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderWithClient {
    pub order: Order,
    pub client: Client,
}
