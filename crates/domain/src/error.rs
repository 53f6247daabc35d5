//! Domain error types.

use common::{OrderId, ProductId, StoreId};
use thiserror::Error;

use crate::order::OrderStatus;
use crate::storage::StorageError;

/// Errors produced by the order lifecycle operations.
///
/// The variants split into a not-found class and a bad-request class, which
/// the HTTP layer maps to 404 and 400. Message texts are part of the wire
/// contract and must not change.
#[derive(Debug, Error)]
pub enum OrderError {
    /// The store referenced by a new order does not exist.
    // Capitalization differs between the creation and lookup paths; both
    // spellings are load-bearing for existing consumers.
    #[error("Store {0} Not Found")]
    StoreNotFound(StoreId),

    /// The store referenced by an order lookup does not exist.
    #[error("Store {0} not found")]
    UnknownStore(StoreId),

    /// A line item references a product that does not exist.
    #[error("Product with id {0} Not Found")]
    ProductNotFound(ProductId),

    /// A line item references a product owned by a different store.
    #[error("Product available within another store")]
    ProductOutsideStore,

    /// A line item asks for more units than the product has in stock.
    #[error("Ordered quantity is more than the available stock")]
    InsufficientStock,

    /// The order does not exist or belongs to a different store; callers
    /// cannot tell which.
    #[error("Order {0} not found in current store")]
    OrderNotFound(OrderId),

    /// The order targeted by a status update is missing, foreign, or
    /// cancelled; one indistinguishable answer for all three.
    #[error("Order Not Found in Current Store")]
    OrderNotUpdatable,

    /// The requested status change is not permitted by the state machine.
    #[error("Can't update order status from {from} to {to}")]
    InvalidStatusTransition { from: OrderStatus, to: OrderStatus },

    /// The storage layer failed.
    #[error(transparent)]
    Storage(#[from] StorageError),
}
