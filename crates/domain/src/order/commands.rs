//! Inputs for the order lifecycle operations.

use common::{ProductId, StoreId};

use crate::client::ClientDetails;

use super::PaymentMethod;

/// Request to create a new order.
#[derive(Debug, Clone)]
pub struct NewOrder {
    /// The store the order is placed against.
    pub store_id: StoreId,

    /// How the client pays.
    pub payment_method: PaymentMethod,

    /// Requested products, validated strictly in this order.
    pub products: Vec<OrderedLine>,

    /// The client placing the order; matched by phone number against
    /// existing clients, created otherwise.
    pub client: ClientDetails,
}

/// One requested line of a new order.
#[derive(Debug, Clone, Copy)]
pub struct OrderedLine {
    pub id: ProductId,
    pub ordered_quantity: u32,
}
