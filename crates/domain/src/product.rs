//! Product records replicated from the products service.

use common::{ProductId, StoreId, Version};
use serde::{Deserialize, Serialize};

use crate::money::Money;

/// A product available within exactly one store.
///
/// Stock is decremented by order creation and must never go negative;
/// writes are version-checked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub price: Money,
    pub stock: u32,
    pub image: String,
    pub store_id: StoreId,
    pub version: Version,
}

impl Product {
    /// Builds the local record for a product replicated from the products
    /// service, starting at the initial version.
    pub fn replicated(new_product: NewProduct) -> Self {
        Self {
            id: new_product.id,
            name: new_product.name,
            price: new_product.price,
            stock: new_product.stock,
            image: new_product.image,
            store_id: new_product.store_id,
            version: Version::initial(),
        }
    }
}

/// Input for replicating a product record, identifier assigned upstream.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub id: ProductId,
    pub name: String,
    pub price: Money,
    pub stock: u32,
    pub image: String,
    pub store_id: StoreId,
}
