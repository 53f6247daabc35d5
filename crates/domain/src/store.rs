//! Store records replicated from the store-management context.

use common::StoreId;
use serde::{Deserialize, Serialize};

/// A store, referenced by orders and products.
///
/// Stores are created and managed by a separate bounded context; this
/// service only keeps the identifier so it can validate references.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Store {
    pub id: StoreId,
}

impl Store {
    /// Creates a store record with the caller-assigned identifier.
    pub fn new(id: StoreId) -> Self {
        Self { id }
    }
}
