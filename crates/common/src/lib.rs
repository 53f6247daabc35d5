//! Shared types used across the order service crates.

mod types;
mod version;

pub use types::{ClientId, OrderId, ProductId, StoreId};
pub use version::Version;
