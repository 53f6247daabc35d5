//! Domain layer for the order service.
//!
//! This crate provides the order lifecycle manager and everything it owns:
//! - the `Order` aggregate with its status state machine
//! - replicated `Product` and `Store` records, lazily created `Client`s
//! - the storage ports (`Storage`, `StorageTx`, `with_transaction`)
//! - the `OrderError` taxonomy shared with the HTTP layer

pub mod client;
pub mod error;
pub mod money;
pub mod order;
pub mod product;
pub mod storage;
pub mod store;

pub use client::{Address, Client, ClientDetails};
pub use error::OrderError;
pub use money::Money;
pub use order::{
    EventPublisher, LineItem, NewOrder, Order, OrderCreatedEvent, OrderService, OrderStatus,
    OrderWithClient, OrderedLine, PaymentMethod, StatusChange, TracingPublisher,
};
pub use product::{NewProduct, Product};
pub use storage::{Storage, StorageError, StorageResult, StorageTx, with_transaction};
pub use store::Store;
