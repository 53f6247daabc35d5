//! Storage adapters for the order service.
//!
//! Implements the `domain` storage ports twice: [`MemoryStorage`] keeps
//! everything behind a single writer lock for tests and local runs, and
//! [`PostgresStorage`] persists through `sqlx` with real transactions and
//! version-checked writes.

mod memory;
mod postgres;

pub use memory::MemoryStorage;
pub use postgres::PostgresStorage;
