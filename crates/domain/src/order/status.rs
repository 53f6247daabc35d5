//! Order status state machine.

use serde::{Deserialize, Serialize};

/// The status of an order in its lifecycle.
///
/// ```text
/// PENDING ──┬──► CONFIRMED
///           │
///           └──► CANCELLED
/// ```
///
/// `CANCELLED` is terminal and cancelled orders are excluded from update
/// lookups entirely; `CONFIRMED` permits no further transition beyond the
/// no-op re-confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// Order has been placed and awaits a decision by the store owner.
    #[default]
    Pending,

    /// Order has been confirmed by the store owner.
    Confirmed,

    /// Order was cancelled (terminal).
    Cancelled,
}

impl OrderStatus {
    /// Returns true if this is a terminal status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Cancelled)
    }

    /// Returns the status in its wire spelling.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Confirmed => "CONFIRMED",
            OrderStatus::Cancelled => "CANCELLED",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
