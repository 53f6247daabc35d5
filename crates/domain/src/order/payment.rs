//! Payment methods accepted at order creation.

use serde::{Deserialize, Serialize};

/// How the client pays for an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    Cash,
    CreditCard,
}

impl PaymentMethod {
    /// Returns the method in its wire spelling.
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "CASH",
            PaymentMethod::CreditCard => "CREDIT_CARD",
        }
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serialization_uses_wire_spelling() {
        assert_eq!(
            serde_json::to_string(&PaymentMethod::CreditCard).unwrap(),
            "\"CREDIT_CARD\""
        );
        let back: PaymentMethod = serde_json::from_str("\"CASH\"").unwrap();
        assert_eq!(back, PaymentMethod::Cash);
    }
}
