//! Client records, created lazily on first order.

use common::ClientId;
use serde::{Deserialize, Serialize};

/// Postal address of a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
}

/// A client, identified by phone number (unique natural key).
///
/// Created on the first order that carries an unknown phone number and
/// reused afterwards; never deleted by this service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    pub id: ClientId,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone_number: String,
    pub address: Address,
}

impl Client {
    /// Creates a client record from the details supplied with an order.
    pub fn from_details(details: ClientDetails) -> Self {
        Self {
            id: ClientId::new(),
            first_name: details.first_name,
            last_name: details.last_name,
            email: details.email,
            phone_number: details.phone_number,
            address: details.address,
        }
    }
}

/// Client details supplied with a new order.
#[derive(Debug, Clone)]
pub struct ClientDetails {
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone_number: String,
    pub address: Address,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_from_details_keeps_phone_number() {
        let client = Client::from_details(ClientDetails {
            first_name: "Amine".to_string(),
            last_name: "Ben Salah".to_string(),
            email: None,
            phone_number: "+216 20 123 456".to_string(),
            address: Address {
                street: "12 Rue de Marseille".to_string(),
                city: "Tunis".to_string(),
                state: "Tunis".to_string(),
                zip_code: "1001".to_string(),
            },
        });

        assert_eq!(client.phone_number, "+216 20 123 456");
        assert!(client.email.is_none());
    }
}
