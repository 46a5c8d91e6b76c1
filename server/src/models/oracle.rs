use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};

use super::flight::FlightStatus;

/// A registered oracle account and the three indexes the app contract gave it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleIdentity {
    pub account: Address,
    pub indexes: [u8; 3],
}

impl OracleIdentity {
    pub fn new(account: Address, indexes: [u8; 3]) -> Self {
        Self { account, indexes }
    }

    pub fn owns(&self, index: u8) -> bool {
        self.indexes.contains(&index)
    }
}

/// Decoded `OracleRequest` event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleRequestEvent {
    pub index: u8,
    pub airline: Address,
    pub flight: String,
    pub timestamp: U256,
}

/// Arguments of one `submitOracleResponse` transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleResponse {
    pub index: u8,
    pub airline: Address,
    pub flight: String,
    pub timestamp: U256,
    pub status: FlightStatus,
}

impl OracleResponse {
    pub fn answering(request: &OracleRequestEvent, status: FlightStatus) -> Self {
        Self {
            index: request.index,
            airline: request.airline,
            flight: request.flight.clone(),
            timestamp: request.timestamp,
            status,
        }
    }
}
