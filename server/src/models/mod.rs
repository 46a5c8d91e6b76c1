//! Data models for the FlightSurety oracle server

use serde::{Deserialize, Serialize};

pub mod flight;
pub mod oracle;

pub use flight::FlightStatus;
pub use oracle::{OracleIdentity, OracleRequestEvent, OracleResponse};

/// Body returned by every HTTP route
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
