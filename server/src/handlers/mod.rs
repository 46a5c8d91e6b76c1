//! API handlers for the oracle server

pub mod status;

pub use status::{api_root, set_flight_status};
