//! Application state shared across handlers

use axum::extract::FromRef;

use crate::services::flight_status::FlightStatusCell;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub flight_status: FlightStatusCell,
}

impl AppState {
    pub fn new(flight_status: FlightStatusCell) -> Self {
        Self { flight_status }
    }
}

impl FromRef<AppState> for FlightStatusCell {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.flight_status.clone()
    }
}
