use axum::{
    extract::{Path, State},
    Json,
};
use tracing::info;

use crate::models::{FlightStatus, MessageResponse};
use crate::services::flight_status::FlightStatusCell;

pub async fn api_root() -> Json<MessageResponse> {
    Json(MessageResponse::new("An API for use with your Dapp!"))
}

/// Sets the status every oracle reports from now on. Any segment other
/// than `10`..`50` selects `UNKNOWN`.
pub async fn set_flight_status(
    State(flight_status): State<FlightStatusCell>,
    Path(raw): Path<String>,
) -> Json<MessageResponse> {
    let status = FlightStatus::from_param(&raw);
    let previous = flight_status.set(status).await;

    info!(requested = %raw, %previous, current = %status, "flight status updated");

    Json(MessageResponse::new(format!("Status changed to: {}", status.label())))
}
