//! Process-wide simulated flight status

use std::sync::Arc;

use tokio::sync::RwLock;

use crate::models::FlightStatus;

/// Shared cell holding the status oracles report. Written by the HTTP
/// surface, copied out by the dispatcher at the start of each fan-out.
#[derive(Clone, Default)]
pub struct FlightStatusCell {
    inner: Arc<RwLock<FlightStatus>>,
}

impl FlightStatusCell {
    pub fn new(initial: FlightStatus) -> Self {
        Self {
            inner: Arc::new(RwLock::new(initial)),
        }
    }

    pub async fn snapshot(&self) -> FlightStatus {
        *self.inner.read().await
    }

    /// Last write wins. Returns the previous value.
    pub async fn set(&self, status: FlightStatus) -> FlightStatus {
        let mut guard = self.inner.write().await;
        std::mem::replace(&mut *guard, status)
    }
}
