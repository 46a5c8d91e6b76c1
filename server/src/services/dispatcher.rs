//! Request dispatcher - fans an `OracleRequest` out to the oracles that own
//! its index

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::chain::{ChainClient, ChainError};
use crate::models::{FlightStatus, OracleRequestEvent, OracleResponse};
use crate::services::flight_status::FlightStatusCell;
use crate::services::oracle_registry::OracleRegistry;
use crate::services::response_submitter::{ResponseSubmitter, SubmissionOutcome};

/// Result of one fan-out
#[derive(Debug)]
pub struct DispatchReport {
    pub id: Uuid,
    pub received_at: DateTime<Utc>,
    pub request: OracleRequestEvent,
    /// Status snapshot every submission of this fan-out carried.
    pub status: FlightStatus,
    /// One entry per matched oracle, in registration order.
    pub outcomes: Vec<SubmissionOutcome>,
}

impl DispatchReport {
    pub fn matched(&self) -> usize {
        self.outcomes.len()
    }

    pub fn failures(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.succeeded()).count()
    }
}

pub struct Dispatcher<C> {
    registry: OracleRegistry,
    status: FlightStatusCell,
    submitter: ResponseSubmitter<C>,
    reports: Option<mpsc::UnboundedSender<Arc<DispatchReport>>>,
}

impl<C: ChainClient> Dispatcher<C> {
    pub fn new(registry: OracleRegistry, status: FlightStatusCell, submitter: ResponseSubmitter<C>) -> Self {
        Self {
            registry,
            status,
            submitter,
            reports: None,
        }
    }

    /// Publishes every finished fan-out on `reports`.
    pub fn with_reports(mut self, reports: mpsc::UnboundedSender<Arc<DispatchReport>>) -> Self {
        self.reports = Some(reports);
        self
    }

    /// Starts one submission per oracle owning `request.index` and returns
    /// without waiting for them. The handle resolves to the report once all
    /// submissions have settled.
    ///
    /// Redelivering the same request dispatches it again.
    pub async fn on_request(&self, request: OracleRequestEvent) -> JoinHandle<Arc<DispatchReport>> {
        let received_at = Utc::now();
        let id = Uuid::new_v4();
        let status = self.status.snapshot().await;
        let matched = self.registry.matching(request.index).await;

        let mut submissions = JoinSet::new();
        for (position, oracle) in matched.into_iter().enumerate() {
            info!(
                dispatch = %id,
                oracle = %oracle.account,
                indexes = ?oracle.indexes,
                "Oracle triggered"
            );
            let submitter = self.submitter.clone();
            let response = OracleResponse::answering(&request, status);
            submissions.spawn(async move { (position, submitter.submit(&oracle, response).await) });
        }

        let reports = self.reports.clone();
        tokio::spawn(async move {
            let mut outcomes = Vec::with_capacity(submissions.len());
            while let Some(joined) = submissions.join_next().await {
                match joined {
                    Ok(outcome) => outcomes.push(outcome),
                    Err(err) => error!(dispatch = %id, error = %err, "submission task aborted"),
                }
            }
            outcomes.sort_by_key(|(position, _)| *position);

            let report = Arc::new(DispatchReport {
                id,
                received_at,
                request,
                status,
                outcomes: outcomes.into_iter().map(|(_, outcome)| outcome).collect(),
            });

            if let Some(reports) = reports {
                let _ = reports.send(report.clone());
            }
            report
        })
    }

    /// Consumes the listener's channel until it closes. Errors delivered by
    /// the subscription are logged; events are dispatched in arrival order.
    pub async fn run(self, mut events: mpsc::Receiver<Result<OracleRequestEvent, ChainError>>) {
        while let Some(item) = events.recv().await {
            match item {
                Ok(request) => {
                    info!(
                        index = request.index,
                        airline = %request.airline,
                        flight = %request.flight,
                        timestamp = %request.timestamp,
                        "Triggered index: {}",
                        request.index
                    );
                    // Fan-outs settle on their own; their reports go to the channel.
                    drop(self.on_request(request).await);
                }
                Err(err) => warn!(error = %err, "oracle request subscription error"),
            }
        }

        info!("oracle request stream closed; dispatcher stopping");
    }
}
