//! FlightSurety Oracle Server
//!
//! Registers a pool of simulated oracles with the FlightSuretyApp contract,
//! answers every `OracleRequest` with the currently selected flight status,
//! and exposes a small HTTP API to change that status.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::sync::mpsc;
use tokio::time::{sleep, Duration};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use flightsurety_server::app_state::AppState;
use flightsurety_server::chain::{FlightSuretyApp, FlightSuretyData, JsonRpcChain};
use flightsurety_server::config::RelayConfig;
use flightsurety_server::event_listener::{EventListener, ListenerError};
use flightsurety_server::models::FlightStatus;
use flightsurety_server::routes::build_router;
use flightsurety_server::services::{
    DispatchReport, Dispatcher, FlightStatusCell, OracleRegistry, ResponseSubmitter,
};

const LISTENER_SUPERVISOR_MAX_BACKOFF_SECONDS: u64 = 30;
const REQUEST_CHANNEL_CAPACITY: usize = 256;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = RelayConfig::from_env().context("failed to load relay configuration")?;
    info!(
        rpc_url = %config.contracts.rpc_url,
        app = %config.contracts.app_address,
        data = %config.contracts.data_address,
        oracles = config.oracle_count,
        "Configuration loaded"
    );

    let chain = Arc::new(JsonRpcChain::new(config.contracts.rpc_url.clone()));
    let app = FlightSuretyApp::new(chain.clone(), config.contracts.app_address);
    let data = FlightSuretyData::new(chain.clone(), config.contracts.data_address);

    let flight_status = FlightStatusCell::new(FlightStatus::OnTime);
    let registry = OracleRegistry::new();

    // Register the oracle pool in the background; the API is usable meanwhile.
    {
        let registry = registry.clone();
        let app = app.clone();
        let settings = config.registry_settings();
        tokio::spawn(async move {
            match registry.initialize(&app, &settings).await {
                Ok(count) => info!(count, "Oracle pool ready"),
                Err(err) => error!(error = %err, "oracle registration failed; no oracle will answer requests"),
            }
        });
    }

    let (report_tx, report_rx) = mpsc::unbounded_channel();
    tokio::spawn(log_reports(report_rx));

    let (request_tx, request_rx) = mpsc::channel(REQUEST_CHANNEL_CAPACITY);
    let dispatcher = Dispatcher::new(
        registry.clone(),
        flight_status.clone(),
        ResponseSubmitter::new(app.clone(), data.clone(), config.response_gas()),
    )
    .with_reports(report_tx);
    tokio::spawn(dispatcher.run(request_rx));

    // Start and supervise the contract event listener.
    let poll_interval = config.event_poll_interval;
    tokio::spawn(async move {
        let mut restart_count: u32 = 0;
        loop {
            let listener = EventListener::new(app.clone(), data.clone(), poll_interval);
            let requests = request_tx.clone();
            let handle = tokio::spawn(async move { listener.start(requests).await });

            match handle.await {
                Ok(Ok(())) => {
                    info!("event listener exited cleanly; stopping supervisor");
                    break;
                }
                Ok(Err(ListenerError::StartBlock(err))) => {
                    error!(error = %err, "event listener could not start; restarting");
                }
                Err(join_error) => {
                    if join_error.is_panic() {
                        error!("event listener panicked; restarting");
                    } else {
                        error!(error = %join_error, "event listener task failed; restarting");
                    }
                }
            }

            restart_count = restart_count.saturating_add(1);
            let backoff_seconds = (2u64.saturating_pow(restart_count.min(5)))
                .min(LISTENER_SUPERVISOR_MAX_BACKOFF_SECONDS);
            warn!(restart_count, backoff_seconds, "event listener restart backoff");
            sleep(Duration::from_secs(backoff_seconds)).await;
        }
    });

    let router = build_router(AppState::new(flight_status));
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));

    info!("Server starting on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    axum::serve(listener, router).await.context("HTTP server failed")?;

    Ok(())
}

async fn log_reports(mut reports: mpsc::UnboundedReceiver<Arc<DispatchReport>>) {
    while let Some(report) = reports.recv().await {
        info!(
            dispatch = %report.id,
            index = report.request.index,
            flight = %report.request.flight,
            status = %report.status,
            matched = report.matched(),
            failures = report.failures(),
            elapsed_ms = (chrono::Utc::now() - report.received_at).num_milliseconds(),
            "oracle request settled"
        );
    }
}
