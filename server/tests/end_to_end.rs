use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::{Address, U256};
use axum::body::Body;
use axum::http::Request;
use tokio::sync::mpsc;
use tokio::time::{sleep, timeout};
use tower::ServiceExt;

use flightsurety_server::app_state::AppState;
use flightsurety_server::chain::contracts::GasSettings;
use flightsurety_server::chain::{FlightSuretyApp, FlightSuretyData, InMemoryChain};
use flightsurety_server::event_listener::EventListener;
use flightsurety_server::models::{FlightStatus, OracleRequestEvent};
use flightsurety_server::routes::build_router;
use flightsurety_server::services::{
    DispatchReport, Dispatcher, FlightStatusCell, OracleRegistry, RegistrySettings,
    ResponseSubmitter,
};

const REGISTRATION_GAS: GasSettings = GasSettings {
    gas: 5_000_000,
    gas_price: 20_000_000,
};
const RESPONSE_GAS: GasSettings = GasSettings {
    gas: 500_000,
    gas_price: 20_000_000,
};

struct Relay {
    chain: Arc<InMemoryChain>,
    registry: OracleRegistry,
    status: FlightStatusCell,
    reports: mpsc::UnboundedReceiver<Arc<DispatchReport>>,
}

/// Wires registry, listener and dispatcher the way the binary does, over
/// an in-memory chain with 20 non-oracle accounts ahead of the pool.
async fn start_relay(plan: Vec<[u8; 3]>) -> Relay {
    let pool_size = plan.len();
    let chain = Arc::new(InMemoryChain::new(20 + pool_size).with_index_plan(plan));
    let app = FlightSuretyApp::new(chain.clone(), chain.app_address());
    let data = FlightSuretyData::new(chain.clone(), chain.data_address());

    let registry = OracleRegistry::new();
    registry
        .initialize(
            &app,
            &RegistrySettings {
                pool_size,
                account_offset: 20,
                gas: REGISTRATION_GAS,
            },
        )
        .await
        .unwrap();

    let status = FlightStatusCell::new(FlightStatus::OnTime);
    let (report_tx, reports) = mpsc::unbounded_channel();
    let (request_tx, request_rx) = mpsc::channel(16);

    let dispatcher = Dispatcher::new(
        registry.clone(),
        status.clone(),
        ResponseSubmitter::new(app.clone(), data.clone(), RESPONSE_GAS),
    )
    .with_reports(report_tx);
    tokio::spawn(dispatcher.run(request_rx));

    let listener = EventListener::new(app, data, Duration::from_millis(5));
    tokio::spawn(listener.start(request_tx));
    // Let the listener pick its starting block.
    sleep(Duration::from_millis(50)).await;

    Relay {
        chain,
        registry,
        status,
        reports,
    }
}

fn request(index: u8, flight: &str) -> OracleRequestEvent {
    OracleRequestEvent {
        index,
        airline: Address::repeat_byte(0xaa),
        flight: flight.to_string(),
        timestamp: U256::from(1_700_000_000u64),
    }
}

async fn next_report(relay: &mut Relay) -> Arc<DispatchReport> {
    timeout(Duration::from_secs(2), relay.reports.recv())
        .await
        .expect("no dispatch report in time")
        .expect("report channel closed")
}

#[tokio::test]
async fn request_reaches_only_index_owners() {
    let mut relay = start_relay(vec![[1, 2, 3], [4, 5, 6], [2, 7, 8]]).await;
    let oracles = relay.registry.snapshot().await;

    relay.chain.emit_oracle_request(&request(2, "VN321")).await;
    let report = next_report(&mut relay).await;

    assert_eq!(report.request, request(2, "VN321"));
    assert_eq!(report.status, FlightStatus::OnTime);
    let answered: Vec<_> = report.outcomes.iter().map(|o| o.oracle).collect();
    assert_eq!(answered, vec![oracles[0].account, oracles[2].account]);
    assert_eq!(report.failures(), 0);

    let recorded = relay.chain.responses().await;
    assert_eq!(recorded.len(), 2);
    assert!(recorded.iter().all(|r| r.response.status == FlightStatus::OnTime));
    assert!(relay.chain.credits().await.is_empty());
}

#[tokio::test]
async fn status_set_over_http_drives_late_airline_credits() {
    let mut relay = start_relay(vec![[1, 2, 3], [4, 5, 6], [2, 7, 8]]).await;
    let router = build_router(AppState::new(relay.status.clone()));

    let response = router
        .oneshot(Request::builder().uri("/api/status/20").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert!(response.status().is_success());

    relay.chain.emit_oracle_request(&request(2, "LH400")).await;
    let report = next_report(&mut relay).await;

    assert_eq!(report.status, FlightStatus::LateAirline);
    assert_eq!(report.matched(), 2);
    let credits = relay.chain.credits().await;
    assert_eq!(credits.len(), 2);
    assert!(credits.iter().all(|c| c.flight == "LH400"));
}

#[tokio::test]
async fn unowned_index_produces_empty_report() {
    let mut relay = start_relay(vec![[1, 2, 3], [4, 5, 6], [2, 7, 8]]).await;

    relay.chain.emit_oracle_request(&request(9, "VN321")).await;
    let report = next_report(&mut relay).await;

    assert_eq!(report.matched(), 0);
    assert!(relay.chain.responses().await.is_empty());
}

#[tokio::test]
async fn consecutive_requests_are_each_dispatched() {
    let mut relay = start_relay(vec![[1, 2, 3], [4, 5, 6], [2, 7, 8]]).await;

    relay.chain.emit_oracle_request(&request(4, "FIRST")).await;
    relay.chain.emit_oracle_request(&request(5, "SECOND")).await;

    let mut flights = vec![
        next_report(&mut relay).await.request.flight.clone(),
        next_report(&mut relay).await.request.flight.clone(),
    ];
    // Fan-outs settle independently, so reports may arrive in either order.
    flights.sort();
    assert_eq!(flights, vec!["FIRST".to_string(), "SECOND".to_string()]);
    assert_eq!(relay.chain.responses().await.len(), 2);
}
