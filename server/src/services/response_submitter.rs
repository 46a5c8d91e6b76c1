//! Response submitter - sends one oracle's answer to a request

use alloy_primitives::{Address, B256};
use tracing::{debug, info, warn};

use crate::chain::contracts::{FlightSuretyApp, FlightSuretyData, GasSettings};
use crate::chain::{ChainClient, ChainError};
use crate::models::{OracleIdentity, OracleResponse};

/// What happened to one oracle's submission
#[derive(Debug)]
pub struct SubmissionOutcome {
    pub oracle: Address,
    pub response: OracleResponse,
    pub transaction: Result<B256, ChainError>,
    /// Present only when the status blamed the airline.
    pub credit: Option<Result<(), ChainError>>,
}

impl SubmissionOutcome {
    pub fn succeeded(&self) -> bool {
        self.transaction.is_ok() && !matches!(self.credit, Some(Err(_)))
    }
}

pub struct ResponseSubmitter<C> {
    app: FlightSuretyApp<C>,
    data: FlightSuretyData<C>,
    gas: GasSettings,
}

impl<C> Clone for ResponseSubmitter<C> {
    fn clone(&self) -> Self {
        Self {
            app: self.app.clone(),
            data: self.data.clone(),
            gas: self.gas,
        }
    }
}

impl<C: ChainClient> ResponseSubmitter<C> {
    pub fn new(app: FlightSuretyApp<C>, data: FlightSuretyData<C>, gas: GasSettings) -> Self {
        Self { app, data, gas }
    }

    /// Sends `submitOracleResponse` from `oracle`, plus a `creditInsurees`
    /// call when the status is `LateAirline`. The two are issued together;
    /// the credit call does not wait for the response to be mined. Failures
    /// are logged and returned, never retried.
    pub async fn submit(&self, oracle: &OracleIdentity, response: OracleResponse) -> SubmissionOutcome {
        let send = self.app.submit_oracle_response(oracle.account, &response, self.gas);
        let credit = async {
            if response.status.is_airline_fault() {
                Some(self.data.credit_insurees(oracle.account, &response.flight).await)
            } else {
                None
            }
        };

        let (transaction, credit) = tokio::join!(send, credit);

        match &transaction {
            Ok(tx_hash) => debug!(oracle = %oracle.account, %tx_hash, "oracle response submitted"),
            Err(err) => warn!(
                oracle = %oracle.account,
                index = response.index,
                airline = %response.airline,
                flight = %response.flight,
                timestamp = %response.timestamp,
                status = response.status.code(),
                error = %err,
                "oracle response rejected"
            ),
        }

        match &credit {
            Some(Ok(())) => info!(oracle = %oracle.account, flight = %response.flight, "Credit set for insurees"),
            Some(Err(err)) => warn!(
                oracle = %oracle.account,
                flight = %response.flight,
                status = response.status.code(),
                error = %err,
                "creditInsurees call failed"
            ),
            None => {}
        }

        SubmissionOutcome {
            oracle: oracle.account,
            response,
            transaction,
            credit,
        }
    }
}
