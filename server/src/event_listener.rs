//! Event listener for FlightSurety contract events
//!
//! Polls the node for new blocks, starting at the latest block when the
//! listener starts, and forwards every `OracleRequest` (or the error that
//! prevented reading it) to the dispatcher. Data contract events are only
//! logged.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::chain::contracts::{FlightSuretyApp, FlightSuretyData};
use crate::chain::{ChainClient, ChainError};
use crate::models::OracleRequestEvent;

pub type RequestSender = mpsc::Sender<Result<OracleRequestEvent, ChainError>>;

#[derive(Debug, thiserror::Error)]
pub enum ListenerError {
    #[error("could not read the starting block: {0}")]
    StartBlock(#[source] ChainError),
}

pub struct EventListener<C> {
    app: FlightSuretyApp<C>,
    data: FlightSuretyData<C>,
    poll_interval: Duration,
}

impl<C: ChainClient> EventListener<C> {
    pub fn new(app: FlightSuretyApp<C>, data: FlightSuretyData<C>, poll_interval: Duration) -> Self {
        Self {
            app,
            data,
            poll_interval,
        }
    }

    /// Runs until the receiving side of `requests` is dropped.
    pub async fn start(self, requests: RequestSender) -> Result<(), ListenerError> {
        let mut next_block = self
            .app
            .chain()
            .block_number()
            .await
            .map_err(ListenerError::StartBlock)?;

        info!(
            app = %self.app.address(),
            data = %self.data.address(),
            from_block = next_block,
            "Starting event listener"
        );

        loop {
            if requests.is_closed() {
                info!("request channel closed; stopping event listener");
                return Ok(());
            }

            match self.poll_once(next_block, &requests).await {
                Ok(Some(processed_to)) => next_block = processed_to + 1,
                Ok(None) => {}
                Err(err) => {
                    if requests.send(Err(err)).await.is_err() {
                        return Ok(());
                    }
                }
            }

            sleep(self.poll_interval).await;
        }
    }

    /// Reads `[from_block, latest]` and returns the last block covered, or
    /// `None` when there is no new block yet.
    async fn poll_once(&self, from_block: u64, requests: &RequestSender) -> Result<Option<u64>, ChainError> {
        let latest = self.app.chain().block_number().await?;
        if latest < from_block {
            return Ok(None);
        }

        let oracle_requests = self.app.oracle_requests(from_block, latest).await?;
        let data_events = self.data.all_events(from_block, latest).await;

        debug!(from_block, to_block = latest, requests = oracle_requests.len(), "polled blocks");

        for request in oracle_requests {
            if requests.send(request).await.is_err() {
                break;
            }
        }

        match data_events {
            Ok(logs) => {
                for log in logs {
                    info!(
                        block = log.block_number,
                        tx_hash = ?log.transaction_hash,
                        topics = ?log.topics,
                        data = ?log.data,
                        "data contract event"
                    );
                }
            }
            Err(err) => warn!(error = %err, "failed to read data contract events"),
        }

        Ok(Some(latest))
    }
}
