//! Typed wrappers around the FlightSurety contracts

use std::sync::Arc;

use alloy_primitives::{Address, Bytes, B256, U256};
use alloy_sol_types::{SolCall, SolEvent};

use super::bindings::{IFlightSuretyApp, IFlightSuretyData};
use super::{ChainClient, ChainError, ChainLog, LogFilter, TxRequest};
use crate::models::{OracleRequestEvent, OracleResponse};

/// Gas limit and price attached to a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GasSettings {
    pub gas: u64,
    pub gas_price: u64,
}

/// FlightSuretyApp bound to a deployed address
pub struct FlightSuretyApp<C> {
    chain: Arc<C>,
    address: Address,
}

impl<C> Clone for FlightSuretyApp<C> {
    fn clone(&self) -> Self {
        Self {
            chain: self.chain.clone(),
            address: self.address,
        }
    }
}

impl<C: ChainClient> FlightSuretyApp<C> {
    pub fn new(chain: Arc<C>, address: Address) -> Self {
        Self { chain, address }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn chain(&self) -> &Arc<C> {
        &self.chain
    }

    pub async fn registration_fee(&self) -> Result<U256, ChainError> {
        let data = self
            .chain
            .call(None, self.address, encode(IFlightSuretyApp::REGISTRATION_FEECall {}))
            .await?;
        let fee = IFlightSuretyApp::REGISTRATION_FEECall::abi_decode_returns(&data, true)?;
        Ok(fee._0)
    }

    /// Pays `fee` from `from` and registers it as an oracle.
    pub async fn register_oracle(
        &self,
        from: Address,
        fee: U256,
        gas: GasSettings,
    ) -> Result<B256, ChainError> {
        self.chain
            .send(TxRequest {
                from,
                to: self.address,
                data: encode(IFlightSuretyApp::registerOracleCall {}),
                value: fee,
                gas: gas.gas,
                gas_price: gas.gas_price,
            })
            .await
    }

    pub async fn get_my_indexes(&self, from: Address) -> Result<[u8; 3], ChainError> {
        let data = self
            .chain
            .call(Some(from), self.address, encode(IFlightSuretyApp::getMyIndexesCall {}))
            .await?;
        let indexes = IFlightSuretyApp::getMyIndexesCall::abi_decode_returns(&data, true)?;
        Ok(indexes._0)
    }

    pub async fn submit_oracle_response(
        &self,
        from: Address,
        response: &OracleResponse,
        gas: GasSettings,
    ) -> Result<B256, ChainError> {
        let call = IFlightSuretyApp::submitOracleResponseCall {
            index: response.index,
            airline: response.airline,
            flight: response.flight.clone(),
            timestamp: response.timestamp,
            statusCode: response.status.code(),
        };

        self.chain
            .send(TxRequest {
                from,
                to: self.address,
                data: encode(call),
                value: U256::ZERO,
                gas: gas.gas,
                gas_price: gas.gas_price,
            })
            .await
    }

    /// Asks the contract to emit an `OracleRequest` for a flight.
    #[cfg(feature = "test-util")]
    pub async fn fetch_flight_status(
        &self,
        from: Address,
        airline: Address,
        flight: &str,
        timestamp: U256,
        gas: GasSettings,
    ) -> Result<B256, ChainError> {
        let call = IFlightSuretyApp::fetchFlightStatusCall {
            airline,
            flight: flight.to_string(),
            timestamp,
        };

        self.chain
            .send(TxRequest {
                from,
                to: self.address,
                data: encode(call),
                value: U256::ZERO,
                gas: gas.gas,
                gas_price: gas.gas_price,
            })
            .await
    }

    /// `OracleRequest` events in `[from_block, to_block]`, in log order.
    /// A log that fails to decode yields an `Err` item instead of aborting
    /// the batch.
    pub async fn oracle_requests(
        &self,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<Result<OracleRequestEvent, ChainError>>, ChainError> {
        let logs = self
            .chain
            .logs(&LogFilter {
                address: self.address,
                topic0: Some(IFlightSuretyApp::OracleRequest::SIGNATURE_HASH),
                from_block,
                to_block,
            })
            .await?;

        Ok(logs.iter().map(decode_oracle_request).collect())
    }
}

fn decode_oracle_request(log: &ChainLog) -> Result<OracleRequestEvent, ChainError> {
    let event =
        IFlightSuretyApp::OracleRequest::decode_raw_log(log.topics.iter().copied(), &log.data, true)?;

    Ok(OracleRequestEvent {
        index: event.index,
        airline: event.airline,
        flight: event.flight,
        timestamp: event.timestamp,
    })
}

/// FlightSuretyData bound to a deployed address
pub struct FlightSuretyData<C> {
    chain: Arc<C>,
    address: Address,
}

impl<C> Clone for FlightSuretyData<C> {
    fn clone(&self) -> Self {
        Self {
            chain: self.chain.clone(),
            address: self.address,
        }
    }
}

impl<C: ChainClient> FlightSuretyData<C> {
    pub fn new(chain: Arc<C>, address: Address) -> Self {
        Self { chain, address }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Read-only `creditInsurees` call on behalf of `from`.
    pub async fn credit_insurees(&self, from: Address, flight: &str) -> Result<(), ChainError> {
        let call = IFlightSuretyData::creditInsureesCall {
            flight: flight.to_string(),
        };
        self.chain.call(Some(from), self.address, encode(call)).await?;
        Ok(())
    }

    /// Every log emitted by the data contract in `[from_block, to_block]`.
    pub async fn all_events(&self, from_block: u64, to_block: u64) -> Result<Vec<ChainLog>, ChainError> {
        self.chain
            .logs(&LogFilter {
                address: self.address,
                topic0: None,
                from_block,
                to_block,
            })
            .await
    }
}

fn encode<T: SolCall>(call: T) -> Bytes {
    Bytes::from(call.abi_encode())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_decode_oracle_request_log() {
        let event = IFlightSuretyApp::OracleRequest {
            index: 4,
            airline: Address::repeat_byte(0xaa),
            flight: "VN321".to_string(),
            timestamp: U256::from(1_700_000_000u64),
        };
        let data = event.encode_log_data();
        let log = ChainLog {
            address: Address::repeat_byte(0x01),
            topics: data.topics().to_vec(),
            data: data.data.clone(),
            block_number: 7,
            transaction_hash: None,
        };

        let decoded = decode_oracle_request(&log).unwrap();
        assert_eq!(decoded.index, 4);
        assert_eq!(decoded.airline, Address::repeat_byte(0xaa));
        assert_eq!(decoded.flight, "VN321");
        assert_eq!(decoded.timestamp, U256::from(1_700_000_000u64));
    }

    #[test]
    fn test_decode_rejects_foreign_topic() {
        let log = ChainLog {
            address: Address::repeat_byte(0x01),
            topics: vec![B256::repeat_byte(0x55)],
            data: Bytes::new(),
            block_number: 1,
            transaction_hash: None,
        };
        assert!(matches!(decode_oracle_request(&log), Err(ChainError::Decode(_))));
    }
}
