//! In-process chain double
//!
//! Plays the oracle-facing part of FlightSuretyApp (fee, registration, index
//! assignment, response acceptance, request emission) and records the calls
//! the relay makes, so the registry and dispatcher can run without a node.
//! Insurance accounting and airline consensus are not modelled.

use std::collections::{HashMap, HashSet, VecDeque};

use alloy_primitives::{Address, Bytes, B256, U256};
use alloy_sol_types::{SolCall, SolEvent};
use async_trait::async_trait;
use rand::seq::SliceRandom;
use rand::Rng;
use tokio::sync::Mutex;

use super::bindings::{IFlightSuretyApp, IFlightSuretyData};
use super::{ChainClient, ChainError, ChainLog, LogFilter, TxRequest};
use crate::models::{FlightStatus, OracleRequestEvent, OracleResponse};

/// Oracle indexes are drawn from `0..INDEX_RANGE`.
pub const INDEX_RANGE: u8 = 10;

/// 1 ether
pub const DEFAULT_REGISTRATION_FEE: U256 = U256::from_limbs([1_000_000_000_000_000_000, 0, 0, 0]);

/// A response the simulated app contract accepted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedResponse {
    pub oracle: Address,
    pub response: OracleResponse,
}

/// A `creditInsurees` call seen by the simulated data contract
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCredit {
    pub caller: Address,
    pub flight: String,
}

#[derive(Default)]
struct ChainState {
    accounts: Vec<Address>,
    block: u64,
    tx_count: u64,
    oracles: HashMap<Address, [u8; 3]>,
    index_plan: VecDeque<[u8; 3]>,
    answered: HashSet<(Address, u8, Address, String, U256)>,
    responses: Vec<RecordedResponse>,
    credits: Vec<RecordedCredit>,
    logs: Vec<ChainLog>,
    failing: HashSet<Address>,
}

pub struct InMemoryChain {
    app_address: Address,
    data_address: Address,
    registration_fee: U256,
    state: Mutex<ChainState>,
}

impl InMemoryChain {
    /// Creates a chain with `account_count` funded accounts.
    pub fn new(account_count: usize) -> Self {
        let accounts = (1..=account_count as u64)
            .map(|n| Address::left_padding_from(&n.to_be_bytes()))
            .collect();

        Self {
            app_address: Address::repeat_byte(0xa0),
            data_address: Address::repeat_byte(0xd0),
            registration_fee: DEFAULT_REGISTRATION_FEE,
            state: Mutex::new(ChainState {
                accounts,
                block: 1,
                ..ChainState::default()
            }),
        }
    }

    /// Index sets handed out to the next registrations, in order. Once the
    /// plan runs out, indexes are random again.
    pub fn with_index_plan(mut self, plan: impl IntoIterator<Item = [u8; 3]>) -> Self {
        self.state.get_mut().index_plan.extend(plan);
        self
    }

    /// Every call and transaction from `account` fails at the RPC layer.
    pub fn with_failing_account(mut self, account: Address) -> Self {
        self.state.get_mut().failing.insert(account);
        self
    }

    pub fn app_address(&self) -> Address {
        self.app_address
    }

    pub fn data_address(&self) -> Address {
        self.data_address
    }

    pub fn registration_fee(&self) -> U256 {
        self.registration_fee
    }

    pub async fn set_failing(&self, account: Address, failing: bool) {
        let mut state = self.state.lock().await;
        if failing {
            state.failing.insert(account);
        } else {
            state.failing.remove(&account);
        }
    }

    pub async fn responses(&self) -> Vec<RecordedResponse> {
        self.state.lock().await.responses.clone()
    }

    pub async fn credits(&self) -> Vec<RecordedCredit> {
        self.state.lock().await.credits.clone()
    }

    pub async fn registered_oracles(&self) -> usize {
        self.state.lock().await.oracles.len()
    }

    /// Appends an `OracleRequest` log in a new block, as the app contract
    /// would from `fetchFlightStatus`.
    pub async fn emit_oracle_request(&self, request: &OracleRequestEvent) {
        let mut state = self.state.lock().await;
        state.block += 1;
        let block = state.block;
        let event = IFlightSuretyApp::OracleRequest {
            index: request.index,
            airline: request.airline,
            flight: request.flight.clone(),
            timestamp: request.timestamp,
        };
        push_log(&mut state, self.app_address, block, None, event);
    }

    /// Appends a raw app-contract log to the current block without mining.
    pub async fn append_app_log(&self, topics: Vec<B256>, data: Bytes) {
        let mut state = self.state.lock().await;
        let block = state.block;
        state.logs.push(ChainLog {
            address: self.app_address,
            topics,
            data,
            block_number: block,
            transaction_hash: None,
        });
    }

    fn mine(state: &mut ChainState) -> (u64, B256) {
        state.block += 1;
        state.tx_count += 1;
        (state.block, B256::left_padding_from(&state.tx_count.to_be_bytes()))
    }

    fn execute_app_call(&self, state: &ChainState, from: Option<Address>, data: &[u8]) -> Result<Bytes, ChainError> {
        match selector(data) {
            Some(IFlightSuretyApp::REGISTRATION_FEECall::SELECTOR) => Ok(Bytes::from(
                IFlightSuretyApp::REGISTRATION_FEECall::abi_encode_returns(&(self.registration_fee,)),
            )),
            Some(IFlightSuretyApp::getMyIndexesCall::SELECTOR) => {
                let indexes = from
                    .and_then(|account| state.oracles.get(&account))
                    .ok_or_else(|| ChainError::Reverted("Not registered as an oracle".into()))?;
                Ok(Bytes::from(
                    IFlightSuretyApp::getMyIndexesCall::abi_encode_returns(&(*indexes,)),
                ))
            }
            _ => Err(ChainError::Reverted("unknown function selector".into())),
        }
    }

    fn execute_app_send(&self, state: &mut ChainState, tx: &TxRequest) -> Result<B256, ChainError> {
        match selector(&tx.data) {
            Some(IFlightSuretyApp::registerOracleCall::SELECTOR) => {
                if tx.value < self.registration_fee {
                    return Err(ChainError::Reverted("Registration fee is required".into()));
                }
                if state.oracles.contains_key(&tx.from) {
                    return Err(ChainError::Reverted("Oracle already registered".into()));
                }
                let indexes = state.index_plan.pop_front().unwrap_or_else(random_indexes);
                state.oracles.insert(tx.from, indexes);
                Ok(Self::mine(state).1)
            }
            Some(IFlightSuretyApp::submitOracleResponseCall::SELECTOR) => {
                let call = IFlightSuretyApp::submitOracleResponseCall::abi_decode(&tx.data, true)?;
                let owns_index = state
                    .oracles
                    .get(&tx.from)
                    .map(|indexes| indexes.contains(&call.index))
                    .unwrap_or(false);
                if !owns_index {
                    return Err(ChainError::Reverted(
                        "Index does not match oracle request".into(),
                    ));
                }

                let key = (tx.from, call.index, call.airline, call.flight.clone(), call.timestamp);
                if !state.answered.insert(key) {
                    return Err(ChainError::Reverted("Oracle already responded".into()));
                }

                state.responses.push(RecordedResponse {
                    oracle: tx.from,
                    response: OracleResponse {
                        index: call.index,
                        airline: call.airline,
                        flight: call.flight.clone(),
                        timestamp: call.timestamp,
                        status: FlightStatus::from_code(call.statusCode),
                    },
                });

                let (block, tx_hash) = Self::mine(state);
                let report = IFlightSuretyApp::OracleReport {
                    airline: call.airline,
                    flight: call.flight,
                    timestamp: call.timestamp,
                    status: call.statusCode,
                };
                push_log(state, self.app_address, block, Some(tx_hash), report);
                Ok(tx_hash)
            }
            Some(IFlightSuretyApp::fetchFlightStatusCall::SELECTOR) => {
                let call = IFlightSuretyApp::fetchFlightStatusCall::abi_decode(&tx.data, true)?;
                let (block, tx_hash) = Self::mine(state);
                let request = IFlightSuretyApp::OracleRequest {
                    index: random_index(),
                    airline: call.airline,
                    flight: call.flight,
                    timestamp: call.timestamp,
                };
                push_log(state, self.app_address, block, Some(tx_hash), request);
                Ok(tx_hash)
            }
            _ => Err(ChainError::Reverted("unknown function selector".into())),
        }
    }
}

#[async_trait]
impl ChainClient for InMemoryChain {
    async fn accounts(&self) -> Result<Vec<Address>, ChainError> {
        Ok(self.state.lock().await.accounts.clone())
    }

    async fn block_number(&self) -> Result<u64, ChainError> {
        Ok(self.state.lock().await.block)
    }

    async fn call(
        &self,
        from: Option<Address>,
        to: Address,
        data: Bytes,
    ) -> Result<Bytes, ChainError> {
        let mut state = self.state.lock().await;
        if let Some(account) = from {
            ensure_not_failing(&state, account)?;
        }

        if to == self.app_address {
            self.execute_app_call(&state, from, &data)
        } else if to == self.data_address {
            match selector(&data) {
                Some(IFlightSuretyData::creditInsureesCall::SELECTOR) => {
                    let call = IFlightSuretyData::creditInsureesCall::abi_decode(&data, true)?;
                    state.credits.push(RecordedCredit {
                        caller: from.unwrap_or(Address::ZERO),
                        flight: call.flight,
                    });
                    Ok(Bytes::new())
                }
                _ => Err(ChainError::Reverted("unknown function selector".into())),
            }
        } else {
            Err(ChainError::Rpc {
                code: -32000,
                message: format!("no contract deployed at {to}"),
            })
        }
    }

    async fn send(&self, tx: TxRequest) -> Result<B256, ChainError> {
        let mut state = self.state.lock().await;
        ensure_not_failing(&state, tx.from)?;

        if tx.to == self.app_address {
            self.execute_app_send(&mut state, &tx)
        } else {
            Err(ChainError::Reverted(format!("{} does not accept transactions", tx.to)))
        }
    }

    async fn logs(&self, filter: &LogFilter) -> Result<Vec<ChainLog>, ChainError> {
        let state = self.state.lock().await;
        Ok(state
            .logs
            .iter()
            .filter(|log| log.address == filter.address)
            .filter(|log| log.block_number >= filter.from_block && log.block_number <= filter.to_block)
            .filter(|log| match filter.topic0 {
                Some(topic) => log.topics.first() == Some(&topic),
                None => true,
            })
            .cloned()
            .collect())
    }
}

fn ensure_not_failing(state: &ChainState, account: Address) -> Result<(), ChainError> {
    if state.failing.contains(&account) {
        return Err(ChainError::Rpc {
            code: -32000,
            message: format!("sender account {account} not recognized"),
        });
    }
    Ok(())
}

fn push_log<E: SolEvent>(
    state: &mut ChainState,
    address: Address,
    block: u64,
    transaction_hash: Option<B256>,
    event: E,
) {
    let data = event.encode_log_data();
    state.logs.push(ChainLog {
        address,
        topics: data.topics().to_vec(),
        data: data.data,
        block_number: block,
        transaction_hash,
    });
}

fn selector(data: &[u8]) -> Option<[u8; 4]> {
    data.get(..4)?.try_into().ok()
}

fn random_index() -> u8 {
    rand::thread_rng().gen_range(0..INDEX_RANGE)
}

/// Three distinct indexes, like the contract's `generateIndexes`.
fn random_indexes() -> [u8; 3] {
    let pool: Vec<u8> = (0..INDEX_RANGE).collect();
    let mut picked = pool.choose_multiple(&mut rand::thread_rng(), 3).copied();
    let mut indexes = [0u8; 3];
    for slot in indexes.iter_mut() {
        *slot = picked.next().unwrap_or_default();
    }
    indexes
}
