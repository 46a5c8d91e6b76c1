//! Oracle registry - registers the simulated oracle pool and remembers the
//! indexes the app contract assigned to each member

use std::sync::Arc;

use alloy_primitives::Address;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::chain::contracts::{FlightSuretyApp, GasSettings};
use crate::chain::{ChainClient, ChainError};
use crate::models::OracleIdentity;

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("failed to list chain accounts: {0}")]
    Accounts(#[source] ChainError),

    #[error("oracle pool needs accounts up to #{required} but the node only has {available}")]
    InsufficientAccounts { available: usize, required: usize },

    #[error("failed to read the registration fee: {0}")]
    Fee(#[source] ChainError),

    #[error("failed to register oracle {oracle}: {source}")]
    Registration {
        oracle: Address,
        #[source]
        source: ChainError,
    },

    #[error("failed to read indexes of oracle {oracle}: {source}")]
    IndexQuery {
        oracle: Address,
        #[source]
        source: ChainError,
    },
}

/// Which accounts form the pool and how registrations are paid for
#[derive(Debug, Clone, Copy)]
pub struct RegistrySettings {
    pub pool_size: usize,
    /// First account of the reserved oracle slice. Accounts below it belong
    /// to the owner, airlines and passengers.
    pub account_offset: usize,
    pub gas: GasSettings,
}

/// Registered oracles in registration order
#[derive(Clone, Default)]
pub struct OracleRegistry {
    oracles: Arc<RwLock<Vec<OracleIdentity>>>,
}

impl OracleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the whole pool, one account after the other.
    ///
    /// Any failure aborts the run and leaves the registry empty. Oracles
    /// that were registered on-chain before the failure stay registered.
    pub async fn initialize<C: ChainClient>(
        &self,
        app: &FlightSuretyApp<C>,
        settings: &RegistrySettings,
    ) -> Result<usize, RegistryError> {
        self.oracles.write().await.clear();

        let accounts = app.chain().accounts().await.map_err(RegistryError::Accounts)?;
        // An offset near usize::MAX can never be satisfied; report it as a
        // shortfall instead of overflowing.
        let pool = settings
            .account_offset
            .checked_add(settings.pool_size)
            .and_then(|end| accounts.get(settings.account_offset..end))
            .ok_or(RegistryError::InsufficientAccounts {
                available: accounts.len(),
                required: settings.account_offset.saturating_add(settings.pool_size),
            })?;

        let fee = app.registration_fee().await.map_err(RegistryError::Fee)?;

        let mut registered = Vec::with_capacity(pool.len());
        for (position, account) in pool.iter().copied().enumerate() {
            if let Err(source) = app.register_oracle(account, fee, settings.gas).await {
                warn!(position, oracle = %account, "oracle registration failed; aborting pool setup");
                return Err(RegistryError::Registration {
                    oracle: account,
                    source,
                });
            }

            let indexes = app
                .get_my_indexes(account)
                .await
                .map_err(|source| RegistryError::IndexQuery {
                    oracle: account,
                    source,
                })?;

            info!(position, oracle = %account, ?indexes, "Oracle registered");
            registered.push(OracleIdentity::new(account, indexes));
        }

        let count = registered.len();
        *self.oracles.write().await = registered;
        Ok(count)
    }

    pub async fn len(&self) -> usize {
        self.oracles.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.oracles.read().await.is_empty()
    }

    pub async fn snapshot(&self) -> Vec<OracleIdentity> {
        self.oracles.read().await.clone()
    }

    /// Oracles owning `index`, in registration order. Each oracle appears
    /// at most once.
    pub async fn matching(&self, index: u8) -> Vec<OracleIdentity> {
        self.oracles
            .read()
            .await
            .iter()
            .filter(|oracle| oracle.owns(index))
            .cloned()
            .collect()
    }

    /// Replaces the contents without touching the chain.
    pub async fn load(&self, oracles: Vec<OracleIdentity>) {
        *self.oracles.write().await = oracles;
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::chain::bindings::IFlightSuretyApp;
    use crate::chain::memory::INDEX_RANGE;
    use crate::chain::{ChainLog, InMemoryChain, LogFilter, TxRequest};
    use alloy_primitives::{Bytes, B256};
    use alloy_sol_types::SolCall;
    use async_trait::async_trait;

    /// Wraps the in-memory chain and fails selected read-only calls.
    struct FlakyReads {
        inner: InMemoryChain,
        fail_fee: bool,
        fail_indexes_of: Option<Address>,
    }

    #[async_trait]
    impl ChainClient for FlakyReads {
        async fn accounts(&self) -> Result<Vec<Address>, ChainError> {
            self.inner.accounts().await
        }

        async fn block_number(&self) -> Result<u64, ChainError> {
            self.inner.block_number().await
        }

        async fn call(
            &self,
            from: Option<Address>,
            to: Address,
            data: Bytes,
        ) -> Result<Bytes, ChainError> {
            if self.fail_fee && data.starts_with(&IFlightSuretyApp::REGISTRATION_FEECall::SELECTOR) {
                return Err(ChainError::InvalidResponse("fee down".into()));
            }
            if from.is_some()
                && from == self.fail_indexes_of
                && data.starts_with(&IFlightSuretyApp::getMyIndexesCall::SELECTOR)
            {
                return Err(ChainError::InvalidResponse("indexes down".into()));
            }
            self.inner.call(from, to, data).await
        }

        async fn send(&self, tx: TxRequest) -> Result<B256, ChainError> {
            self.inner.send(tx).await
        }

        async fn logs(&self, filter: &LogFilter) -> Result<Vec<ChainLog>, ChainError> {
            self.inner.logs(filter).await
        }
    }

    fn flaky_app(fail_fee: bool, fail_indexes_of: Option<Address>) -> FlightSuretyApp<FlakyReads> {
        let inner = InMemoryChain::new(3);
        let address = inner.app_address();
        let chain = FlakyReads {
            inner,
            fail_fee,
            fail_indexes_of,
        };
        FlightSuretyApp::new(Arc::new(chain), address)
    }

    fn account(n: u64) -> Address {
        Address::left_padding_from(&n.to_be_bytes())
    }

    fn settings(pool_size: usize, account_offset: usize) -> RegistrySettings {
        RegistrySettings {
            pool_size,
            account_offset,
            gas: GasSettings {
                gas: 5_000_000,
                gas_price: 20_000_000,
            },
        }
    }

    fn app(chain: InMemoryChain) -> FlightSuretyApp<InMemoryChain> {
        let address = chain.app_address();
        FlightSuretyApp::new(Arc::new(chain), address)
    }

    #[tokio::test]
    async fn test_initialize_registers_every_oracle_with_three_indexes() {
        for pool_size in [1, 3, 25] {
            let app = app(InMemoryChain::new(50));
            let registry = OracleRegistry::new();

            let count = registry.initialize(&app, &settings(pool_size, 20)).await.unwrap();
            assert_eq!(count, pool_size);

            let oracles = registry.snapshot().await;
            assert_eq!(oracles.len(), pool_size);
            for oracle in &oracles {
                let [a, b, c] = oracle.indexes;
                assert!(a != b && a != c && b != c, "indexes not distinct: {:?}", oracle.indexes);
                assert!(oracle.indexes.iter().all(|i| *i < INDEX_RANGE));
            }
        }
    }

    #[tokio::test]
    async fn test_initialize_uses_reserved_slice_in_order() {
        let app = app(InMemoryChain::new(30));
        let accounts = app.chain().accounts().await.unwrap();
        let registry = OracleRegistry::new();

        registry.initialize(&app, &settings(5, 20)).await.unwrap();

        let registered: Vec<_> = registry.snapshot().await.iter().map(|o| o.account).collect();
        assert_eq!(registered, accounts[20..25].to_vec());
    }

    #[tokio::test]
    async fn test_initialize_keeps_assigned_indexes() {
        let chain = InMemoryChain::new(3).with_index_plan([[1, 2, 3], [4, 5, 6], [2, 7, 8]]);
        let app = app(chain);
        let registry = OracleRegistry::new();

        registry.initialize(&app, &settings(3, 0)).await.unwrap();

        let indexes: Vec<_> = registry.snapshot().await.iter().map(|o| o.indexes).collect();
        assert_eq!(indexes, vec![[1, 2, 3], [4, 5, 6], [2, 7, 8]]);
    }

    #[tokio::test]
    async fn test_failure_leaves_registry_empty_without_rollback() {
        let failing = Address::left_padding_from(&3u64.to_be_bytes());
        let app = app(InMemoryChain::new(5).with_failing_account(failing));
        let registry = OracleRegistry::new();

        let err = registry.initialize(&app, &settings(5, 0)).await.unwrap_err();
        match err {
            RegistryError::Registration { oracle, .. } => assert_eq!(oracle, failing),
            other => panic!("unexpected error: {other}"),
        }

        assert!(registry.is_empty().await);
        assert_eq!(app.chain().registered_oracles().await, 2);
    }

    #[tokio::test]
    async fn test_failed_rerun_clears_previous_pool() {
        let chain = Arc::new(InMemoryChain::new(4));
        let app = FlightSuretyApp::new(chain.clone(), chain.app_address());
        let registry = OracleRegistry::new();

        registry.initialize(&app, &settings(2, 0)).await.unwrap();
        assert_eq!(registry.len().await, 2);

        // Same accounts again: the contract rejects the duplicate.
        let err = registry.initialize(&app, &settings(2, 0)).await.unwrap_err();
        assert!(matches!(err, RegistryError::Registration { .. }));
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_insufficient_accounts() {
        let app = app(InMemoryChain::new(10));
        let registry = OracleRegistry::new();

        let err = registry.initialize(&app, &settings(25, 20)).await.unwrap_err();
        assert!(matches!(
            err,
            RegistryError::InsufficientAccounts {
                available: 10,
                required: 45
            }
        ));
        assert_eq!(app.chain().registered_oracles().await, 0);
    }

    #[tokio::test]
    async fn test_account_offset_overflow_is_a_shortfall() {
        let app = app(InMemoryChain::new(10));
        let registry = OracleRegistry::new();

        let err = registry
            .initialize(&app, &settings(25, usize::MAX - 1))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RegistryError::InsufficientAccounts {
                available: 10,
                required: usize::MAX
            }
        ));
        assert_eq!(app.chain().registered_oracles().await, 0);
    }

    #[tokio::test]
    async fn test_fee_query_failure_registers_nothing() {
        let app = flaky_app(true, None);
        let registry = OracleRegistry::new();

        let err = registry.initialize(&app, &settings(3, 0)).await.unwrap_err();
        assert!(matches!(err, RegistryError::Fee(ChainError::InvalidResponse(_))), "{err}");
        assert!(registry.is_empty().await);
        assert_eq!(app.chain().inner.registered_oracles().await, 0);
    }

    #[tokio::test]
    async fn test_index_query_failure_leaves_registry_empty() {
        let app = flaky_app(false, Some(account(2)));
        let registry = OracleRegistry::new();

        let err = registry.initialize(&app, &settings(3, 0)).await.unwrap_err();
        match err {
            RegistryError::IndexQuery { oracle, .. } => assert_eq!(oracle, account(2)),
            other => panic!("unexpected error: {other}"),
        }
        assert!(registry.is_empty().await);
        // The first oracle and the failing one were registered before the query.
        assert_eq!(app.chain().inner.registered_oracles().await, 2);
    }

    #[tokio::test]
    async fn test_matching_follows_registration_order() {
        let registry = OracleRegistry::new();
        registry
            .load(vec![
                OracleIdentity::new(Address::repeat_byte(1), [1, 2, 3]),
                OracleIdentity::new(Address::repeat_byte(2), [4, 5, 6]),
                OracleIdentity::new(Address::repeat_byte(3), [2, 7, 8]),
            ])
            .await;

        let matched: Vec<_> = registry.matching(2).await.iter().map(|o| o.account).collect();
        assert_eq!(matched, vec![Address::repeat_byte(1), Address::repeat_byte(3)]);
        assert!(registry.matching(9).await.is_empty());
    }
}
