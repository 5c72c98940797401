//! Explicit context passed to bindings and deployment
//!
//! Holds chain call defaults, the chain client and the contracts known from
//! the cache. Nothing here is global; tests build as many contexts as they like.

use std::collections::BTreeMap;

use crate::cache::{ContractCache, ContractInfo};
use crate::chain::{CallParams, ChainClient, RetryPolicy};
use crate::settings::ScillaSettings;
use crate::{Error, Result};

/// 1 Li = 10^6 Qa
pub const QA_PER_LI: u128 = 1_000_000;

/// Default parameters for every deploy and call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Setup {
    pub chain_id: u32,
    /// `(chain_id << 16) + 1`
    pub version: u32,
    pub attempts: u32,
    pub timeout_ms: u64,
    /// In Qa
    pub gas_price: u128,
    pub gas_limit: u64,
}

/// Partial update of a `Setup`; absent fields keep their current value
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SetupOverrides {
    pub gas_price_li: Option<u64>,
    pub gas_limit: Option<u64>,
    pub attempts: Option<u32>,
    pub timeout_ms: Option<u64>,
}

impl Setup {
    pub fn new(chain_id: u32) -> Self {
        let tx = crate::settings::TransactionSettings::default();
        Self::with_transactions(chain_id, &tx)
    }

    pub fn from_settings(settings: &ScillaSettings) -> Self {
        Self::with_transactions(settings.network.chain_id, &settings.transactions)
    }

    fn with_transactions(chain_id: u32, tx: &crate::settings::TransactionSettings) -> Self {
        let chain_id = chain_id & 0x7fff;
        Self {
            chain_id,
            version: message_version(chain_id),
            attempts: tx.attempts,
            timeout_ms: tx.timeout_ms,
            gas_price: tx.gas_price_li as u128 * QA_PER_LI,
            gas_limit: tx.gas_limit,
        }
    }

    pub fn update(&mut self, overrides: &SetupOverrides) {
        if let Some(li) = overrides.gas_price_li {
            self.gas_price = li as u128 * QA_PER_LI;
        }
        if let Some(limit) = overrides.gas_limit {
            self.gas_limit = limit;
        }
        if let Some(attempts) = overrides.attempts {
            self.attempts = attempts;
        }
        if let Some(timeout) = overrides.timeout_ms {
            self.timeout_ms = timeout;
        }
    }

    /// Call parameters before any per-call override
    pub fn call_params(&self) -> CallParams {
        CallParams {
            version: self.version,
            amount: 0,
            gas_price: self.gas_price,
            gas_limit: self.gas_limit,
            nonce: None,
            pub_key: None,
        }
    }

    pub fn retry(&self) -> RetryPolicy {
        RetryPolicy {
            attempts: self.attempts,
            interval_ms: self.timeout_ms,
        }
    }
}

pub fn message_version(chain_id: u32) -> u32 {
    (chain_id << 16) + 1
}

pub struct ScillaContext<C> {
    setup: Setup,
    client: C,
    contracts: BTreeMap<String, ContractInfo>,
    default_sender: Option<String>,
}

impl<C: ChainClient> ScillaContext<C> {
    pub fn new(setup: Setup, client: C, contracts: BTreeMap<String, ContractInfo>) -> Self {
        Self {
            setup,
            client,
            contracts,
            default_sender: None,
        }
    }

    /// Context over every contract in a loaded cache
    ///
    /// # Errors
    /// `DuplicateContractName` if the cache holds two contracts with one name.
    pub fn from_cache(setup: Setup, client: C, cache: &ContractCache) -> Result<Self> {
        Ok(Self::new(setup, client, cache.by_name()?))
    }

    pub fn setup(&self) -> &Setup {
        &self.setup
    }

    pub fn update_setup(&mut self, overrides: &SetupOverrides) {
        self.setup.update(overrides);
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn contracts(&self) -> &BTreeMap<String, ContractInfo> {
        &self.contracts
    }

    pub fn contract_info(&self, name: &str) -> Result<&ContractInfo> {
        self.contracts
            .get(name)
            .ok_or_else(|| Error::MissingContract(name.to_string()))
    }

    /// Public key used for deployments that do not name one
    pub fn set_default_sender(&mut self, pub_key: impl Into<String>) {
        self.default_sender = Some(pub_key.into());
    }

    pub fn default_sender(&self) -> Option<&str> {
        self.default_sender.as_deref()
    }
}
