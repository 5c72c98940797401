//! Chain client abstraction
//!
//! Everything network-facing goes through `ChainClient`, so bindings and
//! deployment work against any node API (or an in-memory double in tests).
//! Implementations report their own failures through `Error::remote`.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::binding::encode::ParamValue;
use crate::Result;

/// Address of a deployed contract
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractHandle {
    pub address: String,
}

impl ContractHandle {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
        }
    }
}

/// Confirmation polling parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub interval_ms: u64,
}

/// Fully resolved transaction parameters sent with a deploy or call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallParams {
    pub version: u32,
    /// In Qa
    pub amount: u128,
    /// In Qa
    pub gas_price: u128,
    pub gas_limit: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<u64>,
    /// Sender public key; the client's default account when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pub_key: Option<String>,
}

/// Caller-supplied overrides, the optional trailing argument of a call or deploy
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TxOverrides {
    #[serde(
        default,
        deserialize_with = "lenient_u128",
        serialize_with = "decimal_u128",
        skip_serializing_if = "Option::is_none"
    )]
    pub amount: Option<u128>,
    #[serde(
        default,
        deserialize_with = "lenient_u128",
        serialize_with = "decimal_u128",
        skip_serializing_if = "Option::is_none"
    )]
    pub gas_price: Option<u128>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_limit: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pub_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u32>,
}

impl TxOverrides {
    pub fn apply(&self, params: &mut CallParams) {
        if let Some(v) = self.amount {
            params.amount = v;
        }
        if let Some(v) = self.gas_price {
            params.gas_price = v;
        }
        if let Some(v) = self.gas_limit {
            params.gas_limit = v;
        }
        if let Some(v) = self.nonce {
            params.nonce = Some(v);
        }
        if let Some(v) = &self.pub_key {
            params.pub_key = Some(v.clone());
        }
        if let Some(v) = self.version {
            params.version = v;
        }
    }
}

// Amounts routinely exceed what JSON numbers carry, so strings are accepted too.
fn lenient_u128<'de, D: Deserializer<'de>>(de: D) -> std::result::Result<Option<u128>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Num(u64),
        Str(String),
    }
    match Option::<Raw>::deserialize(de)? {
        None => Ok(None),
        Some(Raw::Num(n)) => Ok(Some(n as u128)),
        Some(Raw::Str(s)) => s.parse().map(Some).map_err(serde::de::Error::custom),
    }
}

fn decimal_u128<S: Serializer>(value: &Option<u128>, ser: S) -> std::result::Result<S::Ok, S::Error> {
    match value {
        Some(n) => ser.serialize_str(&n.to_string()),
        None => ser.serialize_none(),
    }
}

/// A `(vname, type, value)` triple as returned by the chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedValue {
    pub vname: String,
    #[serde(rename = "type")]
    pub ty: String,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventLog {
    #[serde(rename = "_eventname")]
    pub event_name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub params: Vec<NamedValue>,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Receipt {
    pub success: bool,
    #[serde(default)]
    pub event_logs: Vec<EventLog>,
    /// Error codes per call depth, keyed by depth
    #[serde(default)]
    pub errors: BTreeMap<String, Vec<u32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cumulative_gas: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    /// `None` while the transaction is unconfirmed
    #[serde(default)]
    pub receipt: Option<Receipt>,
}

impl Transaction {
    pub fn is_confirmed(&self) -> bool {
        self.receipt.is_some()
    }

    pub fn succeeded(&self) -> bool {
        self.receipt.as_ref().map_or(false, |r| r.success)
    }
}

/// Node operations needed by bindings and deployment
pub trait ChainClient {
    /// Deploy `code` with init parameters, returning the deploy transaction and the new address
    fn deploy(
        &self,
        code: &str,
        init: &[ParamValue],
        params: &CallParams,
        retry: RetryPolicy,
    ) -> Result<(Transaction, ContractHandle)>;

    /// Invoke a transition and wait for confirmation
    fn call(
        &self,
        contract: &ContractHandle,
        transition: &str,
        args: &[ParamValue],
        params: &CallParams,
        retry: RetryPolicy,
    ) -> Result<Transaction>;

    /// Current values of the mutable fields
    fn get_state(&self, contract: &ContractHandle) -> Result<Map<String, Value>>;

    /// Immutable parameters supplied at deployment
    fn get_init(&self, contract: &ContractHandle) -> Result<Vec<NamedValue>>;

    /// Source code at `address`, `None` when nothing is deployed there
    fn get_code(&self, address: &str) -> Result<Option<String>>;
}
