//! Dynamic contract bindings
//!
//! A `ScillaContract` pairs a parsed contract with a chain address. Calls are
//! validated and encoded against the parsed parameter lists before anything
//! is sent, so a wrong argument count never reaches the network.
//!
//! # Call shape
//!
//! For a transition with `n` parameters:
//! - `n` arguments: encoded and sent with the context defaults
//! - `n + 1` arguments: the last one is a `TxOverrides` object
//! - anything else: `Error::CallShape`

pub mod encode;

use serde_json::Value;
use tracing::debug;

use crate::adt::{generate_type_constructors, TypeConstructors};
use crate::cache::ContractInfo;
use crate::chain::{CallParams, ChainClient, ContractHandle, Transaction, TxOverrides};
use crate::context::ScillaContext;
use crate::model::{Field, ParsedContract};
use crate::numeric::{decode_scalar, DecodedValue};
use crate::{Error, Result};

use encode::{encode_args, split_call_args};

#[derive(Debug, Clone, PartialEq)]
pub struct ScillaContract {
    info: ContractInfo,
    handle: ContractHandle,
    deployed_by: Option<Transaction>,
    executer: Option<String>,
}

impl ScillaContract {
    pub fn bind(info: ContractInfo, handle: ContractHandle) -> Self {
        Self {
            info,
            handle,
            deployed_by: None,
            executer: None,
        }
    }

    pub(crate) fn with_deployment(mut self, tx: Transaction) -> Self {
        self.deployed_by = Some(tx);
        self
    }

    pub fn address(&self) -> &str {
        &self.handle.address
    }

    pub fn handle(&self) -> &ContractHandle {
        &self.handle
    }

    pub fn info(&self) -> &ContractInfo {
        &self.info
    }

    pub fn parsed(&self) -> &ParsedContract {
        &self.info.parsed_contract
    }

    /// Transaction that created this contract, when deployed through this crate
    pub fn deployed_by(&self) -> Option<&Transaction> {
        self.deployed_by.as_ref()
    }

    /// Send subsequent calls from `pub_key`
    pub fn connect(&mut self, pub_key: impl Into<String>) -> &mut Self {
        self.executer = Some(pub_key.into());
        self
    }

    pub fn executer(&self) -> Option<&str> {
        self.executer.as_deref()
    }

    /// Factories for the contract's user-defined constructors
    pub fn ctors(&self) -> TypeConstructors {
        generate_type_constructors(&self.parsed().ctors)
    }

    /// Invoke `transition` with positional arguments
    pub fn invoke<C: ChainClient>(
        &self,
        ctx: &ScillaContext<C>,
        transition: &str,
        args: Vec<Value>,
    ) -> Result<Transaction> {
        let params = self.transition_params(transition)?;
        let (args, overrides) = split_call_args(transition, params.len(), args)?;
        self.send(ctx, transition, params, &args, overrides.as_ref())
    }

    /// Invoke `transition` with explicit overrides, `args` must match exactly
    pub fn invoke_with<C: ChainClient>(
        &self,
        ctx: &ScillaContext<C>,
        transition: &str,
        args: Vec<Value>,
        overrides: &TxOverrides,
    ) -> Result<Transaction> {
        let params = self.transition_params(transition)?;
        self.send(ctx, transition, params, &args, Some(overrides))
    }

    fn transition_params(&self, transition: &str) -> Result<&[Field]> {
        self.parsed()
            .transition(transition)
            .map(|t| t.params.as_slice())
            .ok_or_else(|| Error::UnknownTransition {
                contract: self.parsed().name.clone(),
                transition: transition.to_string(),
            })
    }

    fn send<C: ChainClient>(
        &self,
        ctx: &ScillaContext<C>,
        transition: &str,
        params: &[Field],
        args: &[Value],
        overrides: Option<&TxOverrides>,
    ) -> Result<Transaction> {
        let encoded = encode_args(transition, params, args)?;
        let call_params = self.call_params(ctx, overrides);
        debug!(
            contract = %self.parsed().name,
            address = %self.handle.address,
            transition,
            "calling transition"
        );
        ctx.client()
            .call(&self.handle, transition, &encoded, &call_params, ctx.setup().retry())
    }

    fn call_params<C: ChainClient>(
        &self,
        ctx: &ScillaContext<C>,
        overrides: Option<&TxOverrides>,
    ) -> CallParams {
        let mut params = ctx.setup().call_params();
        params.pub_key = self.executer.clone();
        if let Some(overrides) = overrides {
            overrides.apply(&mut params);
        }
        params
    }

    /// Current value of a mutable field
    pub fn read_field<C: ChainClient>(&self, ctx: &ScillaContext<C>, name: &str) -> Result<DecodedValue> {
        let field = self.parsed().field(name).ok_or_else(|| self.unknown_field(name))?;
        let state = ctx.client().get_state(&self.handle)?;
        let raw = state.get(name).ok_or_else(|| self.unknown_field(name))?;
        decode_scalar(&field.ty, raw)
    }

    /// Value a constructor parameter was deployed with
    pub fn read_init_param<C: ChainClient>(
        &self,
        ctx: &ScillaContext<C>,
        name: &str,
    ) -> Result<DecodedValue> {
        let param = self
            .parsed()
            .constructor_param(name)
            .ok_or_else(|| self.unknown_field(name))?;
        let init = ctx.client().get_init(&self.handle)?;
        let entry = init
            .iter()
            .find(|entry| entry.vname == name)
            .ok_or_else(|| self.unknown_field(name))?;
        decode_scalar(&param.ty, &entry.value)
    }

    fn unknown_field(&self, name: &str) -> Error {
        Error::UnknownField {
            contract: self.parsed().name.clone(),
            field: name.to_string(),
        }
    }
}
