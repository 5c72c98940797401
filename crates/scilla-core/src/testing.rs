//! In-memory chain client that records every request

use std::cell::RefCell;
use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::binding::encode::ParamValue;
use crate::chain::{
    CallParams, ChainClient, ContractHandle, NamedValue, Receipt, RetryPolicy, Transaction,
};
use crate::Result;

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub address: String,
    pub transition: String,
    pub args: Vec<ParamValue>,
    pub params: CallParams,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedDeploy {
    pub code: String,
    pub init: Vec<ParamValue>,
    pub params: CallParams,
}

#[derive(Debug, Default)]
pub struct RecordingClient {
    pub calls: RefCell<Vec<RecordedCall>>,
    pub deploys: RefCell<Vec<RecordedDeploy>>,
    pub state: Map<String, Value>,
    pub init: Vec<NamedValue>,
    /// Deployed code by address
    pub code: BTreeMap<String, String>,
}

impl RecordingClient {
    pub fn with_state(state: Value) -> Self {
        Self {
            state: state.as_object().cloned().unwrap_or_default(),
            ..Default::default()
        }
    }

    pub fn last_call(&self) -> RecordedCall {
        self.calls.borrow().last().cloned().expect("no call recorded")
    }

    pub fn last_deploy(&self) -> RecordedDeploy {
        self.deploys.borrow().last().cloned().expect("no deploy recorded")
    }
}

fn confirmed(id: String) -> Transaction {
    Transaction {
        id,
        receipt: Some(Receipt {
            success: true,
            ..Default::default()
        }),
    }
}

impl ChainClient for RecordingClient {
    fn deploy(
        &self,
        code: &str,
        init: &[ParamValue],
        params: &CallParams,
        _retry: RetryPolicy,
    ) -> Result<(Transaction, ContractHandle)> {
        let mut deploys = self.deploys.borrow_mut();
        deploys.push(RecordedDeploy {
            code: code.to_string(),
            init: init.to_vec(),
            params: params.clone(),
        });
        let n = deploys.len();
        Ok((
            confirmed(format!("deploy-{}", n)),
            ContractHandle::new(format!("0x{:040x}", n)),
        ))
    }

    fn call(
        &self,
        contract: &ContractHandle,
        transition: &str,
        args: &[ParamValue],
        params: &CallParams,
        _retry: RetryPolicy,
    ) -> Result<Transaction> {
        let mut calls = self.calls.borrow_mut();
        calls.push(RecordedCall {
            address: contract.address.clone(),
            transition: transition.to_string(),
            args: args.to_vec(),
            params: params.clone(),
        });
        Ok(confirmed(format!("call-{}", calls.len())))
    }

    fn get_state(&self, _contract: &ContractHandle) -> Result<Map<String, Value>> {
        Ok(self.state.clone())
    }

    fn get_init(&self, _contract: &ContractHandle) -> Result<Vec<NamedValue>> {
        Ok(self.init.clone())
    }

    fn get_code(&self, address: &str) -> Result<Option<String>> {
        Ok(self.code.get(address).cloned())
    }
}
