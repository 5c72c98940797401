//! Event log simplification
//!
//! Event parameters arrive in wire form: integers as strings, `Bool` and
//! `Option` as constructor objects. `simplify_logs` turns them into
//! `DecodedValue`s that compare naturally in tests, and `has_event_with_params`
//! checks a transaction's events against a partial description.

use serde_json::Value;

use crate::chain::{EventLog, Transaction};
use crate::numeric::{decode_scalar, is_numeric, DecodedValue};
use crate::tx_errors::event_log;

#[derive(Debug, Clone, PartialEq)]
pub struct SimplifiedParam {
    pub vname: String,
    pub ty: String,
    pub value: DecodedValue,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimplifiedEvent {
    pub event_name: String,
    pub address: String,
    pub params: Vec<SimplifiedParam>,
}

impl SimplifiedEvent {
    pub fn param(&self, name: &str) -> Option<&DecodedValue> {
        self.params.iter().find(|p| p.vname == name).map(|p| &p.value)
    }
}

/// Decode every event parameter
///
/// Values that do not have the shape their type promises are kept as raw JSON.
pub fn simplify_logs(logs: &[EventLog]) -> Vec<SimplifiedEvent> {
    logs.iter()
        .map(|log| SimplifiedEvent {
            event_name: log.event_name.clone(),
            address: log.address.clone(),
            params: log
                .params
                .iter()
                .map(|p| SimplifiedParam {
                    vname: p.vname.clone(),
                    ty: p.ty.clone(),
                    value: simplify_value(&p.ty, &p.value),
                })
                .collect(),
        })
        .collect()
}

/// Partial description of an event parameter; absent parts match anything
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventParam {
    pub vname: Option<String>,
    pub ty: Option<String>,
    pub value: Option<DecodedValue>,
}

impl EventParam {
    pub fn named(vname: impl Into<String>) -> Self {
        Self {
            vname: Some(vname.into()),
            ..Default::default()
        }
    }

    pub fn with_type(mut self, ty: impl Into<String>) -> Self {
        self.ty = Some(ty.into());
        self
    }

    pub fn with_value(mut self, value: DecodedValue) -> Self {
        self.value = Some(value);
        self
    }

    pub fn matches(&self, param: &SimplifiedParam) -> bool {
        self.vname.as_ref().map_or(true, |v| *v == param.vname)
            && self.ty.as_ref().map_or(true, |t| *t == param.ty)
            && self.value.as_ref().map_or(true, |v| same_value(v, &param.value))
    }
}

// Integers compare by value whatever their width.
fn same_value(expected: &DecodedValue, actual: &DecodedValue) -> bool {
    match (expected.as_bigint(), actual.as_bigint()) {
        (Some(a), Some(b)) => a == b,
        _ => expected == actual,
    }
}

/// First event named `name` in the receipt, simplified
pub fn find_event(tx: &Transaction, name: &str) -> Option<SimplifiedEvent> {
    let log = event_log(tx).iter().find(|log| log.event_name == name)?;
    simplify_logs(std::slice::from_ref(log)).pop()
}

pub fn has_event(tx: &Transaction, name: &str) -> bool {
    event_log(tx).iter().any(|log| log.event_name == name)
}

/// Whether the first event named `name` has a parameter matching each of `expected`
pub fn has_event_with_params(tx: &Transaction, name: &str, expected: &[EventParam]) -> bool {
    find_event(tx, name).is_some_and(|event| {
        expected
            .iter()
            .all(|want| event.params.iter().any(|param| want.matches(param)))
    })
}

fn simplify_value(ty: &str, value: &Value) -> DecodedValue {
    let raw = || DecodedValue::Json(value.clone());
    if is_numeric(ty) {
        return decode_scalar(ty, value).unwrap_or_else(|_| raw());
    }
    if ty.starts_with("Option") {
        return match constructor(value) {
            Some("None") => DecodedValue::Null,
            Some(_) => {
                let inner_ty = value["argtypes"][0].as_str().unwrap_or_default();
                let inner = &value["arguments"][0];
                if inner.is_null() {
                    raw()
                } else {
                    decode_scalar(inner_ty, inner).unwrap_or_else(|_| DecodedValue::Json(inner.clone()))
                }
            }
            None => raw(),
        };
    }
    if ty == "Bool" {
        return match constructor(value) {
            Some(c) => DecodedValue::Bool(c == "True"),
            None => raw(),
        };
    }
    raw()
}

fn constructor(value: &Value) -> Option<&str> {
    value.get("constructor").and_then(Value::as_str)
}
