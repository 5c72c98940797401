//! Decoding of chain values into Rust values
//!
//! Scilla integers travel as decimal strings. Types up to 64 bits decode to
//! an `i128`, which holds every `Int32`..`Uint64` value exactly. The 128 and
//! 256 bit types decode to a `BigInt` so no precision is ever lost.

use std::str::FromStr;

use num_bigint::BigInt;
use serde_json::Value;

use crate::{Error, Result};

/// How a Scilla integer type is represented once decoded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumericKind {
    /// Fits in an `i128`
    Machine,
    /// Needs arbitrary precision
    Arbitrary,
}

pub fn numeric_kind(ty: &str) -> Option<NumericKind> {
    match ty {
        "Int32" | "Uint32" | "Int64" | "Uint64" => Some(NumericKind::Machine),
        "Int128" | "Uint128" | "Int256" | "Uint256" => Some(NumericKind::Arbitrary),
        _ => None,
    }
}

pub fn is_numeric(ty: &str) -> bool {
    numeric_kind(ty).is_some()
}

/// A chain value after decoding
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedValue {
    Null,
    Bool(bool),
    Int(i128),
    BigInt(BigInt),
    /// Anything without a more specific representation, as returned by the chain
    Json(Value),
}

impl DecodedValue {
    pub fn as_i128(&self) -> Option<i128> {
        match self {
            DecodedValue::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bigint(&self) -> Option<BigInt> {
        match self {
            DecodedValue::Int(n) => Some(BigInt::from(*n)),
            DecodedValue::BigInt(n) => Some(n.clone()),
            _ => None,
        }
    }
}

/// Decode `raw` according to its declared Scilla type
///
/// Integer types are parsed; everything else is returned as JSON.
pub fn decode_scalar(ty: &str, raw: &Value) -> Result<DecodedValue> {
    let Some(kind) = numeric_kind(ty) else {
        return Ok(DecodedValue::Json(raw.clone()));
    };
    let text = match raw {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        other => {
            return Err(Error::Decode(format!(
                "Expected a {} value, found {}",
                ty, other
            )))
        }
    };
    let invalid = || Error::Decode(format!("Invalid {} value '{}'", ty, text));
    match kind {
        NumericKind::Machine => text
            .parse::<i128>()
            .map(DecodedValue::Int)
            .map_err(|_| invalid()),
        NumericKind::Arbitrary => BigInt::from_str(&text)
            .map(DecodedValue::BigInt)
            .map_err(|_| invalid()),
    }
}
