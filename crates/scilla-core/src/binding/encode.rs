//! Argument encoding
//!
//! Caller values arrive as `serde_json::Value`. Primitive slots take any
//! scalar and send its string form. ADT slots take either a JSON array
//! (one element per constructor argument, by position), a literal built by
//! the constructor factory, or an already encoded `{constructor, argtypes,
//! arguments}` object.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::adt::AdtLiteral;
use crate::chain::TxOverrides;
use crate::model::{AdtField, Field, TypeJson};
use crate::{Error, Result};

/// One named value on the wire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamValue {
    pub vname: String,
    #[serde(rename = "type")]
    pub ty: String,
    pub value: EncodedValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EncodedValue {
    Scalar(String),
    Adt(AdtValue),
    List(Vec<EncodedValue>),
}

/// Constructor application as the node expects it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdtValue {
    pub constructor: String,
    pub argtypes: Vec<String>,
    pub arguments: Vec<EncodedValue>,
}

/// Separate the optional trailing transaction overrides from positional arguments
///
/// Exactly `expected` arguments, or `expected + 1` with the last one an
/// overrides object.
pub fn split_call_args(
    target: &str,
    expected: usize,
    mut args: Vec<Value>,
) -> Result<(Vec<Value>, Option<TxOverrides>)> {
    if args.len() == expected {
        return Ok((args, None));
    }
    if args.len() == expected + 1 {
        if let Some(last) = args.pop() {
            let overrides = serde_json::from_value(last).map_err(|e| {
                Error::ArgumentShape(format!("Invalid transaction parameters for {}: {}", target, e))
            })?;
            return Ok((args, Some(overrides)));
        }
    }
    Err(Error::CallShape {
        target: target.to_string(),
        expected,
        found: args.len(),
    })
}

/// Encode positional arguments against their declared parameters
pub fn encode_args(target: &str, params: &[Field], args: &[Value]) -> Result<Vec<ParamValue>> {
    if params.len() != args.len() {
        return Err(Error::CallShape {
            target: target.to_string(),
            expected: params.len(),
            found: args.len(),
        });
    }
    params
        .iter()
        .zip(args)
        .map(|(param, arg)| encode_param(param, arg))
        .collect()
}

/// Encode one named top-level parameter
pub fn encode_param(field: &Field, arg: &Value) -> Result<ParamValue> {
    Ok(ParamValue {
        vname: field.name.clone(),
        ty: field.ty.clone(),
        value: encode_value(field, arg)?,
    })
}

/// Encode a value for a slot; nested positions carry no name
pub fn encode_value(field: &Field, arg: &Value) -> Result<EncodedValue> {
    let type_json = field
        .type_json
        .as_ref()
        .ok_or_else(|| Error::StaleCache(slot_label(field)))?;

    match type_json {
        TypeJson::Prim(_) => scalar(field, arg).map(EncodedValue::Scalar),
        TypeJson::Adt(adt) => encode_adt(field, adt, arg),
        TypeJson::Map(_) => Err(Error::ArgumentShape(format!(
            "Map values cannot be passed as arguments ({})",
            slot_label(field)
        ))),
    }
}

fn encode_adt(field: &Field, adt: &AdtField, arg: &Value) -> Result<EncodedValue> {
    if let Value::Object(obj) = arg {
        if obj.contains_key("arguments") {
            let value: AdtValue = serde_json::from_value(arg.clone())?;
            return Ok(EncodedValue::Adt(value));
        }
        if obj.contains_key("args") {
            let literal: AdtLiteral = serde_json::from_value(arg.clone())?;
            return encode_literal(&literal);
        }
    }

    let items = arg.as_array().ok_or_else(|| {
        Error::ArgumentShape(format!(
            "Expected an array of {} arguments for {}, got {}",
            adt.argtypes.len(),
            slot_label(field),
            arg
        ))
    })?;

    let arguments = adt
        .argtypes
        .iter()
        .enumerate()
        .map(|(i, argtype)| {
            let item = items.get(i).ok_or_else(|| {
                Error::ArgumentShape(format!(
                    "Missing argument {} of {} for {}",
                    i,
                    adt.argtypes.len(),
                    slot_label(field)
                ))
            })?;
            encode_value(argtype, item)
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(EncodedValue::Adt(AdtValue {
        constructor: adt.ctor.clone(),
        argtypes: adt.argtypes.iter().map(|f| f.ty.clone()).collect(),
        arguments,
    }))
}

/// Encode a factory literal, checking its arity
pub fn encode_literal(literal: &AdtLiteral) -> Result<EncodedValue> {
    let positional = literal.positional_args();
    if positional.len() != literal.argtypes.len() {
        return Err(Error::CallShape {
            target: format!("constructor {}", literal.constructor),
            expected: literal.argtypes.len(),
            found: positional.len(),
        });
    }
    let arguments = literal
        .argtypes
        .iter()
        .zip(&positional)
        .map(|(argtype, arg)| encode_value(argtype, arg))
        .collect::<Result<Vec<_>>>()?;

    Ok(EncodedValue::Adt(AdtValue {
        constructor: literal.constructor.clone(),
        argtypes: literal.argtypes.iter().map(|f| f.ty.clone()).collect(),
        arguments,
    }))
}

fn scalar(field: &Field, arg: &Value) -> Result<String> {
    match arg {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        other => Err(Error::ArgumentShape(format!(
            "Expected a scalar for {}, got {}",
            slot_label(field),
            other
        ))),
    }
}

fn slot_label(field: &Field) -> String {
    if field.name.is_empty() {
        field.ty.clone()
    } else {
        format!("{} ({})", field.name, field.ty)
    }
}
