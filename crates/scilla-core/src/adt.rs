//! ADT constructor factory
//!
//! One `AdtConstructor` per user-defined constructor. Each owns a copy of
//! its constructor's metadata, so a factory built from a contract keeps
//! working unchanged if the contract model is later replaced.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::{Field, ScillaConstructor};
use crate::{Error, Result};

/// Argument literal produced by a constructor factory
///
/// Not checked against `argtypes` here; the encoder does that when the
/// literal is passed to a call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdtLiteral {
    pub constructor: String,
    pub argtypes: Vec<Field>,
    pub args: Value,
}

impl AdtLiteral {
    /// Arguments by position; a bare value counts as the single argument
    pub fn positional_args(&self) -> Vec<Value> {
        match &self.args {
            Value::Array(items) => items.clone(),
            Value::Null if self.argtypes.is_empty() => vec![],
            other => vec![other.clone()],
        }
    }
}

impl From<AdtLiteral> for Value {
    fn from(literal: AdtLiteral) -> Self {
        serde_json::json!({
            "constructor": literal.constructor,
            "argtypes": literal.argtypes,
            "args": literal.args,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AdtConstructor {
    ctor: ScillaConstructor,
}

impl AdtConstructor {
    pub fn type_name(&self) -> &str {
        &self.ctor.type_name
    }

    pub fn name(&self) -> &str {
        &self.ctor.constructor_name
    }

    pub fn apply(&self, args: impl Into<Value>) -> AdtLiteral {
        AdtLiteral {
            constructor: self.ctor.constructor_name.clone(),
            argtypes: self.ctor.argument_types.clone(),
            args: args.into(),
        }
    }
}

/// Factories for every constructor, keyed by constructor name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TypeConstructors {
    by_name: BTreeMap<String, AdtConstructor>,
}

impl TypeConstructors {
    pub fn get(&self, name: &str) -> Option<&AdtConstructor> {
        self.by_name.get(name)
    }

    /// Shorthand for `get(name)?.apply(args)`
    pub fn build(&self, name: &str, args: impl Into<Value>) -> Result<AdtLiteral> {
        self.get(name)
            .map(|ctor| ctor.apply(args))
            .ok_or_else(|| Error::ArgumentShape(format!("Unknown ADT constructor {}", name)))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.by_name.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

pub fn generate_type_constructors(ctors: &[ScillaConstructor]) -> TypeConstructors {
    TypeConstructors {
        by_name: ctors
            .iter()
            .map(|ctor| {
                (
                    ctor.constructor_name.clone(),
                    AdtConstructor { ctor: ctor.clone() },
                )
            })
            .collect(),
    }
}
