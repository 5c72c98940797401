//! Scilla Core - contract parsing and typed call bindings for Scilla
//!
//! Turns Scilla sources into a structural contract model and uses that
//! model to validate and encode calls to deployed contracts.
//!
//! # Architecture
//!
//! ```text
//! .scilla → Toolchain (scilla-fmt) → S-expression → Parser → ParsedContract
//!                                                              ↓
//!                                      ContractCache (content hash, JSON on disk)
//!                                                              ↓
//!                 ScillaContext → deploy / ScillaContract → encode → ChainClient
//! ```
//!
//! # Guarantees
//!
//! - **Strict**: an unexpected compiler AST shape aborts the parse of that file
//! - **Incremental**: unchanged sources are never re-parsed
//! - **Validated**: argument counts and shapes are checked before any network call

pub mod adt;
pub mod binding;
pub mod cache;
pub mod chain;
pub mod codegen;
pub mod compiler;
pub mod context;
pub mod deploy;
pub mod error;
pub mod logs;
pub mod model;
pub mod numeric;
pub mod parser;
pub mod settings;
pub mod tx_errors;

#[cfg(test)]
pub(crate) mod testing;

pub use adt::{generate_type_constructors, AdtConstructor, AdtLiteral, TypeConstructors};
pub use binding::encode::{AdtValue, EncodedValue, ParamValue};
pub use binding::ScillaContract;
pub use cache::{ContractCache, ContractInfo, UpdateReport};
pub use chain::{
    CallParams, ChainClient, ContractHandle, EventLog, NamedValue, Receipt, RetryPolicy,
    Transaction, TxOverrides,
};
pub use compiler::{SexpCompiler, Toolchain};
pub use context::{ScillaContext, Setup, SetupOverrides};
pub use deploy::{compress_contract, ContractDeployer, UserDefinedLibrary};
pub use error::{Error, Result};
pub use logs::{
    find_event, has_event, has_event_with_params, simplify_logs, EventParam, SimplifiedEvent,
    SimplifiedParam,
};
pub use model::{AdtField, Field, MapField, ParsedContract, ScillaConstructor, Transition, TypeJson};
pub use numeric::DecodedValue;
pub use parser::{parse_contract_sexp, parse_scilla, parse_source_file};
pub use settings::ScillaSettings;

/// Version of this crate, as reported by the CLI
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// Generated bindings name `serde_json::Value` through this crate.
pub use serde_json;
