//! Error types for Scilla tooling
//!
//! All fallible operations return `Result<T, Error>`.
//! Parse errors carry the offending node so grammar drift in the
//! external compiler can be diagnosed from the message alone.

use std::path::PathBuf;

/// Scilla tooling error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed S-expression text
    #[error("Syntax error: {0}")]
    Syntax(String),

    /// Unexpected tag or shape in the compiler's S-expression output
    #[error("Grammar mismatch: {message}: {node}")]
    Grammar { message: String, node: String },

    /// A cached field has no structured type attached
    #[error("Parameters were incorrectly parsed for `{0}`. Try clearing your scilla.cache file.")]
    StaleCache(String),

    /// Wrong number of positional arguments for a transition or constructor
    #[error("Expected to receive {expected} parameters for {target} but got {found}")]
    CallShape {
        target: String,
        expected: usize,
        found: usize,
    },

    /// A positional argument does not have the shape its type demands
    #[error("Argument shape error: {0}")]
    ArgumentShape(String),

    /// Contract or library name not present in the loaded cache
    #[error("Scilla contract {0} doesn't exist.")]
    MissingContract(String),

    #[error("Contract {contract} has no transition named {transition}")]
    UnknownTransition { contract: String, transition: String },

    #[error("Contract {contract} has no field named {field}")]
    UnknownField { contract: String, field: String },

    /// Two source files declare the same contract name
    #[error("Contract name {name} is declared by both {first} and {second}")]
    DuplicateContractName {
        name: String,
        first: String,
        second: String,
    },

    /// The external Scilla toolchain failed
    #[error("Toolchain error: {0}")]
    Toolchain(String),

    /// Deployment request is incomplete
    #[error("Deployment error: {0}")]
    Deployment(String),

    /// A chain value does not match its declared type
    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Invalid source pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    /// Failure reported by the chain client, passed through unmodified
    #[error(transparent)]
    Remote(Box<dyn std::error::Error + Send + Sync>),

    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

impl Error {
    pub(crate) fn grammar(message: impl Into<String>, node: impl std::fmt::Display) -> Self {
        Error::Grammar {
            message: message.into(),
            node: node.to_string(),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    /// Wrap an error raised by a chain client implementation
    pub fn remote(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Error::Remote(Box::new(err))
    }
}

/// Result type alias for Scilla tooling operations
pub type Result<T> = std::result::Result<T, Error>;
