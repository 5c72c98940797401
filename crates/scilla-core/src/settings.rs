//! Layered configuration
//!
//! Defaults, then an optional file named by `SCILLA__CONFIG` (or passed
//! explicitly), then `SCILLA__*` environment variables. Nested keys use
//! `__` so names with underscores stay addressable, e.g.
//! `SCILLA__TOOLCHAIN__DOCKER_IMAGE`.

use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScillaSettings {
    pub network: NetworkSettings,
    pub transactions: TransactionSettings,
    pub toolchain: ToolchainSettings,
    pub contracts: ContractsSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NetworkSettings {
    pub url: String,
    pub chain_id: u32,
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            url: "http://localhost:5555".into(),
            chain_id: 111,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TransactionSettings {
    /// Confirmation polls before a transaction is reported as pending
    pub attempts: u32,
    /// Delay between polls
    pub timeout_ms: u64,
    /// Gas price in Li (10^6 Qa)
    pub gas_price_li: u64,
    pub gas_limit: u64,
}

impl Default for TransactionSettings {
    fn default() -> Self {
        Self {
            attempts: 10,
            timeout_ms: 1000,
            gas_price_li: 2000,
            gas_limit: 50000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ToolchainSettings {
    /// Use binaries on PATH instead of the docker image
    pub native: bool,
    pub docker_image: String,
    /// Standard library directory handed to the checker
    pub stdlib_dir: Option<PathBuf>,
}

impl Default for ToolchainSettings {
    fn default() -> Self {
        Self {
            native: false,
            docker_image: "zilliqa/scilla:v0.13.3".into(),
            stdlib_dir: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ContractsSettings {
    /// Root scanned for `.scilla` and `.scillib` files
    pub dir: PathBuf,
    pub cache_file: PathBuf,
}

impl Default for ContractsSettings {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("contracts"),
            cache_file: PathBuf::from(crate::cache::DEFAULT_CACHE_FILE),
        }
    }
}

impl ScillaSettings {
    pub const NAME: &'static str = "SCILLA";

    /// Build from the file named by `SCILLA__CONFIG`, if any, and the environment
    pub fn build() -> Result<Self> {
        Self::build_with_file(None)
    }

    /// Like `build`, with `config_file` taking precedence over `SCILLA__CONFIG`
    pub fn build_with_file(config_file: Option<&Path>) -> Result<Self> {
        let config_var = format!("{}__CONFIG", Self::NAME);
        let env_file = std::env::var(&config_var).ok().map(PathBuf::from);
        // otherwise the environment source would see it as an unknown `config` key
        std::env::remove_var(&config_var);

        let mut builder = Config::builder();
        if let Some(path) = config_file.map(Path::to_path_buf).or(env_file) {
            builder = builder.add_source(File::from(path.as_path()));
        }
        builder = builder.add_source(
            Environment::with_prefix(Self::NAME)
                .separator("__")
                .try_parsing(true),
        );

        let settings: Self = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.transactions.attempts == 0 {
            return Err(Error::Config(config::ConfigError::Message(
                "transactions.attempts must be at least 1".into(),
            )));
        }
        if !self.toolchain.native && self.toolchain.docker_image.trim().is_empty() {
            return Err(Error::Config(config::ConfigError::Message(
                "toolchain.docker_image must be set unless toolchain.native is true".into(),
            )));
        }
        Ok(())
    }
}
