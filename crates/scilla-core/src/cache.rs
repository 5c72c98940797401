//! Content-hash contract cache
//!
//! Parsing needs the external toolchain, so results are kept in a JSON file
//! keyed by source path. An entry is reused while the SHA-256 of the source
//! bytes is unchanged.
//!
//! # Guarantees
//!
//! - An unchanged file is never handed to the compiler again
//! - A file that fails to parse has no entry, stale or otherwise
//! - The cache file is only rewritten when an entry changed
//! - One entry per file, however the root is spelled

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::compiler::SexpCompiler;
use crate::model::ParsedContract;
use crate::parser::{parse_source_file, LIBRARY_EXTENSION};
use crate::{Error, Result};

pub const DEFAULT_CACHE_FILE: &str = "artifacts/scilla.cache";

const SOURCE_EXTENSIONS: [&str; 2] = ["scilla", LIBRARY_EXTENSION];
const EXCLUDED_DIR: &str = "node_modules";

/// Cached parse result for one source file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractInfo {
    /// SHA-256 of the source bytes, lowercase hex
    pub content_hash: String,
    /// Source path, or the chain address for contracts fetched from the network
    pub path: String,
    pub parsed_contract: ParsedContract,
}

/// What an `update` pass did
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct UpdateReport {
    pub parsed: Vec<String>,
    pub unchanged: Vec<String>,
    pub failed: Vec<String>,
    pub removed: Vec<String>,
}

impl UpdateReport {
    pub fn changed(&self) -> bool {
        !self.parsed.is_empty() || !self.removed.is_empty()
    }
}

pub struct ContractCache {
    file: PathBuf,
    entries: BTreeMap<String, ContractInfo>,
}

impl ContractCache {
    /// Load the cache file, starting empty when it does not exist
    pub fn load(file: impl Into<PathBuf>) -> Result<Self> {
        let file = file.into();
        let entries = if file.exists() {
            let text = fs::read_to_string(&file).map_err(|e| Error::io(&file, e))?;
            serde_json::from_str(&text)?
        } else {
            info!(cache = %file.display(), "Cache file doesn't exist, creating a new one");
            BTreeMap::new()
        };
        Ok(Self { file, entries })
    }

    pub fn file(&self) -> &Path {
        &self.file
    }

    /// Entries keyed by source path
    pub fn entries(&self) -> &BTreeMap<String, ContractInfo> {
        &self.entries
    }

    /// Re-parse every changed source under `root`, keyed by canonical path
    ///
    /// Entries for files no longer found under `root` are dropped.
    pub fn update(&mut self, root: &Path, compiler: &dyn SexpCompiler) -> Result<UpdateReport> {
        let mut report = UpdateReport::default();
        // keys must not depend on how the root was spelled
        let root = fs::canonicalize(root).map_err(|e| Error::io(root, e))?;
        let mut seen = BTreeSet::new();

        for path in find_sources(&root)? {
            let key = path.display().to_string();
            seen.insert(key.clone());
            let hash = file_hash(&path)?;

            if self.entries.get(&key).map(|e| e.content_hash.as_str()) == Some(hash.as_str()) {
                debug!(file = %key, "unchanged");
                report.unchanged.push(key);
                continue;
            }

            match parse_source_file(&path, compiler) {
                Ok(parsed_contract) => {
                    info!(file = %key, contract = %parsed_contract.name, "parsed");
                    self.entries.insert(
                        key.clone(),
                        ContractInfo {
                            content_hash: hash,
                            path: key.clone(),
                            parsed_contract,
                        },
                    );
                    report.parsed.push(key);
                }
                Err(err) => {
                    warn!(file = %key, error = %err, "failed to parse");
                    if self.entries.remove(&key).is_some() {
                        report.removed.push(key.clone());
                    }
                    report.failed.push(key);
                }
            }
        }

        let gone: Vec<String> = self
            .entries
            .keys()
            .filter(|key| !seen.contains(*key))
            .cloned()
            .collect();
        for key in gone {
            debug!(file = %key, "source removed");
            self.entries.remove(&key);
            report.removed.push(key);
        }

        Ok(report)
    }

    /// Write the cache file, creating its directory if needed
    pub fn save(&self) -> Result<()> {
        if let Some(dir) = self.file.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|e| Error::io(dir, e))?;
        }
        let json = serde_json::to_string_pretty(&self.entries)?;
        fs::write(&self.file, json).map_err(|e| Error::io(&self.file, e))
    }

    /// Update and save in one go, writing only when something changed
    pub fn refresh(&mut self, root: &Path, compiler: &dyn SexpCompiler) -> Result<UpdateReport> {
        let report = self.update(root, compiler)?;
        if report.changed() || !self.file.exists() {
            self.save()?;
        }
        Ok(report)
    }

    /// Entries re-keyed by contract name
    ///
    /// # Errors
    /// `DuplicateContractName` when two files declare the same name.
    pub fn by_name(&self) -> Result<BTreeMap<String, ContractInfo>> {
        let mut named: BTreeMap<String, ContractInfo> = BTreeMap::new();
        for info in self.entries.values() {
            let name = &info.parsed_contract.name;
            if let Some(first) = named.get(name) {
                return Err(Error::DuplicateContractName {
                    name: name.clone(),
                    first: first.path.clone(),
                    second: info.path.clone(),
                });
            }
            named.insert(name.clone(), info.clone());
        }
        Ok(named)
    }
}

/// SHA-256 of `bytes` as lowercase hex
pub fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

pub fn file_hash(path: &Path) -> Result<String> {
    let bytes = fs::read(path).map_err(|e| Error::io(path, e))?;
    Ok(content_hash(&bytes))
}

/// Every contract and library source below `root`, sorted, skipping `node_modules`
pub fn find_sources(root: &Path) -> Result<Vec<PathBuf>> {
    let base = glob::Pattern::escape(&root.display().to_string());
    let mut found = Vec::new();
    for ext in SOURCE_EXTENSIONS {
        for entry in glob::glob(&format!("{}/**/*.{}", base, ext))? {
            let path = entry.map_err(|e| Error::io(e.path().to_path_buf(), e.into_error()))?;
            if path.components().any(|c| c.as_os_str() == EXCLUDED_DIR) {
                continue;
            }
            found.push(path);
        }
    }
    found.sort();
    Ok(found)
}
