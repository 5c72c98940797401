//! External Scilla toolchain
//!
//! `scilla-fmt` produces the S-expression dump the parser consumes and
//! `scilla-checker` type-checks a source file. Both run either from PATH or
//! inside the official docker image with the source mounted read-only.

use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::debug;

use crate::settings::ToolchainSettings;
use crate::{Error, Result};

/// Mount point of the source file inside the container
const CONTAINER_INPUT: &str = "/tmp/input.scilla";
const CONTAINER_STDLIB: &str = "/stdlib";
const IMAGE_STDLIB: &str = "/scilla/0/src/stdlib";
const IMAGE_BIN: &str = "/scilla/0/bin";
const CHECKER_GAS_LIMIT: &str = "10000";

/// Anything that can turn a source file into the S-expression dump
pub trait SexpCompiler {
    fn to_sexp(&self, path: &Path) -> Result<String>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Toolchain {
    /// `scilla-fmt` and `scilla-checker` on PATH
    Native,
    Docker { image: String },
}

impl Toolchain {
    pub fn from_settings(settings: &ToolchainSettings) -> Self {
        if settings.native {
            Toolchain::Native
        } else {
            Toolchain::Docker {
                image: settings.docker_image.clone(),
            }
        }
    }

    /// Full command line for the formatter, program first
    pub fn fmt_invocation(&self, path: &Path) -> Result<Vec<String>> {
        let fmt_args = ["--sexp", "--human-readable"];
        match self {
            Toolchain::Native => {
                let mut argv = vec!["scilla-fmt".to_string()];
                argv.extend(fmt_args.iter().map(|a| a.to_string()));
                argv.push(path.display().to_string());
                Ok(argv)
            }
            Toolchain::Docker { image } => {
                let mut argv = docker_prefix(image, &[mount(&absolute(path)?, CONTAINER_INPUT)]);
                argv.push(format!("{}/scilla-fmt", IMAGE_BIN));
                argv.extend(fmt_args.iter().map(|a| a.to_string()));
                argv.push(CONTAINER_INPUT.into());
                Ok(argv)
            }
        }
    }

    /// Full command line for the checker, program first
    ///
    /// The native checker has no bundled stdlib, so `libdir` is required.
    pub fn check_invocation(&self, path: &Path, libdir: Option<&Path>) -> Result<Vec<String>> {
        match self {
            Toolchain::Native => {
                let libdir = libdir.ok_or_else(|| {
                    Error::Toolchain("A stdlib directory is required to run the native checker".into())
                })?;
                Ok(vec![
                    "scilla-checker".into(),
                    "-gaslimit".into(),
                    CHECKER_GAS_LIMIT.into(),
                    "-libdir".into(),
                    libdir.display().to_string(),
                    path.display().to_string(),
                ])
            }
            Toolchain::Docker { image } => {
                let mut mounts = vec![mount(&absolute(path)?, CONTAINER_INPUT)];
                let container_libdir = match libdir {
                    Some(dir) => {
                        mounts.push(mount(&absolute(dir)?, CONTAINER_STDLIB));
                        CONTAINER_STDLIB
                    }
                    None => IMAGE_STDLIB,
                };
                let mut argv = docker_prefix(image, &mounts);
                argv.extend([
                    format!("{}/scilla-checker", IMAGE_BIN),
                    "-gaslimit".into(),
                    CHECKER_GAS_LIMIT.into(),
                    "-libdir".into(),
                    container_libdir.into(),
                    CONTAINER_INPUT.into(),
                ]);
                Ok(argv)
            }
        }
    }

    /// Type-check a source file, returning the checker's JSON report
    pub fn check(&self, path: &Path, libdir: Option<&Path>) -> Result<String> {
        run(self.check_invocation(path, libdir)?)
    }
}

impl SexpCompiler for Toolchain {
    fn to_sexp(&self, path: &Path) -> Result<String> {
        run(self.fmt_invocation(path)?)
    }
}

fn docker_prefix(image: &str, mounts: &[String]) -> Vec<String> {
    let mut argv = vec!["docker".to_string(), "run".into(), "--rm".into()];
    for m in mounts {
        argv.push("-v".into());
        argv.push(m.clone());
    }
    argv.push("-i".into());
    argv.push(image.to_string());
    argv
}

fn mount(host: &Path, container: &str) -> String {
    format!("{}:{}", host.display(), container)
}

fn absolute(path: &Path) -> Result<PathBuf> {
    std::fs::canonicalize(path).map_err(|e| Error::io(path, e))
}

fn run(argv: Vec<String>) -> Result<String> {
    let (program, args) = argv
        .split_first()
        .ok_or_else(|| Error::Toolchain("Empty command line".into()))?;
    debug!(command = %argv.join(" "), "running scilla toolchain");

    let output = Command::new(program)
        .args(args)
        .output()
        .map_err(|e| Error::Toolchain(format!("Failed to start {}: {}", program, e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let stdout = String::from_utf8_lossy(&output.stdout);
        let detail = if stderr.trim().is_empty() { stdout } else { stderr };
        return Err(Error::Toolchain(format!(
            "{} exited with {}: {}",
            program,
            output.status,
            detail.trim()
        )));
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}
