use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use colored::Colorize;
use scilla_core::codegen::generate_bindings;
use scilla_core::parser::parse_source_file;
use scilla_core::{
    compress_contract, parse_contract_sexp, ContractCache, Error, ParsedContract, ScillaSettings,
    SexpCompiler, Toolchain,
};
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Scilla contract tooling
///
/// Parse contracts, maintain the contract cache and generate typed bindings.
#[derive(Parser)]
#[command(name = "scilla-cli", version, about, long_about = None)]
struct Cli {
    /// Settings file (overrides SCILLA__CONFIG)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the S-expression dump of a .scilla file
    Compile {
        /// Path to .scilla file
        file: PathBuf,
    },

    /// Type-check contracts with scilla-checker
    Check {
        /// .scilla files (defaults to every contract under the configured contracts dir)
        files: Vec<PathBuf>,
        /// Standard library directory
        #[arg(long)]
        libdir: Option<PathBuf>,
    },

    /// Parse a contract and print its structure
    Parse {
        /// Path to .scilla/.scillib file, or an S-expression dump with --sexp
        file: PathBuf,
        /// Input is an S-expression dump, not Scilla source
        #[arg(long)]
        sexp: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Refresh the contract cache and list known contracts
    Contracts {
        /// Source root (defaults to the configured contracts dir)
        #[arg(long)]
        dir: Option<PathBuf>,
        /// Cache file (defaults to the configured cache file)
        #[arg(long)]
        cache: Option<PathBuf>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Compute the content hash (SHA-256) of a source file
    Hash {
        /// Path to source file
        file: PathBuf,
    },

    /// Strip comments and blank lines from a contract
    Compress {
        /// Path to .scilla file
        file: PathBuf,
        /// Overwrite the file in-place
        #[arg(long)]
        write: bool,
    },

    /// Generate a typed Rust wrapper for a contract
    Bindgen {
        /// Path to .scilla/.scillib file, or an S-expression dump with --sexp
        file: PathBuf,
        /// Input is an S-expression dump, not Scilla source
        #[arg(long)]
        sexp: bool,
        /// Output file (default: stdout)
        #[arg(short)]
        o: Option<PathBuf>,
    },

    /// Show version information
    Version,
}

fn main() {
    let cli = Cli::parse();
    if cli.no_color {
        colored::control::set_override(false);
    }
    init_tracing();

    let exit_code = match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{}: {}", "error".red().bold(), err);
            exit_code_for(&err)
        }
    };

    process::exit(exit_code);
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// 2 for problems with the invocation itself, 1 when the checked thing failed
fn exit_code_for(err: &Error) -> i32 {
    match err {
        Error::Io { .. } | Error::Config(_) | Error::Pattern(_) => 2,
        _ => 1,
    }
}

fn run(cli: Cli) -> scilla_core::Result<i32> {
    let settings = ScillaSettings::build_with_file(cli.config.as_deref())?;
    let toolchain = Toolchain::from_settings(&settings.toolchain);
    debug!(?toolchain, contracts = %settings.contracts.dir.display(), "settings loaded");

    match cli.command {
        Commands::Compile { file } => {
            require_file(&file)?;
            print!("{}", toolchain.to_sexp(&file)?);
            Ok(0)
        }
        Commands::Check { files, libdir } => {
            let files = if files.is_empty() {
                contract_sources(&settings.contracts.dir)?
            } else {
                files
            };
            for file in &files {
                require_file(file)?;
            }
            let libdir = libdir.or_else(|| settings.toolchain.stdlib_dir.clone());

            let mut failures = 0;
            for file in &files {
                match toolchain.check(file, libdir.as_deref()) {
                    Ok(report) => {
                        print!("{}", report);
                        eprintln!("{} {}", "✓".green(), file.display());
                    }
                    Err(err) => {
                        failures += 1;
                        eprintln!("{} {}: {}", "✗".red(), file.display(), err);
                    }
                }
            }
            if files.len() > 1 {
                eprintln!("{} of {} contracts checked cleanly", files.len() - failures, files.len());
            }
            Ok(if failures == 0 { 0 } else { 1 })
        }
        Commands::Parse { file, sexp, json } => {
            let contract = parse_input(&file, sexp, &toolchain)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&contract)?);
            } else {
                print_contract(&contract);
            }
            Ok(0)
        }
        Commands::Contracts { dir, cache, json } => {
            let dir = dir.unwrap_or_else(|| settings.contracts.dir.clone());
            let cache_file = cache.unwrap_or_else(|| settings.contracts.cache_file.clone());
            require_file(&dir)?;

            let mut cache = ContractCache::load(cache_file)?;
            let report = cache.refresh(&dir, &toolchain)?;
            let contracts = cache.by_name()?;

            if json {
                println!("{}", serde_json::to_string_pretty(&contracts)?);
            } else {
                for (name, info) in &contracts {
                    println!("{}  {}", name.bold(), info.path);
                }
            }
            for failed in &report.failed {
                eprintln!("{}: could not parse {}", "warning".yellow().bold(), failed);
            }
            Ok(if report.failed.is_empty() { 0 } else { 1 })
        }
        Commands::Hash { file } => {
            println!("{}", scilla_core::cache::file_hash(&file)?);
            Ok(0)
        }
        Commands::Compress { file, write } => {
            let code = fs::read_to_string(&file).map_err(|e| io_error(&file, e))?;
            let compressed = compress_contract(&code);
            if write {
                fs::write(&file, &compressed).map_err(|e| io_error(&file, e))?;
            } else {
                println!("{}", compressed);
            }
            Ok(0)
        }
        Commands::Bindgen { file, sexp, o } => {
            let contract = parse_input(&file, sexp, &toolchain)?;
            let code = generate_bindings(&contract);
            match o {
                Some(out) => fs::write(&out, code).map_err(|e| io_error(&out, e))?,
                None => print!("{}", code),
            }
            Ok(0)
        }
        Commands::Version => {
            println!(
                "scilla-cli {} (scilla-core {})",
                env!("CARGO_PKG_VERSION"),
                scilla_core::VERSION
            );
            Ok(0)
        }
    }
}

fn io_error(path: &Path, source: std::io::Error) -> Error {
    Error::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn require_file(path: &Path) -> scilla_core::Result<()> {
    if path.exists() {
        Ok(())
    } else {
        Err(io_error(
            path,
            std::io::Error::new(std::io::ErrorKind::NotFound, "file doesn't exist"),
        ))
    }
}

/// Every `.scilla` file under `dir`; libraries are checked through their importers
fn contract_sources(dir: &Path) -> scilla_core::Result<Vec<PathBuf>> {
    require_file(dir)?;
    let sources = scilla_core::cache::find_sources(dir)?;
    Ok(sources
        .into_iter()
        .filter(|p| p.extension().is_some_and(|ext| ext == "scilla"))
        .collect())
}

fn parse_input(file: &Path, sexp: bool, compiler: &dyn SexpCompiler) -> scilla_core::Result<ParsedContract> {
    if sexp {
        let text = fs::read_to_string(file).map_err(|e| io_error(file, e))?;
        parse_contract_sexp(&text)
    } else {
        parse_source_file(file, compiler)
    }
}

fn print_contract(contract: &ParsedContract) {
    let render = |fields: &[scilla_core::Field]| {
        fields
            .iter()
            .map(|f| format!("{}: {}", f.name, f.ty))
            .collect::<Vec<_>>()
            .join(", ")
    };

    println!("{} {}", "contract".bold(), contract.name);
    match &contract.constructor_params {
        Some(params) => println!("  params: {}", render(params)),
        None => println!("  params: (none)"),
    }
    for field in &contract.fields {
        println!("  field {} : {}", field.name, field.ty);
    }
    for t in &contract.transitions {
        let kind = if t.is_procedure() { "procedure" } else { "transition" };
        println!("  {} {}({})", kind, t.name, render(&t.params));
    }
    for ctor in &contract.ctors {
        let mut clause = ctor.constructor_name.clone();
        for arg in &ctor.argument_types {
            clause.push(' ');
            clause.push_str(&arg.ty);
        }
        println!("  type {} = {}", ctor.type_name, clause);
    }
}
