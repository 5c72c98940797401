//! Scilla parser: S-expression reader, type reconstruction, contract extraction
//!
//! The Scilla compiler front-end (`scilla-fmt --sexp`) turns a source file
//! into an S-expression dump of its AST. This module reads that dump and
//! extracts the parts needed to talk to a deployed contract.
//!
//! # Pipeline
//!
//! `.scilla → scilla-fmt → S-expression text → SExp → ParsedContract`
//!
//! The dump format is undocumented and changes between compiler versions,
//! so every destructuring step checks the tag it expects.

pub mod contract;
pub mod library;
pub mod sexp;
pub mod types;

use std::path::Path;

use crate::compiler::SexpCompiler;
use crate::model::ParsedContract;
use crate::{Error, Result};

use sexp::SExp;

/// Extension of library-only source files, which never go through the compiler
pub const LIBRARY_EXTENSION: &str = "scillib";

/// Parse the S-expression dump of a contract module
///
/// # Errors
/// `Syntax` for malformed text, `Grammar` for an unexpected AST shape.
pub fn parse_contract_sexp(text: &str) -> Result<ParsedContract> {
    let tree = sexp::parse(text)?;
    contract::extract(&tree)
}

/// Run the compiler on a `.scilla` file and parse its output
pub fn parse_scilla(path: &Path, compiler: &dyn SexpCompiler) -> Result<ParsedContract> {
    if !path.exists() {
        return Err(Error::io(
            path,
            std::io::Error::new(std::io::ErrorKind::NotFound, "file doesn't exist"),
        ));
    }
    let text = compiler.to_sexp(path)?;
    parse_contract_sexp(&text)
}

/// Parse any Scilla source, dispatching on the file extension
pub fn parse_source_file(path: &Path, compiler: &dyn SexpCompiler) -> Result<ParsedContract> {
    if path.extension().and_then(|e| e.to_str()) == Some(LIBRARY_EXTENSION) {
        let text = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Ok(library::parse_scilla_library(&text))
    } else {
        parse_scilla(path, compiler)
    }
}

// ── Destructuring helpers ──────────────────────────────────

/// Name inside `(Ident (SimpleLocal name) <rep>)`
pub(crate) fn ident_name(node: &SExp) -> Result<&str> {
    if node.tag() != Some("Ident") {
        return Err(Error::grammar("Expected Ident", node));
    }
    let inner = node
        .as_list()
        .and_then(|items| items.get(1))
        .ok_or_else(|| Error::grammar("Ident without a name", node))?;
    match inner.as_list() {
        Some([SExp::Atom(tag), SExp::Atom(name), ..])
            if tag == "SimpleLocal" || tag == "GlobalName" =>
        {
            Ok(name.as_str())
        }
        _ => Err(Error::grammar("Expected SimpleLocal", inner)),
    }
}

/// Children of a node that must be a list
pub(crate) fn list_of<'a>(node: &'a SExp, what: &str) -> Result<&'a [SExp]> {
    node.as_list()
        .ok_or_else(|| Error::grammar(format!("{} is not a list", what), node))
}

/// Value of the `(tag value)` row among `rows`
pub(crate) fn section<'a>(rows: &'a [SExp], tag: &str) -> Option<&'a SExp> {
    rows.iter()
        .find(|row| row.tag() == Some(tag))
        .and_then(|row| row.as_list())
        .and_then(|items| items.get(1))
}

/// Like `section`, but a missing row is a grammar mismatch
pub(crate) fn required_section<'a>(rows: &'a [SExp], tag: &str, parent: &SExp) -> Result<&'a SExp> {
    section(rows, tag).ok_or_else(|| Error::grammar(format!("Missing {} section", tag), parent))
}

/// Value of a `(tag value)` node, checking the tag
pub(crate) fn tagged<'a>(node: &'a SExp, tag: &str) -> Result<&'a SExp> {
    if node.tag() != Some(tag) {
        return Err(Error::grammar(format!("Index 0 is not {}", tag), node));
    }
    node.as_list()
        .and_then(|items| items.get(1))
        .ok_or_else(|| Error::grammar(format!("{} without a value", tag), node))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ident_name_simple_local() {
        let node = sexp::parse("(Ident (SimpleLocal owner) ((fname x) (lnum 1) (cnum 2)))").unwrap();
        assert_eq!(ident_name(&node).unwrap(), "owner");
    }

    #[test]
    fn test_ident_name_rejects_other_tags() {
        let node = sexp::parse("(Ident (Unexpected owner))").unwrap();
        assert!(ident_name(&node).unwrap_err().to_string().contains("SimpleLocal"));
        let node = sexp::parse("(Name (SimpleLocal owner))").unwrap();
        assert!(ident_name(&node).unwrap_err().to_string().contains("Ident"));
    }

    #[test]
    fn test_tagged_checks_tag() {
        let node = sexp::parse("(comp_type CompTrans)").unwrap();
        assert_eq!(tagged(&node, "comp_type").unwrap().as_atom(), Some("CompTrans"));
        let err = tagged(&node, "comp_name").unwrap_err().to_string();
        assert!(err.contains("Index 0 is not comp_name"), "{}", err);
    }

    #[test]
    fn test_parse_source_file_missing() {
        struct NeverCalled;
        impl SexpCompiler for NeverCalled {
            fn to_sexp(&self, _path: &Path) -> Result<String> {
                panic!("compiler must not run for a missing file");
            }
        }
        let err = parse_source_file(Path::new("does/not/exist.scilla"), &NeverCalled).unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }
}
