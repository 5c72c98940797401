//! Typed binding generation
//!
//! Emits Rust source for a thin wrapper over `ScillaContract`: one method
//! per transition, one accessor per field and per constructor parameter.
//! Procedures are internal to the contract and get no method.

use std::collections::BTreeSet;
use std::fmt::Write;

use crate::model::{Field, ParsedContract};

const RUST_KEYWORDS: &[&str] = &[
    "as", "async", "await", "box", "break", "const", "continue", "crate", "dyn", "else", "enum",
    "extern", "false", "fn", "for", "if", "impl", "in", "let", "loop", "match", "mod", "move",
    "mut", "pub", "ref", "return", "self", "static", "struct", "super", "trait", "true", "type",
    "unsafe", "use", "where", "while", "yield",
];

/// `setHello` → `set_hello`, `NestedPairs` → `nested_pairs`
pub fn snake_case(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() {
            let prev_lower = i > 0 && (chars[i - 1].is_lowercase() || chars[i - 1].is_ascii_digit());
            let next_lower = chars.get(i + 1).map_or(false, |n| n.is_lowercase());
            let prev_upper = i > 0 && chars[i - 1].is_uppercase();
            if i > 0 && (prev_lower || (prev_upper && next_lower)) && !out.ends_with('_') {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

fn ident(name: &str) -> String {
    let snake = snake_case(name);
    // these cannot be raw identifiers
    if matches!(snake.as_str(), "self" | "super" | "crate") {
        format!("{}_", snake)
    } else if RUST_KEYWORDS.contains(&snake.as_str()) {
        format!("r#{}", snake)
    } else {
        snake
    }
}

fn arg_list(params: &[Field]) -> String {
    params
        .iter()
        .map(|p| format!("{}: impl Into<Value>", ident(&p.name)))
        .collect::<Vec<_>>()
        .join(", ")
}

fn arg_values(params: &[Field]) -> String {
    params
        .iter()
        .map(|p| format!("{}.into()", ident(&p.name)))
        .collect::<Vec<_>>()
        .join(", ")
}

fn signature(params: &[Field]) -> String {
    params
        .iter()
        .map(|p| format!("{}: {}", p.name, p.ty))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Rust source of the typed wrapper for `contract`
pub fn generate_bindings(contract: &ParsedContract) -> String {
    let name = &contract.name;
    let mut taken: BTreeSet<String> = ["new", "contract"].iter().map(|s| s.to_string()).collect();
    let mut out = String::new();

    // writeln! into a String cannot fail
    let _ = writeln!(out, "// Generated bindings for the {} Scilla contract.", name);
    let _ = writeln!(out, "// Regenerate with `scilla-cli bindgen`; do not edit by hand.");
    out.push('\n');
    out.push_str("#![allow(dead_code)]\n\n");
    out.push_str("use scilla_core::serde_json::Value;\n");
    out.push_str(
        "use scilla_core::{ChainClient, DecodedValue, Result, ScillaContext, ScillaContract, Transaction, TxOverrides};\n\n",
    );

    let _ = writeln!(out, "pub struct {}<'a, C: ChainClient> {{", name);
    out.push_str("    ctx: &'a ScillaContext<C>,\n");
    out.push_str("    contract: &'a ScillaContract,\n");
    out.push_str("}\n\n");

    let _ = writeln!(out, "impl<'a, C: ChainClient> {}<'a, C> {{", name);
    out.push_str("    pub fn new(ctx: &'a ScillaContext<C>, contract: &'a ScillaContract) -> Self {\n");
    out.push_str("        Self { ctx, contract }\n");
    out.push_str("    }\n\n");
    out.push_str("    pub fn contract(&self) -> &ScillaContract {\n");
    out.push_str("        self.contract\n");
    out.push_str("    }\n");

    for transition in contract.transitions.iter().filter(|t| !t.is_procedure()) {
        let method = ident(&transition.name);
        let with = format!("{}_with", method.trim_start_matches("r#"));
        if !taken.insert(method.clone()) || !taken.insert(with.clone()) {
            let _ = writeln!(out, "\n    // transition {} skipped: name clash", transition.name);
            continue;
        }
        let params = arg_list(&transition.params);
        let values = arg_values(&transition.params);

        let _ = writeln!(out, "\n    /// `{}({})`", transition.name, signature(&transition.params));
        let _ = writeln!(out, "    pub fn {}(&self{}) -> Result<Transaction> {{", method, prefixed(&params));
        let _ = writeln!(
            out,
            "        self.contract.invoke(self.ctx, \"{}\", vec![{}])",
            transition.name, values
        );
        out.push_str("    }\n");

        let _ = writeln!(
            out,
            "\n    pub fn {}(&self{}, tx: &TxOverrides) -> Result<Transaction> {{",
            with,
            prefixed(&params)
        );
        let _ = writeln!(
            out,
            "        self.contract.invoke_with(self.ctx, \"{}\", vec![{}], tx)",
            transition.name, values
        );
        out.push_str("    }\n");
    }

    let accessors = contract
        .fields
        .iter()
        .map(|f| (f, "read_field"))
        .chain(
            contract
                .constructor_params
                .iter()
                .flatten()
                .map(|f| (f, "read_init_param")),
        );
    for (field, reader) in accessors {
        let method = ident(&field.name);
        if !taken.insert(method.clone()) {
            let _ = writeln!(out, "\n    // accessor {} skipped: name clash", field.name);
            continue;
        }
        let _ = writeln!(out, "\n    /// `{} : {}`", field.name, field.ty);
        let _ = writeln!(out, "    pub fn {}(&self) -> Result<DecodedValue> {{", method);
        let _ = writeln!(out, "        self.contract.{}(self.ctx, \"{}\")", reader, field.name);
        out.push_str("    }\n");
    }

    out.push_str("}\n");
    out
}

fn prefixed(params: &str) -> String {
    if params.is_empty() {
        String::new()
    } else {
        format!(", {}", params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_contract_sexp;
    use std::fs;
    use std::path::Path;

    fn read_fixture(path: &str) -> String {
        let full = Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("../../tests/fixtures")
            .join(path);
        fs::read_to_string(&full)
            .unwrap_or_else(|e| panic!("Failed to read {}: {}", full.display(), e))
    }

    #[test]
    fn test_snake_case() {
        assert_eq!(snake_case("setHello"), "set_hello");
        assert_eq!(snake_case("NestedPairs"), "nested_pairs");
        assert_eq!(snake_case("welcome_msg"), "welcome_msg");
        assert_eq!(snake_case("getHTTPStatus"), "get_http_status");
        assert_eq!(snake_case("mint2Tokens"), "mint2_tokens");
    }

    #[test]
    fn test_keywords_escaped() {
        assert_eq!(ident("type"), "r#type");
        assert_eq!(ident("Match"), "r#match");
    }

    #[test]
    fn test_hello_world_bindings() {
        let contract = parse_contract_sexp(&read_fixture("sexp/HelloWorld.sexp")).unwrap();
        let code = generate_bindings(&contract);
        assert!(code.contains("pub struct HelloWorld<'a, C: ChainClient>"));
        assert!(code.contains("pub fn set_hello(&self, msg: impl Into<Value>) -> Result<Transaction>"));
        assert!(code.contains("self.contract.invoke(self.ctx, \"setHello\", vec![msg.into()])"));
        assert!(code.contains("pub fn set_hello_with(&self, msg: impl Into<Value>, tx: &TxOverrides)"));
        assert!(code.contains("pub fn get_hello(&self) -> Result<Transaction>"));
        assert!(code.contains("self.contract.read_field(self.ctx, \"welcome_msg\")"));
        assert!(code.contains("self.contract.read_init_param(self.ctx, \"owner\")"));
    }

    #[test]
    fn test_procedures_not_exposed() {
        let contract = parse_contract_sexp(&read_fixture("sexp/ADTTest.sexp")).unwrap();
        let code = generate_bindings(&contract);
        assert!(!code.contains("check_owner"));
        assert!(code.contains("pub fn set_si(&self, value: impl Into<Value>)"));
    }

    #[test]
    fn test_generation_is_deterministic() {
        let contract = parse_contract_sexp(&read_fixture("sexp/GenerateAdtType.sexp")).unwrap();
        let first = generate_bindings(&contract);
        for _ in 0..10 {
            assert_eq!(generate_bindings(&contract), first);
        }
    }
}
