//! Contract structure extraction
//!
//! Walks the top-level module node:
//!
//! ```text
//! ((smver 0)
//!  (libs (((lname ..) (lentries (LibTyp .. | LibVar ..)*))))
//!  (elibs ..)
//!  (contr ((cname ..) (cparams ..) (cconstraint ..) (cfields ..) (ccomps ..))))
//! ```

use super::sexp::SExp;
use super::types::parse_field;
use super::{ident_name, list_of, required_section, section, tagged};
use crate::model::{Field, ParsedContract, ScillaConstructor, Transition};
use crate::{Error, Result};

/// Extract a `ParsedContract` from the whole module tree
pub fn extract(module: &SExp) -> Result<ParsedContract> {
    let rows = list_of(module, "Module")?;
    let contr = required_section(rows, "contr", module)?;
    let contr_rows = list_of(contr, "contr")?;

    let ctors = match section(rows, "libs") {
        Some(libs) => extract_types(libs)?,
        None => vec![],
    };

    let cname = required_section(contr_rows, "cname", contr)?;
    let name = ident_name(cname)?.to_string();

    let cparams = required_section(contr_rows, "cparams", contr)?;
    let params = extract_fields(cparams, "cparams")?;
    let constructor_params = if params.is_empty() { None } else { Some(params) };

    let cfields = required_section(contr_rows, "cfields", contr)?;
    let fields = extract_fields(cfields, "cfields")?;

    let ccomps = required_section(contr_rows, "ccomps", contr)?;
    let transitions = list_of(ccomps, "ccomps")?
        .iter()
        .map(extract_transition)
        .collect::<Result<Vec<_>>>()?;

    Ok(ParsedContract {
        name,
        constructor_params,
        fields,
        transitions,
        ctors,
    })
}

/// `((Ident ..) <type> [init expr])*`, shared by cparams and cfields
fn extract_fields(node: &SExp, what: &str) -> Result<Vec<Field>> {
    list_of(node, what)?.iter().map(named_field).collect()
}

fn named_field(row: &SExp) -> Result<Field> {
    match row.as_list() {
        Some([ident, ty, ..]) => {
            let name = ident_name(ident)?;
            Ok(parse_field(ty)?.named(name))
        }
        _ => Err(Error::grammar("Expected (Ident type) pair", row)),
    }
}

fn extract_transition(row: &SExp) -> Result<Transition> {
    let (comp_type, comp_name, comp_params) = match row.as_list() {
        Some([comp_type, comp_name, comp_params, ..]) => (comp_type, comp_name, comp_params),
        _ => return Err(Error::grammar("Malformed component", row)),
    };

    let kind = tagged(comp_type, "comp_type")?
        .as_atom()
        .ok_or_else(|| Error::grammar("comp_type is not an atom", comp_type))?
        .to_string();
    let name = ident_name(tagged(comp_name, "comp_name")?)?.to_string();
    let params = extract_fields(tagged(comp_params, "comp_params")?, "comp_params")?;

    Ok(Transition { kind, name, params })
}

/// Flatten the constructors of every user-defined type in the contract library
fn extract_types(libs: &SExp) -> Result<Vec<ScillaConstructor>> {
    let mut ctors = Vec::new();
    // `libs` holds zero or one library record
    let Some(library) = list_of(libs, "libs")?.first() else {
        return Ok(ctors);
    };
    let library_rows = list_of(library, "Library")?;
    let entries = required_section(library_rows, "lentries", library)?;

    for entry in list_of(entries, "lentries")? {
        match entry.tag() {
            Some("LibVar") => {}
            Some("LibTyp") => {
                let items = list_of(entry, "LibTyp")?;
                let (ident, clauses) = match items {
                    [_, ident, clauses, ..] => (ident, clauses),
                    _ => return Err(Error::grammar("Malformed LibTyp", entry)),
                };
                let type_name = ident_name(ident)?;
                for clause in list_of(clauses, "LibTyp constructors")? {
                    ctors.push(extract_constructor(type_name, clause)?);
                }
            }
            _ => return Err(Error::grammar("Unknown library entry", entry)),
        }
    }
    Ok(ctors)
}

/// `((cname (Ident ..)) (c_arg_types (<type>*)))`
fn extract_constructor(type_name: &str, clause: &SExp) -> Result<ScillaConstructor> {
    let rows = list_of(clause, "Constructor clause")?;
    let cname = required_section(rows, "cname", clause)?;
    let arg_types = required_section(rows, "c_arg_types", clause)?;

    Ok(ScillaConstructor {
        type_name: type_name.to_string(),
        constructor_name: ident_name(cname)?.to_string(),
        argument_types: list_of(arg_types, "c_arg_types")?
            .iter()
            .map(parse_field)
            .collect::<Result<Vec<_>>>()?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AdtField, TypeJson};
    use crate::parser::{parse_contract_sexp, sexp};
    use pretty_assertions::assert_eq;
    use std::fs;
    use std::path::Path;

    fn read_fixture(path: &str) -> String {
        let full = Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("../../tests/fixtures")
            .join(path);
        fs::read_to_string(&full)
            .unwrap_or_else(|e| panic!("Failed to read {}: {}", full.display(), e))
    }

    fn hello_world() -> ParsedContract {
        parse_contract_sexp(&read_fixture("sexp/HelloWorld.sexp")).unwrap()
    }

    fn adt_test() -> ParsedContract {
        parse_contract_sexp(&read_fixture("sexp/ADTTest.sexp")).unwrap()
    }

    // ── HelloWorld ─────────────────────────────────────

    #[test]
    fn test_contract_name() {
        assert_eq!(hello_world().name, "HelloWorld");
    }

    #[test]
    fn test_constructor_params() {
        assert_eq!(
            hello_world().constructor_params,
            Some(vec![Field::primitive("ByStr20").named("owner")])
        );
    }

    #[test]
    fn test_transitions() {
        let contract = hello_world();
        let names: Vec<_> = contract
            .transitions
            .iter()
            .map(|t| (t.kind.as_str(), t.name.as_str()))
            .collect();
        assert_eq!(names, vec![("CompTrans", "setHello"), ("CompTrans", "getHello")]);
    }

    #[test]
    fn test_transition_params() {
        assert_eq!(
            hello_world().transitions[0].params,
            vec![Field::primitive("String").named("msg")]
        );
        assert!(hello_world().transitions[1].params.is_empty());
    }

    #[test]
    fn test_fields() {
        assert_eq!(
            hello_world().fields,
            vec![Field::primitive("String").named("welcome_msg")]
        );
    }

    #[test]
    fn test_contract_without_library_has_no_ctors() {
        assert!(hello_world().ctors.is_empty());
    }

    // ── User-defined ADTs ──────────────────────────────

    #[test]
    fn test_user_defined_adts() {
        let si = Field {
            name: String::new(),
            ty: "SI".into(),
            type_json: Some(TypeJson::Adt(AdtField {
                ctor: "SI".into(),
                argtypes: vec![],
            })),
        };
        let ctor = |type_name: &str, name: &str, args: Vec<Field>| ScillaConstructor {
            type_name: type_name.into(),
            constructor_name: name.into(),
            argument_types: args,
        };
        assert_eq!(
            adt_test().ctors,
            vec![
                ctor("SI", "S", vec![Field::primitive("String")]),
                ctor("SI", "I", vec![Field::primitive("Uint32")]),
                ctor("SIPair", "A", vec![Field::primitive("Uint32")]),
                ctor("SIPair", "B", vec![Field::primitive("String")]),
                ctor("SIPair", "C", vec![si.clone(), si]),
            ]
        );
    }

    #[test]
    fn test_empty_cparams_is_none_and_empty_cfields_is_empty() {
        let contract = adt_test();
        assert_eq!(contract.constructor_params, None);
        assert_eq!(contract.fields, vec![]);
    }

    #[test]
    fn test_procedure_and_user_type_param() {
        let contract = adt_test();
        let proc = contract.transition("checkOwner").unwrap();
        assert!(proc.is_procedure());
        let set = contract.transition("setSI").unwrap();
        assert_eq!(set.params[0].name, "value");
        assert_eq!(set.params[0].ty, "SI");
    }

    // ── Nested generic signatures ──────────────────────

    #[test]
    fn test_generated_adt_signatures() {
        let contract = parse_contract_sexp(&read_fixture("sexp/GenerateAdtType.sexp")).unwrap();
        let types: Vec<_> = contract
            .transitions
            .iter()
            .map(|t| t.params[0].ty.as_str())
            .collect();
        assert_eq!(
            types,
            vec![
                "List (Pair ByStr20 (List (Pair Uint32 Uint128)))",
                "List Uint128",
                "Pair Uint32 Uint128",
                "List (Pair ByStr20 ByStr20)",
            ]
        );
    }

    // ── Grammar mismatches ─────────────────────────────

    #[test]
    fn test_missing_contr_is_fatal() {
        let err = parse_contract_sexp("((smver 0) (libs ()))").unwrap_err();
        assert!(err.to_string().contains("Missing contr section"));
    }

    #[test]
    fn test_wrong_component_tag_is_fatal() {
        let text = r#"((smver 0) (libs ())
          (contr ((cname (Ident (SimpleLocal X) ()))
                  (cparams ()) (cfields ())
                  (ccomps (((comp_kind CompTrans) (comp_name (Ident (SimpleLocal t) ())) (comp_params ()) (comp_body ())))))))"#;
        let err = parse_contract_sexp(text).unwrap_err();
        assert!(err.to_string().contains("Index 0 is not comp_type"), "{}", err);
    }

    #[test]
    fn test_unknown_library_entry_is_fatal() {
        let text = r#"((libs (((lname (Ident (SimpleLocal L) ())) (lentries ((LibMystery x))))))
          (contr ((cname (Ident (SimpleLocal X) ())) (cparams ()) (cfields ()) (ccomps ()))))"#;
        let err = parse_contract_sexp(text).unwrap_err();
        assert!(err.to_string().contains("Unknown library entry"), "{}", err);
    }

    #[test]
    fn test_field_without_ident_is_fatal() {
        let module = sexp::parse(
            r#"((contr ((cname (Ident (SimpleLocal X) ())) (cparams (((Name owner) (PrimType ByStr20)))) (cfields ()) (ccomps ()))))"#,
        )
        .unwrap();
        assert!(extract(&module).is_err());
    }

    #[test]
    fn test_parse_determinism_100_iterations() {
        let text = read_fixture("sexp/ADTTest.sexp");
        let first = parse_contract_sexp(&text).unwrap();
        for i in 0..100 {
            let result = parse_contract_sexp(&text).unwrap();
            assert_eq!(first, result, "Determinism failure at iteration {}", i);
        }
    }
}
