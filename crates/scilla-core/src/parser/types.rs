//! Type reconstruction: turns a parsed type node into a `Field`
//!
//! Recognised node categories:
//!
//! ```text
//! (PrimType Uint128)                                  → Uint128
//! (Address ...)                                       → ByStr20
//! (ADT (Ident (SimpleLocal Pair) ..) (arg arg))       → Pair A B
//! (MapType key value)                                 → Map K V
//! ```
//!
//! Anything else means the compiler's grammar moved under us and aborts
//! the parse of the whole file.

use super::sexp::SExp;
use super::{ident_name, list_of};
use crate::model::{AdtField, Field, MapField, TypeJson};
use crate::{Error, Result};

/// Every address flavour is passed on the wire as a 20-byte string
pub const ADDRESS_TYPE: &str = "ByStr20";

/// Reconstruct a positional (unnamed) field from a type node
pub fn parse_field(node: &SExp) -> Result<Field> {
    let items = node
        .as_list()
        .ok_or_else(|| Error::grammar("Type node is not a list", node))?;

    match node.tag() {
        Some("PrimType") => {
            let name = items
                .get(1)
                .and_then(SExp::as_atom)
                .ok_or_else(|| Error::grammar("PrimType without a type name", node))?;
            Ok(Field::primitive(name))
        }
        Some("Address") => Ok(Field::primitive(ADDRESS_TYPE)),
        Some("ADT") => {
            let ident = items
                .get(1)
                .ok_or_else(|| Error::grammar("ADT without a constructor", node))?;
            let ctor = ident_name(ident)?.to_string();
            let args = match items.get(2) {
                Some(args) => list_of(args, "ADT argument types")?,
                None => &[],
            };
            let argtypes = args.iter().map(parse_field).collect::<Result<Vec<_>>>()?;
            let adt = AdtField { ctor, argtypes };
            Ok(Field {
                name: String::new(),
                ty: adt_signature(&adt),
                type_json: Some(TypeJson::Adt(adt)),
            })
        }
        Some("MapType") => {
            let (key, value) = match items {
                [_, key, value] => (parse_field(key)?, parse_field(value)?),
                _ => return Err(Error::grammar("MapType needs a key and a value type", node)),
            };
            let ty = format!("Map {} {}", argument_signature(&key), argument_signature(&value));
            Ok(Field {
                name: String::new(),
                ty,
                type_json: Some(TypeJson::Map(MapField {
                    key: Box::new(key),
                    value: Box::new(value),
                })),
            })
        }
        _ => Err(Error::grammar("Encountered unexpected field type", node)),
    }
}

/// Textual signature of an ADT application, e.g. `List (Pair ByStr20 Uint32)`
pub fn adt_signature(adt: &AdtField) -> String {
    let mut out = adt.ctor.clone();
    for arg in &adt.argtypes {
        out.push(' ');
        out.push_str(&argument_signature(arg));
    }
    out
}

// Applied constructors and maps are parenthesised when they appear as an
// argument, otherwise `List Pair A B` would be ambiguous.
fn argument_signature(field: &Field) -> String {
    let nested = match &field.type_json {
        Some(TypeJson::Adt(adt)) => !adt.argtypes.is_empty(),
        Some(TypeJson::Map(_)) => true,
        Some(TypeJson::Prim(_)) | None => false,
    };
    if nested {
        format!("({})", field.ty)
    } else {
        field.ty.clone()
    }
}
