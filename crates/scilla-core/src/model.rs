//! Contract model: the structural description of one Scilla source file
//!
//! Produced once per parse, cached to disk as JSON, never mutated in place.

use serde::{Deserialize, Serialize};

/// One named or positional value slot
///
/// `type_json` is `None` when the structured shape could not be determined;
/// encoding a call against such a field fails with `Error::StaleCache`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(
        rename = "typeJSON",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub type_json: Option<TypeJson>,
}

impl Field {
    /// Positional primitive slot, e.g. `Uint32`
    pub fn primitive(ty: impl Into<String>) -> Self {
        let ty = ty.into();
        Field {
            name: String::new(),
            type_json: Some(TypeJson::Prim(ty.clone())),
            ty,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Constructor tag when this slot holds an algebraic data type
    pub fn adt(&self) -> Option<&AdtField> {
        match &self.type_json {
            Some(TypeJson::Adt(adt)) => Some(adt),
            _ => None,
        }
    }
}

/// Structured type of a field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TypeJson {
    /// Primitive type name, e.g. `Uint128`, `ByStr20`, `String`
    Prim(String),
    /// Algebraic data type application, e.g. `List (Pair ByStr20 Uint32)`
    Adt(AdtField),
    /// `Map K V`
    Map(MapField),
}

/// One level of an algebraic data type's shape
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdtField {
    pub ctor: String,
    pub argtypes: Vec<Field>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapField {
    pub key: Box<Field>,
    pub value: Box<Field>,
}

/// Externally invocable component of a contract
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    /// Component kind as reported by the compiler (`CompTrans` or `CompProc`)
    pub kind: String,
    pub name: String,
    /// Positional call order
    pub params: Vec<Field>,
}

impl Transition {
    pub fn is_procedure(&self) -> bool {
        self.kind == "CompProc"
    }
}

/// One named constructor of a user-defined sum type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScillaConstructor {
    pub type_name: String,
    pub constructor_name: String,
    pub argument_types: Vec<Field>,
}

/// Complete structural description of one contract or library
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedContract {
    pub name: String,
    /// `None` when the contract takes no deployment parameters
    pub constructor_params: Option<Vec<Field>>,
    pub fields: Vec<Field>,
    pub transitions: Vec<Transition>,
    pub ctors: Vec<ScillaConstructor>,
}

impl ParsedContract {
    pub fn transition(&self, name: &str) -> Option<&Transition> {
        self.transitions.iter().find(|t| t.name == name)
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn constructor_param(&self, name: &str) -> Option<&Field> {
        self.constructor_params
            .as_deref()
            .and_then(|params| params.iter().find(|f| f.name == name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_field_json_shape() {
        let field = Field::primitive("String").named("msg");
        let json = serde_json::to_value(&field).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"name": "msg", "type": "String", "typeJSON": "String"})
        );
    }

    #[test]
    fn test_missing_type_json_survives_round_trip() {
        let field: Field = serde_json::from_str(r#"{"name": "owner", "type": "ByStr20"}"#).unwrap();
        assert_eq!(field.type_json, None);
        let json = serde_json::to_string(&field).unwrap();
        assert!(!json.contains("typeJSON"));
    }

    #[test]
    fn test_adt_type_json_deserializes_as_adt() {
        let field: Field = serde_json::from_value(serde_json::json!({
            "name": "",
            "type": "Option Uint64",
            "typeJSON": {"ctor": "Option", "argtypes": [
                {"name": "", "type": "Uint64", "typeJSON": "Uint64"}
            ]}
        }))
        .unwrap();
        let adt = field.adt().unwrap();
        assert_eq!(adt.ctor, "Option");
        assert_eq!(adt.argtypes, vec![Field::primitive("Uint64")]);
    }

    #[test]
    fn test_parsed_contract_lookups() {
        let contract = ParsedContract {
            name: "HelloWorld".into(),
            constructor_params: Some(vec![Field::primitive("ByStr20").named("owner")]),
            fields: vec![Field::primitive("String").named("welcome_msg")],
            transitions: vec![Transition {
                kind: "CompTrans".into(),
                name: "setHello".into(),
                params: vec![Field::primitive("String").named("msg")],
            }],
            ctors: vec![],
        };
        assert!(contract.transition("setHello").is_some());
        assert!(contract.transition("getHello").is_none());
        assert!(contract.field("welcome_msg").is_some());
        assert!(contract.constructor_param("owner").is_some());
        assert!(!contract.transitions[0].is_procedure());
    }
}
