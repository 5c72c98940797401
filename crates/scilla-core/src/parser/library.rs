//! Library sources (`.scillib`) are only scanned for their name.

use crate::model::ParsedContract;

/// Build a `ParsedContract` for a library file from its source text
///
/// The name comes from the first line starting with `library`; an
/// unnamed library yields an empty name.
pub fn parse_scilla_library(source: &str) -> ParsedContract {
    let name = source
        .lines()
        .map(str::trim)
        .find(|line| line.starts_with("library"))
        .and_then(|line| line.split_whitespace().nth(1))
        .unwrap_or_default()
        .to_string();

    ParsedContract {
        name,
        constructor_params: None,
        fields: vec![],
        transitions: vec![],
        ctors: vec![],
    }
}
