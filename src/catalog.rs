use std::ops::Deref;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::error::FetchError;
use crate::fields::CharacterRecord;

/// Every record from one load, in API order. Cheap to clone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CharacterCatalog {
    records: Arc<[CharacterRecord]>,
}

impl CharacterCatalog {
    pub fn new(records: Vec<CharacterRecord>) -> Self {
        Self {
            records: records.into(),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[CharacterRecord] {
        &self.records
    }
}

impl Deref for CharacterCatalog {
    type Target = [CharacterRecord];

    fn deref(&self) -> &Self::Target {
        &self.records
    }
}

impl From<Vec<CharacterRecord>> for CharacterCatalog {
    fn from(value: Vec<CharacterRecord>) -> Self {
        Self::new(value)
    }
}

/// Parses a response body. Accepts a bare array or `{ "docs": [...] }`;
/// any other JSON shape is an empty catalog.
pub fn parse_catalog(body: &[u8]) -> Result<CharacterCatalog, FetchError> {
    let value: Value = serde_json::from_slice(body)?;
    Ok(catalog_from_value(value))
}

pub fn catalog_from_value(value: Value) -> CharacterCatalog {
    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut object) => match object.remove("docs") {
            Some(Value::Array(items)) => items,
            _ => {
                debug!("response object has no docs array");
                Vec::new()
            }
        },
        other => {
            debug!(kind = json_kind(&other), "unexpected response shape");
            Vec::new()
        }
    };

    let mut skipped = 0usize;
    let records = items
        .into_iter()
        .filter_map(|item| match item {
            Value::Object(fields) => Some(CharacterRecord::new(fields)),
            _ => {
                skipped += 1;
                None
            }
        })
        .collect::<Vec<_>>();
    if skipped > 0 {
        debug!(skipped, "ignored non-object catalog entries");
    }
    CharacterCatalog::new(records)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_array_is_the_catalog() {
        let catalog = parse_catalog(br#"[{"nombre":"Homer"},{"nombre":"Ned"}]"#).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog[1].get("nombre").unwrap(), "Ned");
    }

    #[test]
    fn docs_wrapper_is_unwrapped() {
        let body = br#"{"docs":[{"Nombre":"Bart"}],"totalDocs":1,"page":1}"#;
        let catalog = parse_catalog(body).unwrap();
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn other_shapes_are_empty() {
        assert!(parse_catalog(br#"{"results":[{"name":"x"}]}"#).unwrap().is_empty());
        assert!(parse_catalog(br#"{"docs":"nope"}"#).unwrap().is_empty());
        assert!(parse_catalog(b"42").unwrap().is_empty());
        assert!(parse_catalog(b"null").unwrap().is_empty());
    }

    #[test]
    fn non_object_entries_are_dropped() {
        let body = br#"[{"name":"Lisa"}, 3, "x", null, {"name":"Maggie"}]"#;
        let catalog = parse_catalog(body).unwrap();
        assert_eq!(catalog.len(), 2);
    }

    #[test]
    fn invalid_json_is_a_parse_error() {
        let err = parse_catalog(b"<html>oops</html>").unwrap_err();
        assert!(matches!(err, FetchError::Parse(_)));
    }
}
