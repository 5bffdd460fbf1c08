//! Canonical field lookup over loosely shaped character records.
//!
//! The character APIs spell the same property several ways (`Nombre`,
//! `nombre`, `nome`, `name`). Every consumer goes through a [`FieldTable`]
//! that maps a canonical [`Field`] to its ordered candidate keys.

use std::collections::BTreeMap;
use std::fmt;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One API entry. No fixed schema.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CharacterRecord(Map<String, Value>);

impl CharacterRecord {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Follows a dotted path such as `origin.name`. Missing or non-object
    /// intermediates yield `None`.
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let first = segments.next()?;
        let mut current = self.0.get(first)?;
        for segment in segments {
            current = current.as_object()?.get(segment)?;
        }
        Some(current)
    }
}

impl From<Map<String, Value>> for CharacterRecord {
    fn from(value: Map<String, Value>) -> Self {
        Self(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Name,
    Occupation,
    History,
    Image,
    Voice,
    FirstAppearance,
    Gender,
    Status,
}

impl Field {
    pub const ALL: [Field; 8] = [
        Field::Name,
        Field::Occupation,
        Field::History,
        Field::Image,
        Field::Voice,
        Field::FirstAppearance,
        Field::Gender,
        Field::Status,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Field::Name => "name",
            Field::Occupation => "occupation",
            Field::History => "history",
            Field::Image => "image",
            Field::Voice => "voice",
            Field::FirstAppearance => "first_appearance",
            Field::Gender => "gender",
            Field::Status => "status",
        }
    }

    fn default_candidates(self) -> &'static [&'static str] {
        match self {
            Field::Name => &["Nombre", "nombre", "nome", "name"],
            Field::Occupation => &["Ocupacion", "ocupacion", "occupation"],
            Field::History => &["Historia", "historia", "history", "description"],
            Field::Image => &["Imagen", "imagen", "image", "portrait_path"],
            Field::Voice => &["VozOriginal", "vozOriginal", "voice"],
            Field::FirstAppearance => &["PrimeraAparicion", "primeraAparicion", "first_appearance"],
            Field::Gender => &["Genero", "genero", "gender"],
            Field::Status => &["Estado", "estado", "status"],
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

static DEFAULT_TABLE: Lazy<FieldTable> = Lazy::new(|| {
    let candidates = Field::ALL
        .iter()
        .map(|field| {
            let keys = field
                .default_candidates()
                .iter()
                .map(|key| key.to_string())
                .collect();
            (*field, keys)
        })
        .collect();
    FieldTable { candidates }
});

/// Ordered candidate keys per canonical field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldTable {
    candidates: BTreeMap<Field, Vec<String>>,
}

impl Default for FieldTable {
    fn default() -> Self {
        DEFAULT_TABLE.clone()
    }
}

impl FieldTable {
    pub fn candidates(&self, field: Field) -> &[String] {
        self.candidates
            .get(&field)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Replaces the candidate list of one field. An empty list is ignored.
    pub fn set_candidates<I, S>(&mut self, field: Field, keys: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let keys: Vec<String> = keys.into_iter().map(Into::into).collect();
        if !keys.is_empty() {
            self.candidates.insert(field, keys);
        }
    }

    /// Applies per-field overrides on top of this table.
    pub fn with_overrides(mut self, overrides: &BTreeMap<Field, Vec<String>>) -> Self {
        for (field, keys) in overrides {
            self.set_candidates(*field, keys.iter().cloned());
        }
        self
    }

    pub fn lookup(&self, record: &CharacterRecord, field: Field) -> Option<String> {
        lookup(record, self.candidates(field))
    }

    pub fn resolve(&self, record: &CharacterRecord, field: Field, fallback: &str) -> String {
        resolve(record, self.candidates(field), fallback)
    }
}

/// First present, non-blank value among `candidates`, or `None`.
pub fn lookup<S: AsRef<str>>(record: &CharacterRecord, candidates: &[S]) -> Option<String> {
    candidates
        .iter()
        .filter_map(|key| record.get_path(key.as_ref()))
        .find_map(scalar_text)
}

/// Like [`lookup`], falling back to `fallback` when no candidate matches.
pub fn resolve<S: AsRef<str>>(
    record: &CharacterRecord,
    candidates: &[S],
    fallback: &str,
) -> String {
    lookup(record, candidates).unwrap_or_else(|| fallback.to_string())
}

fn scalar_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(text) => text.trim().to_string(),
        Value::Number(number) => number.to_string(),
        Value::Bool(flag) => flag.to_string(),
        Value::Null | Value::Array(_) | Value::Object(_) => return None,
    };
    if text.is_empty() { None } else { Some(text) }
}
