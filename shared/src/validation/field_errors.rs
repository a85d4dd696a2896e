use crate::error::SharedError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use validator::ValidationErrors;

/// Location of a validation failure: a field name plus an optional list index
/// (`venues.2` is `{ field: "venues", index: Some(2) }`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FieldPath {
    pub field: String,
    pub index: Option<usize>,
}

impl FieldPath {
    pub fn field(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            index: None,
        }
    }

    pub fn indexed(field: impl Into<String>, index: usize) -> Self {
        Self {
            field: field.into(),
            index: Some(index),
        }
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.index {
            Some(index) => write!(f, "{}.{}", self.field, index),
            None => f.write_str(&self.field),
        }
    }
}

impl FromStr for FieldPath {
    type Err = SharedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(2, '.');
        let field = parts.next().unwrap_or_default();
        if field.is_empty() {
            return Err(SharedError::InvalidFieldPath(s.to_string()));
        }
        match parts.next() {
            None => Ok(Self::field(field)),
            Some(rest) => {
                // Only the leading index matters, e.g. `venues.0.value` -> venues[0].
                let index_part = rest.split('.').next().unwrap_or_default();
                index_part
                    .parse::<usize>()
                    .map(|index| Self::indexed(field, index))
                    .map_err(|_| SharedError::InvalidFieldPath(s.to_string()))
            }
        }
    }
}

impl Serialize for FieldPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for FieldPath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Field-to-messages map returned whenever input fails validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<FieldPath, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, path: FieldPath, message: impl Into<String>) {
        self.0.entry(path).or_default().push(message.into());
    }

    pub fn merge(&mut self, other: FieldErrors) {
        for (path, messages) in other.0 {
            self.0.entry(path).or_default().extend(messages);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, path: &FieldPath) -> Option<&[String]> {
        self.0.get(path).map(Vec::as_slice)
    }

    pub fn contains(&self, path: &FieldPath) -> bool {
        self.0.contains_key(path)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&FieldPath, &Vec<String>)> {
        self.0.iter()
    }
}

impl From<ValidationErrors> for FieldErrors {
    fn from(errors: ValidationErrors) -> Self {
        let mut field_errors = FieldErrors::new();
        for (field, failures) in errors.field_errors() {
            for failure in failures {
                let message = failure
                    .message
                    .as_ref()
                    .map(|message| message.to_string())
                    .unwrap_or_else(|| format!("Invalid {}", field));
                field_errors.add(FieldPath::field(field), message);
            }
        }
        field_errors
    }
}
