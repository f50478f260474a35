//! Query constraint and record data shapes.

use crate::model::value::Value;
use std::collections::BTreeMap;

/// Field name -> value mapping used for record data and equality constraints.
pub type Fields = BTreeMap<String, Value>;

/// Equality constraints for `find`.
///
/// `Positional` covers the scalar shorthand (`find(5)`) and positional
/// sequences; only a one-element positional form can be rewritten into a
/// named primary-key constraint.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Params {
    Fields(Fields),
    Positional(Vec<Value>),
}

impl Default for Params {
    fn default() -> Self {
        Self::Fields(Fields::new())
    }
}

impl Params {
    /// Empty named constraint set (full scan through the first index).
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one named equality constraint.
    ///
    /// Turns a positional value list into named form, dropping it.
    pub fn with(self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        let mut fields = match self {
            Self::Fields(fields) => fields,
            Self::Positional(_) => Fields::new(),
        };
        fields.insert(name.into(), value.into());
        Self::Fields(fields)
    }

    pub fn scalar(value: impl Into<Value>) -> Self {
        Self::Positional(vec![value.into()])
    }

    pub fn as_fields(&self) -> Option<&Fields> {
        match self {
            Self::Fields(fields) => Some(fields),
            Self::Positional(_) => None,
        }
    }

    pub fn into_fields(self) -> Option<Fields> {
        match self {
            Self::Fields(fields) => Some(fields),
            Self::Positional(_) => None,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Fields(fields) => fields.len(),
            Self::Positional(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Renders the constraints as compact JSON for error messages.
    pub fn to_json_string(&self) -> String {
        let rendered = match self {
            Self::Fields(fields) => serde_json::Value::Object(
                fields
                    .iter()
                    .map(|(name, value)| (name.clone(), value.to_json()))
                    .collect(),
            ),
            Self::Positional(values) => {
                serde_json::Value::Array(values.iter().map(Value::to_json).collect())
            }
        };
        rendered.to_string()
    }
}

impl From<Fields> for Params {
    fn from(value: Fields) -> Self {
        Self::Fields(value)
    }
}

impl From<Vec<Value>> for Params {
    fn from(value: Vec<Value>) -> Self {
        Self::Positional(value)
    }
}

impl From<Value> for Params {
    fn from(value: Value) -> Self {
        Self::scalar(value)
    }
}

impl From<i64> for Params {
    fn from(value: i64) -> Self {
        Self::scalar(value)
    }
}

impl From<&str> for Params {
    fn from(value: &str) -> Self {
        Self::scalar(value)
    }
}

impl<const N: usize, V: Into<Value>> From<[(&str, V); N]> for Params {
    fn from(pairs: [(&str, V); N]) -> Self {
        Self::Fields(
            pairs
                .into_iter()
                .map(|(name, value)| (name.to_string(), value.into()))
                .collect(),
        )
    }
}
