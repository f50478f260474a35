//! Declared field shapes.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Declared storage type of one format entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    #[serde(alias = "uint")]
    Unsigned,
    #[serde(alias = "int")]
    Integer,
    #[serde(alias = "num")]
    Number,
    #[serde(alias = "str")]
    String,
    #[serde(alias = "bool")]
    Boolean,
    Varbinary,
    Array,
    Any,
}

impl FieldType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unsigned => "unsigned",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::String => "string",
            Self::Boolean => "boolean",
            Self::Varbinary => "varbinary",
            Self::Array => "array",
            Self::Any => "any",
        }
    }
}

impl Display for FieldType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of a space format. Its position in the format is its tuple slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
}

impl Field {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Field, FieldType};

    #[test]
    fn deserializes_type_aliases() {
        let field: Field = serde_json::from_str(r#"{"name":"id","type":"uint"}"#)
            .expect("alias should deserialize");
        assert_eq!(field, Field::new("id", FieldType::Unsigned));

        let field: Field = serde_json::from_str(r#"{"name":"title","type":"str"}"#)
            .expect("alias should deserialize");
        assert_eq!(field.field_type, FieldType::String);
    }

    #[test]
    fn rejects_unknown_type() {
        let result = serde_json::from_str::<Field>(r#"{"name":"x","type":"decimal128"}"#);
        assert!(result.is_err());
    }
}
