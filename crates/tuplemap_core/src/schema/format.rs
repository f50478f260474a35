//! Value coercion against declared field types.
//!
//! # Responsibility
//! - Coerce user-supplied values into the representation a field stores.
//!
//! # Invariants
//! - Formatting is deterministic and idempotent:
//!   `format(t, format(t, v)) == format(t, v)`.
//! - `Null` is never coerced; nullability is the store's concern.
//! - Values that cannot be coerced are returned unchanged. For `Unsigned`
//!   this includes negative numbers.

use crate::model::value::Value;
use crate::schema::field::FieldType;

/// Coerces raw values to the shape of a declared field type.
///
/// Used for scalar-shorthand normalization in `find`, index value projection,
/// and save-time coercion.
pub trait ValueFormatter {
    fn format_value(&self, field_type: FieldType, value: &Value) -> Value;
}

/// Default coercion rules.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardFormatter;

impl ValueFormatter for StandardFormatter {
    fn format_value(&self, field_type: FieldType, value: &Value) -> Value {
        if value.is_null() {
            return Value::Null;
        }

        match field_type {
            FieldType::Unsigned => match to_integer(value) {
                Value::Int(integer) if integer < 0 => value.clone(),
                coerced => coerced,
            },
            FieldType::Integer => to_integer(value),
            FieldType::Number => to_number(value),
            FieldType::String => to_string(value),
            FieldType::Boolean => to_boolean(value),
            FieldType::Varbinary => match value {
                Value::Str(text) => Value::Bytes(text.as_bytes().to_vec()),
                other => other.clone(),
            },
            FieldType::Array | FieldType::Any => value.clone(),
        }
    }
}

fn to_integer(value: &Value) -> Value {
    match value {
        Value::Float(number) if number.fract() == 0.0 && number.abs() < i64::MAX as f64 => {
            Value::Int(*number as i64)
        }
        Value::Str(text) => text
            .trim()
            .parse::<i64>()
            .map_or_else(|_| value.clone(), Value::Int),
        Value::Bool(flag) => Value::Int(i64::from(*flag)),
        other => other.clone(),
    }
}

fn to_number(value: &Value) -> Value {
    match value {
        Value::Str(text) => {
            let trimmed = text.trim();
            if let Ok(integer) = trimmed.parse::<i64>() {
                return Value::Int(integer);
            }
            match trimmed.parse::<f64>() {
                Ok(number) if number.is_finite() => Value::Float(number),
                _ => value.clone(),
            }
        }
        Value::Bool(flag) => Value::Int(i64::from(*flag)),
        other => other.clone(),
    }
}

fn to_string(value: &Value) -> Value {
    match value {
        Value::Int(integer) => Value::Str(integer.to_string()),
        Value::Float(number) => Value::Str(number.to_string()),
        Value::Bool(flag) => Value::Str(flag.to_string()),
        Value::Bytes(bytes) => match std::str::from_utf8(bytes) {
            Ok(text) => Value::Str(text.to_string()),
            Err(_) => value.clone(),
        },
        other => other.clone(),
    }
}

fn to_boolean(value: &Value) -> Value {
    match value {
        Value::Int(integer) => Value::Bool(*integer != 0),
        Value::Str(text) => match text.trim().to_ascii_lowercase().as_str() {
            "true" | "1" => Value::Bool(true),
            "false" | "0" | "" => Value::Bool(false),
            _ => value.clone(),
        },
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::{StandardFormatter, ValueFormatter};
    use crate::model::value::Value;
    use crate::schema::field::FieldType;

    const ALL_TYPES: [FieldType; 8] = [
        FieldType::Unsigned,
        FieldType::Integer,
        FieldType::Number,
        FieldType::String,
        FieldType::Boolean,
        FieldType::Varbinary,
        FieldType::Array,
        FieldType::Any,
    ];

    #[test]
    fn coerces_numeric_strings_for_integer_fields() {
        let formatter = StandardFormatter;
        assert_eq!(
            formatter.format_value(FieldType::Unsigned, &Value::from(" 42 ")),
            Value::Int(42)
        );
        assert_eq!(
            formatter.format_value(FieldType::Integer, &Value::Float(3.0)),
            Value::Int(3)
        );
        assert_eq!(
            formatter.format_value(FieldType::Integer, &Value::from("abc")),
            Value::from("abc")
        );
    }

    #[test]
    fn unsigned_fields_leave_negative_numbers_alone() {
        let formatter = StandardFormatter;
        assert_eq!(
            formatter.format_value(FieldType::Unsigned, &Value::from("-5")),
            Value::from("-5")
        );
        assert_eq!(
            formatter.format_value(FieldType::Unsigned, &Value::Float(-2.0)),
            Value::Float(-2.0)
        );
        assert_eq!(
            formatter.format_value(FieldType::Integer, &Value::from("-5")),
            Value::Int(-5)
        );
    }

    #[test]
    fn coerces_scalars_for_string_fields() {
        let formatter = StandardFormatter;
        assert_eq!(
            formatter.format_value(FieldType::String, &Value::Int(7)),
            Value::from("7")
        );
        assert_eq!(
            formatter.format_value(FieldType::String, &Value::Bool(true)),
            Value::from("true")
        );
    }

    #[test]
    fn null_is_preserved_for_every_type() {
        let formatter = StandardFormatter;
        for field_type in ALL_TYPES {
            assert_eq!(formatter.format_value(field_type, &Value::Null), Value::Null);
        }
    }

    #[test]
    fn formatting_is_idempotent() {
        let formatter = StandardFormatter;
        let samples = [
            Value::from("12"),
            Value::from("-7"),
            Value::Float(-4.0),
            Value::from("1.5"),
            Value::from("true"),
            Value::from("nope"),
            Value::Int(0),
            Value::Int(-3),
            Value::Float(2.0),
            Value::Float(2.25),
            Value::Bool(false),
            Value::Bytes(vec![0xff, 0x00]),
            Value::Array(vec![Value::Int(1)]),
        ];
        for field_type in ALL_TYPES {
            for sample in &samples {
                let once = formatter.format_value(field_type, sample);
                let twice = formatter.format_value(field_type, &once);
                assert_eq!(once, twice, "type={field_type} sample={sample}");
            }
        }
    }
}
