//! Space descriptor: format, indexes, and key extraction rules.
//!
//! # Responsibility
//! - Describe one tuple space (id, name, ordered format, declared indexes).
//! - Select a declared index for a set of equality constraints.
//! - Derive identity keys from records (named) and tuples (positional).
//!
//! # Invariants
//! - A space always has at least one index; index `0` is primary and has at
//!   least one part.
//! - Field names are unique within a format.
//! - Index selection never falls back to a scan over an undeclared index.

use crate::model::params::Fields;
use crate::model::record::Record;
use crate::model::value::{Key, Tuple, Value};
use crate::repo::error::{MapperError, MapperResult};
use crate::schema::field::{Field, FieldType};
use crate::schema::index::{IndexDef, IndexPart};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::rc::Rc;

/// Index declaration by field names, as written in schema configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSpec {
    pub name: String,
    pub fields: Vec<String>,
}

impl IndexSpec {
    pub fn new(name: impl Into<String>, fields: &[&str]) -> Self {
        Self {
            name: name.into(),
            fields: fields.iter().map(|field| (*field).to_string()).collect(),
        }
    }
}

/// Validated descriptor of one tuple space.
#[derive(Debug, Clone)]
pub struct Space {
    id: u32,
    name: String,
    format: Rc<[Field]>,
    positions: HashMap<String, usize>,
    indexes: Vec<IndexDef>,
}

impl Space {
    /// Validates and builds a space descriptor.
    ///
    /// # Errors
    /// - `InvalidSchema` for duplicate field names, an empty index list, an
    ///   empty primary index, or an index over an undeclared field.
    pub fn new(
        id: u32,
        name: impl Into<String>,
        format: Vec<Field>,
        indexes: Vec<IndexSpec>,
    ) -> MapperResult<Self> {
        let name = name.into();

        let mut positions = HashMap::with_capacity(format.len());
        for (position, field) in format.iter().enumerate() {
            if positions.insert(field.name.clone(), position).is_some() {
                return Err(MapperError::InvalidSchema(format!(
                    "space `{name}` declares field `{}` twice",
                    field.name
                )));
            }
        }

        if indexes.is_empty() {
            return Err(MapperError::InvalidSchema(format!(
                "space `{name}` has no indexes"
            )));
        }

        let mut resolved = Vec::with_capacity(indexes.len());
        for (index_id, declared) in indexes.into_iter().enumerate() {
            if declared.fields.is_empty() {
                return Err(MapperError::InvalidSchema(format!(
                    "index `{}` of space `{name}` has no parts",
                    declared.name
                )));
            }
            let mut parts = Vec::with_capacity(declared.fields.len());
            for field_name in &declared.fields {
                let position = *positions.get(field_name).ok_or_else(|| {
                    MapperError::InvalidSchema(format!(
                        "index `{}` of space `{name}` references unknown field `{field_name}`",
                        declared.name
                    ))
                })?;
                parts.push(IndexPart {
                    position,
                    field_type: format[position].field_type,
                });
            }
            resolved.push(IndexDef {
                id: index_id as u32,
                name: declared.name,
                parts,
            });
        }

        Ok(Self {
            id,
            name,
            format: format.into(),
            positions,
            indexes: resolved,
        })
    }

    pub fn builder(id: u32, name: impl Into<String>) -> SpaceBuilder {
        SpaceBuilder {
            id,
            name: name.into(),
            format: Vec::new(),
            indexes: Vec::new(),
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn format(&self) -> &[Field] {
        &self.format
    }

    pub(crate) fn shared_format(&self) -> Rc<[Field]> {
        Rc::clone(&self.format)
    }

    pub fn field_position(&self, name: &str) -> Option<usize> {
        self.positions.get(name).copied()
    }

    pub fn field_type(&self, name: &str) -> Option<FieldType> {
        self.field_position(name)
            .map(|position| self.format[position].field_type)
    }

    pub fn indexes(&self) -> &[IndexDef] {
        &self.indexes
    }

    pub fn primary_index(&self) -> &IndexDef {
        &self.indexes[0]
    }

    /// Field names of the primary index in part order.
    pub fn primary_field_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.primary_index()
            .positions()
            .map(|position| self.format[position].name.as_str())
    }

    /// Selects a declared index for a set of equality constraints.
    ///
    /// An index whose parts are exactly the constrained fields wins; otherwise
    /// the first index whose leading parts cover the constrained fields is
    /// used. Empty constraints resolve to the primary index. Unknown field
    /// names never resolve.
    pub fn cast_index(&self, params: &Fields) -> Option<&IndexDef> {
        let mut wanted = BTreeSet::new();
        for name in params.keys() {
            wanted.insert(self.field_position(name)?);
        }

        let exact = self.indexes.iter().find(|index| {
            index.parts.len() == wanted.len()
                && index.positions().all(|position| wanted.contains(&position))
        });
        if exact.is_some() {
            return exact;
        }

        self.indexes.iter().find(|index| {
            index.parts.len() >= wanted.len()
                && index
                    .positions()
                    .take(wanted.len())
                    .all(|position| wanted.contains(&position))
        })
    }

    /// Projects constraint values into index-part order.
    ///
    /// Stops at the first part without a constraint, so the result is always
    /// a key prefix of `index`.
    pub fn index_values(&self, index: &IndexDef, params: &Fields) -> Vec<Value> {
        let mut values = Vec::with_capacity(index.parts.len());
        for part in &index.parts {
            match params.get(&self.format[part.position].name) {
                Some(value) => values.push(value.clone()),
                None => break,
            }
        }
        values
    }

    /// Derives the identity key from a record's named fields.
    ///
    /// # Errors
    /// - `InvalidKey` when a primary-index field is absent or null.
    pub fn instance_key(&self, record: &Record) -> MapperResult<Key> {
        self.key_from(|position| record.slot(position))
    }

    /// Derives the identity key from a positional tuple.
    ///
    /// # Errors
    /// - `InvalidKey` when a primary-index position is missing or null.
    pub fn tuple_key(&self, tuple: &Tuple) -> MapperResult<Key> {
        self.key_from(|position| tuple.get(position))
    }

    fn key_from<'a>(&self, lookup: impl Fn(usize) -> Option<&'a Value>) -> MapperResult<Key> {
        let mut parts = Vec::with_capacity(self.primary_index().parts.len());
        for position in self.primary_index().positions() {
            match lookup(position) {
                Some(value) if !value.is_null() => parts.push(value.clone()),
                _ => {
                    return Err(MapperError::InvalidKey {
                        space: self.name.clone(),
                        field: self.format[position].name.clone(),
                    })
                }
            }
        }
        Ok(Key::new(parts))
    }
}

/// Fluent builder for `Space`, mostly for code-declared schemas and tests.
#[derive(Debug, Clone)]
pub struct SpaceBuilder {
    id: u32,
    name: String,
    format: Vec<Field>,
    indexes: Vec<IndexSpec>,
}

impl SpaceBuilder {
    pub fn field(mut self, name: impl Into<String>, field_type: FieldType) -> Self {
        self.format.push(Field::new(name, field_type));
        self
    }

    /// Declares an index; the first declared index is primary.
    pub fn index(mut self, name: impl Into<String>, fields: &[&str]) -> Self {
        self.indexes.push(IndexSpec::new(name, fields));
        self
    }

    pub fn build(self) -> MapperResult<Space> {
        Space::new(self.id, self.name, self.format, self.indexes)
    }
}
