//! Space declarations and value coercion.
//!
//! # Responsibility
//! - Hold the named set of spaces a mapper can route to.
//! - Load space declarations from JSON configuration.
//!
//! # Invariants
//! - Space names and space ids are unique within one schema.
//! - Every loaded space passed `Space::new` validation.

pub mod field;
pub mod format;
pub mod index;
pub mod space;

use crate::repo::error::{MapperError, MapperResult};
use field::Field;
use serde::{Deserialize, Serialize};
use space::{IndexSpec, Space};
use std::collections::BTreeMap;
use std::rc::Rc;

/// Serialized form of one space declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpaceConfig {
    pub id: u32,
    pub name: String,
    pub format: Vec<Field>,
    pub indexes: Vec<IndexSpec>,
}

/// Serialized form of a whole schema.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaConfig {
    #[serde(default)]
    pub spaces: Vec<SpaceConfig>,
}

/// Named collection of space descriptors.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    spaces: BTreeMap<String, Rc<Space>>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses and validates a JSON schema document.
    ///
    /// # Errors
    /// - `InvalidSchema` for malformed JSON or any invalid space declaration.
    pub fn from_json(source: &str) -> MapperResult<Self> {
        let config: SchemaConfig = serde_json::from_str(source)
            .map_err(|err| MapperError::InvalidSchema(format!("invalid schema json: {err}")))?;
        Self::from_config(config)
    }

    pub fn from_config(config: SchemaConfig) -> MapperResult<Self> {
        let mut schema = Self::new();
        for space in config.spaces {
            schema.add_space(Space::new(space.id, space.name, space.format, space.indexes)?)?;
        }
        Ok(schema)
    }

    /// Adds one space, rejecting duplicate names or ids.
    pub fn add_space(&mut self, space: Space) -> MapperResult<()> {
        if self.spaces.contains_key(space.name()) {
            return Err(MapperError::InvalidSchema(format!(
                "space `{}` is declared twice",
                space.name()
            )));
        }
        if let Some(existing) = self.spaces.values().find(|other| other.id() == space.id()) {
            return Err(MapperError::InvalidSchema(format!(
                "space id {} is used by both `{}` and `{}`",
                space.id(),
                existing.name(),
                space.name()
            )));
        }
        self.spaces.insert(space.name().to_string(), Rc::new(space));
        Ok(())
    }

    /// Builder-style variant of `add_space`.
    pub fn with_space(mut self, space: Space) -> MapperResult<Self> {
        self.add_space(space)?;
        Ok(self)
    }

    pub fn space(&self, name: &str) -> Option<Rc<Space>> {
        self.spaces.get(name).cloned()
    }

    pub fn has_space(&self, name: &str) -> bool {
        self.spaces.contains_key(name)
    }

    /// Returns sorted space names.
    pub fn space_names(&self) -> Vec<String> {
        self.spaces.keys().cloned().collect()
    }

    pub fn spaces(&self) -> impl Iterator<Item = &Rc<Space>> {
        self.spaces.values()
    }
}
