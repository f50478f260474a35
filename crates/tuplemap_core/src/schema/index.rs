//! Declared index descriptors.

use crate::schema::field::FieldType;

/// One column of an index: tuple position plus the field's declared type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexPart {
    pub position: usize,
    pub field_type: FieldType,
}

/// Resolved index over a space format.
///
/// Index `0` of a space is its primary index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexDef {
    pub id: u32,
    pub name: String,
    pub parts: Vec<IndexPart>,
}

impl IndexDef {
    pub fn is_primary(&self) -> bool {
        self.id == 0
    }

    pub fn positions(&self) -> impl Iterator<Item = usize> + '_ {
        self.parts.iter().map(|part| part.position)
    }
}
