//! Field-named record view over one tuple.
//!
//! # Responsibility
//! - Hold one optional slot per format entry of the owning space.
//! - Carry a stable generated identity independent of field values.
//!
//! # Invariants
//! - Slot count always equals the owning space's format length.
//! - `None` means the field is absent on the record; `Some(Value::Null)` is
//!   an explicit null.
//! - `id` never changes once generated.

use crate::model::params::Fields;
use crate::model::value::{Tuple, Value};
use crate::repo::error::{MapperError, MapperResult};
use crate::schema::field::Field;
use std::cell::RefCell;
use std::rc::Rc;
use uuid::Uuid;

/// Stable handle attached to a record at construction.
pub type RecordId = Uuid;

/// Shared record handle. `Rc::ptr_eq` is logical identity.
pub type RecordRef = Rc<RefCell<Record>>;

#[derive(Debug, Clone)]
pub struct Record {
    id: RecordId,
    space: String,
    format: Rc<[Field]>,
    slots: Vec<Option<Value>>,
}

impl Record {
    /// Creates a record with every field absent.
    pub(crate) fn empty(space: impl Into<String>, format: Rc<[Field]>) -> Self {
        let slots = vec![None; format.len()];
        Self {
            id: Uuid::new_v4(),
            space: space.into(),
            format,
            slots,
        }
    }

    /// Creates a record from a fetched tuple; missing positions become `Null`.
    pub(crate) fn from_tuple(space: impl Into<String>, format: Rc<[Field]>, tuple: &Tuple) -> Self {
        let slots = (0..format.len())
            .map(|position| Some(tuple.get(position).cloned().unwrap_or(Value::Null)))
            .collect();
        Self {
            id: Uuid::new_v4(),
            space: space.into(),
            format,
            slots,
        }
    }

    pub fn id(&self) -> RecordId {
        self.id
    }

    /// Name of the space this record belongs to.
    pub fn space(&self) -> &str {
        &self.space
    }

    pub fn format(&self) -> &[Field] {
        &self.format
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.position(name).and_then(|position| self.slot(position))
    }

    pub fn has(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Sets a declared field.
    ///
    /// # Errors
    /// - `UnknownField` when `name` is not part of the space format.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> MapperResult<()> {
        let position = self.require_position(name)?;
        self.slots[position] = Some(value.into());
        Ok(())
    }

    /// Marks a declared field as absent and returns its previous value.
    pub fn unset(&mut self, name: &str) -> MapperResult<Option<Value>> {
        let position = self.require_position(name)?;
        Ok(self.slots[position].take())
    }

    pub fn slot(&self, position: usize) -> Option<&Value> {
        self.slots.get(position).and_then(Option::as_ref)
    }

    pub(crate) fn set_slot(&mut self, position: usize, value: Value) {
        self.slots[position] = Some(value);
    }

    /// Present fields as a name -> value map.
    pub fn fields(&self) -> Fields {
        self.format
            .iter()
            .zip(&self.slots)
            .filter_map(|(field, slot)| slot.as_ref().map(|value| (field.name.clone(), value.clone())))
            .collect()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.format.iter().position(|field| field.name == name)
    }

    fn require_position(&self, name: &str) -> MapperResult<usize> {
        self.position(name).ok_or_else(|| MapperError::UnknownField {
            space: self.space.clone(),
            field: name.to_string(),
        })
    }
}
