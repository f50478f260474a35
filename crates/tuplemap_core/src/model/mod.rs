//! In-memory data model for mapped spaces.
//!
//! # Responsibility
//! - Define values, tuples, and identity keys exchanged with the store.
//! - Define the field-named record view and query constraint shapes.
//!
//! # Invariants
//! - Record identity is a generated `RecordId`, never a field value.
//! - Keys compare structurally; equal keys denote the same logical row.

pub mod params;
pub mod record;
pub mod value;
