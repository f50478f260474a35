//! Repository layer: identity map, find cache, and diff-based saves.
//!
//! # Responsibility
//! - Present tuples of one space as shared, field-named records.
//! - Keep SQL/wire details behind the `TupleClient` seam.
//!
//! # Invariants
//! - One live record per key per repository.
//! - Errors propagate unchanged; no retries, no rollback.

pub mod error;
pub mod find_cache;
pub mod repository;
