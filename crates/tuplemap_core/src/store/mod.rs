//! Tuple store client contract and the embedded SQLite store.
//!
//! # Responsibility
//! - Define the `TupleClient` seam the repository talks to.
//! - Provide an embedded SQLite-backed tuple store for local use and tests.
//!
//! # Invariants
//! - Clients report every failure as `StoreError`; nothing is retried here.
//! - Store bookkeeping tables are versioned via `PRAGMA user_version`.
//!
//! # See also
//! - `repo::repository` for how select/insert/update are driven.

use crate::model::value::{Tuple, Value};
use crate::schema::index::IndexDef;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;
mod sqlite;

pub use open::{open_store, open_store_in_memory};
pub use sqlite::SqliteTupleClient;

pub type StoreResult<T> = Result<T, StoreError>;

/// Failure surfaced by a tuple client.
#[derive(Debug)]
pub enum StoreError {
    Sqlite(rusqlite::Error),
    Codec(serde_json::Error),
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
    UnknownSpace(u32),
    DuplicateKey {
        space_id: u32,
        key: String,
    },
    RowNotFound {
        space_id: u32,
        key: String,
    },
    Rejected(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::Codec(err) => write!(f, "tuple codec error: {err}"),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "store schema version {db_version} is newer than supported {latest_supported}"
            ),
            Self::UnknownSpace(space_id) => write!(f, "space {space_id} is not defined"),
            Self::DuplicateKey { space_id, key } => {
                write!(f, "duplicate key {key} in space {space_id}")
            }
            Self::RowNotFound { space_id, key } => {
                write!(f, "no tuple with key {key} in space {space_id}")
            }
            Self::Rejected(message) => write!(f, "store rejected request: {message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::Codec(err) => Some(err),
            Self::UnsupportedSchemaVersion { .. }
            | Self::UnknownSpace(_)
            | Self::DuplicateKey { .. }
            | Self::RowNotFound { .. }
            | Self::Rejected(_) => None,
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(value: serde_json::Error) -> Self {
        Self::Codec(value)
    }
}

/// One field mutation inside an `update` request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOp {
    /// Replace the value at `position`.
    Assign { position: usize, value: Value },
}

impl UpdateOp {
    pub fn position(&self) -> usize {
        match self {
            Self::Assign { position, .. } => *position,
        }
    }

    /// Applies the operation to a tuple, padding with `Null` when the tuple is
    /// shorter than `position`.
    pub fn apply(&self, tuple: &mut Tuple) {
        match self {
            Self::Assign { position, value } => {
                if tuple.len() <= *position {
                    tuple.resize(*position + 1, Value::Null);
                }
                tuple[*position] = value.clone();
            }
        }
    }
}

/// Remote tuple store operations consumed by repositories.
///
/// Spaces and indexes are addressed by numeric id; `index` also carries the
/// part positions so embedded stores can evaluate it.
pub trait TupleClient {
    /// Returns tuples whose leading `index` parts equal `values`, in store order.
    fn select(&self, space_id: u32, values: &[Value], index: &IndexDef) -> StoreResult<Vec<Tuple>>;

    /// Inserts a full tuple; fails on a duplicate primary key.
    fn insert(&self, space_id: u32, tuple: &Tuple) -> StoreResult<()>;

    /// Applies `operations` to the row identified by primary-key `key`.
    fn update(&self, space_id: u32, key: &[Value], operations: &[UpdateOp]) -> StoreResult<()>;
}

#[cfg(test)]
mod tests {
    use super::{StoreError, UpdateOp};
    use crate::model::value::Value;
    use std::error::Error;

    #[test]
    fn assign_pads_short_tuples() {
        let mut tuple = vec![Value::Int(1)];
        UpdateOp::Assign {
            position: 2,
            value: Value::from("x"),
        }
        .apply(&mut tuple);
        assert_eq!(tuple, vec![Value::Int(1), Value::Null, Value::from("x")]);
    }

    #[test]
    fn rejected_error_has_no_source() {
        let err = StoreError::Rejected("offline".to_string());
        assert!(err.source().is_none());
        assert!(err.to_string().contains("offline"));
    }
}
