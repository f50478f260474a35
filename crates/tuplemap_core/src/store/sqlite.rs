//! SQLite-backed `TupleClient`.
//!
//! # Responsibility
//! - Persist tuples per space as JSON bodies keyed by their primary key.
//! - Evaluate index selects by comparing part positions inside tuple bodies.
//!
//! # Invariants
//! - A space must be defined (`define_space`) before tuples are written.
//! - `(space_id, pk)` is unique; duplicate inserts are rejected.
//! - Select results are ordered by insertion sequence.
//! - Non-finite floats are rejected on write; JSON has no encoding for them.
//! - Select decodes a full body only for rows whose index positions match.

use crate::model::value::{Tuple, Value};
use crate::schema::index::IndexDef;
use crate::schema::space::Space;
use crate::store::{StoreError, StoreResult, TupleClient, UpdateOp};
use log::debug;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};

/// Embedded tuple store over one owned SQLite connection.
#[derive(Debug)]
pub struct SqliteTupleClient {
    conn: Connection,
}

impl SqliteTupleClient {
    /// Wraps an already bootstrapped connection.
    ///
    /// Prefer `open_store`/`open_store_in_memory`, which apply migrations.
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Records a space and its primary index positions.
    ///
    /// Re-defining an existing space id replaces its name and key layout.
    pub fn define_space(&self, space: &Space) -> StoreResult<()> {
        let parts: Vec<usize> = space.primary_index().positions().collect();
        self.conn.execute(
            "INSERT INTO spaces (space_id, name, primary_parts)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(space_id) DO UPDATE SET
                name = excluded.name,
                primary_parts = excluded.primary_parts;",
            params![space.id(), space.name(), serde_json::to_string(&parts)?],
        )?;
        Ok(())
    }

    /// Number of tuples stored for a space.
    pub fn count(&self, space_id: u32) -> StoreResult<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM tuples WHERE space_id = ?1;",
            [space_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    fn primary_parts(&self, space_id: u32) -> StoreResult<Vec<usize>> {
        let encoded: Option<String> = self
            .conn
            .query_row(
                "SELECT primary_parts FROM spaces WHERE space_id = ?1;",
                [space_id],
                |row| row.get(0),
            )
            .optional()?;
        match encoded {
            Some(encoded) => Ok(serde_json::from_str(&encoded)?),
            None => Err(StoreError::UnknownSpace(space_id)),
        }
    }

    fn encode_key(space_id: u32, parts: &[usize], tuple: &Tuple) -> StoreResult<String> {
        let mut key = Vec::with_capacity(parts.len());
        for position in parts {
            match tuple.get(*position) {
                Some(value) if !value.is_null() => key.push(value.clone()),
                _ => {
                    return Err(StoreError::Rejected(format!(
                        "tuple for space {space_id} has no value at primary key position {position}"
                    )))
                }
            }
        }
        Ok(serde_json::to_string(&key)?)
    }
}

fn map_constraint(err: rusqlite::Error, space_id: u32, key: &str) -> StoreError {
    match err.sqlite_error_code() {
        Some(ErrorCode::ConstraintViolation) => StoreError::DuplicateKey {
            space_id,
            key: key.to_string(),
        },
        _ => StoreError::Sqlite(err),
    }
}

/// Decodes only the index positions of a stored body, so an unreadable value
/// elsewhere in the row cannot fail unrelated selects.
fn matches_prefix(
    body: &[serde_json::Value],
    values: &[Value],
    index: &IndexDef,
) -> StoreResult<bool> {
    for (part, expected) in index.parts.iter().zip(values) {
        let Some(encoded) = body.get(part.position) else {
            return Ok(false);
        };
        let actual: Value = serde_json::from_value(encoded.clone())?;
        if actual != *expected {
            return Ok(false);
        }
    }
    Ok(true)
}

fn ensure_encodable(space_id: u32, tuple: &Tuple) -> StoreResult<()> {
    match tuple.iter().position(|value| !value.is_finite()) {
        Some(position) => Err(StoreError::Rejected(format!(
            "tuple for space {space_id} has a non-finite float at position {position}"
        ))),
        None => Ok(()),
    }
}

impl TupleClient for SqliteTupleClient {
    fn select(&self, space_id: u32, values: &[Value], index: &IndexDef) -> StoreResult<Vec<Tuple>> {
        self.primary_parts(space_id)?;

        let mut stmt = self
            .conn
            .prepare("SELECT body FROM tuples WHERE space_id = ?1 ORDER BY seq ASC;")?;
        let mut rows = stmt.query([space_id])?;
        let mut tuples = Vec::new();

        while let Some(row) = rows.next()? {
            let body: String = row.get(0)?;
            let encoded: Vec<serde_json::Value> = serde_json::from_str(&body)?;
            if !matches_prefix(&encoded, values, index)? {
                continue;
            }
            let tuple = encoded
                .into_iter()
                .map(serde_json::from_value)
                .collect::<Result<Tuple, _>>()?;
            tuples.push(tuple);
        }

        debug!(
            "event=store_select module=store status=ok space_id={} index={} rows={}",
            space_id,
            index.name,
            tuples.len()
        );
        Ok(tuples)
    }

    fn insert(&self, space_id: u32, tuple: &Tuple) -> StoreResult<()> {
        let parts = self.primary_parts(space_id)?;
        ensure_encodable(space_id, tuple)?;
        let key = Self::encode_key(space_id, &parts, tuple)?;
        let body = serde_json::to_string(tuple)?;

        self.conn
            .execute(
                "INSERT INTO tuples (space_id, pk, body) VALUES (?1, ?2, ?3);",
                params![space_id, key, body],
            )
            .map_err(|err| map_constraint(err, space_id, &key))?;
        Ok(())
    }

    fn update(&self, space_id: u32, key: &[Value], operations: &[UpdateOp]) -> StoreResult<()> {
        let parts = self.primary_parts(space_id)?;
        let encoded_key = serde_json::to_string(key)?;

        let row: Option<(i64, String)> = self
            .conn
            .query_row(
                "SELECT seq, body FROM tuples WHERE space_id = ?1 AND pk = ?2;",
                params![space_id, encoded_key],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        let Some((seq, body)) = row else {
            return Err(StoreError::RowNotFound {
                space_id,
                key: encoded_key,
            });
        };

        let mut tuple: Tuple = serde_json::from_str(&body)?;
        for operation in operations {
            operation.apply(&mut tuple);
        }
        ensure_encodable(space_id, &tuple)?;
        let next_key = Self::encode_key(space_id, &parts, &tuple)?;

        self.conn
            .execute(
                "UPDATE tuples SET pk = ?1, body = ?2 WHERE seq = ?3;",
                params![next_key, serde_json::to_string(&tuple)?, seq],
            )
            .map_err(|err| map_constraint(err, space_id, &next_key))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::model::value::Value;
    use crate::schema::field::FieldType;
    use crate::schema::space::Space;
    use crate::store::{open_store_in_memory, StoreError, TupleClient, UpdateOp};

    fn pairs_space() -> Space {
        Space::builder(600, "pairs")
            .field("a", FieldType::Unsigned)
            .field("b", FieldType::Unsigned)
            .field("label", FieldType::String)
            .index("primary", &["a", "b"])
            .build()
            .expect("pairs space")
    }

    #[test]
    fn select_filters_on_leading_index_parts() {
        let store = open_store_in_memory().expect("store");
        let space = pairs_space();
        store.define_space(&space).expect("define");

        for (a, b) in [(1, 1), (1, 2), (2, 1)] {
            store
                .insert(
                    space.id(),
                    &vec![Value::Int(a), Value::Int(b), Value::from("x")],
                )
                .expect("insert");
        }

        let rows = store
            .select(space.id(), &[Value::Int(1)], space.primary_index())
            .expect("select");
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|row| row[0] == Value::Int(1)));

        let all = store
            .select(space.id(), &[], space.primary_index())
            .expect("full scan");
        assert_eq!(all.len(), 3);
    }

    #[test]
    fn update_can_move_primary_key() {
        let store = open_store_in_memory().expect("store");
        let space = pairs_space();
        store.define_space(&space).expect("define");
        store
            .insert(space.id(), &vec![Value::Int(1), Value::Int(1)])
            .expect("insert");

        store
            .update(
                space.id(),
                &[Value::Int(1), Value::Int(1)],
                &[UpdateOp::Assign {
                    position: 1,
                    value: Value::Int(5),
                }],
            )
            .expect("update");

        let moved = store
            .select(space.id(), &[Value::Int(1), Value::Int(5)], space.primary_index())
            .expect("select");
        assert_eq!(moved, vec![vec![Value::Int(1), Value::Int(5)]]);

        let err = store
            .update(space.id(), &[Value::Int(1), Value::Int(1)], &[])
            .expect_err("old key is gone");
        assert!(matches!(err, StoreError::RowNotFound { .. }));
    }

    #[test]
    fn insert_rejects_missing_primary_key() {
        let store = open_store_in_memory().expect("store");
        let space = pairs_space();
        store.define_space(&space).expect("define");

        let err = store
            .insert(space.id(), &vec![Value::Int(1)])
            .expect_err("partial key");
        assert!(matches!(err, StoreError::Rejected(_)));
    }
}
