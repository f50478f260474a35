//! Identity-mapped repository over one tuple space.
//!
//! # Responsibility
//! - Keep exactly one live record per key for the repository lifetime.
//! - Resolve `find` queries through the cache, the identity map, and finally
//!   one index select.
//! - Flush records as inserts or minimal assign-only updates.
//!
//! # Invariants
//! - `persisted` and `original` always hold the same key set.
//! - `original[key]` is the last tuple confirmed read from or written to the
//!   store for `key`.
//! - Local maps are mutated only after the client call succeeded.
//! - Every save that performed I/O clears the whole find cache.
//! - Nothing is evicted; memory grows with distinct keys and queries.

use crate::model::params::{Fields, Params};
use crate::model::record::{Record, RecordId, RecordRef};
use crate::model::value::{Key, Tuple, Value};
use crate::repo::error::{MapperError, MapperResult};
use crate::repo::find_cache::{FindCache, FindResult};
use crate::schema::format::ValueFormatter;
use crate::schema::space::Space;
use crate::store::{TupleClient, UpdateOp};
use log::debug;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Shared repository handle handed out by mappers and the pool.
pub type RepositoryRef = Rc<RefCell<Repository>>;

/// Unit-of-work repository bound to one space.
pub struct Repository {
    space: Rc<Space>,
    formatter: Rc<dyn ValueFormatter>,
    client: Rc<dyn TupleClient>,
    persisted: HashMap<Key, RecordRef>,
    original: HashMap<Key, Tuple>,
    keys: HashMap<RecordId, Key>,
    cache: FindCache,
}

impl Repository {
    pub fn new(
        space: Rc<Space>,
        formatter: Rc<dyn ValueFormatter>,
        client: Rc<dyn TupleClient>,
    ) -> Self {
        Self {
            space,
            formatter,
            client,
            persisted: HashMap::new(),
            original: HashMap::new(),
            keys: HashMap::new(),
            cache: FindCache::default(),
        }
    }

    pub fn space(&self) -> &Space {
        &self.space
    }

    /// Builds a transient record from declared fields of `data`.
    ///
    /// Undeclared fields are dropped. No I/O is performed; the record enters
    /// the identity map only on `save`.
    ///
    /// # Errors
    /// - `InvalidKey` when a primary-index field is absent or null.
    pub fn create(&mut self, data: &Fields) -> MapperResult<RecordRef> {
        let mut record = Record::empty(self.space.name(), self.space.shared_format());
        let mut accepted = 0;
        for (position, field) in self.space.format().iter().enumerate() {
            if let Some(value) = data.get(&field.name) {
                record.set_slot(position, value.clone());
                accepted += 1;
            }
        }
        if accepted < data.len() {
            debug!(
                "event=create module=repository status=fields_dropped space={} dropped={}",
                self.space.name(),
                data.len() - accepted
            );
        }

        let key = self.space.instance_key(&record)?;
        self.keys.insert(record.id(), key);
        Ok(Rc::new(RefCell::new(record)))
    }

    /// Returns every record matching `params`.
    pub fn find(&mut self, params: impl Into<Params>) -> MapperResult<Vec<RecordRef>> {
        match self.find_with(params.into(), false)? {
            FindResult::Many(records) => Ok(records),
            FindResult::One(record) => Ok(record.into_iter().collect()),
        }
    }

    /// Returns the first record matching `params`, if any.
    pub fn find_one(&mut self, params: impl Into<Params>) -> MapperResult<Option<RecordRef>> {
        match self.find_with(params.into(), true)? {
            FindResult::One(record) => Ok(record),
            FindResult::Many(records) => Ok(records.into_iter().next()),
        }
    }

    /// Returns the first match, or creates and saves a record from `params`.
    pub fn find_or_create(&mut self, params: impl Into<Params>) -> MapperResult<RecordRef> {
        let params = self.normalize(params.into());
        if let Some(record) = self.find_one(params.clone())? {
            return Ok(record);
        }

        let Some(data) = params.as_fields() else {
            return Err(self.no_index(&params));
        };
        let record = self.create(data)?;
        self.save(&record)
    }

    /// Returns the first match or fails with `NotFound`.
    pub fn find_or_fail(&mut self, params: impl Into<Params>) -> MapperResult<RecordRef> {
        let params = params.into();
        self.find_one(params.clone())?
            .ok_or_else(|| MapperError::NotFound {
                space: self.space.name().to_string(),
                params: params.to_json_string(),
            })
    }

    /// Resolves `params` to one or many records.
    ///
    /// Order: scalar-shorthand normalization, cache, identity map, index
    /// resolution, then one remote select whose result is cached.
    ///
    /// # Errors
    /// - `NoIndex` when no declared index matches; no remote call is made.
    /// - `Store` when the select fails; the reserved cache slot is released.
    pub fn find_with(&mut self, params: Params, one: bool) -> MapperResult<FindResult> {
        let params = self.normalize(params);
        let space = Rc::clone(&self.space);

        if let Some(result) = self.cache.lookup(&params, one) {
            debug!(
                "event=find module=repository status=cache_hit space={} one={}",
                space.name(),
                one
            );
            return Ok(result);
        }

        let Some(fields) = params.as_fields() else {
            return Err(self.no_index(&params));
        };

        if let Some(record) = self.identity_hit(fields) {
            debug!(
                "event=find module=repository status=identity_hit space={}",
                space.name()
            );
            return Ok(if one {
                FindResult::One(Some(record))
            } else {
                FindResult::Many(vec![record])
            });
        }

        let index = space
            .cast_index(fields)
            .ok_or_else(|| self.no_index(&params))?;
        let values: Vec<Value> = space
            .index_values(index, fields)
            .iter()
            .zip(&index.parts)
            .map(|(value, part)| self.formatter.format_value(part.field_type, value))
            .collect();

        let ticket = self.cache.reserve(&params, one);
        let tuples = match self.client.select(space.id(), &values, index) {
            Ok(tuples) => tuples,
            Err(err) => {
                self.cache.release(ticket);
                return Err(err.into());
            }
        };
        debug!(
            "event=find module=repository status=select space={} index={} rows={}",
            space.name(),
            index.name,
            tuples.len()
        );

        let result = match self.materialize(tuples, one) {
            Ok(result) => result,
            Err(err) => {
                self.cache.release(ticket);
                return Err(err);
            }
        };
        self.cache.fill(ticket, result.clone());
        Ok(result)
    }

    /// Returns the canonical record for a fetched tuple.
    ///
    /// A record already live for the tuple's key wins and the incoming tuple
    /// is discarded, even when its values diverge from the cached record.
    pub fn get_instance(&mut self, tuple: Tuple) -> MapperResult<RecordRef> {
        let key = self.space.tuple_key(&tuple)?;
        if let Some(existing) = self.persisted.get(&key) {
            return Ok(Rc::clone(existing));
        }

        let record = Record::from_tuple(self.space.name(), self.space.shared_format(), &tuple);
        self.keys.insert(record.id(), key.clone());
        self.original.insert(key.clone(), tuple);

        let record = Rc::new(RefCell::new(record));
        self.persisted.insert(key, Rc::clone(&record));
        Ok(record)
    }

    /// Flushes one record: insert when its key is unknown, minimal update when
    /// it changed, nothing when it did not.
    ///
    /// Present fields are coerced through the formatter and written back into
    /// the record before the tuple is built. Absent fields are never part of
    /// an update diff; inserts pad them with `Null`.
    ///
    /// # Errors
    /// - `SpaceMismatch` when the record was built for another space.
    /// - `InvalidKey` when the primary-index fields are missing.
    /// - `Store` when the insert/update fails; local maps are left untouched.
    pub fn save(&mut self, record_ref: &RecordRef) -> MapperResult<RecordRef> {
        let space = Rc::clone(&self.space);
        let (tuple, present, key, record_id) = {
            let mut record = record_ref.borrow_mut();
            if record.space() != space.name() {
                return Err(MapperError::SpaceMismatch {
                    expected: space.name().to_string(),
                    actual: record.space().to_string(),
                });
            }

            let mut tuple = Tuple::with_capacity(space.format().len());
            let mut present = Vec::with_capacity(space.format().len());
            for (position, field) in space.format().iter().enumerate() {
                let Some(value) = record.slot(position) else {
                    continue;
                };
                let coerced = self.formatter.format_value(field.field_type, value);
                record.set_slot(position, coerced.clone());
                tuple.resize(position, Value::Null);
                tuple.push(coerced);
                present.push(position);
            }

            let key = space.instance_key(&record)?;
            (tuple, present, key, record.id())
        };

        // `persisted` and `original` share their key set.
        if let Some(original) = self.original.get(&key) {
            let operations: Vec<UpdateOp> = present
                .iter()
                .filter(|&&position| original.get(position) != Some(&tuple[position]))
                .map(|&position| UpdateOp::Assign {
                    position,
                    value: tuple[position].clone(),
                })
                .collect();

            if operations.is_empty() {
                debug!(
                    "event=save module=repository status=noop space={} key={}",
                    space.name(),
                    key
                );
                return Ok(Rc::clone(record_ref));
            }

            let primary: Vec<Value> = space
                .primary_index()
                .positions()
                .map(|position| original.get(position).cloned().unwrap_or(Value::Null))
                .collect();
            let mut snapshot = original.clone();
            for operation in &operations {
                operation.apply(&mut snapshot);
            }

            self.client.update(space.id(), &primary, &operations)?;
            debug!(
                "event=save module=repository status=update space={} key={} changed={}",
                space.name(),
                key,
                operations.len()
            );
            self.original.insert(key.clone(), snapshot);
        } else {
            self.client.insert(space.id(), &tuple)?;
            debug!(
                "event=save module=repository status=insert space={} key={}",
                space.name(),
                key
            );
            self.persisted.insert(key.clone(), Rc::clone(record_ref));
            self.original.insert(key.clone(), tuple);
        }

        self.keys.insert(record_id, key);
        self.cache.clear();
        Ok(Rc::clone(record_ref))
    }

    /// Whether the record was ever created or fetched through this repository.
    pub fn knows(&self, record: &RecordRef) -> bool {
        self.keys.contains_key(&record.borrow().id())
    }

    /// Last confirmed tuple for `key`.
    pub fn original(&self, key: &Key) -> Option<&Tuple> {
        self.original.get(key)
    }

    /// Live record for `key`, without any I/O.
    pub fn persisted(&self, key: &Key) -> Option<RecordRef> {
        self.persisted.get(key).cloned()
    }

    pub fn persisted_count(&self) -> usize {
        self.persisted.len()
    }

    /// Number of resolved queries currently memoized.
    pub fn cached_queries(&self) -> usize {
        self.cache.len()
    }

    fn normalize(&self, params: Params) -> Params {
        let primary = self.space.primary_index();
        let scalar = match &params {
            Params::Positional(values) if values.len() == 1 && primary.parts.len() == 1 => {
                values[0].clone()
            }
            _ => return params,
        };

        let part = primary.parts[0];
        let formatted = self.formatter.format_value(part.field_type, &scalar);
        if formatted != scalar {
            return params;
        }

        let name = self.space.format()[part.position].name.clone();
        Params::new().with(name, formatted)
    }

    fn identity_hit(&self, fields: &Fields) -> Option<RecordRef> {
        let primary = self.space.primary_index();
        if fields.len() != primary.parts.len() {
            return None;
        }

        let mut parts = Vec::with_capacity(primary.parts.len());
        for part in &primary.parts {
            let value = fields.get(&self.space.format()[part.position].name)?;
            parts.push(self.formatter.format_value(part.field_type, value));
        }
        self.persisted.get(&Key::new(parts)).cloned()
    }

    fn materialize(&mut self, tuples: Vec<Tuple>, one: bool) -> MapperResult<FindResult> {
        if one {
            let first = match tuples.into_iter().next() {
                Some(tuple) => Some(self.get_instance(tuple)?),
                None => None,
            };
            return Ok(FindResult::One(first));
        }

        let mut records = Vec::with_capacity(tuples.len());
        for tuple in tuples {
            records.push(self.get_instance(tuple)?);
        }
        Ok(FindResult::Many(records))
    }

    fn no_index(&self, params: &Params) -> MapperError {
        MapperError::NoIndex {
            space: self.space.name().to_string(),
            params: params.to_json_string(),
        }
    }
}
