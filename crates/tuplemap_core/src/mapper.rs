//! Mapper: repositories sharing one schema, formatter, and client.
//!
//! # Responsibility
//! - Build one repository per space name on first use and keep it.
//!
//! # Invariants
//! - Repeated lookups of a space return the same repository handle.
//! - All repositories of a mapper share its client and formatter.

use crate::repo::error::{LookupError, MapperResult};
use crate::repo::repository::{Repository, RepositoryRef};
use crate::schema::format::{StandardFormatter, ValueFormatter};
use crate::schema::Schema;
use crate::store::TupleClient;
use log::debug;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

pub struct Mapper {
    schema: Rc<Schema>,
    client: Rc<dyn TupleClient>,
    formatter: Rc<dyn ValueFormatter>,
    repositories: RefCell<HashMap<String, RepositoryRef>>,
}

impl Mapper {
    /// Creates a mapper using `StandardFormatter` coercion rules.
    pub fn new(schema: Schema, client: Rc<dyn TupleClient>) -> Self {
        Self::with_formatter(schema, client, Rc::new(StandardFormatter))
    }

    pub fn with_formatter(
        schema: Schema,
        client: Rc<dyn TupleClient>,
        formatter: Rc<dyn ValueFormatter>,
    ) -> Self {
        Self {
            schema: Rc::new(schema),
            client,
            formatter,
            repositories: RefCell::new(HashMap::new()),
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn client(&self) -> Rc<dyn TupleClient> {
        Rc::clone(&self.client)
    }

    pub fn formatter(&self) -> Rc<dyn ValueFormatter> {
        Rc::clone(&self.formatter)
    }

    pub fn space_names(&self) -> Vec<String> {
        self.schema.space_names()
    }

    /// Returns the repository of `space`, building it on first use.
    ///
    /// # Errors
    /// - `Lookup(SpaceNotFound)` when the schema has no such space.
    pub fn repository(&self, space: &str) -> MapperResult<RepositoryRef> {
        if let Some(existing) = self.repositories.borrow().get(space) {
            return Ok(Rc::clone(existing));
        }

        let descriptor = self
            .schema
            .space(space)
            .ok_or_else(|| LookupError::SpaceNotFound(space.to_string()))?;
        let repository = Rc::new(RefCell::new(Repository::new(
            descriptor,
            Rc::clone(&self.formatter),
            Rc::clone(&self.client),
        )));
        debug!("event=repository_init module=mapper status=ok space={space}");

        self.repositories
            .borrow_mut()
            .insert(space.to_string(), Rc::clone(&repository));
        Ok(repository)
    }
}
