//! Named mapper registry and `mapper.space` router.
//!
//! # Responsibility
//! - Register mappers directly, through factories, or through resolvers.
//! - Route CRUD verbs addressed as `mapper.space` to the owning repository.
//!
//! # Invariants
//! - A mapper name is registered at most once.
//! - A materialized mapper and a resolved repository are kept for the pool
//!   lifetime; the pool is an explicit context object, never global state.

use crate::mapper::Mapper;
use crate::model::params::{Fields, Params};
use crate::model::record::RecordRef;
use crate::repo::error::{LookupError, MapperResult};
use crate::repo::repository::RepositoryRef;
use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

static MAPPER_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid mapper name regex"));
static POOL_SPACE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([A-Za-z_][A-Za-z0-9_]*)\.([A-Za-z_][A-Za-z0-9_]*)$")
        .expect("valid pool space regex")
});

type MapperFactory = Box<dyn Fn() -> MapperResult<Mapper>>;
type MapperResolver = Box<dyn Fn(&str) -> Option<Mapper>>;

/// How a registered name produces its mapper.
pub enum MapperSource {
    /// Ready-made mapper.
    Direct(Mapper),
    /// Called once, on first lookup of the name.
    Factory(MapperFactory),
    /// Called with the looked-up name; `None` defers to pool-wide resolvers.
    Resolver(MapperResolver),
}

impl MapperSource {
    pub fn factory(factory: impl Fn() -> MapperResult<Mapper> + 'static) -> Self {
        Self::Factory(Box::new(factory))
    }

    pub fn resolver(resolver: impl Fn(&str) -> Option<Mapper> + 'static) -> Self {
        Self::Resolver(Box::new(resolver))
    }
}

/// Long-lived routing context over named mappers.
#[derive(Default)]
pub struct Pool {
    sources: BTreeMap<String, MapperSource>,
    mappers: BTreeMap<String, Rc<Mapper>>,
    resolvers: Vec<MapperResolver>,
    repositories: HashMap<String, RepositoryRef>,
}

impl Pool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers one mapper source under `name`.
    ///
    /// # Errors
    /// - `InvalidMapperName` when `name` is not an identifier.
    /// - `DuplicateMapper` when `name` was already registered.
    pub fn register(&mut self, name: &str, source: MapperSource) -> MapperResult<&mut Self> {
        if !MAPPER_NAME_RE.is_match(name) {
            return Err(LookupError::InvalidMapperName(name.to_string()).into());
        }
        if self.sources.contains_key(name) || self.mappers.contains_key(name) {
            return Err(LookupError::DuplicateMapper(name.to_string()).into());
        }

        match source {
            MapperSource::Direct(mapper) => {
                self.mappers.insert(name.to_string(), Rc::new(mapper));
            }
            other => {
                self.sources.insert(name.to_string(), other);
            }
        }
        Ok(self)
    }

    /// Appends a fallback resolver tried for names without a registration.
    pub fn register_resolver(
        &mut self,
        resolver: impl Fn(&str) -> Option<Mapper> + 'static,
    ) -> &mut Self {
        self.resolvers.push(Box::new(resolver));
        self
    }

    /// Returns the mapper for `name`, materializing it on first use.
    ///
    /// # Errors
    /// - `MapperNotRegistered` when no source or resolver yields a mapper.
    /// - Any error returned by a registered factory.
    pub fn mapper(&mut self, name: &str) -> MapperResult<Rc<Mapper>> {
        if let Some(mapper) = self.mappers.get(name) {
            return Ok(Rc::clone(mapper));
        }

        let mut materialized = match self.sources.get(name) {
            Some(MapperSource::Factory(factory)) => Some(factory()?),
            Some(MapperSource::Resolver(resolver)) => resolver(name),
            Some(MapperSource::Direct(_)) | None => None,
        };
        if materialized.is_none() {
            materialized = self.resolvers.iter().find_map(|resolver| resolver(name));
        }

        let Some(mapper) = materialized else {
            warn!("event=pool_lookup module=pool status=error error_code=mapper_not_registered mapper={name}");
            return Err(LookupError::MapperNotRegistered(name.to_string()).into());
        };

        debug!("event=pool_lookup module=pool status=materialized mapper={name}");
        let mapper = Rc::new(mapper);
        self.mappers.insert(name.to_string(), Rc::clone(&mapper));
        Ok(mapper)
    }

    /// Mappers materialized so far, ordered by name.
    pub fn mappers(&self) -> Vec<Rc<Mapper>> {
        self.mappers.values().cloned().collect()
    }

    /// Resolves `mapper.space` to its repository, caching the result.
    ///
    /// # Errors
    /// - `InvalidSpaceName` when `space` is not of the form `mapper.space`.
    /// - Mapper or space lookup failures.
    pub fn repository(&mut self, space: &str) -> MapperResult<RepositoryRef> {
        if let Some(repository) = self.repositories.get(space) {
            return Ok(Rc::clone(repository));
        }

        let (mapper_name, space_name) = match POOL_SPACE_RE.captures(space) {
            Some(captures) => (captures[1].to_string(), captures[2].to_string()),
            None => return Err(LookupError::InvalidSpaceName(space.to_string()).into()),
        };

        let repository = self.mapper(&mapper_name)?.repository(&space_name)?;
        self.repositories
            .insert(space.to_string(), Rc::clone(&repository));
        Ok(repository)
    }

    /// Creates and saves a record.
    pub fn create(&mut self, space: &str, data: &Fields) -> MapperResult<RecordRef> {
        let repository = self.repository(space)?;
        let mut repository = repository.borrow_mut();
        let record = repository.create(data)?;
        repository.save(&record)
    }

    pub fn find(&mut self, space: &str, params: impl Into<Params>) -> MapperResult<Vec<RecordRef>> {
        self.repository(space)?.borrow_mut().find(params)
    }

    pub fn find_one(
        &mut self,
        space: &str,
        params: impl Into<Params>,
    ) -> MapperResult<Option<RecordRef>> {
        self.repository(space)?.borrow_mut().find_one(params)
    }

    /// Finds the first match or creates it, then flushes the record.
    pub fn find_or_create(
        &mut self,
        space: &str,
        params: impl Into<Params>,
    ) -> MapperResult<RecordRef> {
        let repository = self.repository(space)?;
        let mut repository = repository.borrow_mut();
        let record = repository.find_or_create(params)?;
        repository.save(&record)
    }

    pub fn find_or_fail(&mut self, space: &str, params: impl Into<Params>) -> MapperResult<RecordRef> {
        self.repository(space)?.borrow_mut().find_or_fail(params)
    }
}
