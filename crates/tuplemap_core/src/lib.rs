//! Identity-mapped data mapper over tuple-store spaces.
//! Records fetched or created through a repository keep one live instance per
//! key; saves flush only the fields that changed.

pub mod logging;
pub mod mapper;
pub mod model;
pub mod pool;
pub mod repo;
pub mod schema;
pub mod store;

pub use logging::{default_log_level, init_logging, logging_status, LoggingConfig, LoggingError};
pub use mapper::Mapper;
pub use model::params::{Fields, Params};
pub use model::record::{Record, RecordId, RecordRef};
pub use model::value::{Key, Tuple, Value};
pub use pool::{MapperSource, Pool};
pub use repo::error::{LookupError, MapperError, MapperResult};
pub use repo::find_cache::FindResult;
pub use repo::repository::{Repository, RepositoryRef};
pub use schema::field::{Field, FieldType};
pub use schema::format::{StandardFormatter, ValueFormatter};
pub use schema::index::{IndexDef, IndexPart};
pub use schema::space::{IndexSpec, Space, SpaceBuilder};
pub use schema::Schema;
pub use store::{
    open_store, open_store_in_memory, SqliteTupleClient, StoreError, StoreResult, TupleClient,
    UpdateOp,
};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
