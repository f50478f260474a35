//! Error taxonomy shared by repositories, mappers, and the pool.

use crate::store::StoreError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type MapperResult<T> = Result<T, MapperError>;

/// Name resolution failures for mappers and spaces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    /// Composite identifier is not of the form `mapper.space`.
    InvalidSpaceName(String),
    InvalidMapperName(String),
    MapperNotRegistered(String),
    DuplicateMapper(String),
    SpaceNotFound(String),
}

impl Display for LookupError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidSpaceName(value) => write!(f, "invalid pool space name: {value}"),
            Self::InvalidMapperName(value) => write!(f, "invalid mapper name: {value}"),
            Self::MapperNotRegistered(value) => write!(f, "mapper {value} is not registered"),
            Self::DuplicateMapper(value) => write!(f, "mapper {value} was registered"),
            Self::SpaceNotFound(value) => write!(f, "space {value} is not defined"),
        }
    }
}

impl Error for LookupError {}

/// Failure of a mapping operation.
#[derive(Debug)]
pub enum MapperError {
    /// A primary-index field needed for the key is absent or null.
    InvalidKey { space: String, field: String },
    /// No declared index matches the constraint field set.
    NoIndex { space: String, params: String },
    UnknownField { space: String, field: String },
    /// A record was handed to the repository of another space.
    SpaceMismatch { expected: String, actual: String },
    NotFound { space: String, params: String },
    InvalidSchema(String),
    Lookup(LookupError),
    Store(StoreError),
}

impl Display for MapperError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidKey { space, field } => {
                write!(f, "invalid key for space {space}: field `{field}` is missing")
            }
            Self::NoIndex { space, params } => {
                write!(f, "no index in space {space} for params {params}")
            }
            Self::UnknownField { space, field } => {
                write!(f, "space {space} has no field `{field}`")
            }
            Self::SpaceMismatch { expected, actual } => {
                write!(f, "record of space {actual} cannot be saved into space {expected}")
            }
            Self::NotFound { space, params } => {
                write!(f, "no {space} record for params {params}")
            }
            Self::InvalidSchema(message) => write!(f, "invalid schema: {message}"),
            Self::Lookup(err) => write!(f, "{err}"),
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for MapperError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Lookup(err) => Some(err),
            Self::Store(err) => Some(err),
            Self::InvalidKey { .. }
            | Self::NoIndex { .. }
            | Self::UnknownField { .. }
            | Self::SpaceMismatch { .. }
            | Self::NotFound { .. }
            | Self::InvalidSchema(_) => None,
        }
    }
}

impl From<LookupError> for MapperError {
    fn from(value: LookupError) -> Self {
        Self::Lookup(value)
    }
}

impl From<StoreError> for MapperError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

#[cfg(test)]
mod tests {
    use super::{LookupError, MapperError};
    use crate::store::StoreError;
    use std::error::Error;

    #[test]
    fn store_errors_keep_their_source() {
        let err = MapperError::from(StoreError::UnknownSpace(9));
        assert!(err.source().is_some());
        assert_eq!(err.to_string(), "space 9 is not defined");
    }

    #[test]
    fn lookup_messages_name_the_identifier() {
        let err = MapperError::from(LookupError::InvalidSpaceName("users".to_string()));
        assert_eq!(err.to_string(), "invalid pool space name: users");
    }
}
