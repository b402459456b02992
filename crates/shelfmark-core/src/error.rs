use std::fmt;

use rusqlite::ErrorCode;
use thiserror::Error;

/// The shape rule a rejected field value broke.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Constraint {
    /// A required value was absent (or a required text value was blank).
    Required,
    /// A text value exceeded its declared maximum length, in characters.
    MaxLength { max: usize, actual: usize },
    /// The supplied value does not have the declared column type.
    Type { expected: &'static str },
    /// Setting the value would make the domain hierarchy cyclic.
    Acyclic,
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Required => write!(f, "value is required"),
            Self::MaxLength { max, actual } => {
                write!(f, "length {actual} exceeds maximum of {max}")
            }
            Self::Type { expected } => write!(f, "expected a value of type {expected}"),
            Self::Acyclic => write!(f, "would create a cycle in the domain hierarchy"),
        }
    }
}

/// Which way a migration step was being run when it failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Up => write!(f, "up"),
            Self::Down => write!(f, "down"),
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("validation failed for {entity}.{field}: {constraint}")]
    Validation {
        entity: &'static str,
        field: &'static str,
        constraint: Constraint,
    },

    #[error("foreign key violation: {entity}.{field} references missing {references} with id {id}")]
    ForeignKeyViolation {
        entity: &'static str,
        field: &'static str,
        references: &'static str,
        id: i64,
    },

    #[error(
        "cannot delete {entity} with id {id}: {count} dependent {dependent} row(s) via {relation}"
    )]
    ReferentialIntegrity {
        entity: &'static str,
        id: i64,
        dependent: &'static str,
        relation: &'static str,
        count: usize,
    },

    #[error("storage temporarily unavailable: {message}")]
    TransientStorage { message: String },

    #[error("migration {version} ({name}) failed while running {direction}: {reason}")]
    Migration {
        version: &'static str,
        name: &'static str,
        direction: Direction,
        reason: String,
    },

    #[error("unknown migration version: {0}")]
    UnknownMigration(String),

    #[error("not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: i64 },

    #[error("database error: {0}")]
    Database(rusqlite::Error),
}

impl Error {
    /// Returns `true` when the operation may succeed if retried unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::TransientStorage { .. })
    }

    pub(crate) const fn validation(
        entity: &'static str,
        field: &'static str,
        constraint: Constraint,
    ) -> Self {
        Self::Validation {
            entity,
            field,
            constraint,
        }
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        match err.sqlite_error_code() {
            Some(ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked) => Self::TransientStorage {
                message: err.to_string(),
            },
            _ => Self::Database(err),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    fn sqlite_failure(code: i32) -> rusqlite::Error {
        rusqlite::Error::SqliteFailure(rusqlite::ffi::Error::new(code), None)
    }

    #[test]
    fn test_busy_and_locked_are_transient() {
        let busy = Error::from(sqlite_failure(rusqlite::ffi::SQLITE_BUSY));
        let locked = Error::from(sqlite_failure(rusqlite::ffi::SQLITE_LOCKED));

        assert!(busy.is_retryable());
        assert!(locked.is_retryable());
    }

    #[test]
    fn test_other_failures_are_not_retryable() {
        let err = Error::from(sqlite_failure(rusqlite::ffi::SQLITE_CONSTRAINT));
        assert!(matches!(err, Error::Database(_)));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_validation_message_names_field() {
        let err = Error::validation(
            "Book",
            "Title",
            Constraint::MaxLength {
                max: 255,
                actual: 300,
            },
        );
        assert_eq!(
            err.to_string(),
            "validation failed for Book.Title: length 300 exceeds maximum of 255"
        );
    }
}
