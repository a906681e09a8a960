// src/occupancy/error.rs

use thiserror::Error;

/// Failures an occupancy operation can surface. Every operation runs inside
/// one transaction, so any of these means the store was left untouched.
#[derive(Debug, Error)]
pub enum OccupancyError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("bed is no longer vacant, please pick another")]
    SlotAlreadyTaken,

    #[error("employee id '{0}' already exists")]
    DuplicateIdentifier(String),

    #[error("import rejected: {0}")]
    ImportValidation(String),

    #[error("occupancy invariant violated: {0}")]
    InvariantViolation(String),

    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),
}

/// Turns a unique-constraint violation on employees.emp_id into the typed
/// duplicate error; everything else stays a storage error.
pub(crate) fn map_unique(err: sqlx::Error, emp_id: &str) -> OccupancyError {
    if let sqlx::Error::Database(ref db) = err {
        if db.code().as_deref() == Some("23505") {
            return OccupancyError::DuplicateIdentifier(emp_id.to_string());
        }
    }
    OccupancyError::Storage(err)
}
